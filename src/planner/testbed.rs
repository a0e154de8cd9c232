//! Testbed inventory.
//!
//! Only the device names are read from the pyATS-style `testbed.yaml`.
//! Connecting to the devices is somebody else's job.

use std::path::Path;

use serde::Deserialize;

use super::errors::PlannerError;

/// The set of devices a plan may target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Testbed {
    devices: Vec<String>,
}

#[derive(Deserialize)]
struct TestbedFile {
    #[serde(default)]
    devices: serde_yaml::Mapping,
}

impl Testbed {
    /// Build a testbed from a list of device names.
    pub fn from_devices<I, S>(devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            devices: devices.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse testbed YAML. Device names keep their file order.
    pub fn from_yaml(yaml: &str) -> Result<Self, PlannerError> {
        let file: TestbedFile = serde_yaml::from_str(yaml).map_err(|e| PlannerError::Testbed {
            reason: format!("failed to parse testbed: {e}"),
        })?;

        let devices: Vec<String> = file
            .devices
            .keys()
            .filter_map(|k| match k {
                serde_yaml::Value::String(s) => Some(s.clone()),
                serde_yaml::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect();

        if devices.is_empty() {
            return Err(PlannerError::Testbed {
                reason: "testbed defines no devices".into(),
            });
        }

        Ok(Self { devices })
    }

    /// Read and parse a testbed file.
    pub fn load(path: &Path) -> Result<Self, PlannerError> {
        let raw = std::fs::read_to_string(path).map_err(|e| PlannerError::Testbed {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        let testbed = Self::from_yaml(&raw)?;
        tracing::info!(
            path = %path.display(),
            devices = ?testbed.devices,
            "loaded testbed"
        );
        Ok(testbed)
    }

    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    pub fn contains(&self, device: &str) -> bool {
        self.devices.iter().any(|d| d == device)
    }

    /// Device names joined for prompts and error messages.
    pub fn device_list(&self) -> String {
        self.devices.join(", ")
    }
}
