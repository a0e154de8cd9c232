//! The structured plan the planner model is asked to return.

use serde::{Deserialize, Serialize};

use super::errors::PlannerError;
use super::extract::extract_json_object;
use super::testbed::Testbed;

/// One device, one show command, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPlan {
    pub device: String,
    pub command: String,
    pub intent: String,
}

/// How a command's output should be collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandMode {
    /// Try the structured parser first, fall back to raw text.
    Parsed,
    /// Raw CLI text only. Running-config has no useful parsed form.
    Raw,
}

impl CommandMode {
    pub fn for_command(command: &str) -> Self {
        let normalized = command.trim().to_ascii_lowercase();
        if normalized.contains("show run") || normalized.contains("show running") {
            CommandMode::Raw
        } else {
            CommandMode::Parsed
        }
    }

    /// File suffix used when the output is staged on disk.
    pub fn file_suffix(self) -> &'static str {
        match self {
            CommandMode::Parsed => ".json",
            CommandMode::Raw => ".txt",
        }
    }
}

/// A validated plan ready to hand to the device layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCommand {
    #[serde(flatten)]
    pub plan: ExtractedPlan,
    pub mode: CommandMode,
    /// Suffix for the staged output file, following `mode`.
    pub output_suffix: &'static str,
}

/// Extract and decode a plan from raw model output.
pub fn parse_plan(raw_response: &str) -> Result<ExtractedPlan, PlannerError> {
    let value = extract_json_object(raw_response).map_err(|source| PlannerError::Extraction {
        raw_response: raw_response.to_string(),
        source,
    })?;

    serde_json::from_value(value).map_err(|e| PlannerError::InvalidPlan {
        raw_response: raw_response.to_string(),
        reason: e.to_string(),
    })
}

/// Reject plans that target a device outside the testbed.
pub fn validate_plan(plan: ExtractedPlan, testbed: &Testbed) -> Result<PlannedCommand, PlannerError> {
    if !testbed.contains(&plan.device) {
        return Err(PlannerError::UnknownDevice {
            device: plan.device,
            valid: testbed.devices().to_vec(),
        });
    }

    let mode = CommandMode::for_command(&plan.command);
    Ok(PlannedCommand {
        plan,
        mode,
        output_suffix: mode.file_suffix(),
    })
}
