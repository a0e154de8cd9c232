//! Application configuration.
//!
//! Reads `netbuddy.yaml` and resolves `${VAR}` / `${VAR:-default}` references
//! before parsing. Every section has defaults, so a missing file is not an
//! error: the binaries fall back to [`AppConfig::default`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::mcp_client::{ClientInfo, ServerConfig, SpawnOptions};

/// Config file name searched for in the working directory and its parents.
pub const CONFIG_FILE_NAME: &str = "netbuddy.yaml";

/// Env var pointing at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "NETBUDDY_CONFIG";

/// Name of the bundled tool host binary.
pub const SERVER_BINARY: &str = "multiply-server";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("{var} points at {path}, which does not exist")]
    MissingOverride { var: &'static str, path: String },
}

// ─── Sections ────────────────────────────────────────────────────────────────

/// Top-level configuration (mirrors `netbuddy.yaml`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Tool host launch settings. When absent the bundled `multiply-server`
    /// next to the running executable is used.
    pub server: Option<ServerConfig>,
    pub client: ClientConfig,
    pub planner: PlannerConfig,
    pub testbed: TestbedConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub name: String,
    pub version: String,
    pub request_timeout_ms: u64,
    pub shutdown_grace_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "multiply-demo-client".into(),
            version: "1.0".into(),
            request_timeout_ms: 10_000,
            shutdown_grace_ms: 1_000,
        }
    }
}

/// Chat-completions endpoint used by the planner.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub base_url: String,
    pub model: String,
    /// Empty means no `Authorization` header is sent.
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o".into(),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            temperature: 0.0,
            max_tokens: 512,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TestbedConfig {
    pub path: PathBuf,
}

impl Default for TestbedConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("testbed.yaml"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive. `RUST_LOG` takes precedence.
    pub filter: String,
    pub json: bool,
    /// Log file path, relative paths resolved under the data directory.
    /// Logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "netbuddy=info,warn".into(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Launch settings for the tool host.
    pub fn server_config(&self) -> ServerConfig {
        self.server.clone().unwrap_or_else(default_server_config)
    }

    pub fn spawn_options(&self) -> SpawnOptions {
        SpawnOptions {
            client_info: ClientInfo {
                name: self.client.name.clone(),
                version: self.client.version.clone(),
            },
            request_timeout: Duration::from_millis(self.client.request_timeout_ms),
            shutdown_grace: Duration::from_millis(self.client.shutdown_grace_ms),
        }
    }
}

/// The bundled server binary, looked up next to the current executable.
fn default_server_config() -> ServerConfig {
    let binary = format!("{SERVER_BINARY}{}", std::env::consts::EXE_SUFFIX);
    let command = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&binary)))
        .filter(|path| path.exists())
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or(binary);

    ServerConfig {
        command,
        args: Vec::new(),
        env: Default::default(),
        cwd: None,
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate the config file.
///
/// `NETBUDDY_CONFIG` wins when set; otherwise walks upward from `start`
/// looking for `netbuddy.yaml`. `Ok(None)` means no file, use defaults.
pub fn find_config_path(start: &Path) -> Result<Option<PathBuf>, ConfigError> {
    if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(expand_tilde(&explicit));
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::MissingOverride {
            var: CONFIG_ENV_VAR,
            path: path.display().to_string(),
        });
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Ok(Some(candidate));
        }
        if !dir.pop() {
            return Ok(None);
        }
    }
}

/// Read, interpolate and parse a config file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    parse_config(&raw).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Resolve the config for a binary: an explicit `--config` path, else the
/// searched-for file, else defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>), ConfigError> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            find_config_path(&cwd)?
        }
    };

    match path {
        Some(p) => Ok((load_config(&p)?, Some(p))),
        None => Ok((AppConfig::default(), None)),
    }
}

fn parse_config(raw: &str) -> Result<AppConfig, serde_yaml::Error> {
    let interpolated = interpolate_env_vars(raw);
    if interpolated.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    let mut config: AppConfig = serde_yaml::from_str(&interpolated)?;

    if let Some(file) = config.logging.file.take() {
        config.logging.file = Some(PathBuf::from(expand_tilde(&file.to_string_lossy())));
    }
    config.testbed.path = PathBuf::from(expand_tilde(&config.testbed.path.to_string_lossy()));

    Ok(config)
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                result.push_str(&resolve_var_expr(&after[..end]));
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated reference: keep the text as written.
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    result
}

fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((name, default)) => std::env::var(name)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| expand_tilde(default)),
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn interpolate_uses_default_when_unset() {
        std::env::remove_var("__NETBUDDY_TEST_UNSET__");
        assert_eq!(
            interpolate_env_vars("url: ${__NETBUDDY_TEST_UNSET__:-http://localhost:11434/v1}"),
            "url: http://localhost:11434/v1"
        );
    }

    #[test]
    fn interpolate_uses_value_when_set() {
        std::env::set_var("__NETBUDDY_TEST_KEY__", "sk-test");
        assert_eq!(
            interpolate_env_vars("api_key: ${__NETBUDDY_TEST_KEY__}"),
            "api_key: sk-test"
        );
        std::env::remove_var("__NETBUDDY_TEST_KEY__");
    }

    #[test]
    fn interpolate_leaves_plain_and_unterminated_text() {
        assert_eq!(interpolate_env_vars("plain $HOME text"), "plain $HOME text");
        assert_eq!(interpolate_env_vars("broken ${VAR"), "broken ${VAR");
    }

    #[test]
    fn expand_tilde_uses_home() {
        let expanded = expand_tilde("~/logs/netbuddy.log");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/logs/netbuddy.log"));
        assert_eq!(expand_tilde("/abs/path"), "/abs/path");
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.client.request_timeout_ms, 10_000);
        assert_eq!(config.client.shutdown_grace_ms, 1_000);
        assert_eq!(config.logging.filter, "netbuddy=info,warn");
        assert!(config.server.is_none());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let yaml = r#"
server:
  command: /opt/tools/multiply-server
  args: ["--quiet"]
client:
  request_timeout_ms: 2500
planner:
  model: llama3.1
  base_url: http://localhost:11434/v1
"#;
        let config = parse_config(yaml).unwrap();
        let server = config.server_config();
        assert_eq!(server.command, "/opt/tools/multiply-server");
        assert_eq!(server.args, vec!["--quiet".to_string()]);
        assert_eq!(config.client.request_timeout_ms, 2500);
        assert_eq!(config.client.name, "multiply-demo-client");
        assert_eq!(config.planner.model, "llama3.1");
        assert_eq!(config.planner.max_tokens, 512);

        let opts = config.spawn_options();
        assert_eq!(opts.request_timeout, Duration::from_millis(2500));
        assert_eq!(opts.shutdown_grace, Duration::from_secs(1));
    }

    #[test]
    fn default_server_falls_back_to_binary_name() {
        let server = AppConfig::default().server_config();
        assert!(server.command.contains(SERVER_BINARY));
        assert!(server.args.is_empty());
    }

    #[test]
    fn load_config_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"client: [not, a, mapping]\n").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn find_config_walks_upward() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join(CONFIG_FILE_NAME), "logging:\n  json: true\n").unwrap();

        // Only meaningful when the override var is not set in the test env.
        if std::env::var(CONFIG_ENV_VAR).is_err() {
            let found = find_config_path(&nested).unwrap().unwrap();
            assert_eq!(found, root.path().join(CONFIG_FILE_NAME));
            assert!(load_config(&found).unwrap().logging.json);
        }
    }
}
