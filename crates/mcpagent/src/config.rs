//! Configuration types for launching an MCP server.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Grace period `disconnect` waits for the child to exit before killing it.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 5000;

fn default_shutdown_grace() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_MS
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpAgentConfig {
    pub server: ServerConfig,
}

/// How to launch one MCP server process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Command to run (e.g., "python", "mcpagent-demo-server").
    pub command: String,
    /// Arguments to pass to the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment overrides. `None` inherits the parent environment untouched.
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
    /// Per-request response timeout in milliseconds. `None` waits forever.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// How long `disconnect` waits before killing the child (default: 5000).
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
}

impl ServerConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: None,
            timeout_ms: None,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl McpAgentConfig {
    /// Load a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse TOML config text. Errors are reported against the path `<string>`.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: "<string>".into(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_minimal_server() {
        let toml_str = r#"
[server]
command = "python"
"#;
        let config = McpAgentConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.server.command, "python");
        assert!(config.server.args.is_empty());
        assert!(config.server.env.is_none());
        assert!(config.server.timeout_ms.is_none());
        assert_eq!(config.server.shutdown_grace_ms, 5000); // default
    }

    #[test]
    fn parse_full_server() {
        let toml_str = r#"
[server]
command = "python"
args = ["server.py", "--quiet"]
timeout_ms = 2500
shutdown_grace_ms = 100
env = { GREETING_STYLE = "formal" }
"#;
        let config = McpAgentConfig::from_toml_str(toml_str).unwrap();
        let server = config.server;
        assert_eq!(server.args, vec!["server.py", "--quiet"]);
        assert_eq!(server.request_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(server.shutdown_grace(), Duration::from_millis(100));
        assert_eq!(server.env.unwrap()["GREETING_STYLE"], "formal");
    }

    #[test]
    fn missing_command_is_a_parse_error() {
        let err = McpAgentConfig::from_toml_str("[server]\nargs = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn builder_sets_fields() {
        let config = ServerConfig::new("cat")
            .arg("-u")
            .args(["a", "b"])
            .env_var("KEY", "value")
            .timeout(Duration::from_secs(2));
        assert_eq!(config.command, "cat");
        assert_eq!(config.args, vec!["-u", "a", "b"]);
        assert_eq!(config.env.as_ref().unwrap()["KEY"], "value");
        assert_eq!(config.timeout_ms, Some(2000));
    }

    #[test]
    fn huge_timeout_saturates() {
        let config = ServerConfig::new("cat").timeout(Duration::MAX);
        assert_eq!(config.timeout_ms, Some(u64::MAX));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\ncommand = \"sh\"\nargs = [\"-c\", \"cat\"]").unwrap();
        let config = McpAgentConfig::load(file.path()).unwrap();
        assert_eq!(config.server.command, "sh");
        assert_eq!(config.server.args.len(), 2);
    }

    #[test]
    fn load_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = McpAgentConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
