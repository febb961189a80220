//! Error types for mcpagent operations.
//!
//! [`McpAgentError`] is what callers see. The layer-local errors
//! ([`TransportError`], [`ProtocolError`], [`ConfigError`]) are wrapped into it
//! at the session boundary and stay reachable through `source()`.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause carried by [`McpAgentError::Client`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by [`McpClient`](crate::McpClient) and
/// [`BlockingMcpClient`](crate::BlockingMcpClient).
#[derive(Debug, Error)]
pub enum McpAgentError {
    /// The server could not be started, or an operation ran while disconnected.
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<TransportError>,
    },

    /// The server answered a `read_resource` request with `status: error`.
    #[error("Failed to read resource '{uri}': {message}")]
    Resource { uri: String, message: String },

    /// The server answered a `call_tool` request with `status: error`.
    #[error("Failed to call tool '{tool}': {message}")]
    Tool { tool: String, message: String },

    /// Malformed responses, I/O failures and anything else unexpected.
    #[error("{message}")]
    Client {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

/// Coarse classification of an [`McpAgentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Resource,
    Tool,
    Client,
}

impl McpAgentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Resource { .. } => ErrorKind::Resource,
            Self::Tool { .. } => ErrorKind::Tool,
            Self::Client { .. } => ErrorKind::Client,
        }
    }

    pub(crate) fn not_connected() -> Self {
        Self::Connection {
            message: "Client is not connected. Call connect() first.".to_string(),
            source: None,
        }
    }

    pub(crate) fn client(message: impl Into<String>) -> Self {
        Self::Client {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn client_with_source(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Client {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Errors from the child-process transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to spawn MCP server '{command}': {source}")]
    SpawnFailed {
        command: String,
        source: std::io::Error,
    },

    #[error("Transport is already connected")]
    AlreadyConnected,

    #[error("Transport is not connected")]
    NotConnected,

    #[error("Child process {stream} was not captured")]
    MissingPipe { stream: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether this failure means the channel was never (or is no longer) usable,
    /// as opposed to an I/O failure mid-exchange.
    pub fn is_connection_failure(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Errors from encoding requests or decoding response lines.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response is not a JSON object")]
    NotAnObject,

    #[error("Response is missing the 'status' field")]
    MissingStatus,

    #[error("Unknown response status: {0}")]
    UnknownStatus(String),
}

/// Errors from loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config file parse error at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
