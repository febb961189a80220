//! Client SDK for MCP servers that speak line-delimited JSON over stdio.
//!
//! The server is spawned as a child process. Each request is one JSON line on
//! its stdin and each response one JSON line on its stdout, strictly one
//! request in flight at a time. [`McpClient`] is the async API;
//! [`BlockingMcpClient`] runs the same operations to completion for callers
//! without a runtime.

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod transport;

pub use blocking::BlockingMcpClient;
pub use client::McpClient;
pub use config::{McpAgentConfig, ServerConfig};
pub use error::{ConfigError, ErrorKind, McpAgentError, ProtocolError, TransportError};
pub use protocol::{Request, Response};
pub use transport::{LineTransport, StdioTransport};
