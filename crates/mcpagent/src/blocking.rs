//! Blocking wrapper around [`McpClient`].
//!
//! Each method drives the corresponding async operation to completion on a
//! private current-thread runtime owned by the wrapper. The runtime lives as
//! long as the wrapper because the child process's pipes are registered with
//! it at connect time.
//!
//! These methods must not be called from inside an async runtime. Such calls
//! are detected and fail with a client error instead of blocking the executor.

use crate::client::McpClient;
use crate::config::ServerConfig;
use crate::error::McpAgentError;
use serde_json::{Map, Value};
use std::future::Future;
use tokio::runtime::{Builder, Handle, Runtime};

pub struct BlockingMcpClient {
    // Declared before `runtime` so the client drops while its runtime is alive.
    client: McpClient,
    runtime: Runtime,
}

impl BlockingMcpClient {
    /// Blocking client for a server spawned from `config`.
    pub fn new(config: ServerConfig) -> Result<Self, McpAgentError> {
        Self::from_client(McpClient::new(config))
    }

    /// Wrap an existing, not yet connected, async client.
    pub fn from_client(client: McpClient) -> Result<Self, McpAgentError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                McpAgentError::client_with_source(format!("Failed to start runtime: {e}"), e)
            })?;
        Ok(Self { client, runtime })
    }

    pub fn client(&self) -> &McpClient {
        &self.client
    }

    /// Safe to call from anywhere, including inside an async runtime.
    ///
    /// Reports `false` while another thread holds the session.
    pub fn is_connected(&self) -> bool {
        if Handle::try_current().is_ok() {
            return self.client.try_is_connected().unwrap_or(false);
        }
        self.runtime.block_on(self.client.is_connected())
    }

    pub fn connect(&self) -> Result<(), McpAgentError> {
        self.run(self.client.connect())
    }

    pub fn disconnect(&self) -> Result<(), McpAgentError> {
        self.run(self.client.disconnect())
    }

    pub fn read_resource(&self, uri: &str) -> Result<Value, McpAgentError> {
        self.run(self.client.read_resource(uri))
    }

    pub fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, McpAgentError> {
        self.run(self.client.call_tool(name, arguments))
    }

    fn run<T>(
        &self,
        operation: impl Future<Output = Result<T, McpAgentError>>,
    ) -> Result<T, McpAgentError> {
        if Handle::try_current().is_ok() {
            return Err(McpAgentError::client(
                "Blocking MCP calls cannot be made from within an async runtime",
            ));
        }
        self.runtime.block_on(operation)
    }
}

impl Drop for BlockingMcpClient {
    fn drop(&mut self) {
        if Handle::try_current().is_ok() {
            // Can't block here; kill-on-drop still reaps the child.
            return;
        }
        if let Err(e) = self.runtime.block_on(self.client.disconnect()) {
            tracing::warn!("Failed to disconnect on drop: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn always_42() -> ServerConfig {
        ServerConfig::new("sh").args([
            "-c",
            r#"while IFS= read -r line; do echo '{"status":"success","data":42}'; done"#,
        ])
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn call_tool_blocking_end_to_end() {
        let client = BlockingMcpClient::new(always_42()).unwrap();
        client.connect().unwrap();
        assert!(client.is_connected());

        let result = client
            .call_tool("add", args(json!({"a": 10, "b": 20})))
            .unwrap();
        assert_eq!(result, json!(42));

        client.disconnect().unwrap();
        assert!(!client.is_connected());
    }

    #[test]
    fn disconnect_twice_is_a_no_op() {
        let client = BlockingMcpClient::new(always_42()).unwrap();
        client.connect().unwrap();
        client.disconnect().unwrap();
        client.disconnect().unwrap();
    }

    #[test]
    fn errors_surface_synchronously() {
        let client = BlockingMcpClient::new(always_42()).unwrap();
        let err = client.read_resource("greeting://Sync").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn resource_error_surfaces_synchronously() {
        let config = ServerConfig::new("sh").args([
            "-c",
            r#"while IFS= read -r line; do echo '{"status":"error","error":"no such greeting"}'; done"#,
        ]);
        let client = BlockingMcpClient::new(config).unwrap();
        client.connect().unwrap();
        let err = client.read_resource("greeting://Nobody").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(err.to_string().contains("no such greeting"));
    }

    #[test]
    fn drop_disconnects_gracefully() {
        let client = BlockingMcpClient::new(always_42()).unwrap();
        client.connect().unwrap();
        drop(client);
    }

    #[test]
    fn calls_inside_a_runtime_are_refused() {
        let client = BlockingMcpClient::new(always_42()).unwrap();
        let outer = Builder::new_current_thread().build().unwrap();
        {
            let _guard = outer.enter();
            let err = client.connect().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Client);
        }
        assert!(!client.is_connected());
    }

    #[test]
    fn connection_state_is_readable_inside_a_runtime() {
        let client = BlockingMcpClient::new(always_42()).unwrap();
        client.connect().unwrap();

        let outer = Builder::new_current_thread().build().unwrap();
        {
            let _guard = outer.enter();
            assert!(client.is_connected());
        }

        client.disconnect().unwrap();
        let _guard = outer.enter();
        assert!(!client.is_connected());
    }
}
