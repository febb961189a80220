//! MCP client session: one connection to one server.
//!
//! Requests carry no id, so responses are paired with requests purely by
//! order. The session lock covers the whole write-then-read exchange, which
//! keeps concurrent callers on one client from reading each other's replies.
//!
//! An exchange whose future is dropped midway (a caller-side timeout, a lost
//! `select!` branch, an aborted task) leaves an unread reply in the pipe. The
//! session notices on its next use and drops that connection.

use crate::config::ServerConfig;
use crate::error::{McpAgentError, TransportError};
use crate::protocol::{Request, Response, decode_response, encode_request};
use crate::transport::{LineTransport, StdioTransport};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{Instrument, Span};

/// Connection state guarded by the session lock.
struct Session {
    transport: Box<dyn LineTransport>,
    connected: bool,
    // Set while a request line may be on the wire without its reply read.
    in_flight: bool,
}

impl Session {
    /// Tear down a connection left behind by an interrupted exchange.
    async fn reap_interrupted(&mut self) {
        if self.in_flight {
            tracing::warn!("Previous request was interrupted; dropping the connection");
            self.in_flight = false;
            teardown(self).await;
        }
    }
}

/// Async client for a line-JSON MCP server.
pub struct McpClient {
    session: Mutex<Session>,
    request_timeout: Option<Duration>,
    span: Span,
}

impl McpClient {
    /// Client for a server spawned from `config`.
    pub fn new(config: ServerConfig) -> Self {
        let span = tracing::info_span!("mcp_client", command = %config.command);
        let request_timeout = config.request_timeout();
        Self::with_transport(StdioTransport::new(config))
            .with_request_timeout(request_timeout)
            .with_span(span)
    }

    /// Client over an arbitrary transport.
    pub fn with_transport(transport: impl LineTransport + 'static) -> Self {
        Self {
            session: Mutex::new(Session {
                transport: Box::new(transport),
                connected: false,
                in_flight: false,
            }),
            request_timeout: None,
            span: tracing::info_span!("mcp_client"),
        }
    }

    /// Bound how long a request waits for its response line.
    ///
    /// On expiry the connection is torn down: a half-read stream cannot be
    /// resynchronized.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Span every operation of this client is recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub async fn is_connected(&self) -> bool {
        let mut session = self.session.lock().await;
        session.reap_interrupted().await;
        session.connected
    }

    /// Connection state without waiting for the session lock.
    ///
    /// `None` while another operation holds the session.
    pub fn try_is_connected(&self) -> Option<bool> {
        self.session
            .try_lock()
            .ok()
            .map(|session| session.connected && !session.in_flight)
    }

    /// Start the server and mark the session connected.
    pub async fn connect(&self) -> Result<(), McpAgentError> {
        self.establish().instrument(self.span.clone()).await
    }

    /// Stop the server. Does nothing when already disconnected.
    ///
    /// The session ends up disconnected even when shutting the server down
    /// fails; the failure is still reported.
    pub async fn disconnect(&self) -> Result<(), McpAgentError> {
        self.shut_down().instrument(self.span.clone()).await
    }

    /// Send one request and wait for its response line.
    ///
    /// Write/read failures, end of stream and timeouts leave the session
    /// disconnected. A response that fails to decode does not: the line was
    /// consumed whole, so the stream is still in step. Dropping the returned
    /// future before it completes also costs the connection.
    pub async fn send_request(&self, request: &Request) -> Result<Response, McpAgentError> {
        self.round_trip(request).instrument(self.span.clone()).await
    }

    async fn establish(&self) -> Result<(), McpAgentError> {
        let mut session = self.session.lock().await;
        session.reap_interrupted().await;
        if session.connected {
            return Err(McpAgentError::Connection {
                message: "Client is already connected".to_string(),
                source: None,
            });
        }

        match session.transport.connect().await {
            Ok(()) => {
                session.connected = true;
                tracing::info!("MCP session established successfully");
                Ok(())
            }
            Err(e) if e.is_connection_failure() => {
                tracing::error!("ConnectionError: {e}");
                Err(McpAgentError::Connection {
                    message: e.to_string(),
                    source: Some(e),
                })
            }
            Err(e) => {
                tracing::error!("Failed to initialize MCP session: {e}");
                Err(McpAgentError::client_with_source(
                    format!("Failed to initialize MCP session: {e}"),
                    e,
                ))
            }
        }
    }

    async fn shut_down(&self) -> Result<(), McpAgentError> {
        let mut session = self.session.lock().await;
        session.reap_interrupted().await;
        if !session.connected {
            return Ok(());
        }
        session.connected = false;

        match session.transport.disconnect().await {
            Ok(()) => {
                tracing::info!("MCP session closed");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to disconnect: {e}");
                Err(McpAgentError::client_with_source(
                    format!("Failed to disconnect: {e}"),
                    e,
                ))
            }
        }
    }

    async fn round_trip(&self, request: &Request) -> Result<Response, McpAgentError> {
        let mut session = self.session.lock().await;
        session.reap_interrupted().await;
        if !session.connected {
            tracing::error!("Client is not connected. Call connect() first.");
            return Err(McpAgentError::not_connected());
        }

        let line = encode_request(request).map_err(|e| {
            McpAgentError::client_with_source(format!("Failed to encode request: {e}"), e)
        })?;

        session.in_flight = true;
        let exchanged = exchange(session.transport.as_mut(), &line, self.request_timeout).await;
        session.in_flight = false;
        let received = match exchanged {
            Ok(received) => received,
            Err(e) => {
                tracing::error!("Failed to send request: {e}");
                teardown(&mut session).await;
                return Err(e);
            }
        };

        let response = decode_response(&received).map_err(|e| {
            tracing::error!("Failed to decode response: {e}");
            McpAgentError::client_with_source(format!("Failed to decode response: {e}"), e)
        })?;
        tracing::debug!("Received response: {received}");
        Ok(response)
    }

    /// Read the resource at `uri` and return its data.
    pub async fn read_resource(&self, uri: &str) -> Result<Value, McpAgentError> {
        let response = self.send_request(&Request::read_resource(uri)).await?;
        match response {
            Response::Success(data) => Ok(data),
            Response::Error(message) => {
                tracing::error!(parent: &self.span, "Failed to read resource '{uri}': {message}");
                Err(McpAgentError::Resource {
                    uri: uri.to_string(),
                    message,
                })
            }
        }
    }

    /// Call tool `name` with `arguments` and return its result.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, McpAgentError> {
        let response = self
            .send_request(&Request::call_tool(name, arguments))
            .await?;
        match response {
            Response::Success(data) => Ok(data),
            Response::Error(message) => {
                tracing::error!(parent: &self.span, "Failed to call tool '{name}': {message}");
                Err(McpAgentError::Tool {
                    tool: name.to_string(),
                    message,
                })
            }
        }
    }
}

/// Write one request line and read back one response line.
///
/// Every error returned here means the stream can no longer be trusted.
async fn exchange(
    transport: &mut dyn LineTransport,
    line: &str,
    timeout: Option<Duration>,
) -> Result<String, McpAgentError> {
    transport
        .write_line(line)
        .await
        .map_err(|e| wrap_transport("Failed to send request", e))?;
    tracing::debug!("Sent request: {line}");

    let read = transport.read_line();
    let received = match timeout {
        Some(limit) => tokio::time::timeout(limit, read).await.map_err(|elapsed| {
            McpAgentError::client_with_source(
                format!(
                    "No response received from the server within {}ms",
                    limit.as_millis()
                ),
                elapsed,
            )
        })?,
        None => read.await,
    };

    received
        .map_err(|e| wrap_transport("Failed to read response", e))?
        .ok_or_else(|| McpAgentError::client("No response received from the server."))
}

fn wrap_transport(context: &str, e: TransportError) -> McpAgentError {
    if e.is_connection_failure() {
        McpAgentError::Connection {
            message: format!("{context}: {e}"),
            source: Some(e),
        }
    } else {
        McpAgentError::client_with_source(format!("{context}: {e}"), e)
    }
}

/// Drop a broken connection.
async fn teardown(session: &mut Session) {
    session.connected = false;
    if let Err(e) = session.transport.disconnect().await {
        tracing::warn!("Failed to shut down broken connection: {e}");
    }
}
