//! Child-process transport.
//!
//! Spawns the configured server and exposes its stdin/stdout as a
//! line-oriented channel. One line in, one line out; there is no background
//! reader, so the caller owns the pacing of the exchange.

use crate::config::ServerConfig;
use crate::error::TransportError;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Boxed future returned by [`LineTransport`] methods.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// A bidirectional, newline-framed message channel.
pub trait LineTransport: Send {
    /// Open the channel. Fails with [`TransportError::AlreadyConnected`] if it is open.
    fn connect(&mut self) -> TransportFuture<'_, ()>;

    /// Close the channel and release its resources. No-op when already closed.
    fn disconnect(&mut self) -> TransportFuture<'_, ()>;

    /// Write `line` followed by `\n` and flush.
    fn write_line<'a>(&'a mut self, line: &'a str) -> TransportFuture<'a, ()>;

    /// Read the next non-blank line without its terminator. `None` means end of stream.
    fn read_line(&mut self) -> TransportFuture<'_, Option<String>>;

    fn is_connected(&self) -> bool;
}

/// Handles for a running server process.
struct ChildProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Stdio transport to a locally spawned MCP server.
pub struct StdioTransport {
    config: ServerConfig,
    process: Option<ChildProcess>,
}

impl StdioTransport {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            process: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    async fn spawn(&mut self) -> Result<(), TransportError> {
        if self.process.is_some() {
            return Err(TransportError::AlreadyConnected);
        }

        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(env) = &self.config.env {
            cmd.envs(env);
        }

        let mut child = cmd.spawn().map_err(|e| TransportError::SpawnFailed {
            command: self.config.command.clone(),
            source: e,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or(TransportError::MissingPipe { stream: "stdin" })?;
        let stdout = child
            .stdout
            .take()
            .ok_or(TransportError::MissingPipe { stream: "stdout" })?;

        tracing::debug!(
            pid = child.id(),
            "Spawned MCP server: {} {:?}",
            self.config.command,
            self.config.args
        );

        self.process = Some(ChildProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        });
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), TransportError> {
        let Some(process) = self.process.take() else {
            return Ok(());
        };
        let ChildProcess {
            mut child, stdin, ..
        } = process;

        // Closing stdin is the server's signal to exit.
        drop(stdin);

        let grace = self.config.shutdown_grace();
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::debug!("MCP server exited with {status}");
            }
            Err(_) => {
                tracing::warn!(
                    "MCP server '{}' did not exit within {}ms, killing it",
                    self.config.command,
                    grace.as_millis()
                );
                child.kill().await?;
            }
        }
        Ok(())
    }

    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        let process = self.process.as_mut().ok_or(TransportError::NotConnected)?;
        process.stdin.write_all(line.as_bytes()).await?;
        process.stdin.write_all(b"\n").await?;
        process.stdin.flush().await?;
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>, TransportError> {
        let process = self.process.as_mut().ok_or(TransportError::NotConnected)?;
        let mut buf = String::new();
        loop {
            buf.clear();
            if process.stdout.read_line(&mut buf).await? == 0 {
                tracing::debug!("MCP server stdout closed (EOF)");
                return Ok(None);
            }
            let line = buf.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(line.to_string()));
        }
    }
}

impl LineTransport for StdioTransport {
    fn connect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(self.spawn())
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(self.shutdown())
    }

    fn write_line<'a>(&'a mut self, line: &'a str) -> TransportFuture<'a, ()> {
        Box::pin(self.send_line(line))
    }

    fn read_line(&mut self) -> TransportFuture<'_, Option<String>> {
        Box::pin(self.next_line())
    }

    fn is_connected(&self) -> bool {
        self.process.is_some()
    }
}
