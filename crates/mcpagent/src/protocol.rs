//! Line-JSON wire format.
//!
//! Requests are `{"action": ..., ...}` objects, responses are
//! `{"status": "success", "data": ...}` or `{"status": "error", "error": ...}`.
//! Every message is a single line; serde_json's compact output never contains
//! a raw newline.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Message used when an error response carries no usable `error` field.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// A request sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    ReadResource {
        uri: String,
    },
    CallTool {
        tool: String,
        #[serde(default)]
        arguments: Map<String, Value>,
    },
}

impl Request {
    pub fn read_resource(uri: impl Into<String>) -> Self {
        Self::ReadResource { uri: uri.into() }
    }

    pub fn call_tool(tool: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self::CallTool {
            tool: tool.into(),
            arguments,
        }
    }

    /// The wire tag of this request.
    pub fn action(&self) -> &'static str {
        match self {
            Self::ReadResource { .. } => "read_resource",
            Self::CallTool { .. } => "call_tool",
        }
    }
}

/// A classified response line.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(Value),
    Error(String),
}

/// Serialize a request to one line, without the trailing newline.
pub fn encode_request(request: &Request) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(request)?)
}

/// Parse and classify one response line.
pub fn decode_response(line: &str) -> Result<Response, ProtocolError> {
    let value: Value = serde_json::from_str(line)?;
    let Value::Object(mut object) = value else {
        return Err(ProtocolError::NotAnObject);
    };

    let status = object.remove("status").ok_or(ProtocolError::MissingStatus)?;
    match status.as_str() {
        Some("success") => Ok(Response::Success(
            object.remove("data").unwrap_or(Value::Null),
        )),
        Some("error") => {
            let message = match object.remove("error") {
                Some(Value::String(message)) => message,
                _ => UNKNOWN_ERROR.to_string(),
            };
            Ok(Response::Error(message))
        }
        Some(other) => Err(ProtocolError::UnknownStatus(other.to_string())),
        None => Err(ProtocolError::UnknownStatus(status.to_string())),
    }
}

/// Parse one request line. Used by servers speaking this protocol.
pub fn decode_request(line: &str) -> Result<Request, ProtocolError> {
    Ok(serde_json::from_str(line)?)
}

/// Serialize a response to one line, without the trailing newline.
pub fn encode_response(response: &Response) -> Result<String, ProtocolError> {
    let value = match response {
        Response::Success(data) => json!({"status": "success", "data": data}),
        Response::Error(message) => json!({"status": "error", "error": message}),
    };
    Ok(serde_json::to_string(&value)?)
}
