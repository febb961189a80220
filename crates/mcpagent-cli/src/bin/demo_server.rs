//! Demo MCP server speaking line-delimited JSON on stdin/stdout.
//!
//! Resources: `greeting://{name}`. Tools: `add(a, b)` and `echo(...)`.
//! Exits when stdin closes.

use anyhow::{Context, Result};
use mcpagent::protocol::{Request, Response, decode_request, encode_response};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    mcpagent::logging::init(false);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match decode_request(&line) {
            Ok(request) => handle(request),
            Err(e) => {
                tracing::warn!("Invalid request: {e}: {line}");
                Response::Error(format!("Invalid request: {e}"))
            }
        };

        let encoded = encode_response(&response).context("Failed to encode response")?;
        stdout.write_all(encoded.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}

fn handle(request: Request) -> Response {
    match request {
        Request::ReadResource { uri } => match uri.strip_prefix("greeting://") {
            Some(name) if !name.is_empty() => {
                Response::Success(Value::String(format!("Hello, {name}!")))
            }
            _ => Response::Error(format!("Unknown resource: {uri}")),
        },
        Request::CallTool { tool, arguments } => match tool.as_str() {
            "add" => add(&arguments),
            "echo" => Response::Success(Value::Object(arguments)),
            _ => Response::Error(format!("Unknown tool: {tool}")),
        },
    }
}

fn add(arguments: &Map<String, Value>) -> Response {
    let operand = |name: &str| arguments.get(name).and_then(Value::as_i64);
    match (operand("a"), operand("b")) {
        (Some(a), Some(b)) => match a.checked_add(b) {
            Some(sum) => Response::Success(sum.into()),
            None => Response::Error(format!("Integer overflow adding {a} and {b}")),
        },
        _ => Response::Error("Invalid arguments: 'a' and 'b' must be integers".to_string()),
    }
}
