//! mcpagent CLI: read resources and call tools on a line-JSON MCP server.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mcpagent::{BlockingMcpClient, McpAgentConfig, McpAgentError, McpClient, Request, ServerConfig};
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mcpagent", version, about = "Drive a line-JSON MCP server")]
struct Cli {
    /// TOML config file with a [server] section
    #[arg(long)]
    config: Option<PathBuf>,

    /// Server command (defaults to the bundled demo server)
    #[arg(long = "command")]
    server_command: Option<String>,

    /// Server argument (repeatable)
    #[arg(long = "arg", allow_hyphen_values = true)]
    server_args: Vec<String>,

    /// Per-request response timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Enable verbose/debug logging
    #[arg(long)]
    verbose: bool,

    /// Use the blocking client instead of the async one
    #[arg(long)]
    blocking: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Read a resource by URI
    Read { uri: String },
    /// Call a tool with a JSON object of arguments
    Call {
        tool: String,
        #[arg(long, default_value = "{}")]
        arguments: String,
    },
    /// Read the greeting://<name> resource
    Greet { name: String },
    /// Call the `add` tool
    Add { a: i64, b: i64 },
    /// Greet Alice and add 10 + 20
    Demo,
}

/// One request to run and how to print its result.
struct Step {
    label: Option<&'static str>,
    request: Request,
    integer: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    mcpagent::logging::init(cli.verbose);

    let config = resolve_config(&cli)?;
    let steps = plan(cli.action)?;

    if cli.blocking {
        run_blocking(config, steps)
    } else {
        run_async(config, steps)
    }
}

/// Merge the config file (if any) with command-line overrides.
fn resolve_config(cli: &Cli) -> Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => McpAgentConfig::load(path)?.server,
        None => ServerConfig::new(match &cli.server_command {
            Some(command) => command.clone(),
            None => demo_server_path()?,
        }),
    };

    if let Some(command) = &cli.server_command {
        config.command = command.clone();
    }
    if !cli.server_args.is_empty() {
        config.args = cli.server_args.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = Some(timeout_ms);
    }
    Ok(config)
}

/// The demo server binary installed next to this executable.
fn demo_server_path() -> Result<String> {
    let exe = std::env::current_exe().context("Failed to locate the mcpagent executable")?;
    let server = exe.with_file_name(format!(
        "mcpagent-demo-server{}",
        std::env::consts::EXE_SUFFIX
    ));
    Ok(server.to_string_lossy().into_owned())
}

fn plan(action: Action) -> Result<Vec<Step>> {
    let step = |label, request, integer| Step {
        label,
        request,
        integer,
    };
    let steps = match action {
        Action::Read { uri } => vec![step(None, Request::read_resource(uri), false)],
        Action::Call { tool, arguments } => {
            let arguments = match serde_json::from_str(&arguments)
                .context("--arguments must be valid JSON")?
            {
                Value::Object(map) => map,
                other => bail!("--arguments must be a JSON object, got: {other}"),
            };
            vec![step(None, Request::call_tool(tool, arguments), false)]
        }
        Action::Greet { name } => vec![step(None, greeting(&name), false)],
        Action::Add { a, b } => vec![step(None, add(a, b), true)],
        Action::Demo => vec![
            step(Some("Greeting"), greeting("Alice"), false),
            step(Some("Sum"), add(10, 20), true),
        ],
    };
    Ok(steps)
}

fn greeting(name: &str) -> Request {
    Request::read_resource(format!("greeting://{name}"))
}

fn add(a: i64, b: i64) -> Request {
    let mut arguments = Map::new();
    arguments.insert("a".into(), a.into());
    arguments.insert("b".into(), b.into());
    Request::call_tool("add", arguments)
}

/// Format a result for stdout. Strings print bare, everything else as JSON.
fn render(label: Option<&str>, value: &Value, integer: bool) -> Result<String> {
    let text = if integer {
        let n = match value {
            Value::Number(n) => n.as_i64().or_else(|| whole_number(n.as_f64()?)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        n.with_context(|| format!("Expected an integer result, got: {value}"))?
            .to_string()
    } else {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    };
    Ok(match label {
        Some(label) => format!("{label}: {text}"),
        None => text,
    })
}

/// `f` as an integer, if it has no fractional part and fits.
fn whole_number(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

#[tokio::main]
async fn run_async(config: ServerConfig, steps: Vec<Step>) -> Result<()> {
    let client = McpClient::new(config);
    client
        .connect()
        .await
        .context("Failed to connect to MCP server")?;

    let mut outcome = Ok(());
    for Step {
        label,
        request,
        integer,
    } in steps
    {
        let result = match request {
            Request::ReadResource { uri } => client.read_resource(&uri).await,
            Request::CallTool { tool, arguments } => client.call_tool(&tool, arguments).await,
        };
        outcome = print_result(label, result, integer);
        if outcome.is_err() {
            break;
        }
    }

    let closed = client.disconnect().await;
    outcome?;
    closed.context("Failed to disconnect from MCP server")
}

fn run_blocking(config: ServerConfig, steps: Vec<Step>) -> Result<()> {
    let client = BlockingMcpClient::new(config)?;
    client.connect().context("Failed to connect to MCP server")?;

    let mut outcome = Ok(());
    for Step {
        label,
        request,
        integer,
    } in steps
    {
        let result = match request {
            Request::ReadResource { uri } => client.read_resource(&uri),
            Request::CallTool { tool, arguments } => client.call_tool(&tool, arguments),
        };
        outcome = print_result(label, result, integer);
        if outcome.is_err() {
            break;
        }
    }

    let closed = client.disconnect();
    outcome?;
    closed.context("Failed to disconnect from MCP server")
}

fn print_result(
    label: Option<&str>,
    result: Result<Value, McpAgentError>,
    integer: bool,
) -> Result<()> {
    let value = result.map_err(|e| {
        tracing::error!("An error occurred: {e}");
        e
    })?;
    println!("{}", render(label, &value, integer)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mcpagent").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn demo_plan_greets_then_adds() {
        let steps = plan(Action::Demo).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].request, Request::read_resource("greeting://Alice"));
        assert_eq!(steps[0].label, Some("Greeting"));
        match &steps[1].request {
            Request::CallTool { tool, arguments } => {
                assert_eq!(tool, "add");
                assert_eq!(Value::Object(arguments.clone()), json!({"a": 10, "b": 20}));
            }
            other => panic!("Expected call_tool, got: {other:?}"),
        }
        assert!(steps[1].integer);
    }

    #[test]
    fn call_arguments_must_be_an_object() {
        let err = plan(Action::Call {
            tool: "add".into(),
            arguments: "[1, 2]".into(),
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("JSON object"));

        assert!(
            plan(Action::Call {
                tool: "add".into(),
                arguments: "{not json".into(),
            })
            .is_err()
        );
    }

    #[test]
    fn render_strings_bare_and_values_as_json() {
        assert_eq!(render(None, &json!("Hello, Alice!"), false).unwrap(), "Hello, Alice!");
        assert_eq!(render(None, &json!({"k": 1}), false).unwrap(), r#"{"k":1}"#);
        assert_eq!(
            render(Some("Greeting"), &json!("Hi"), false).unwrap(),
            "Greeting: Hi"
        );
    }

    #[test]
    fn render_coerces_integers() {
        assert_eq!(render(Some("Sum"), &json!(30), true).unwrap(), "Sum: 30");
        assert_eq!(render(None, &json!("30"), true).unwrap(), "30");
        assert!(render(None, &json!("thirty"), true).is_err());
    }

    #[test]
    fn render_accepts_whole_floats() {
        assert_eq!(render(Some("Sum"), &json!(30.0), true).unwrap(), "Sum: 30");
        assert_eq!(render(None, &json!(-4.0), true).unwrap(), "-4");
        assert!(render(None, &json!(30.5), true).is_err());
        assert!(render(None, &json!(1e300), true).is_err());
    }

    #[test]
    fn flags_override_config() {
        let cli = cli(&[
            "--command",
            "python",
            "--arg",
            "server.py",
            "--arg",
            "--quiet",
            "--timeout-ms",
            "250",
            "demo",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.command, "python");
        assert_eq!(config.args, vec!["server.py", "--quiet"]);
        assert_eq!(config.timeout_ms, Some(250));
    }

    #[test]
    fn default_command_is_demo_server() {
        let config = resolve_config(&cli(&["greet", "Bob"])).unwrap();
        assert!(config.command.contains("mcpagent-demo-server"));
        assert!(config.args.is_empty());
    }
}
