//! MCP server over stdio.
//!
//! Newline-delimited JSON-RPC 2.0. Each tool maps onto one
//! [`MonitoringEngine`] operation and answers with pretty JSON text plus
//! `structuredContent`. Engine errors become `isError: true` tool results.
//! Tool calls run concurrently; responses to them may arrive out of order.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::engine::MonitoringEngine;
use super::errors::EngineError;

const SERVER_NAME: &str = "awswatch";

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Default, Deserialize)]
struct ListAlarmsArgs {
    #[serde(default)]
    only_in_alarm_state: bool,
}

#[derive(Debug, Deserialize)]
struct QueryLogsArgs {
    log_group_names: Vec<String>,
    query_string: String,
    #[serde(default)]
    start_time: Option<i64>,
    #[serde(default)]
    end_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct DiscoverFieldsArgs {
    log_group_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LogGroupExistsArgs {
    log_group_name: String,
}

#[derive(Clone)]
pub struct McpServer {
    engine: MonitoringEngine,
    protocol_version: String,
}

impl McpServer {
    pub fn new(engine: MonitoringEngine, protocol_version: impl Into<String>) -> Self {
        Self {
            engine,
            protocol_version: protocol_version.into(),
        }
    }

    /// Serve requests from stdin until it closes
    pub async fn run_stdio(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve newline-delimited requests from `reader`, answering on `writer`.
    ///
    /// `tools/call` requests run on their own tasks and answer as they finish,
    /// so a long query never holds up `ping` or other calls. Everything else is
    /// answered in order. Returns once `reader` is exhausted and every
    /// in-flight call has answered.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
        // Dropped at end of input so `rx` closes after the last in-flight call
        let mut tx = Some(tx);

        loop {
            tokio::select! {
                line = lines.next_line(), if tx.is_some() => {
                    let Some(line) = line? else {
                        tx = None;
                        continue;
                    };
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    debug!("incoming rpc line: {}", line);

                    let req = match serde_json::from_str::<RpcRequest>(line) {
                        Ok(req) => req,
                        Err(err) => {
                            warn!("failed to parse rpc request: {}", err);
                            continue;
                        }
                    };

                    let tool_call = tx.clone().filter(|_| req.method == "tools/call");
                    if let Some(responses) = tool_call {
                        let server = self.clone();
                        tokio::spawn(async move {
                            if let Some(resp) = server.handle_request(req).await {
                                let _ = responses.send(resp);
                            }
                        });
                    } else if let Some(resp) = self.handle_request(req).await {
                        write_response(&mut writer, &resp).await?;
                    }
                }
                Some(resp) = rx.recv() => {
                    write_response(&mut writer, &resp).await?;
                }
                else => break,
            }
        }

        Ok(())
    }

    async fn handle_request(&self, req: RpcRequest) -> Option<Value> {
        let id = req.id.clone();

        match req.method.as_str() {
            "initialize" => {
                let result = json!({
                    "protocolVersion": self.protocol_version,
                    "capabilities": {
                        "tools": {
                            "listChanged": false
                        }
                    },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                });

                id.map(|msg_id| rpc_ok(msg_id, result))
            }
            "ping" => id.map(|msg_id| rpc_ok(msg_id, json!({}))),
            "notifications/initialized" | "initialized" => None,
            "tools/list" => id.map(|msg_id| rpc_ok(msg_id, tools_list_result())),
            "tools/call" => {
                let msg_id = id?;

                let parsed: Result<ToolCallParams> =
                    serde_json::from_value(req.params).context("invalid tools/call params payload");

                match parsed {
                    Ok(params) => {
                        let tool_result = match self.call_tool(params).await {
                            Ok(value) => value,
                            Err(err) => tool_error_result(format!("{err:#}")),
                        };
                        Some(rpc_ok(msg_id, tool_result))
                    }
                    Err(err) => Some(rpc_err(msg_id, -32602, &format!("invalid params: {err}"))),
                }
            }
            _ => id.map(|msg_id| {
                rpc_err(msg_id, -32601, &format!("method not found: {}", req.method))
            }),
        }
    }

    async fn call_tool(&self, params: ToolCallParams) -> Result<Value> {
        match params.name.as_str() {
            "list_log_groups" => {
                let payload = serde_json::to_value(self.engine.list_log_groups())?;
                Ok(tool_ok_full(payload))
            }
            "list_alarms" => {
                let args: ListAlarmsArgs = if params.arguments.is_null() {
                    ListAlarmsArgs::default()
                } else {
                    serde_json::from_value(params.arguments)
                        .context("list_alarms expects {\"only_in_alarm_state\": bool}")?
                };
                let alarms = self
                    .engine
                    .list_alarms(args.only_in_alarm_state)
                    .await
                    .map_err(engine_error)?;
                Ok(tool_ok_full(json!({ "alarms": alarms })))
            }
            "list_alarms_in_alarm_state" => {
                let alarms = self
                    .engine
                    .list_alarms_in_alarm_state()
                    .await
                    .map_err(engine_error)?;
                Ok(tool_ok_full(json!({ "alarms": alarms })))
            }
            "query_logs" => {
                let args: QueryLogsArgs = serde_json::from_value(params.arguments).context(
                    "query_logs expects {\"log_group_names\": [...], \"query_string\": ...}",
                )?;
                let result = self
                    .engine
                    .query_logs(
                        args.log_group_names,
                        &args.query_string,
                        args.start_time,
                        args.end_time,
                    )
                    .await
                    .map_err(engine_error)?;
                Ok(tool_ok_full(serde_json::to_value(result)?))
            }
            "discover_log_fields" => {
                let args: DiscoverFieldsArgs = serde_json::from_value(params.arguments)
                    .context("discover_log_fields expects {\"log_group_names\": [...]}")?;
                let schema = self
                    .engine
                    .discover_fields(&args.log_group_names)
                    .await
                    .map_err(engine_error)?;
                Ok(tool_ok_full(serde_json::to_value(schema)?))
            }
            "log_group_exists" => {
                let args: LogGroupExistsArgs = serde_json::from_value(params.arguments)
                    .context("log_group_exists expects {\"log_group_name\": ...}")?;
                let exists = self.engine.log_group_exists(&args.log_group_name).await;
                Ok(tool_ok_full(json!({
                    "logGroupName": args.log_group_name,
                    "exists": exists
                })))
            }
            "get_saved_queries" => {
                let queries = self
                    .engine
                    .list_saved_queries()
                    .await
                    .map_err(engine_error)?;
                Ok(tool_ok_full(json!({ "savedQueries": queries })))
            }
            other => Err(anyhow!("unknown tool: {other}")),
        }
    }
}

async fn write_response<W>(writer: &mut W, resp: &Value) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(resp)?;
    writer.write_all(&payload).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

fn engine_error(err: EngineError) -> anyhow::Error {
    anyhow!("{}: {}", err.code(), err)
}

fn tools_list_result() -> Value {
    let log_group_names = json!({
        "type": "array",
        "items": { "type": "string" },
        "minItems": 1
    });

    json!({
        "tools": [
            {
                "name": "list_log_groups",
                "description": "Configured CloudWatch log group names, grouped by profile and category.",
                "inputSchema": { "type": "object", "properties": {} }
            },
            {
                "name": "list_alarms",
                "description": "List CloudWatch metric and composite alarms.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "only_in_alarm_state": { "type": "boolean", "default": false }
                    }
                }
            },
            {
                "name": "list_alarms_in_alarm_state",
                "description": "List CloudWatch alarms currently in the ALARM state.",
                "inputSchema": { "type": "object", "properties": {} }
            },
            {
                "name": "query_logs",
                "description": "Run a CloudWatch Logs Insights query and wait for its results. Check `status` on the result.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "log_group_names": log_group_names,
                        "query_string": { "type": "string" },
                        "start_time": { "type": "integer", "description": "Epoch milliseconds, defaults to 24h ago" },
                        "end_time": { "type": "integer", "description": "Epoch milliseconds, defaults to now" }
                    },
                    "required": ["log_group_names", "query_string"]
                }
            },
            {
                "name": "discover_log_fields",
                "description": "Sample recent records and infer the field names and types of log groups.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "log_group_names": log_group_names
                    },
                    "required": ["log_group_names"]
                }
            },
            {
                "name": "log_group_exists",
                "description": "Check whether a CloudWatch log group exists.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "log_group_name": { "type": "string" }
                    },
                    "required": ["log_group_name"]
                }
            },
            {
                "name": "get_saved_queries",
                "description": "List saved CloudWatch Logs Insights query definitions.",
                "inputSchema": { "type": "object", "properties": {} }
            }
        ]
    })
}

fn rpc_ok(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn rpc_err(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}

fn tool_ok_full(payload: Value) -> Value {
    let text = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string());
    json!({
        "content": [
            {
                "type": "text",
                "text": text
            }
        ],
        "structuredContent": payload,
        "isError": false
    })
}

fn tool_error_result(message: String) -> Value {
    json!({
        "content": [
            {
                "type": "text",
                "text": message
            }
        ],
        "isError": true
    })
}
