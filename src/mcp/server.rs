//! Stdio MCP server: reads one JSON-RPC message per line, answers in order.
//!
//! The loop is strictly sequential. A request is read, dispatched, and its
//! response written and flushed before the next line is read.

use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::types::{
    negotiate_protocol_version, CallToolParams, Implementation, InitializeParams,
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId,
    ServerCapabilities, ToolsCapability,
};
use crate::config::Config;
use crate::tools::{ToolCall, ToolContext, ToolRegistry};

/// Failures that end the serve loop.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct McpServer {
    registry: ToolRegistry,
    ctx: ToolContext,
    server_info: Implementation,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, ctx: ToolContext, server_info: Implementation) -> Self {
        Self {
            registry,
            ctx,
            server_info,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ToolRegistry::default(),
            config.tool_context(),
            Implementation::new(config.server_name.clone(), config.server_version.clone()),
        )
    }

    /// Serve over the process's stdin/stdout until stdin closes.
    pub async fn run_stdio(&self) -> Result<(), TransportError> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve line-delimited JSON-RPC from `reader` to `writer` until EOF.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), TransportError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                tracing::info!("input closed, shutting down");
                return Ok(());
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_message(line).await,
                Err(e) => Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(format!("Parse error: {e}")),
                )),
            };

            if let Some(response) = response {
                write_response(&mut writer, &response).await?;
            }
        }
    }

    /// Handle one raw message. Returns `None` for notifications.
    pub async fn handle_message(&self, line: &str) -> Option<JsonRpcResponse> {
        let raw: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "unparseable message");
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(format!("Parse error: {e}")),
                ));
            }
        };

        let id = raw
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

        if !raw.get("method").is_some_and(Value::is_string) {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Invalid Request: missing method"),
            ));
        }

        let request: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(format!("Invalid Request: {e}")),
                ))
            }
        };

        if request.is_notification() {
            tracing::debug!(method = %request.method, "notification received");
            return None;
        }
        let id = request.id.clone()?;

        tracing::debug!(method = %request.method, %id, "request received");
        let response = match self.dispatch(request).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(Some(id), error),
        };
        Some(response)
    }

    async fn dispatch(&self, request: JsonRpcRequest) -> Result<Value, JsonRpcError> {
        match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => encode(&ListToolsResult {
                tools: self.registry.list(),
            }),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = match params {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| JsonRpcError::invalid_params(format!("Invalid initialize params: {e}")))?,
            None => InitializeParams::default(),
        };

        let protocol_version = negotiate_protocol_version(params.protocol_version.as_deref());
        match &params.client_info {
            Some(client) => tracing::info!(
                client = %client.name,
                client_version = %client.version,
                protocol_version,
                "client initialized"
            ),
            None => tracing::info!(protocol_version, "client initialized"),
        }

        encode(&InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.server_info.clone(),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let has_name = params
            .as_ref()
            .and_then(|p| p.get("name"))
            .is_some_and(Value::is_string);
        if !has_name {
            return Err(JsonRpcError::invalid_params("Missing tool name"));
        }

        let params: CallToolParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tool call params: {e}")))?
            .ok_or_else(|| JsonRpcError::invalid_params("Missing tool name"))?;

        let call = ToolCall {
            name: params.name,
            arguments: params.arguments.unwrap_or(Value::Null),
        };
        let result = self.registry.invoke(&self.ctx, call).await;
        encode(&result)
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}
