//! Common test utilities for stdio server integration tests.

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use toolhost_lib::config::Platform;
use toolhost_lib::mcp::types::Implementation;
use toolhost_lib::mcp::McpServer;
use toolhost_lib::tools::{ToolContext, ToolRegistry};

pub fn test_server(root: &Path) -> McpServer {
    McpServer::new(
        ToolRegistry::default(),
        ToolContext {
            workspace_root: root.to_path_buf(),
            default_timeout: Duration::from_secs(10),
            max_output_bytes: 1024 * 1024,
            max_file_size: 1024 * 1024,
            platform: Platform::detect(),
        },
        Implementation::new("toolhost", "0.1.0"),
    )
}

/// Feed `messages` (one per line) through `serve` and return the parsed
/// response lines.
pub async fn run_session(server: &McpServer, messages: &[Value]) -> Vec<Value> {
    let input: String = messages.iter().map(|m| format!("{m}\n")).collect();
    let mut output = Vec::new();

    server
        .serve(input.as_bytes(), &mut output)
        .await
        .expect("serve failed");

    String::from_utf8(output)
        .expect("responses are UTF-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("response is JSON"))
        .collect()
}

pub fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

pub fn result_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"]
        .as_str()
        .expect("tool result text")
}
