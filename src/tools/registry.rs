//! Tool registry for tool discovery and invocation.
//!
//! The ToolRegistry owns the built-in tools in a fixed order. Every call is
//! validated against the tool's schema before the handler runs, and every
//! failure comes back as result text rather than an error.

use std::time::Instant;

use crate::core::tool::ToolDescriptor;
use crate::tools::cmd::BashTool;
use crate::tools::fs::{EditTool, LsTool, ReadTool, WriteTool};
use crate::tools::search::{GlobTool, GrepTool};
use crate::tools::types::{Tool, ToolCall, ToolContext, ToolResult};

/// Registry of all available tools.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl Default for ToolRegistry {
    /// Creates a registry with all built-in tools registered.
    fn default() -> Self {
        let tools: Vec<Box<dyn Tool>> = vec![
            // Command execution
            Box::new(BashTool),
            // Filesystem tools
            Box::new(ReadTool),
            Box::new(WriteTool),
            Box::new(EditTool),
            // Search tools
            Box::new(GlobTool),
            Box::new(GrepTool),
            Box::new(LsTool),
        ];
        Self { tools }
    }
}

impl ToolRegistry {
    /// Descriptors of every registered tool, in registration order.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    pub fn resolve(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Invoke a tool by name. Never fails: unknown tools, invalid arguments,
    /// and handler errors are all rendered into the returned text.
    pub async fn invoke(&self, ctx: &ToolContext, call: ToolCall) -> ToolResult {
        let Some(tool) = self.resolve(&call.name) else {
            tracing::warn!(tool = %call.name, "unknown tool requested");
            return ToolResult::text(format!("Unknown tool: {}", call.name));
        };

        let started = Instant::now();
        let outcome = match tool.schema().validate(&call.arguments) {
            Ok(args) => tool.invoke(ctx, args).await,
            Err(e) => Err(e.into()),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                tracing::debug!(tool = tool.name(), elapsed_ms, "tool call succeeded");
                result
            }
            Err(e) => {
                tracing::warn!(tool = tool.name(), elapsed_ms, error = %e, "tool call failed");
                ToolResult::text(e.to_string())
            }
        }
    }
}
