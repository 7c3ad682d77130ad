//! Shared types and traits for tool system.
//!
//! This module defines the core abstractions for tools:
//! - Tool call input and the uniform text result envelope
//! - Tool trait for implementing new tools
//! - Error types for tool execution

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Platform;
use crate::core::tool::ToolDescriptor;
use crate::mcp::types::{Content, TextContent};
use crate::tools::validate::{ArgSchema, ValidatedArgs, ValidationError};

/// A single tool invocation as received from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Result of a tool invocation. Success and failure share this shape; a
/// failure is just text describing what went wrong.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<Content>,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text(TextContent::new(text))],
        }
    }

    /// Concatenated text of all text items.
    pub fn as_text(&self) -> String {
        self.content
            .iter()
            .map(|item| match item {
                Content::Text(text) => text.text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Errors that can occur during tool execution. The `Display` text is what the
/// caller sees in the result envelope.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Error parsing arguments: {0}")]
    InvalidArguments(#[from] ValidationError),
    #[error("Error: {0}")]
    Precondition(String),
    #[error("Error {action}: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Error: {0}")]
    Failed(String),
}

impl ToolError {
    pub fn io(action: &'static str, source: std::io::Error) -> Self {
        Self::Io { action, source }
    }

    pub fn missing_file(path: &Path) -> Self {
        Self::Precondition(format!("File {} does not exist", path.display()))
    }
}

/// Read-only values shared by every handler for the life of the process.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub workspace_root: PathBuf,
    pub default_timeout: Duration,
    pub max_output_bytes: usize,
    pub max_file_size: u64,
    pub platform: Platform,
}

impl ToolContext {
    /// Resolve a caller-supplied path. Relative paths are anchored at the
    /// workspace root.
    pub fn resolve(&self, raw: &str) -> PathBuf {
        self.workspace_root.join(raw)
    }
}

/// Trait for implementing tools.
///
/// Handlers receive arguments that already passed their schema, so defaults
/// are filled in and types are known to match.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Field table used both for validation and for the advertised schema.
    fn schema(&self) -> &'static ArgSchema;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().into(),
            description: self.description().into(),
            input_schema: self.schema().json_schema(),
        }
    }

    async fn invoke(&self, ctx: &ToolContext, args: ValidatedArgs) -> Result<ToolResult, ToolError>;
}
