//! Tool registry and implementations.
//!
//! This module provides:
//! - Tool registry for discovery and invocation
//! - Built-in tools: shell commands, file read/write/edit, glob, grep, ls
//! - Table-driven argument validation shared by every tool
//!
//! # Tool Lifecycle
//!
//! 1. The dispatcher hands a `ToolCall` to the registry
//! 2. Arguments are checked against the tool's `ArgSchema`
//! 3. The handler runs with a shared `ToolContext`
//! 4. Success or failure is returned as a text `ToolResult`
//!
//! # Module Structure
//!
//! - `types`: Core types (Tool trait, ToolCall, ToolResult, ToolError)
//! - `validate`: Argument schemas and validation
//! - `registry`: ToolRegistry for managing and invoking tools
//! - `fs`: Filesystem tools (read, write, edit, ls)
//! - `search`: Search tools (glob, grep)
//! - `cmd`: Command execution (bash)
//!
//! # Adding New Tools
//!
//! 1. Implement the tool in the appropriate submodule with a static schema
//! 2. Register it in `ToolRegistry::default` (in `registry.rs`)

// Public exports
pub use registry::ToolRegistry;
pub use types::{Tool, ToolCall, ToolContext, ToolError, ToolResult};
pub use validate::{ArgSchema, ValidatedArgs, ValidationError};

// Submodules
pub mod cmd;
pub mod fs;
mod registry;
pub mod search;
mod types;
pub mod validate;

#[cfg(test)]
mod tests;
