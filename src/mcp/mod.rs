//! MCP (Model Context Protocol) server over stdio.
//!
//! - `types`: JSON-RPC framing and the MCP messages this server speaks
//! - `server`: the sequential read/dispatch/write loop

pub mod server;
pub mod types;

pub use server::{McpServer, TransportError};
