use serde::{Deserialize, Serialize};

/// MCP tool descriptor as advertised by `tools/list`.
/// Field names follow the MCP wire shape so the registry output can be
/// serialized directly into the listing result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}
