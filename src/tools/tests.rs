//! Tool registry and tool execution tests

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::config::Platform;
    use crate::tools::{ToolCall, ToolContext, ToolRegistry};

    fn context(root: &Path) -> ToolContext {
        ToolContext {
            workspace_root: root.to_path_buf(),
            default_timeout: Duration::from_secs(10),
            max_output_bytes: 1024 * 1024,
            max_file_size: 1024 * 1024,
            platform: Platform::detect(),
        }
    }

    fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            name: name.to_string(),
            arguments,
        }
    }

    #[test]
    fn test_tool_registry_has_all_tools_in_order() {
        let registry = ToolRegistry::default();
        let names: Vec<String> = registry.list().into_iter().map(|t| t.name).collect();

        assert_eq!(
            names,
            vec!["bash", "read", "write", "edit", "glob", "grep", "ls"]
        );
    }

    #[test]
    fn test_descriptors_advertise_required_fields() {
        let registry = ToolRegistry::default();
        let tools = registry.list();

        let edit = tools.iter().find(|t| t.name == "edit").unwrap();
        assert_eq!(
            edit.input_schema["required"],
            json!(["file_path", "old_string", "new_string"])
        );
        assert_eq!(edit.input_schema["properties"]["replace_all"]["default"], false);

        let bash = tools.iter().find(|t| t.name == "bash").unwrap();
        assert_eq!(bash.input_schema["properties"]["timeout"]["maximum"], 600000);

        let grep = tools.iter().find(|t| t.name == "grep").unwrap();
        assert_eq!(
            grep.input_schema["properties"]["output_mode"]["enum"],
            json!(["content", "files_with_matches"])
        );
    }

    #[test]
    fn test_resolve() {
        let registry = ToolRegistry::default();
        assert_eq!(registry.resolve("glob").map(|t| t.name()), Some("glob"));
        assert!(registry.resolve("fs.read").is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_names_the_tool_without_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::default();

        let result = registry
            .invoke(
                &context(dir.path()),
                call("delete_everything", json!({"file_path": "x.txt", "content": "y"})),
            )
            .await;

        assert_eq!(result.as_text(), "Unknown tool: delete_everything");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_validation_failure_is_reported_before_handler_runs() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::default();

        let result = registry
            .invoke(&context(dir.path()), call("write", json!({"file_path": "x.txt"})))
            .await;
        assert_eq!(
            result.as_text(),
            "Error parsing arguments: content: missing required field"
        );
        assert!(!dir.path().join("x.txt").exists());

        let result = registry
            .invoke(&context(dir.path()), call("read", json!("x.txt")))
            .await;
        assert_eq!(
            result.as_text(),
            "Error parsing arguments: arguments must be an object"
        );
    }

    #[tokio::test]
    async fn test_write_edit_read_through_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::default();
        let ctx = context(dir.path());

        let result = registry
            .invoke(
                &ctx,
                call(
                    "write",
                    json!({"file_path": "index.html", "content": "<p>draft</p>\n<p>draft</p>"}),
                ),
            )
            .await;
        assert!(result.as_text().starts_with("File written successfully to "));

        let result = registry
            .invoke(
                &ctx,
                call(
                    "edit",
                    json!({"file_path": "index.html", "old_string": "draft", "new_string": "final"}),
                ),
            )
            .await;
        assert_eq!(result.as_text(), "File edited successfully");

        let result = registry
            .invoke(&ctx, call("read", json!({"file_path": "index.html"})))
            .await;
        assert_eq!(result.as_text(), "1\t<p>final</p>\n2\t<p>draft</p>");
    }

    #[tokio::test]
    async fn test_absolute_paths_bypass_workspace_root() {
        let workspace = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let target = elsewhere.path().join("outside.txt");
        std::fs::write(&target, "outside").unwrap();

        let registry = ToolRegistry::default();
        let result = registry
            .invoke(
                &context(workspace.path()),
                call("read", json!({"file_path": target.to_string_lossy()})),
            )
            .await;
        assert_eq!(result.as_text(), "1\toutside");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_bash_failure_becomes_result_text() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::default();

        let result = registry
            .invoke(&context(dir.path()), call("bash", json!({"command": "exit 7"})))
            .await;
        assert_eq!(
            result.as_text(),
            "Error: Command failed with exit code 7: exit 7"
        );
    }
}
