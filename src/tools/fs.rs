//! Filesystem tools for reading, writing, editing, and listing files.

use std::fs::Metadata;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;

use crate::tools::types::{Tool, ToolContext, ToolError, ToolResult};
use crate::tools::validate::{ArgSchema, Field, FieldDefault, FieldKind, ValidatedArgs};

static READ_SCHEMA: ArgSchema = ArgSchema {
    fields: &[
        Field::required("file_path", FieldKind::String, "Path to the file"),
        Field::optional(
            "limit",
            FieldKind::Integer {
                min: Some(0),
                max: None,
            },
            "Number of lines to read (0 or absent reads to the end of the file)",
        ),
        Field::optional(
            "offset",
            FieldKind::Integer {
                min: Some(0),
                max: None,
            },
            "Zero-based line number to start reading from",
        )
        .with_default(FieldDefault::Integer(0)),
    ],
};

#[derive(Debug, Deserialize)]
struct ReadArgs {
    file_path: String,
    limit: Option<usize>,
    offset: usize,
}

/// Tool for reading a window of lines from a file.
pub struct ReadTool;

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &'static str {
        "read"
    }

    fn description(&self) -> &'static str {
        "Read file contents. Lines are prefixed with their 1-based line number and a tab. Use offset/limit to read a window of a large file."
    }

    fn schema(&self) -> &'static ArgSchema {
        &READ_SCHEMA
    }

    async fn invoke(&self, ctx: &ToolContext, args: ValidatedArgs) -> Result<ToolResult, ToolError> {
        let args: ReadArgs = args.into_typed()?;
        let full = ctx.resolve(&args.file_path);

        if !full.exists() {
            return Err(ToolError::missing_file(&full));
        }

        let metadata = std::fs::metadata(&full).map_err(|e| ToolError::io("reading file", e))?;
        if metadata.len() > ctx.max_file_size {
            return Err(ToolError::Failed(format!(
                "File {} is {} bytes, larger than the {} byte limit",
                full.display(),
                metadata.len(),
                ctx.max_file_size
            )));
        }

        let bytes = std::fs::read(&full).map_err(|e| ToolError::io("reading file", e))?;
        let content = String::from_utf8_lossy(&bytes);
        Ok(ToolResult::text(number_lines(&content, args.offset, args.limit)))
    }
}

/// Render `content` split on `\n`, starting at zero-based `offset`, with at
/// most `limit` lines (`None` or `0` means to the end).
pub(crate) fn number_lines(content: &str, offset: usize, limit: Option<usize>) -> String {
    let take = match limit {
        Some(n) if n > 0 => n,
        _ => usize::MAX,
    };

    content
        .split('\n')
        .enumerate()
        .skip(offset)
        .take(take)
        .map(|(idx, line)| format!("{}\t{}", idx + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

static WRITE_SCHEMA: ArgSchema = ArgSchema {
    fields: &[
        Field::required("file_path", FieldKind::String, "Path to the file"),
        Field::required("content", FieldKind::String, "Content to write"),
    ],
};

#[derive(Debug, Deserialize)]
struct WriteArgs {
    file_path: String,
    content: String,
}

/// Tool for writing file contents.
pub struct WriteTool;

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &'static str {
        "write"
    }

    fn description(&self) -> &'static str {
        "Write content to a file, creating it or replacing its entire contents"
    }

    fn schema(&self) -> &'static ArgSchema {
        &WRITE_SCHEMA
    }

    async fn invoke(&self, ctx: &ToolContext, args: ValidatedArgs) -> Result<ToolResult, ToolError> {
        let args: WriteArgs = args.into_typed()?;
        let full = ctx.resolve(&args.file_path);

        std::fs::write(&full, args.content).map_err(|e| ToolError::io("writing file", e))?;

        Ok(ToolResult::text(format!(
            "File written successfully to {}",
            full.display()
        )))
    }
}

static EDIT_SCHEMA: ArgSchema = ArgSchema {
    fields: &[
        Field::required("file_path", FieldKind::String, "Path to the file"),
        Field::required("old_string", FieldKind::String, "Exact text to replace"),
        Field::required("new_string", FieldKind::String, "Replacement text"),
        Field::optional(
            "replace_all",
            FieldKind::Boolean,
            "Replace every occurrence instead of only the first",
        )
        .with_default(FieldDefault::Boolean(false)),
    ],
};

#[derive(Debug, Deserialize)]
struct EditArgs {
    file_path: String,
    old_string: String,
    new_string: String,
    replace_all: bool,
}

/// Tool for exact-match text replacement inside a file.
pub struct EditTool;

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &'static str {
        "edit"
    }

    fn description(&self) -> &'static str {
        "Edit a file by replacing exact text. Replaces the first occurrence unless replace_all is true."
    }

    fn schema(&self) -> &'static ArgSchema {
        &EDIT_SCHEMA
    }

    async fn invoke(&self, ctx: &ToolContext, args: ValidatedArgs) -> Result<ToolResult, ToolError> {
        let args: EditArgs = args.into_typed()?;
        let full = ctx.resolve(&args.file_path);

        if !full.exists() {
            return Err(ToolError::missing_file(&full));
        }

        let content =
            std::fs::read_to_string(&full).map_err(|e| ToolError::io("editing file", e))?;
        let updated = replace_text(&content, &args.old_string, &args.new_string, args.replace_all)?;
        std::fs::write(&full, updated).map_err(|e| ToolError::io("editing file", e))?;

        Ok(ToolResult::text("File edited successfully"))
    }
}

/// Exact substring replacement. Without `replace_all`, a missing needle is an
/// error and only the first match changes; with it, zero matches is a no-op.
pub(crate) fn replace_text(
    content: &str,
    old: &str,
    new: &str,
    replace_all: bool,
) -> Result<String, ToolError> {
    if replace_all {
        return Ok(content.replace(old, new));
    }
    if !content.contains(old) {
        return Err(ToolError::Precondition("String not found in file".into()));
    }
    Ok(content.replacen(old, new, 1))
}

static LS_SCHEMA: ArgSchema = ArgSchema {
    fields: &[
        Field::required("path", FieldKind::String, "Directory to list"),
        Field::optional(
            "ignore",
            FieldKind::StringArray,
            "Glob patterns; entries whose names match are left out",
        ),
    ],
};

#[derive(Debug, Deserialize)]
struct LsArgs {
    path: String,
    ignore: Option<Vec<String>>,
}

/// Tool for long-form directory listings.
pub struct LsTool;

#[async_trait]
impl Tool for LsTool {
    fn name(&self) -> &'static str {
        "ls"
    }

    fn description(&self) -> &'static str {
        "List files and directories with type, permissions, size, and modification time"
    }

    fn schema(&self) -> &'static ArgSchema {
        &LS_SCHEMA
    }

    async fn invoke(&self, ctx: &ToolContext, args: ValidatedArgs) -> Result<ToolResult, ToolError> {
        let args: LsArgs = args.into_typed()?;
        let full = ctx.resolve(&args.path);
        let ignore = build_ignore_set(args.ignore.as_deref().unwrap_or_default())?;

        let metadata = match std::fs::metadata(&full) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::Precondition(format!(
                    "Path {} does not exist",
                    full.display()
                )))
            }
            Err(e) => return Err(ToolError::Failed(e.to_string())),
        };

        let mut entries: Vec<(String, Metadata)> = Vec::new();
        if metadata.is_dir() {
            for item in std::fs::read_dir(&full).map_err(|e| ToolError::Failed(e.to_string()))? {
                let item = item.map_err(|e| ToolError::Failed(e.to_string()))?;
                let name = item.file_name().to_string_lossy().into_owned();
                if ignore.is_match(&name) {
                    continue;
                }
                // Entries can vanish between read_dir and stat.
                let Ok(meta) = std::fs::symlink_metadata(item.path()) else {
                    continue;
                };
                entries.push((name, meta));
            }
        } else {
            let name = full
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| full.display().to_string());
            entries.push((name, metadata));
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let total: u64 = entries.iter().map(|(_, m)| m.len()).sum();
        let mut out = vec![format!("total {}", total)];
        out.extend(entries.iter().map(|(name, meta)| format_entry(name, meta)));

        Ok(ToolResult::text(out.join("\n")))
    }
}

fn build_ignore_set(patterns: &[String]) -> Result<GlobSet, ToolError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| ToolError::Failed(format!("invalid ignore pattern {pattern:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ToolError::Failed(format!("invalid ignore patterns: {e}")))
}

fn format_entry(name: &str, meta: &Metadata) -> String {
    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
        'l'
    } else if file_type.is_dir() {
        'd'
    } else {
        '-'
    };
    let modified = meta
        .modified()
        .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| "-".repeat(16));
    let suffix = if file_type.is_dir() { "/" } else { "" };

    format!(
        "{}{} {:>10} {} {}{}",
        kind,
        permission_string(meta),
        meta.len(),
        modified,
        name,
        suffix
    )
}

#[cfg(unix)]
fn permission_string(meta: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let mode = meta.permissions().mode();
    let mut out = String::with_capacity(9);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(not(unix))]
fn permission_string(meta: &Metadata) -> String {
    if meta.permissions().readonly() {
        "r--r--r--".to_string()
    } else {
        "rw-rw-rw-".to_string()
    }
}
