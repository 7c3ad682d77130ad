//! Search tools for finding files by name and content.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use regex::Regex;
use serde::Deserialize;

use crate::tools::types::{Tool, ToolContext, ToolError, ToolResult};
use crate::tools::validate::{ArgSchema, Field, FieldDefault, FieldKind, ValidatedArgs};

const NO_MATCHES: &str = "No matches found";
const BINARY_SNIFF_BYTES: usize = 8 * 1024;

static GLOB_SCHEMA: ArgSchema = ArgSchema {
    fields: &[
        Field::required(
            "pattern",
            FieldKind::String,
            "Glob pattern, e.g. \"**/*.js\" or \"src/*.{html,css}\"",
        ),
        Field::optional("path", FieldKind::String, "Directory to search in")
            .with_default(FieldDefault::Str(".")),
    ],
};

#[derive(Debug, Deserialize)]
struct GlobArgs {
    pattern: String,
    path: String,
}

/// Tool for finding paths by glob pattern.
pub struct GlobTool;

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &'static str {
        "glob"
    }

    fn description(&self) -> &'static str {
        "Find files and directories matching a glob pattern. Paths are returned relative to the search directory, one per line."
    }

    fn schema(&self) -> &'static ArgSchema {
        &GLOB_SCHEMA
    }

    async fn invoke(&self, ctx: &ToolContext, args: ValidatedArgs) -> Result<ToolResult, ToolError> {
        let args: GlobArgs = args.into_typed()?;
        let root = ctx.resolve(&args.path);

        if !root.is_dir() {
            return Err(ToolError::Precondition(format!(
                "Directory {} does not exist",
                root.display()
            )));
        }

        let pattern = root_relative_pattern(&root, &args.pattern);
        let matcher = compile_glob(&pattern)?;
        let matches = glob_paths(&root, &matcher);
        tracing::debug!(pattern = %args.pattern, count = matches.len(), "glob finished");

        Ok(ToolResult::text(matches.join("\n")))
    }
}

fn compile_glob(pattern: &str) -> Result<GlobMatcher, ToolError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| ToolError::Failed(format!("Invalid glob pattern {pattern:?}: {e}")))
}

/// Matching runs against root-relative paths, so a leading `./` or an
/// absolute prefix naming `root` is dropped from the pattern.
fn root_relative_pattern(root: &Path, pattern: &str) -> String {
    let as_path = Path::new(pattern);
    if as_path.is_absolute() {
        if let Some(rel) = relative_slash_path(root, as_path) {
            return rel;
        }
        return pattern.to_string();
    }

    let mut rest = pattern;
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.to_string()
}

/// Relative, `/`-separated paths under `root` matching `matcher`, depth-first
/// in file-name order. Dot-entries are not descended into or reported.
fn glob_paths(root: &Path, matcher: &GlobMatcher) -> Vec<String> {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    walker
        .filter_map(Result::ok)
        .filter(|entry| entry.depth() > 0)
        .filter_map(|entry| relative_slash_path(root, entry.path()))
        .filter(|rel| matcher.is_match(rel))
        .collect()
}

fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

static GREP_SCHEMA: ArgSchema = ArgSchema {
    fields: &[
        Field::required("pattern", FieldKind::String, "Regular expression to search for"),
        Field::optional(
            "include",
            FieldKind::String,
            "Only search files matching this glob, e.g. \"*.css\"",
        ),
        Field::optional("path", FieldKind::String, "File or directory to search in")
            .with_default(FieldDefault::Str(".")),
        Field::optional(
            "output_mode",
            FieldKind::Enum(&["content", "files_with_matches"]),
            "\"content\" returns matching lines, \"files_with_matches\" returns file paths",
        )
        .with_default(FieldDefault::Str("content")),
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum OutputMode {
    Content,
    FilesWithMatches,
}

#[derive(Debug, Deserialize)]
struct GrepArgs {
    pattern: String,
    include: Option<String>,
    path: String,
    output_mode: OutputMode,
}

/// Tool for regular expression search over file contents.
pub struct GrepTool;

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn description(&self) -> &'static str {
        "Search file contents with a regular expression. Respects .gitignore and skips hidden and binary files."
    }

    fn schema(&self) -> &'static ArgSchema {
        &GREP_SCHEMA
    }

    async fn invoke(&self, ctx: &ToolContext, args: ValidatedArgs) -> Result<ToolResult, ToolError> {
        let args: GrepArgs = args.into_typed()?;
        let root = ctx.resolve(&args.path);

        let regex = match Regex::new(&args.pattern) {
            Ok(regex) => regex,
            Err(e) => {
                tracing::debug!(pattern = %args.pattern, error = %e, "grep pattern rejected");
                return Ok(ToolResult::text(NO_MATCHES));
            }
        };
        let include = match args.include.as_deref().map(IncludeFilter::new).transpose() {
            Ok(include) => include,
            Err(e) => {
                tracing::debug!(include = ?args.include, error = %e, "grep include rejected");
                return Ok(ToolResult::text(NO_MATCHES));
            }
        };

        if !root.exists() {
            return Ok(ToolResult::text(NO_MATCHES));
        }

        let hits = grep_files(&root, &regex, include.as_ref(), args.output_mode);
        if hits.is_empty() {
            Ok(ToolResult::text(NO_MATCHES))
        } else {
            Ok(ToolResult::text(hits.join("\n")))
        }
    }
}

struct IncludeFilter {
    matcher: GlobMatcher,
    whole_path: bool,
}

impl IncludeFilter {
    fn new(pattern: &str) -> Result<Self, globset::Error> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()?
            .compile_matcher();
        Ok(Self {
            matcher,
            whole_path: pattern.contains('/'),
        })
    }

    fn accepts(&self, rel: &str) -> bool {
        if self.whole_path {
            self.matcher.is_match(rel)
        } else {
            let name = rel.rsplit('/').next().unwrap_or(rel);
            self.matcher.is_match(name)
        }
    }
}

fn grep_files(
    root: &Path,
    regex: &Regex,
    include: Option<&IncludeFilter>,
    mode: OutputMode,
) -> Vec<String> {
    let mut out = Vec::new();

    for (path, rel) in candidate_files(root) {
        if let Some(filter) = include {
            if !filter.accepts(&rel) {
                continue;
            }
        }

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        if looks_binary(&bytes) {
            continue;
        }

        let content = String::from_utf8_lossy(&bytes);
        match mode {
            OutputMode::FilesWithMatches => {
                if content.lines().any(|line| regex.is_match(line)) {
                    out.push(rel);
                }
            }
            OutputMode::Content => {
                for (idx, line) in content.lines().enumerate() {
                    if regex.is_match(line) {
                        out.push(format!("{}:{}:{}", rel, idx + 1, line));
                    }
                }
            }
        }
    }

    out
}

/// Files to search, paired with the path shown to the caller. A file root is
/// reported by its own name.
fn candidate_files(root: &Path) -> Vec<(PathBuf, String)> {
    if root.is_file() {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        return vec![(root.to_path_buf(), name)];
    }

    WalkBuilder::new(root)
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .filter_map(|entry| {
            let rel = relative_slash_path(root, entry.path())?;
            Some((entry.into_path(), rel))
        })
        .collect()
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_SNIFF_BYTES).any(|b| *b == 0)
}
