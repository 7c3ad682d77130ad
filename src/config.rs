//! Process configuration resolved once at startup.
//!
//! Values come from the environment (after loading an optional `.env` file)
//! with built-in fallbacks. Unparseable values fall back to their defaults
//! rather than aborting startup.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::tools::ToolContext;

pub const DEFAULT_SERVER_NAME: &str = "toolhost";
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 120_000;
pub const MAX_COMMAND_TIMEOUT_MS: u64 = 600_000;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Platform used to pick the command shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Macos,
    Linux,
}

impl Platform {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "win32",
            Self::Macos => "darwin",
            Self::Linux => "linux",
        }
    }

    pub fn detect() -> Self {
        match std::env::consts::OS {
            "windows" => Self::Windows,
            "macos" => Self::Macos,
            _ => Self::Linux,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "win32" | "windows" => Ok(Self::Windows),
            "darwin" | "macos" => Ok(Self::Macos),
            "linux" => Ok(Self::Linux),
            _ => Err(format!("unsupported platform: {value}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            _ => Err(format!("unsupported log level: {value}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_name: String,
    pub server_version: String,
    pub workspace_path: PathBuf,
    pub command_timeout_ms: u64,
    pub max_output_bytes: usize,
    pub max_file_size: u64,
    pub debug: bool,
    pub log_level: LogLevel,
    pub platform: Platform,
}

impl Config {
    /// Load `.env` (if any) and resolve configuration from the process
    /// environment.
    pub fn from_env() -> Result<Self, std::io::Error> {
        let _ = dotenvy::dotenv();
        let cwd = std::env::current_dir()?;
        Ok(Self::from_lookup(&cwd, |key| std::env::var(key).ok()))
    }

    /// Resolve configuration through `lookup`, with relative paths anchored
    /// at `cwd`.
    pub fn from_lookup<F>(cwd: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let workspace_path = match value("WORKSPACE_PATH") {
            Some(raw) => normalize_path(cwd, raw.trim()),
            None => cwd.to_path_buf(),
        };

        let debug = value("DEBUG")
            .map(|v| v.eq_ignore_ascii_case("true") || v.trim() == "1")
            .unwrap_or(false);

        Self {
            server_name: value("MCP_SERVER_NAME").unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
            server_version: value("MCP_SERVER_VERSION")
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            workspace_path,
            command_timeout_ms: value("COMMAND_TIMEOUT_MS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|ms| (1..=MAX_COMMAND_TIMEOUT_MS).contains(ms))
                .unwrap_or(DEFAULT_COMMAND_TIMEOUT_MS),
            max_output_bytes: parse_or(value("MAX_OUTPUT_BYTES"), DEFAULT_MAX_OUTPUT_BYTES),
            max_file_size: parse_or(value("MAX_FILE_SIZE"), DEFAULT_MAX_FILE_SIZE),
            debug,
            log_level: parse_or(value("LOG_LEVEL"), LogLevel::default()),
            platform: value("FORCE_PLATFORM")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(Platform::detect),
        }
    }

    /// Default tracing filter directive, used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> String {
        let level = if self.debug {
            LogLevel::Debug
        } else {
            self.log_level
        };
        format!("toolhost={},toolhost_lib={},warn", level.as_str(), level.as_str())
    }

    pub fn tool_context(&self) -> ToolContext {
        ToolContext {
            workspace_root: self.workspace_path.clone(),
            default_timeout: Duration::from_millis(self.command_timeout_ms),
            max_output_bytes: self.max_output_bytes,
            max_file_size: self.max_file_size,
            platform: self.platform,
        }
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn normalize_path(cwd: &Path, raw: &str) -> PathBuf {
    let candidate = PathBuf::from(raw);
    if candidate.is_absolute() {
        candidate
    } else {
        cwd.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(Path::new("/srv/work"), |key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = config_with(&[]);
        assert_eq!(config.server_name, "toolhost");
        assert_eq!(config.server_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.workspace_path, PathBuf::from("/srv/work"));
        assert_eq!(config.command_timeout_ms, 120_000);
        assert_eq!(config.max_output_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert!(!config.debug);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.platform, Platform::detect());
    }

    #[test]
    fn test_relative_workspace_is_anchored_at_cwd() {
        let config = config_with(&[("WORKSPACE_PATH", "projects/site")]);
        assert_eq!(config.workspace_path, PathBuf::from("/srv/work/projects/site"));

        let config = config_with(&[("WORKSPACE_PATH", "/opt/site")]);
        assert_eq!(config.workspace_path, PathBuf::from("/opt/site"));
    }

    #[test]
    fn test_invalid_numbers_fall_back_to_defaults() {
        let config = config_with(&[
            ("COMMAND_TIMEOUT_MS", "soon"),
            ("MAX_FILE_SIZE", "-4"),
            ("MAX_OUTPUT_BYTES", "2048"),
        ]);
        assert_eq!(config.command_timeout_ms, DEFAULT_COMMAND_TIMEOUT_MS);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.max_output_bytes, 2048);
    }

    #[test]
    fn test_out_of_range_timeout_falls_back_to_default() {
        for raw in ["0", "600001"] {
            let config = config_with(&[("COMMAND_TIMEOUT_MS", raw)]);
            assert_eq!(config.command_timeout_ms, DEFAULT_COMMAND_TIMEOUT_MS, "{raw}");
        }

        let config = config_with(&[("COMMAND_TIMEOUT_MS", "600000")]);
        assert_eq!(config.command_timeout_ms, MAX_COMMAND_TIMEOUT_MS);
    }

    #[test]
    fn test_debug_flag_overrides_log_level() {
        let config = config_with(&[("LOG_LEVEL", "warn")]);
        assert_eq!(config.log_filter(), "toolhost=warn,toolhost_lib=warn,warn");

        let config = config_with(&[("LOG_LEVEL", "warn"), ("DEBUG", "1")]);
        assert!(config.debug);
        assert_eq!(config.log_filter(), "toolhost=debug,toolhost_lib=debug,warn");
    }

    #[test]
    fn test_platform_override() {
        let config = config_with(&[("FORCE_PLATFORM", "win32")]);
        assert_eq!(config.platform, Platform::Windows);

        let config = config_with(&[("FORCE_PLATFORM", "amiga")]);
        assert_eq!(config.platform, Platform::detect());
    }

    #[test]
    fn test_tool_context_projection() {
        let config = config_with(&[("COMMAND_TIMEOUT_MS", "5000")]);
        let ctx = config.tool_context();
        assert_eq!(ctx.workspace_root, PathBuf::from("/srv/work"));
        assert_eq!(ctx.default_timeout, Duration::from_millis(5000));
        assert_eq!(ctx.max_output_bytes, config.max_output_bytes);
    }
}
