//! Shell command execution tool.

use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use sysinfo::{Pid, ProcessesToUpdate, Signal, System};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command as TokioCommand};

use crate::config::{Platform, MAX_COMMAND_TIMEOUT_MS};
use crate::tools::types::{Tool, ToolContext, ToolError, ToolResult};
use crate::tools::validate::{ArgSchema, Field, FieldKind, ValidatedArgs};

static BASH_SCHEMA: ArgSchema = ArgSchema {
    fields: &[
        Field::required("command", FieldKind::String, "The command to execute"),
        Field::optional(
            "description",
            FieldKind::String,
            "Short description of what the command does",
        ),
        Field::optional(
            "timeout",
            FieldKind::Integer {
                min: Some(1),
                max: Some(MAX_COMMAND_TIMEOUT_MS as i64),
            },
            "Timeout in milliseconds (max 600000)",
        ),
    ],
};

#[derive(Debug, Deserialize)]
struct BashArgs {
    command: String,
    description: Option<String>,
    timeout: Option<u64>,
}

/// Tool for running a shell command in the workspace root.
pub struct BashTool;

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &'static str {
        "bash"
    }

    fn description(&self) -> &'static str {
        "Run a shell command in the workspace directory and return its output. Non-zero exits, timeouts, and oversized output are reported as errors."
    }

    fn schema(&self) -> &'static ArgSchema {
        &BASH_SCHEMA
    }

    async fn invoke(&self, ctx: &ToolContext, args: ValidatedArgs) -> Result<ToolResult, ToolError> {
        let args: BashArgs = args.into_typed()?;
        let timeout = args
            .timeout
            .map(Duration::from_millis)
            .unwrap_or(ctx.default_timeout);

        tracing::debug!(
            command = %args.command,
            description = args.description.as_deref().unwrap_or(""),
            timeout_ms = timeout.as_millis() as u64,
            "running shell command"
        );

        let started = Instant::now();
        let result = run_shell_command(ctx, &args.command, timeout).await;
        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "shell command finished");

        result.map(ToolResult::text)
    }
}

enum Collected {
    Finished {
        status: ExitStatus,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    Overflow,
}

async fn run_shell_command(
    ctx: &ToolContext,
    command: &str,
    timeout: Duration,
) -> Result<String, ToolError> {
    let mut child = shell_command(ctx.platform, command)
        .current_dir(&ctx.workspace_root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ToolError::Failed(format!("Failed to spawn shell: {e}")))?;

    let cap = ctx.max_output_bytes;
    let outcome = tokio::time::timeout(timeout, collect(&mut child, cap)).await;

    match outcome {
        Err(_) => {
            terminate(&mut child).await;
            Err(ToolError::Failed(format!(
                "Command timed out after {}ms: {}",
                timeout.as_millis(),
                command
            )))
        }
        Ok(Err(e)) => {
            terminate(&mut child).await;
            Err(ToolError::Failed(format!("Failed to collect command output: {e}")))
        }
        Ok(Ok(Collected::Overflow)) => {
            terminate(&mut child).await;
            Err(ToolError::Failed(format!(
                "Command output exceeded {cap} bytes: {command}"
            )))
        }
        Ok(Ok(Collected::Finished {
            status,
            stdout,
            stderr,
        })) => render_exit(command, status, &stdout, &stderr),
    }
}

fn shell_command(platform: Platform, command: &str) -> TokioCommand {
    match platform {
        Platform::Windows => {
            let mut cmd = TokioCommand::new("cmd");
            cmd.args(["/C", &format!("chcp 65001 >nul 2>&1 && {command}")]);
            cmd
        }
        Platform::Macos | Platform::Linux => {
            let mut cmd = TokioCommand::new("sh");
            cmd.args(["-c", command]);
            cmd
        }
    }
}

/// Why output capture stopped early.
#[derive(Debug, thiserror::Error)]
enum CaptureError {
    #[error("output cap exceeded")]
    Overflow,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Drain both pipes concurrently against one shared byte budget, then reap.
/// Stops at the first overflow without waiting for the other pipe.
async fn collect(child: &mut Child, cap: usize) -> std::io::Result<Collected> {
    let used = AtomicUsize::new(0);
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let captured = tokio::try_join!(
        read_capped(stdout, &used, cap),
        read_capped(stderr, &used, cap)
    );
    let (stdout, stderr) = match captured {
        Ok(pair) => pair,
        Err(CaptureError::Overflow) => return Ok(Collected::Overflow),
        Err(CaptureError::Io(e)) => return Err(e),
    };

    let status = child.wait().await?;
    Ok(Collected::Finished {
        status,
        stdout,
        stderr,
    })
}

/// Read until EOF, failing with `Overflow` once the shared total passes `cap`.
async fn read_capped<R>(
    reader: Option<R>,
    used: &AtomicUsize,
    cap: usize,
) -> Result<Vec<u8>, CaptureError>
where
    R: AsyncRead + Unpin,
{
    let mut out = Vec::new();
    let Some(mut reader) = reader else {
        return Ok(out);
    };

    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(out);
        }
        let total = used.fetch_add(n, Ordering::SeqCst) + n;
        if total > cap {
            return Err(CaptureError::Overflow);
        }
        out.extend_from_slice(&buf[..n]);
    }
}

async fn terminate(child: &mut Child) {
    kill_process_tree(child.id());

    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "kill after process tree termination failed");
    }
}

/// Kill `pid` and every descendant still attached to it, deepest first.
fn kill_process_tree(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    let root = Pid::from_u32(pid);

    let mut system = System::new();
    let _ = system.refresh_processes(ProcessesToUpdate::All, true);

    let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
    for (pid, process) in system.processes() {
        if let Some(parent) = process.parent() {
            children.entry(parent).or_default().push(*pid);
        }
    }

    let mut tree = vec![root];
    let mut next = 0;
    while next < tree.len() {
        if let Some(kids) = children.get(&tree[next]) {
            tree.extend(kids.iter().copied());
        }
        next += 1;
    }

    for pid in tree.into_iter().rev() {
        if let Some(process) = system.process(pid) {
            if process.kill_with(Signal::Kill) != Some(true) {
                let _ = process.kill();
            }
        }
    }
}

fn render_exit(
    command: &str,
    status: ExitStatus,
    stdout: &[u8],
    stderr: &[u8],
) -> Result<String, ToolError> {
    let stdout = String::from_utf8_lossy(stdout).into_owned();
    if status.success() {
        return Ok(stdout);
    }

    let Some(code) = status.code() else {
        return Err(ToolError::Failed(format!(
            "Command terminated by signal: {command}"
        )));
    };

    let stderr = String::from_utf8_lossy(stderr);
    let detail = if stderr.is_empty() {
        stdout.as_str()
    } else {
        stderr.as_ref()
    };

    let mut message = format!("Command failed with exit code {code}: {command}");
    if !detail.is_empty() {
        message.push('\n');
        message.push_str(detail);
    }
    Err(ToolError::Failed(message))
}
