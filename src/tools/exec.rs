//! Allowlisted command execution.
//!
//! A run moves through `Spawning -> Running -> Exited`, or
//! `Running -> TimedOut -> Exited` when the deadline passes first. Both
//! deadlines are `tokio::time` futures scoped to the wait they guard, so
//! neither can fire after the child has been reaped.
//!
//! On unix the child leads a fresh process group and both signals go to the
//! whole group, so background jobs it started die with it.

use crate::{
    config::{MAX_OUTPUT_BYTES, MAX_TIMEOUT_MS},
    errors::{ErrorCode, IoContext, ToolError, ToolResult},
    mcp::registry::Tool,
    runtime::ToolRuntime,
    sandbox::ResolvedPath,
    tools::{collector::BoundedCollector, parse_params, root_dir, to_payload, within},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{
    ffi::OsString,
    io,
    path::PathBuf,
    process::{ExitStatus, Stdio},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, Command},
    sync::watch,
    time::timeout,
};
use tracing::{debug, warn};

/// Time between SIGTERM and SIGKILL.
pub const KILL_GRACE: Duration = Duration::from_secs(2);
/// How long output pipes may stay open after the child exited.
pub const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(250);

const FALLBACK_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RunCommandRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "root_dir")]
    pub cwd: String,
    pub timeout_ms: Option<u64>,
    pub max_output_bytes: Option<usize>,
}

/// A validated invocation. Nothing has been spawned yet.
#[derive(Debug)]
pub struct CommandSpec {
    pub command: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: ResolvedPath,
    pub timeout: Duration,
    pub output_cap: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub exit_code: Option<i32>,
    pub signal: Option<String>,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub duration_ms: u64,
}

impl ToolRuntime {
    /// Validates a request against the allowlist, limits and workspace.
    pub async fn command_spec(&self, req: RunCommandRequest) -> ToolResult<CommandSpec> {
        if !self.allowlist().contains(&req.command.as_str()) {
            return Err(ToolError::new(
                ErrorCode::CommandNotAllowed,
                format!("command not allowed: {}", req.command),
            )
            .with_details(json!({ "allowed": self.allowlist() })));
        }
        let timeout_ms =
            within("timeoutMs", req.timeout_ms, self.limits().default_timeout_ms, 1, MAX_TIMEOUT_MS)?;
        let output_cap = within(
            "maxOutputBytes",
            req.max_output_bytes,
            self.limits().default_output_bytes,
            1,
            MAX_OUTPUT_BYTES,
        )?;
        if req.args.iter().any(|a| a.contains('\0')) {
            return Err(ToolError::validation("arguments must not contain NUL bytes"));
        }

        let working_dir = self.resolve(&req.cwd, true)?;
        let meta = tokio::fs::metadata(&working_dir.absolute).await.for_path(&working_dir.relative)?;
        if !meta.is_dir() {
            return Err(ToolError::new(
                ErrorCode::NotDirectory,
                format!("working directory is not a directory: {}", working_dir.relative),
            ));
        }
        let program = which::which_in(&req.command, Some(search_path()), &working_dir.absolute)
            .map_err(|_| {
                ToolError::new(ErrorCode::NotFound, format!("command not found on PATH: {}", req.command))
            })?;

        Ok(CommandSpec {
            command: req.command,
            program,
            args: req.args,
            working_dir,
            timeout: Duration::from_millis(timeout_ms),
            output_cap,
        })
    }

    pub async fn run_command(&self, req: RunCommandRequest) -> ToolResult<CommandResult> {
        let spec = self.command_spec(req).await?;
        run(spec).await
    }
}

fn search_path() -> OsString {
    std::env::var_os("PATH").unwrap_or_else(|| OsString::from(FALLBACK_PATH))
}

/// Spawns `spec` and waits for it. A non-zero exit is still `Ok`.
pub async fn run(spec: CommandSpec) -> ToolResult<CommandResult> {
    let started = Instant::now();
    let mut command = Command::new(&spec.program);
    command.args(&spec.args);
    command.current_dir(&spec.working_dir.absolute);
    command.env_clear();
    command.env("PATH", search_path());
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command.kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().for_path(&spec.command)?;
    // The child leads its own group; the id stays valid as a group id after
    // the child itself is reaped.
    let group = child.id();
    debug!(command = %spec.command, pid = ?group, cwd = %spec.working_dir.relative, "spawned");

    let stdout = child.stdout.take().ok_or_else(|| ToolError::internal("stdout pipe missing"))?;
    let stderr = child.stderr.take().ok_or_else(|| ToolError::internal("stderr pipe missing"))?;
    let (stop_tx, stop_rx) = watch::channel(false);
    let out_task = tokio::spawn(pump(stdout, BoundedCollector::new(spec.output_cap), stop_rx.clone()));
    let err_task = tokio::spawn(pump(stderr, BoundedCollector::new(spec.output_cap), stop_rx));

    let exit = supervise(&mut child, group, spec.timeout)
        .await
        .map_err(|e| ToolError::internal("waiting for command failed").with_details(json!({ "cause": e.to_string() })))?;

    // Grandchildren can keep the pipes open after the child is gone.
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(OUTPUT_DRAIN_GRACE).await;
        let _ = stop_tx.send(true);
    });
    let (out, err) = tokio::join!(out_task, err_task);
    stopper.abort();
    let out = out.map_err(|e| ToolError::internal(format!("stdout reader failed: {e}")))?;
    let err = err.map_err(|e| ToolError::internal(format!("stderr reader failed: {e}")))?;

    let duration_ms = started.elapsed().as_millis() as u64;
    debug!(
        command = %spec.command,
        exit_code = ?exit.status.code(),
        timed_out = exit.timed_out,
        stdout_bytes = out.len(),
        stderr_bytes = err.len(),
        duration_ms,
        "exited"
    );
    Ok(CommandResult {
        exit_code: exit.status.code(),
        signal: signal_name(&exit.status),
        timed_out: exit.timed_out,
        stdout: out.text(),
        stderr: err.text(),
        stdout_truncated: out.truncated(),
        stderr_truncated: err.truncated(),
        duration_ms,
    })
}

/// Drains `reader` into `sink` until EOF or until told to stop. Keeps
/// reading past the cap so the child never blocks on a full pipe.
async fn pump<R>(mut reader: R, mut sink: BoundedCollector, mut stop: watch::Receiver<bool>) -> BoundedCollector
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 8192];
    loop {
        tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) | Err(_) => break,
                Ok(n) => sink.push(&buf[..n]),
            },
            _ = stop.changed() => break,
        }
    }
    sink
}

struct Exit {
    status: ExitStatus,
    timed_out: bool,
}

async fn supervise(child: &mut Child, group: Option<u32>, limit: Duration) -> io::Result<Exit> {
    if let Ok(status) = timeout(limit, child.wait()).await {
        return Ok(Exit { status: status?, timed_out: false });
    }

    debug!(pid = ?group, "deadline reached, terminating");
    terminate(child, group)?;
    if let Ok(status) = timeout(KILL_GRACE, child.wait()).await {
        let status = status?;
        // Sweep whatever outlived the leader.
        if let Err(e) = kill(child, group) {
            debug!(error = %e, "sweeping process group failed");
        }
        return Ok(Exit { status, timed_out: true });
    }

    warn!(pid = ?group, "command ignored termination, killing");
    if let Err(e) = kill(child, group) {
        // already gone between the grace deadline and here
        debug!(error = %e, "kill after grace failed");
    }
    Ok(Exit { status: child.wait().await?, timed_out: true })
}

#[cfg(unix)]
fn signal_group(group: Option<u32>, signal: nix::sys::signal::Signal) -> io::Result<()> {
    use nix::{errno::Errno, sys::signal::killpg, unistd::Pid};
    let Some(pgid) = group else { return Ok(()) };
    match killpg(Pid::from_raw(pgid as i32), signal) {
        // the whole group is already gone
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::from(e)),
    }
}

#[cfg(unix)]
fn terminate(_child: &mut Child, group: Option<u32>) -> io::Result<()> {
    signal_group(group, nix::sys::signal::Signal::SIGTERM)
}

#[cfg(unix)]
fn kill(_child: &mut Child, group: Option<u32>) -> io::Result<()> {
    signal_group(group, nix::sys::signal::Signal::SIGKILL)
}

#[cfg(not(unix))]
fn terminate(child: &mut Child, group: Option<u32>) -> io::Result<()> {
    kill(child, group)
}

#[cfg(not(unix))]
fn kill(child: &mut Child, _group: Option<u32>) -> io::Result<()> {
    match child.start_kill() {
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
        other => other,
    }
}

#[cfg(unix)]
fn signal_name(status: &ExitStatus) -> Option<String> {
    use nix::sys::signal::Signal;
    use std::os::unix::process::ExitStatusExt;
    let raw = status.signal()?;
    Some(match Signal::try_from(raw) {
        Ok(sig) => sig.as_str().to_string(),
        Err(_) => format!("SIG{raw}"),
    })
}

#[cfg(not(unix))]
fn signal_name(_status: &ExitStatus) -> Option<String> {
    None
}

pub struct RunCommandTool {
    runtime: Arc<ToolRuntime>,
}

impl RunCommandTool {
    pub fn new(runtime: Arc<ToolRuntime>) -> Self { Self { runtime } }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &'static str { "run_command" }

    fn description(&self) -> &'static str {
        "Run an allowlisted program (no shell) inside the workspace with a timeout and capped output."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({"type":"object","additionalProperties":false,"required":["command"],"properties":{
            "command":{"type":"string","enum": self.runtime.allowlist()},
            "args":{"type":"array","items":{"type":"string"},"default":[]},
            "cwd":{"type":"string","default":"."},
            "timeoutMs":{"type":"integer","minimum":1,"maximum":MAX_TIMEOUT_MS},
            "maxOutputBytes":{"type":"integer","minimum":1,"maximum":MAX_OUTPUT_BYTES}
        }})
    }

    async fn call(&self, params: serde_json::Value) -> ToolResult<serde_json::Value> {
        let req: RunCommandRequest = parse_params(params)?;
        to_payload(self.runtime.run_command(req).await?)
    }
}
