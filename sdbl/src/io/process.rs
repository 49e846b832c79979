//! Helper processes (package metadata queries) with a deadline and capped output.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run a short-lived helper such as `python -m pip show`, giving up after
/// `timeout`.
///
/// Stdin is closed. Each stream keeps at most `limit` bytes and the excess
/// is only counted.
#[instrument(skip_all, fields(program = ?cmd.get_program(), timeout_secs = timeout.as_secs()))]
pub fn run_helper(
    mut cmd: Command,
    timeout: Duration,
    limit: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .inspect_err(|e| error!(err = %e, "helper could not be started"))
        .with_context(|| format!("spawn {:?}", cmd.get_program()))?;

    let stdout = spawn_reader(child.stdout.take(), limit, "stdout")?;
    let stderr = spawn_reader(child.stderr.take(), limit, "stderr")?;

    let (status, timed_out) = match child.wait_timeout(timeout).context("wait for helper")? {
        Some(status) => (status, false),
        None => {
            warn!("helper unresponsive, terminating");
            child.kill().context("terminate helper")?;
            (child.wait().context("reap helper")?, true)
        }
    };

    let (stdout, dropped_out) = collect(stdout, "stdout")?;
    let (stderr, dropped_err) = collect(stderr, "stderr")?;
    let truncated = dropped_out + dropped_err;
    if truncated > 0 {
        debug!(truncated, "helper output clipped");
    }

    debug!(code = ?status.code(), timed_out, "helper exited");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        truncated,
        timed_out,
    })
}

type Captured = (Vec<u8>, usize);

fn spawn_reader<R: Read + Send + 'static>(
    pipe: Option<R>,
    limit: usize,
    name: &str,
) -> Result<thread::JoinHandle<Result<Captured>>> {
    let pipe = pipe.ok_or_else(|| anyhow!("{name} is not piped"))?;
    Ok(thread::spawn(move || read_stream_limited(pipe, limit)))
}

fn collect(handle: thread::JoinHandle<Result<Captured>>, name: &str) -> Result<Captured> {
    handle
        .join()
        .map_err(|_| anyhow!("{name} reader panicked"))?
        .with_context(|| format!("capture {name}"))
}

/// Drain `reader`, keeping the first `limit` bytes.
fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<Captured> {
    let mut kept = Vec::new();
    let mut dropped = 0usize;
    let mut chunk = [0u8; 4096];

    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            return Ok((kept, dropped));
        }
        let room = limit.saturating_sub(kept.len()).min(n);
        kept.extend_from_slice(&chunk[..room]);
        dropped += n - room;
    }
}
