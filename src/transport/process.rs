//! FG-010: Child process execution with a deadline and a stdout ceiling.
//!
//! Spawn, optionally feed stdin, capture both streams. Each stream drains on
//! its own thread so a chatty stderr cannot stall stdout. On unix the child
//! leads its own process group, so a timeout takes down everything it spawned.

use super::{ExecError, ExecOutput, Limits};
use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const STREAM_BUF_SIZE: usize = 65536;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// stderr is kept for diagnostics only; anything past this is discarded.
pub const MAX_STDERR_BYTES: usize = 1024 * 1024;

#[derive(Debug, Default)]
struct Capture {
    bytes: Vec<u8>,
    overflowed: bool,
}

/// Run `cmd` to completion under `limits`.
pub fn run(mut cmd: Command, stdin_data: Option<Vec<u8>>, limits: Limits) -> Result<ExecOutput, ExecError> {
    let program = cmd.get_program().to_string_lossy().to_string();

    cmd.stdin(if stdin_data.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        program: program.clone(),
        source,
    })?;
    debug!(%program, pid = child.id(), "spawned");

    if let (Some(data), Some(mut stdin)) = (stdin_data, child.stdin.take()) {
        // A child that exits without reading closes the pipe; that is its business.
        thread::spawn(move || {
            let _ = stdin.write_all(&data);
        });
    }

    let overflow = Arc::new(AtomicBool::new(false));
    let stdout_rx = spawn_capture(
        child.stdout.take(),
        limits.max_output_bytes,
        true,
        Arc::clone(&overflow),
    );
    let stderr_rx = spawn_capture(
        child.stderr.take(),
        MAX_STDERR_BYTES,
        false,
        Arc::new(AtomicBool::new(false)),
    );

    let deadline = Instant::now() + limits.timeout;

    let status = loop {
        if overflow.load(Ordering::SeqCst) {
            warn!(%program, limit = limits.max_output_bytes, "output ceiling hit, killing");
            kill_tree(&mut child);
            return Err(ExecError::OutputTooLarge {
                limit: limits.max_output_bytes,
            });
        }
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                kill_tree(&mut child);
                return Err(ExecError::Io(format!("wait error: {}", e)));
            }
        }
        if Instant::now() >= deadline {
            warn!(%program, timeout_secs = limits.timeout.as_secs_f64(), "deadline passed, killing");
            kill_tree(&mut child);
            return Err(ExecError::Timeout {
                timeout: limits.timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    // Background children may still hold the pipes open.
    let stdout = match recv_before(&stdout_rx, deadline) {
        Some(capture) => capture,
        None => {
            kill_tree(&mut child);
            return Err(ExecError::Timeout {
                timeout: limits.timeout,
            });
        }
    };
    if stdout.overflowed {
        kill_tree(&mut child);
        return Err(ExecError::OutputTooLarge {
            limit: limits.max_output_bytes,
        });
    }
    let stderr = recv_before(&stderr_rx, deadline).unwrap_or_default();

    let exit_code = status.code().unwrap_or(-1);
    debug!(%program, exit_code, stdout_bytes = stdout.bytes.len(), "finished");

    Ok(ExecOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout.bytes).to_string(),
        stderr: String::from_utf8_lossy(&stderr.bytes).to_string(),
    })
}

fn spawn_capture<R: Read + Send + 'static>(
    reader: Option<R>,
    limit: usize,
    hard_limit: bool,
    overflow: Arc<AtomicBool>,
) -> Receiver<Capture> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let capture = match reader {
            Some(r) => read_capped(r, limit, hard_limit, &overflow),
            None => Capture::default(),
        };
        let _ = tx.send(capture);
    });
    rx
}

/// Read until EOF keeping at most `limit` bytes. With `hard_limit` the read
/// stops at the first byte past the limit and flags the overflow; otherwise
/// the excess is drained and dropped.
fn read_capped<R: Read>(mut reader: R, limit: usize, hard_limit: bool, overflow: &AtomicBool) -> Capture {
    let mut capture = Capture::default();
    let mut buf = [0u8; STREAM_BUF_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        let room = limit.saturating_sub(capture.bytes.len());
        if n > room {
            capture.overflowed = true;
            if hard_limit {
                overflow.store(true, Ordering::SeqCst);
                break;
            }
            capture.bytes.extend_from_slice(&buf[..room]);
            continue;
        }
        capture.bytes.extend_from_slice(&buf[..n]);
    }
    capture
}

fn recv_before(rx: &Receiver<Capture>, deadline: Instant) -> Option<Capture> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match rx.recv_timeout(remaining) {
        Ok(capture) => Some(capture),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(Capture::default()),
    }
}

/// Kill the child's process group (unix) and the child itself, then reap it.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Err(e) = kill_group("kill", child.id()) {
            warn!(pid = child.id(), error = %e, "process group kill failed, background children may survive");
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// SIGKILL every process in group `pgid` through the `kill` utility.
#[cfg(unix)]
fn kill_group(kill_program: &str, pgid: u32) -> Result<(), String> {
    let status = Command::new(kill_program)
        .args(["-KILL", "--", &format!("-{}", pgid)])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| format!("cannot run {}: {}", kill_program, e))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("{} exited with {}", kill_program, status))
    }
}
