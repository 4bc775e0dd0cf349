//! Helpers for running child processes with timeouts and bounded output.

use std::io::{self, ErrorKind, Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// How long helper threads may keep draining pipes after a timed-out child is
/// killed. A descendant outside the child's process group can hold the pipes
/// open indefinitely; its threads are detached once this expires.
const KILL_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Spawn attempts made while the executable is still open for writing
/// elsewhere (`ETXTBSY`).
const SPAWN_BUSY_ATTEMPTS: u32 = 5;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
    /// Error from feeding stdin, if any. A broken pipe is not recorded.
    pub stdin_error: Option<anyhow::Error>,
}

impl CommandOutput {
    /// Stderr as lossy UTF-8, trimmed, for error messages.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Run a command with a timeout, feeding `stdin` and capturing stdout/stderr without
/// risking pipe deadlocks.
///
/// Stdin is written on its own thread and closed once written; stdout and stderr are
/// read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still
/// draining the pipe).
///
/// On unix the child leads its own process group, and a timeout kills the whole
/// group so descendants cannot keep the invocation alive. Helper threads are
/// joined before returning; after a timeout they get a short grace period to
/// finish and are detached if a pipe is still held open.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    stdin: Option<Vec<u8>>,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    debug!("spawning child process");
    let mut child = match spawn_when_not_busy(&mut cmd) {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdin_handle = match stdin {
        Some(input) => {
            let child_stdin = child
                .stdin
                .take()
                .ok_or_else(|| anyhow!("stdin was not piped"))?;
            Some(thread::spawn(move || write_stdin(child_stdin, &input)))
        }
        None => None,
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            kill_process_group(&child);
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let deadline = timed_out.then(|| Instant::now() + KILL_DRAIN_GRACE);
    let (stdout, stdout_truncated) = join_output(stdout_handle, deadline).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle, deadline).context("join stderr")?;
    let stdin_error = match stdin_handle {
        Some(handle) => match join_by(handle, deadline) {
            Some(Ok(result)) => result.err(),
            Some(Err(_)) => Some(anyhow!("stdin writer thread panicked")),
            None => {
                warn!("stdin still held open after kill, detaching writer");
                None
            }
        },
        None => None,
    };

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
        stdin_error,
    })
}

/// Write all of `input` and close the pipe by dropping it.
///
/// A child that exits without reading its input closes the pipe early; that is
/// left for the exit status and output to judge.
fn write_stdin(mut pipe: ChildStdin, input: &[u8]) -> Result<()> {
    match pipe.write_all(input).and_then(|()| pipe.flush()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            debug!("child closed stdin before reading all input");
            Ok(())
        }
        Err(e) => Err(e).context("write stdin"),
    }
}

/// Spawn `cmd`, retrying briefly while the executable is busy.
///
/// A freshly written program can still be open for writing in a process
/// forked concurrently elsewhere; the spawn then fails with `ETXTBSY` until
/// that process execs or exits.
fn spawn_when_not_busy(cmd: &mut Command) -> io::Result<Child> {
    let mut attempt = 1;
    loop {
        match cmd.spawn() {
            Err(e)
                if e.kind() == ErrorKind::ExecutableFileBusy && attempt < SPAWN_BUSY_ATTEMPTS =>
            {
                debug!(attempt, "executable busy, retrying spawn");
                thread::sleep(Duration::from_millis(20 * u64::from(attempt)));
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Kill every process in the child's group.
///
/// The group id equals the child's pid (see `process_group(0)` above). Failure
/// only leaves descendants behind; the child itself is killed by the caller.
#[cfg(unix)]
fn kill_process_group(child: &Child) {
    let group = format!("-{}", child.id());
    let status = Command::new("kill")
        .args(["-KILL", "--", &group])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() => debug!(group = child.id(), "killed process group"),
        Ok(status) => warn!(
            group = child.id(),
            exit_code = ?status.code(),
            "kill process group failed"
        ),
        Err(e) => warn!(group = child.id(), err = %e, "kill process group failed"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

/// Join `handle`, giving up at `deadline` and leaving the thread detached.
fn join_by<T>(handle: JoinHandle<T>, deadline: Option<Instant>) -> Option<thread::Result<T>> {
    if let Some(deadline) = deadline {
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
    Some(handle.join())
}

fn join_output(
    handle: JoinHandle<Result<(Vec<u8>, usize)>>,
    deadline: Option<Instant>,
) -> Result<(Vec<u8>, usize)> {
    match join_by(handle, deadline) {
        Some(Ok(result)) => result,
        Some(Err(_)) => Err(anyhow!("output reader thread panicked")),
        None => {
            warn!("output pipe still held open after kill, detaching reader");
            Ok((Vec::new(), 0))
        }
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_stream_limited_keeps_prefix_and_counts_rest() {
        let data = vec![b'x'; 10_000];
        let (kept, truncated) = read_stream_limited(data.as_slice(), 4096).expect("read");
        assert_eq!(kept.len(), 4096);
        assert_eq!(truncated, 10_000 - 4096);
    }

    #[test]
    fn spawn_failure_is_reported() {
        let cmd = Command::new("/definitely/not/a/program");
        let err = run_command_with_timeout(cmd, None, Duration::from_secs(1), 100).unwrap_err();
        assert!(err.to_string().contains("spawn command"));
    }

    #[cfg(unix)]
    #[test]
    fn echoes_stdin_through_cat() {
        let cmd = Command::new("cat");
        let output = run_command_with_timeout(
            cmd,
            Some(b"hello".to_vec()),
            Duration::from_secs(5),
            1000,
        )
        .expect("run cat");
        assert!(output.status.success());
        assert_eq!(output.stdout, b"hello");
        assert!(output.stdin_error.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn large_input_does_not_deadlock() {
        let input = vec![b'a'; 1 << 20];
        let output = run_command_with_timeout(
            Command::new("cat"),
            Some(input.clone()),
            Duration::from_secs(10),
            2 << 20,
        )
        .expect("run cat");
        assert_eq!(output.stdout.len(), input.len());
        assert!(!output.timed_out);
    }

    #[cfg(unix)]
    #[test]
    fn timed_out_command_is_killed() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let output =
            run_command_with_timeout(cmd, None, Duration::from_millis(100), 100).expect("run");
        assert!(output.timed_out);
        assert!(!output.status.success());
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_forked_descendants() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 5; echo done"]);
        let started = Instant::now();
        let output = run_command_with_timeout(
            cmd,
            Some(b"{}".to_vec()),
            Duration::from_millis(200),
            100,
        )
        .expect("run");
        assert!(output.timed_out);
        assert!(output.stdout.is_empty());
        assert!(
            started.elapsed() < Duration::from_secs(3),
            "took {:?}",
            started.elapsed()
        );
    }

    #[cfg(unix)]
    #[test]
    fn timeout_is_bounded_when_a_descendant_leaves_the_group() {
        // `setsid` moves the sleeper out of the child's group, so only the
        // drain grace bounds the wait.
        let mut cmd = Command::new("sh");
        cmd.args([
            "-c",
            "if command -v setsid >/dev/null; then setsid sleep 5; else sleep 5; fi; echo done",
        ]);
        let started = Instant::now();
        let output =
            run_command_with_timeout(cmd, None, Duration::from_millis(200), 100).expect("run");
        assert!(output.timed_out);
        assert!(
            started.elapsed() < Duration::from_secs(3),
            "took {:?}",
            started.elapsed()
        );
    }
}
