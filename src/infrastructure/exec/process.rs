//! Child process supervision
//!
//! Spawns a prepared `Command`, drains its pipes on helper threads and polls
//! for exit so a deadline can be enforced without blocking on output.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{CutoverError, CutoverResult};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Who ran what, for error messages
pub struct Label<'a> {
    pub host: &'a str,
    pub command: &'a str,
}

/// Run to completion and return trimmed stdout
///
/// `input` is written to the child's stdin, which is closed afterwards;
/// without it stdin is `/dev/null`. With `stream`, stdout/stderr go straight
/// to the terminal and the returned string is empty.
pub fn supervise(
    mut cmd: Command,
    input: Option<&str>,
    label: Label<'_>,
    deadline: Option<Duration>,
    stream: bool,
) -> CutoverResult<String> {
    cmd.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    if stream {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    } else {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    }

    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut child = cmd.spawn().map_err(|source| CutoverError::Spawn {
        program,
        source,
    })?;

    let feeder = feed(child.stdin.take(), input);
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait(&mut child, deadline)? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CutoverError::CommandTimeout {
                host: label.host.to_string(),
                command: label.command.to_string(),
                after: deadline.unwrap_or_default(),
            });
        }
    };

    if let Some(feeder) = feeder {
        let _ = feeder.join();
    }
    let stdout = collect(stdout);
    let stderr = collect(stderr);
    trace!(host = label.host, code = ?status.code(), "command finished");

    if !status.success() {
        return Err(CutoverError::CommandFailed {
            host: label.host.to_string(),
            command: label.command.to_string(),
            code: status.code(),
            stderr,
        });
    }

    Ok(stdout.trim().to_string())
}

/// `None` when the deadline passed first
fn wait(
    child: &mut Child,
    deadline: Option<Duration>,
) -> CutoverResult<Option<std::process::ExitStatus>> {
    let Some(limit) = deadline else {
        return Ok(Some(child.wait()?));
    };
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started.elapsed() >= limit {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Writes on a thread so a child that never reads cannot block us
fn feed<W: Write + Send + 'static>(
    pipe: Option<W>,
    input: Option<&str>,
) -> Option<JoinHandle<()>> {
    let (mut pipe, input) = (pipe?, input?.to_owned());
    Some(thread::spawn(move || {
        // a child that exits early closes the pipe; its status tells the story
        let _ = pipe.write_all(input.as_bytes());
    }))
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn label() -> Label<'static> {
        Label {
            host: "local",
            command: "test",
        }
    }

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_trimmed_stdout() {
        let out = supervise(sh("echo '  hello  '"), None, label(), None, false).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn nonzero_exit_carries_code_and_stderr() {
        let err = supervise(sh("echo boom >&2; exit 7"), None, label(), None, false).unwrap_err();
        match err {
            CutoverError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(7));
                assert_eq!(stderr.trim(), "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn deadline_kills_the_child() {
        let started = Instant::now();
        let err = supervise(
            sh("sleep 5"),
            None,
            label(),
            Some(Duration::from_millis(100)),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, CutoverError::CommandTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = supervise(
            Command::new("cutover-definitely-not-installed"),
            None,
            label(),
            None,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, CutoverError::Spawn { .. }));
    }

    #[test]
    fn input_is_fed_to_stdin_and_closed() {
        let mut cmd = Command::new("sh");
        cmd.arg("-s");
        let out = supervise(
            cmd,
            Some("export TOKEN=abc; echo \"$TOKEN\"\n"),
            label(),
            Some(Duration::from_secs(5)),
            false,
        )
        .unwrap();
        assert_eq!(out, "abc");
    }

    #[test]
    fn stdin_is_empty_without_input() {
        let deadline = Some(Duration::from_secs(5));
        let out = supervise(sh("cat"), None, label(), deadline, false).unwrap();
        assert_eq!(out, "");
    }
}
