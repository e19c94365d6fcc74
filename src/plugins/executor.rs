use crate::storage::{RunWriter, StorageError};
use std::collections::BTreeMap;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, warn};

/// Ceiling on the in-memory copy handed to the diagnostic parsers. Bytes past
/// it are still written to the run's raw log in full.
pub const MAX_INLINE_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

pub const TRUNCATION_MARKER: &str = "\n[output truncated; full output available via the run log]";

const READ_CHUNK_BYTES: usize = 8192;

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("binary `{binary}` was not found on PATH")]
    MissingBinary { binary: String },
    #[error("failed to spawn `{binary}`: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to capture output of `{binary}`: {source}")]
    Capture {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug)]
pub struct CapturedRun {
    pub exit_code: i32,
    /// Combined output in arrival order, capped at `MAX_INLINE_OUTPUT_BYTES`.
    pub output: String,
    pub truncated: bool,
}

/// Spawns `program` with a literal argument vector (no shell, no
/// metacharacter expansion) and a fully sanitized environment, streaming both
/// output pipes into the run writer as chunks arrive. Per-stream order is
/// preserved; stdout and stderr interleave in arrival order.
pub fn execute_command(
    program: &str,
    args: &[String],
    cwd: &Path,
    child_env: &BTreeMap<String, String>,
    writer: &mut RunWriter,
) -> Result<CapturedRun, ExecutorError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .env_clear()
        .envs(child_env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(ExecutorError::MissingBinary {
                binary: program.to_string(),
            })
        }
        Err(err) => {
            return Err(ExecutorError::Spawn {
                binary: program.to_string(),
                source: err,
            })
        }
    };

    let stdout = child.stdout.take().ok_or_else(|| ExecutorError::Capture {
        binary: program.to_string(),
        source: std::io::Error::other("missing stdout pipe"),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| ExecutorError::Capture {
        binary: program.to_string(),
        source: std::io::Error::other("missing stderr pipe"),
    })?;

    let (sender, receiver) = mpsc::channel::<Vec<u8>>();
    let stderr_sender = sender.clone();
    let stdout_reader = thread::spawn(move || forward_chunks(stdout, sender));
    let stderr_reader = thread::spawn(move || forward_chunks(stderr, stderr_sender));

    let mut inline: Vec<u8> = Vec::new();
    let mut truncated = false;
    for chunk in receiver {
        writer.append_log(&chunk)?;
        if truncated {
            continue;
        }
        let capacity_left = MAX_INLINE_OUTPUT_BYTES - inline.len();
        if chunk.len() <= capacity_left {
            inline.extend_from_slice(&chunk);
        } else {
            inline.extend_from_slice(&chunk[..capacity_left]);
            truncated = true;
            warn!(run_id = %writer.run_id(), "inline output capped; raw log keeps the full stream");
        }
    }

    // channel closed: both pipes hit EOF, the exit status is available
    let _ = stdout_reader.join();
    let _ = stderr_reader.join();
    let status = child.wait().map_err(|err| ExecutorError::Capture {
        binary: program.to_string(),
        source: err,
    })?;

    let mut output = String::from_utf8_lossy(&inline).into_owned();
    if truncated {
        output.push_str(TRUNCATION_MARKER);
    }
    let exit_code = status.code().unwrap_or(-1);
    debug!(run_id = %writer.run_id(), exit_code, truncated, "subprocess finished");

    Ok(CapturedRun {
        exit_code,
        output,
        truncated,
    })
}

fn forward_chunks(mut pipe: impl Read, sender: mpsc::Sender<Vec<u8>>) {
    let mut buf = [0u8; READ_CHUNK_BYTES];
    loop {
        match pipe.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if sender.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
        }
    }
}
