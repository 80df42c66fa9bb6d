//! Elevated shell channel
//!
//! Each open spawns the configured elevation program (a shell reading
//! commands from stdin, `su` by default), writes a single `exec cat` command
//! and streams the child's stdout back. One process per request means
//! concurrent requests never share a session.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader, ReadBuf};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;

use super::{ByteStream, ChannelError, PrivilegedChannel};

/// Trailing stderr bytes kept for classifying a failed open
const STDERR_TAIL: usize = 4096;

/// Channel that reads files through an elevated shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuShellChannel {
    program: String,
    args: Vec<String>,
}

impl Default for SuShellChannel {
    fn default() -> Self {
        Self::new("su", Vec::new())
    }
}

impl SuShellChannel {
    /// Create a channel spawning `program args...` for every request
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Elevation program
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Check that the elevation program yields a root shell
    pub async fn check_elevation(&self) -> Result<bool, ChannelError> {
        let mut child = self.spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(b"id -u\n").await?;
        }

        let output = child.wait_with_output().await?;
        let uid = String::from_utf8_lossy(&output.stdout);

        Ok(output.status.success() && uid.trim() == "0")
    }

    fn spawn(&self) -> Result<Child, ChannelError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ChannelError::Unavailable {
                reason: format!("failed to spawn '{}': {}", self.program, e),
            })
    }
}

#[async_trait]
impl PrivilegedChannel for SuShellChannel {
    async fn open_for_read(&self, path: &Path) -> Result<ByteStream, ChannelError> {
        let script = cat_command(path)?;
        let mut child = self.spawn()?;

        // Drained from the start: a wrapper that fills the stderr pipe would
        // otherwise stall before writing any stdout.
        let errors = drain_stderr(child.stderr.take());

        if let Some(mut stdin) = child.stdin.take() {
            // A shell that refuses elevation may exit before reading stdin;
            // the exit status below reports that case.
            if let Err(e) = stdin.write_all(script.as_bytes()).await {
                tracing::debug!("Elevated shell closed stdin early: {}", e);
            }
        }

        let stdout = child.stdout.take().ok_or_else(|| ChannelError::Unavailable {
            reason: "elevated shell has no stdout".to_string(),
        })?;
        let mut reader = BufReader::new(stdout);

        // Wait for the first chunk so a failed open is reported before any
        // byte is handed to the caller.
        let has_data = !reader.fill_buf().await?.is_empty();
        if !has_data {
            let status = child.wait().await?;
            if !status.success() {
                let stderr = errors.await.unwrap_or_default();
                return Err(classify_failure(path, &stderr));
            }
        }

        Ok(Box::pin(ChildStream {
            reader,
            _child: child,
        }))
    }

    fn name(&self) -> &'static str {
        "su"
    }
}

/// Stdout of an elevated `cat`
///
/// Owns the child so dropping the stream kills the process.
struct ChildStream {
    reader: BufReader<ChildStdout>,
    _child: Child,
}

impl AsyncRead for ChildStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().reader).poll_read(cx, buf)
    }
}

/// Read `stderr` to the end, keeping only its tail
fn drain_stderr(stderr: Option<ChildStderr>) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut tail = Vec::new();
        if let Some(mut stderr) = stderr {
            let mut chunk = [0u8; 1024];
            loop {
                match stderr.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        tail.extend_from_slice(&chunk[..n]);
                        if tail.len() > STDERR_TAIL {
                            tail.drain(..tail.len() - STDERR_TAIL);
                        }
                    }
                }
            }
        }
        String::from_utf8_lossy(&tail).into_owned()
    })
}

/// Build the shell command reading `path`
fn cat_command(path: &Path) -> Result<String, ChannelError> {
    let path_str = path.to_str().ok_or_else(|| ChannelError::Denied {
        path: path.display().to_string(),
        reason: "path is not valid UTF-8".to_string(),
    })?;

    if path_str.contains('\0') {
        return Err(ChannelError::Denied {
            path: path.display().to_string(),
            reason: "path contains NUL".to_string(),
        });
    }

    Ok(format!("exec cat -- {}\n", shell_quote(path_str)))
}

/// Single-quote `value` for a POSIX shell
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn classify_failure(path: &Path, stderr: &str) -> ChannelError {
    let reason = stderr.trim();
    if reason.contains("No such file") {
        ChannelError::NotFound {
            path: path.display().to_string(),
        }
    } else {
        ChannelError::Denied {
            path: path.display().to_string(),
            reason: if reason.is_empty() {
                "elevated shell exited with failure".to_string()
            } else {
                reason.to_string()
            },
        }
    }
}
