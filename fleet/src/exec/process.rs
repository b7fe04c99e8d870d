//! Timeout-enforcing process runner on tokio

use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use fleet_common::{FleetError, FleetResult};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{CommandRunner, ExecResult};

/// How long pipe readers may keep draining after a timed-out child was killed
pub const KILL_GRACE: Duration = Duration::from_millis(500);

/// Production [`CommandRunner`] backed by `tokio::process`.
///
/// Both pipes are drained by their own tasks while the child is awaited, so
/// a process that fills the OS pipe buffer can never stall `wait()`. On
/// timeout the child is killed and reaped before the call returns.
///
/// Only the direct child is killed. Processes it forked keep running and
/// their pipes are abandoned after [`KILL_GRACE`]. The process group is left
/// alone on purpose: `adb` commands may spawn the long-lived adb server
/// daemon, and `killpg` would take it down with them.
#[derive(Debug, Clone, Default)]
pub struct TimedProcess;

impl TimedProcess {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for TimedProcess {
    async fn run(&self, argv: &[String], timeout: Option<Duration>) -> FleetResult<ExecResult> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| FleetError::Parse("empty command line".to_string()))?;

        debug!(command = %argv.join(" "), ?timeout, "Spawning process");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FleetError::spawn(argv, e))?;

        let mut stdout = PipeCapture::spawn(child.stdout.take());
        let mut stderr = PipeCapture::spawn(child.stderr.take());

        let finished = async {
            let status = child.wait().await;
            stdout.join().await;
            stderr.join().await;
            status
        };

        let status = match timeout {
            None => Some(finished.await),
            Some(limit) => tokio::select! {
                status = finished => Some(status),
                () = tokio::time::sleep(limit) => None,
            },
        };

        match status {
            Some(status) => {
                let status = status.map_err(|e| FleetError::spawn(argv, e))?;
                Ok(ExecResult {
                    stdout: Some(stdout.take()),
                    stderr: Some(stderr.take()),
                    exit_code: status.code(),
                    timed_out: false,
                })
            }
            None => {
                warn!(
                    command = %argv.join(" "),
                    timeout_secs = timeout.map(|t| t.as_secs_f64()).unwrap_or_default(),
                    "Command took too long, terminating it"
                );
                if let Err(e) = child.start_kill() {
                    debug!("Kill after timeout failed: {}", e);
                }
                if let Err(e) = child.wait().await {
                    debug!("Reaping timed out process failed: {}", e);
                }

                stdout.drain_for(KILL_GRACE).await;
                stderr.drain_for(KILL_GRACE).await;

                Ok(ExecResult {
                    stdout: stdout.take_partial(),
                    stderr: stderr.take_partial(),
                    exit_code: None,
                    timed_out: true,
                })
            }
        }
    }
}

/// One output pipe being drained into a shared buffer by a background task.
///
/// The buffer lives outside the task so a partial capture survives when the
/// reader has to be abandoned.
struct PipeCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
    reader: Option<JoinHandle<()>>,
}

impl PipeCapture {
    fn spawn<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let reader = pipe.map(|pipe| tokio::spawn(read_pipe(pipe, buffer.clone())));
        Self { buffer, reader }
    }

    /// Wait for the reader to hit end of stream
    async fn join(&mut self) {
        if let Some(reader) = self.reader.as_mut() {
            if let Err(e) = reader.await {
                debug!("Pipe reader ended abnormally: {}", e);
            }
            self.reader = None;
        }
    }

    /// Give the reader a bounded amount of time, then abandon it
    async fn drain_for(&mut self, grace: Duration) {
        let Some(mut reader) = self.reader.take() else {
            return;
        };
        // A finished handle may already have been observed by `join`.
        if reader.is_finished() {
            return;
        }
        if tokio::time::timeout(grace, &mut reader).await.is_err() {
            debug!("Pipe still open after kill, abandoning reader");
            reader.abort();
        }
    }

    fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner));
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn take_partial(&self) -> Option<String> {
        let text = self.take();
        (!text.is_empty()).then_some(text)
    }
}

async fn read_pipe<R>(mut pipe: R, buffer: Arc<Mutex<Vec<u8>>>)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(&chunk[..n]),
            Err(e) => {
                debug!("Reading process output failed: {}", e);
                break;
            }
        }
    }
}
