//! Container restart command.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use lake_core::SupervisorConfig;

use crate::error::{RestartError, RestartResult};

/// How long to wait for output pipes to drain after the child is gone.
const OUTPUT_GRACE: Duration = Duration::from_secs(1);

/// Outcome of a successful restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartReport {
    pub container: String,
    /// stdout followed by stderr.
    pub output: String,
    pub elapsed: Duration,
}

/// Anything that can restart the monitored container.
pub trait Restarter {
    fn restart(&self) -> impl Future<Output = RestartResult<RestartReport>> + Send;

    /// Name of the restart target, for logging.
    fn target(&self) -> &str;
}

/// Restarts a container by running an external command.
#[derive(Debug, Clone)]
pub struct ContainerRestarter {
    container: String,
    command: Vec<String>,
    timeout: Duration,
}

impl ContainerRestarter {
    pub fn new(container: impl Into<String>, command: Vec<String>, timeout: Duration) -> Self {
        Self {
            container: container.into(),
            command,
            timeout,
        }
    }

    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self::new(
            config.container_name.clone(),
            config.restart_command.clone(),
            config.restart_timeout,
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self) -> RestartResult<RestartReport> {
        if self.container.trim().is_empty() {
            return Err(RestartError::NoContainer);
        }
        let (program, args) = self.command.split_first().ok_or(RestartError::NoCommand)?;

        info!(container = %self.container, %program, "restarting container");
        let started = Instant::now();

        let mut child = Command::new(program)
            .args(args)
            .arg(&self.container)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RestartError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(source)) => {
                return Err(RestartError::Wait {
                    container: self.container.clone(),
                    source,
                });
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(container = %self.container, error = %e, "failed to kill timed-out restart command");
                }
                None
            }
        };

        let mut output = drain(stdout).await;
        output.extend(drain(stderr).await);
        let output = String::from_utf8_lossy(&output).trim_end().to_string();
        let elapsed = started.elapsed();

        match status {
            None => Err(RestartError::Timeout {
                container: self.container.clone(),
                after: self.timeout,
                output,
            }),
            Some(status) if !status.success() => Err(RestartError::Failed {
                container: self.container.clone(),
                status,
                output,
            }),
            Some(_) => {
                debug!(container = %self.container, ?elapsed, %output, "restart command finished");
                Ok(RestartReport {
                    container: self.container.clone(),
                    output,
                    elapsed,
                })
            }
        }
    }
}

impl Restarter for ContainerRestarter {
    fn restart(&self) -> impl Future<Output = RestartResult<RestartReport>> + Send {
        self.run()
    }

    fn target(&self) -> &str {
        &self.container
    }
}

fn spawn_reader<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buf).await {
                debug!(error = %e, "failed reading restart command output");
            }
        }
        buf
    })
}

/// Collect a reader's bytes. A grandchild still holding the pipe open must
/// not stall the caller, so the wait is bounded.
async fn drain(reader: JoinHandle<Vec<u8>>) -> Vec<u8> {
    match tokio::time::timeout(OUTPUT_GRACE, reader).await {
        Ok(Ok(buf)) => buf,
        _ => Vec::new(),
    }
}
