use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::uci::UciCommand;
use crate::{EngineError, EngineTransport};

const QUIT_GRACE: Duration = Duration::from_millis(200);

/// Owns one engine subprocess at a time together with its pipes.
pub struct ProcessSupervisor {
    path: PathBuf,
    spawn_grace: Duration,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
    spawn_count: u32,
}

impl ProcessSupervisor {
    pub fn new(path: impl Into<PathBuf>, spawn_grace: Duration) -> Self {
        Self {
            path: path.into(),
            spawn_grace,
            child: None,
            stdin: None,
            stdout: None,
            spawn_count: 0,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|child| child.id())
    }

    /// Number of OS processes launched over this supervisor's lifetime.
    pub fn spawn_count(&self) -> u32 {
        self.spawn_count
    }

    fn forward_stderr(child: &mut Child) {
        let Some(stderr) = child.stderr.take() else {
            return;
        };
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                log::debug!("engine stderr: {}", line);
            }
        });
    }
}

#[async_trait]
impl EngineTransport for ProcessSupervisor {
    async fn start(&mut self) -> Result<(), EngineError> {
        if self.child.is_some() {
            self.stop().await;
        }

        let mut child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::SpawnFailed(format!("{}: {}", self.path.display(), e)))?;
        self.spawn_count += 1;

        let stdin = child.stdin.take().ok_or(EngineError::NotRunning)?;
        let stdout = child.stdout.take().ok_or(EngineError::NotRunning)?;
        Self::forward_stderr(&mut child);

        // An engine that dies straight away (wrong binary, missing network
        // file, ...) is reported here rather than on the first read.
        tokio::time::sleep(self.spawn_grace).await;
        if let Ok(Some(status)) = child.try_wait() {
            return Err(EngineError::SpawnFailed(format!(
                "{} exited immediately with {}",
                self.path.display(),
                status
            )));
        }

        log::info!("started engine {} (pid {:?})", self.path.display(), child.id());
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stdout = Some(BufReader::new(stdout));
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        if self.stdin.is_none() || self.stdout.is_none() {
            return false;
        }
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    async fn stop(&mut self) {
        if let Some(mut stdin) = self.stdin.take() {
            let line = format!("{}\n", UciCommand::Quit);
            let _ = stdin.write_all(line.as_bytes()).await;
            let _ = stdin.flush().await;
        }
        self.stdout = None;

        let Some(mut child) = self.child.take() else {
            return;
        };
        let exited = tokio::time::timeout(QUIT_GRACE, child.wait()).await;
        if exited.is_err() {
            log::warn!("engine did not quit in time, killing it");
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        log::debug!("engine {} stopped", self.path.display());
    }

    async fn send(&mut self, line: &str) -> Result<(), EngineError> {
        let stdin = self.stdin.as_mut().ok_or(EngineError::NotRunning)?;
        log::debug!(">> {}", line);
        stdin.write_all(format!("{}\n", line).as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, EngineError> {
        let reader = self.stdout.as_mut().ok_or(EngineError::NotRunning)?;
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            return Err(EngineError::NotRunning);
        }
        let line = line.trim().to_string();
        log::trace!("<< {}", line);
        Ok(line)
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        // Best effort to kill the child process
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }
}
