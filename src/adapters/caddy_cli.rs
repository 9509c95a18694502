use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::ports::proxy_control::{
    CommandOutput, ControlError, ControlFuture, ControlResult, ProxyCommand, ProxyControl,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the proxy binary for lifecycle commands
#[derive(Debug, Clone)]
pub struct CaddyCli {
    binary: PathBuf,
    caddyfile: PathBuf,
    timeout: Duration,
}

impl CaddyCli {
    pub fn new(binary: impl Into<PathBuf>, caddyfile: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            caddyfile: caddyfile.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments passed to the binary for `command`
    pub fn args(&self, command: ProxyCommand) -> Vec<String> {
        let mut args = vec![command.as_str().to_string()];
        if command.takes_config() {
            args.push("--config".to_string());
            args.push(self.caddyfile.to_string_lossy().into_owned());
        }
        args
    }

    async fn run_inner(&self, command: ProxyCommand) -> ControlResult<CommandOutput> {
        let args = self.args(command);
        tracing::info!(binary = %self.binary.display(), args = ?args, "Running proxy command");

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| ControlError::Timeout {
                command: command.to_string(),
                seconds: self.timeout.as_secs(),
            })??;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        let error = if output.status.success() {
            String::new()
        } else {
            tracing::warn!(command = %command, status = %output.status, "Proxy command failed");
            output.status.to_string()
        };

        Ok(CommandOutput {
            output: combined,
            error,
        })
    }
}

impl ProxyControl for CaddyCli {
    fn run<'a>(&'a self, command: ProxyCommand) -> ControlFuture<'a> {
        Box::pin(async move {
            let result = self.run_inner(command).await;
            let outcome = match &result {
                Ok(out) if out.succeeded() => "success",
                _ => "failure",
            };
            crate::metrics::record_proxy_command(command.as_str(), outcome);
            result
        })
    }
}
