use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ControlError {
    /// The proxy binary could not be started
    #[error("Failed to run proxy command: {0}")]
    SpawnError(#[from] std::io::Error),

    #[error("Proxy command '{command}' timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Unknown proxy command: {0}")]
    UnknownCommand(String),
}

pub type ControlResult<T> = Result<T, ControlError>;

pub type ControlFuture<'a> =
    Pin<Box<dyn Future<Output = ControlResult<CommandOutput>> + Send + 'a>>;

/// Lifecycle operations on the proxy process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyCommand {
    Validate,
    Start,
    Stop,
    Reload,
}

impl ProxyCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyCommand::Validate => "validate",
            ProxyCommand::Start => "start",
            ProxyCommand::Stop => "stop",
            ProxyCommand::Reload => "reload",
        }
    }

    /// Whether the command is given the Caddyfile path
    pub fn takes_config(&self) -> bool {
        !matches!(self, ProxyCommand::Stop)
    }
}

impl fmt::Display for ProxyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProxyCommand {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validate" => Ok(ProxyCommand::Validate),
            "start" => Ok(ProxyCommand::Start),
            "stop" => Ok(ProxyCommand::Stop),
            "reload" => Ok(ProxyCommand::Reload),
            other => Err(ControlError::UnknownCommand(other.to_string())),
        }
    }
}

/// Captured output of one command. A failing exit status is reported in
/// `error`, not as an `Err`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub output: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl CommandOutput {
    pub fn succeeded(&self) -> bool {
        self.error.is_empty()
    }
}

pub trait ProxyControl: Send + Sync + 'static {
    fn run<'a>(&'a self, command: ProxyCommand) -> ControlFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        for command in [
            ProxyCommand::Validate,
            ProxyCommand::Start,
            ProxyCommand::Stop,
            ProxyCommand::Reload,
        ] {
            let parsed: ProxyCommand = command.as_str().parse().expect("Failed to parse command");
            assert_eq!(parsed, command);
        }
        assert!(matches!(
            "restart".parse::<ProxyCommand>(),
            Err(ControlError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_stop_takes_no_config() {
        assert!(ProxyCommand::Reload.takes_config());
        assert!(!ProxyCommand::Stop.takes_config());
    }
}
