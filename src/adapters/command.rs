use crate::domain::ports::SenderGateway;
use crate::utils::error::SendFailure;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

pub const DEFAULT_SEND_COMMAND: &str = "termux-sms-send";

/// 透過外部指令發送簡訊：`<command> <args...> <destination> <message>`
#[derive(Debug, Clone)]
pub struct CommandGateway {
    program: String,
    args: Vec<String>,
}

impl CommandGateway {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn termux() -> Self {
        Self::new(DEFAULT_SEND_COMMAND, vec!["-n".to_string()])
    }

    fn build(&self, destination: &str, message: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(destination)
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // 逾時時 future 會被丟棄，子行程也要跟著結束
            .kill_on_drop(true);
        command
    }
}

impl Default for CommandGateway {
    fn default() -> Self {
        Self::termux()
    }
}

#[async_trait]
impl SenderGateway for CommandGateway {
    async fn send(&self, destination: &str, message: &str) -> Result<(), SendFailure> {
        let output = self.build(destination, message).output().await?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::debug!(program = %self.program, status = %output.status, stderr = %stderr, "Send command failed");
        Err(SendFailure::CommandFailed {
            status: output.status.to_string(),
            stderr,
        })
    }
}
