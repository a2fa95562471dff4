use crate::error::{DeployError, ErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("`{command}` exited with code {code}")]
    ExitCode { command: String, code: i32 },

    #[error("`{command}` terminated by signal {signal}")]
    Signal { command: String, signal: i32 },

    #[error("Failed to run `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Mock expectation not met: {0}")]
    MockExpectationNotMet(String),
}

impl ProcessError {
    /// Exit code a shell would report for this failure
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessError::ExitCode { code, .. } => Some(*code),
            ProcessError::Signal { signal, .. } => Some(128 + signal),
            ProcessError::CommandNotFound(_) => Some(crate::error::EXIT_COMMAND_NOT_FOUND),
            _ => None,
        }
    }
}

/// Convert ProcessError to DeployError
impl From<ProcessError> for DeployError {
    fn from(err: ProcessError) -> Self {
        let (code, command) = match &err {
            ProcessError::CommandNotFound(cmd) => {
                (ErrorCode::EXEC_COMMAND_NOT_FOUND, Some(cmd.clone()))
            }
            ProcessError::ExitCode { command, .. } => {
                (ErrorCode::EXEC_SUBPROCESS_FAILED, Some(command.clone()))
            }
            ProcessError::Signal { command, .. } => {
                (ErrorCode::EXEC_SIGNAL_RECEIVED, Some(command.clone()))
            }
            ProcessError::Io { command, .. } => (ErrorCode::EXEC_SPAWN_FAILED, Some(command.clone())),
            ProcessError::MockExpectationNotMet(_) => (ErrorCode::EXEC_GENERIC, None),
        };

        let exit_code = err.exit_code();
        let mut error = DeployError::execution_with_code(code, err.to_string(), command);
        if let Some(exit_code) = exit_code {
            error = error.with_exit_code(exit_code);
        }
        error.with_source(err)
    }
}
