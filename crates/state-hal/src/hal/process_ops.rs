//! Process execution helpers.
//!
//! External commands are considered "world-touching" and must go through the HAL so we can
//! test the resolver without spawning real processes. Commands run to completion; there is
//! no timeout.

use crate::{HalError, HalResult};
use std::process::Output;

/// Process execution trait (external command runner).
pub trait ProcessOps {
    fn command_output(&self, program: &str, args: &[&str]) -> HalResult<Output>;

    /// Run a command and return its stdout, failing on a non-zero exit.
    fn command_stdout(&self, program: &str, args: &[&str]) -> HalResult<String> {
        let output = self.command_output(program, args)?;
        if !output.status.success() {
            return Err(output_failed(program, &output));
        }
        Ok(String::from_utf8(output.stdout)?)
    }
}

pub fn output_failed(program: &str, output: &Output) -> HalError {
    HalError::CommandFailed {
        program: program.to_string(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

pub fn map_command_err(program: &str, err: std::io::Error) -> HalError {
    if err.kind() == std::io::ErrorKind::NotFound {
        return HalError::CommandNotFound(program.to_string());
    }
    HalError::Io(err)
}
