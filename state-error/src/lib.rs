use std::io;
use thiserror::Error;

pub type HalResult<T> = Result<T, HalError>;
pub type StateResult<T> = Result<T, StateError>;

#[derive(Error, Debug)]
pub enum HalError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command failed: {program} (exit={code:?}): {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error on {path}: {source}")]
    PathIo {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("UTF-8 decode error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

impl HalError {
    pub fn path_io(path: impl AsRef<std::path::Path>, source: io::Error) -> Self {
        HalError::PathIo {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum StateError {
    /// Block device enumeration could not start; partition data is unreliable.
    #[error("block device enumeration failed: {0}")]
    Enumeration(#[source] HalError),

    #[error("invalid query: {0}")]
    QueryParse(String),

    #[error("query failed: {0}")]
    QueryEval(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_message_includes_exit_and_stderr() {
        let err = HalError::CommandFailed {
            program: "findmnt".to_string(),
            code: Some(1),
            stderr: "no such label".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Command failed: findmnt (exit=Some(1)): no such label"
        );
    }

    #[test]
    fn enumeration_error_wraps_hal_error() {
        let err = StateError::Enumeration(HalError::path_io(
            "/sys/block",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        ));
        assert!(err.to_string().starts_with("block device enumeration failed"));
        assert!(err.to_string().contains("/sys/block"));
        let cause = std::error::Error::source(&err).expect("wrapped hal error");
        assert!(cause.to_string().starts_with("I/O error on /sys/block"));
    }

    #[test]
    fn query_errors_name_their_stage() {
        assert_eq!(
            StateError::QueryParse("unexpected token".to_string()).to_string(),
            "invalid query: unexpected token"
        );
        assert_eq!(
            StateError::QueryEval("cannot iterate over null".to_string()).to_string(),
            "query failed: cannot iterate over null"
        );
    }
}
