//! Error types for the adapter and its collaborators.
//!
//! Collaborator errors (`BindingError`, `ResolveError`, `ProcessError`) stay
//! typed. `execute` folds all of them into `IntegrationError` so the host
//! only ever sees one error shape from an execution.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("Syntax error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("File '{0}' was uploaded more than once")]
    DuplicateFile(String),
    #[error("Files '{first}' and '{second}' both resolve to '{key}'")]
    KeyCollision {
        key: String,
        first: String,
        second: String,
    },
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error talking to interpreter: {0}")]
    Io(#[from] std::io::Error),
    #[error("Timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("interpreter exited with code {code:?}: {stderr}")]
    Exited { code: Option<i32>, stderr: String },
    #[error("malformed interpreter output: {0}")]
    Protocol(String),
    #[error("failed to serialize process input: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The single error kind surfaced by `LanguagePlugin::execute`.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct IntegrationError(anyhow::Error);

impl IntegrationError {
    pub fn new(source: impl Into<anyhow::Error>) -> Self {
        Self(source.into())
    }

    /// True when the wrapped failure is an interpreter timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.0.downcast_ref::<ProcessError>(),
            Some(ProcessError::Timeout { .. })
        )
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_kind_survives_wrapping() {
        let err = IntegrationError::new(ProcessError::Timeout { timeout_ms: 50 });
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Timed out after 50ms");
    }

    #[test]
    fn other_errors_are_not_timeouts() {
        let err = IntegrationError::new(ResolveError::DuplicateFile("a.csv".into()));
        assert!(!err.is_timeout());
        assert!(err.inner().downcast_ref::<ResolveError>().is_some());
    }
}
