//! Interpreter process management: stdio protocol, spawn and timeout.

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    context::{ExecutionOutput, ProcessInput},
    error::ProcessError,
};

pub mod python;
pub mod stdio;

pub use python::EntryScript;
pub use stdio::StdioSpawner;

/// Runs one external program per call, feeding it `input` and enforcing `timeout`.
///
/// Implementations own the child for its whole life: on timeout they must
/// terminate it and report `ProcessError::Timeout`.
#[async_trait]
pub trait ProcessSpawner: Send + Sync {
    async fn spawn(
        &self,
        program: &str,
        args: &[String],
        input: &ProcessInput,
        timeout: Duration,
    ) -> Result<ExecutionOutput, ProcessError>;
}
