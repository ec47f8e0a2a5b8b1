//! Python execution adapter for a plugin host.
//!
//! `PythonPlugin` turns an execution request into one `python3 -u run.py`
//! process, publishing uploaded file paths to the user's code under
//! `$superblocksFiles`. Binding pairs are extracted statically from the
//! source without running it.

pub mod bindings;
pub mod config;
pub mod context;
pub mod error;
pub mod files;
pub mod plugin;
pub mod process;

pub use config::{Config, PluginConfiguration};
pub use context::{
    EvaluationPair, ExecutionContext, ExecutionOutput, ProcessInput, RequestFile, FILES_VARIABLE,
};
pub use error::{BindingError, IntegrationError, ProcessError, ResolveError};
pub use plugin::{
    ActionConfiguration, LanguagePlugin, PluginExecutionProps, PythonDatasourceConfiguration,
    PythonPlugin,
};
