//! Host contract and the Python execution adapter.

use std::{collections::HashSet, sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    bindings::{extract_python_evaluation_pairs, PythonScanner},
    config::PluginConfiguration,
    context::{
        EvaluationPair, ExecutionContext, ExecutionOutput, ProcessInput, RequestFile,
        FILES_VARIABLE,
    },
    error::{BindingError, IntegrationError},
    files::tree_path_to_disk_path,
    process::{EntryScript, ProcessSpawner, StdioSpawner},
};

/// What every language plugin exposes to the host.
#[async_trait]
pub trait LanguagePlugin: Send + Sync {
    async fn evaluate_binding_pairs(
        &self,
        code: &str,
        entities_to_extract: &HashSet<String>,
        data_context: &Map<String, Value>,
    ) -> Result<Vec<EvaluationPair>, BindingError>;

    async fn execute(&self, props: PluginExecutionProps) -> Result<ExecutionOutput, IntegrationError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginExecutionProps {
    #[serde(default)]
    pub context: ExecutionContext,
    #[serde(default)]
    pub datasource_configuration: PythonDatasourceConfiguration,
    #[serde(default)]
    pub action_configuration: ActionConfiguration,
    #[serde(default)]
    pub files: Vec<RequestFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Accepted and kept as-is; local execution reads nothing from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PythonDatasourceConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub struct PythonPlugin {
    configuration: PluginConfiguration,
    script: EntryScript,
    spawner: Arc<dyn ProcessSpawner>,
}

impl PythonPlugin {
    /// Plugin whose entry script lives next to the running executable.
    pub fn new(configuration: PluginConfiguration) -> Result<Self> {
        Ok(Self::with_script(configuration, EntryScript::from_install_dir()?))
    }

    pub fn with_script(configuration: PluginConfiguration, script: EntryScript) -> Self {
        Self {
            configuration,
            script,
            spawner: Arc::new(StdioSpawner),
        }
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn ProcessSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn configuration(&self) -> &PluginConfiguration {
        &self.configuration
    }

    pub fn script(&self) -> &EntryScript {
        &self.script
    }

    /// Publishes uploaded file paths under `$superblocksFiles` and runs the interpreter once.
    pub async fn run_python(
        &self,
        input: &mut ProcessInput,
        timeout: Duration,
    ) -> Result<ExecutionOutput> {
        let file_paths = tree_path_to_disk_path(&input.context.globals, &input.files)?;
        input
            .context
            .add_global_variable_override(FILES_VARIABLE, serde_json::to_value(&file_paths)?);

        let output = self
            .spawner
            .spawn(
                &self.configuration.interpreter,
                &self.script.interpreter_args(),
                input,
                timeout,
            )
            .await?;
        log::debug!(
            "python run finished in {}ms (error: {})",
            output.execution_time_ms,
            output.error.is_some()
        );
        Ok(output)
    }
}

#[async_trait]
impl LanguagePlugin for PythonPlugin {
    async fn evaluate_binding_pairs(
        &self,
        code: &str,
        entities_to_extract: &HashSet<String>,
        data_context: &Map<String, Value>,
    ) -> Result<Vec<EvaluationPair>, BindingError> {
        extract_python_evaluation_pairs(code, entities_to_extract, data_context, &PythonScanner)
    }

    async fn execute(&self, props: PluginExecutionProps) -> Result<ExecutionOutput, IntegrationError> {
        let PluginExecutionProps {
            context,
            datasource_configuration: _,
            action_configuration,
            files,
        } = props;

        let timeout = self.configuration.timeout();
        let mut input = ProcessInput {
            context,
            code: action_configuration.body.unwrap_or_default(),
            files,
        };
        self.run_python(&mut input, timeout)
            .await
            .map_err(IntegrationError::new)
    }
}
