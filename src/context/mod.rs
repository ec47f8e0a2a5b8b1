//! Execution context, uploaded files and the process payload.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Global variable carrying the tree-path → disk-path mapping of uploaded files.
pub const FILES_VARIABLE: &str = "$superblocksFiles";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    #[serde(default)]
    pub globals: Map<String, Value>,
    #[serde(default)]
    pub outputs: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new(globals: Map<String, Value>) -> Self {
        Self { globals, outputs: Map::new() }
    }

    /// Sets one global, replacing any previous value under `key`.
    pub fn add_global_variable_override(&mut self, key: &str, value: Value) {
        self.globals.insert(key.to_string(), value);
    }

    pub fn global(&self, key: &str) -> Option<&Value> {
        self.globals.get(key)
    }
}

/// An uploaded file: `originalname` is the handle, `path` where it sits on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFile {
    pub originalname: String,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl RequestFile {
    pub fn new(originalname: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            originalname: originalname.into(),
            path: path.into(),
            mimetype: None,
            size: None,
        }
    }
}

/// What the interpreter process receives on stdin (minus the data tag).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessInput {
    pub context: ExecutionContext,
    pub code: String,
    #[serde(default)]
    pub files: Vec<RequestFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutput {
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub log: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub execution_time_ms: u64,
}

impl ExecutionOutput {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationPair {
    pub expression: String,
    pub value: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn override_replaces_only_its_key() {
        let mut ctx = ExecutionContext::new(
            json!({"Input1": {"value": "a"}, "$superblocksFiles": {"old": "/tmp/old"}})
                .as_object()
                .cloned()
                .unwrap(),
        );
        ctx.add_global_variable_override(FILES_VARIABLE, json!({}));

        assert_eq!(ctx.global(FILES_VARIABLE), Some(&json!({})));
        assert_eq!(ctx.global("Input1"), Some(&json!({"value": "a"})));
        assert_eq!(ctx.globals.len(), 2);
    }

    #[test]
    fn output_uses_camel_case_on_the_wire() {
        let out = ExecutionOutput {
            output: json!(2),
            execution_time_ms: 12,
            ..Default::default()
        };
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["executionTimeMs"], json!(12));
        assert!(v.get("error").is_none());
    }
}
