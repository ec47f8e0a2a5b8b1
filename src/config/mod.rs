use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
    time::Duration,
};

use directories::BaseDirs;

pub const DEFAULT_TIMEOUT_MS: u64 = 1_200_000;
pub const DEFAULT_INTERPRETER: &str = "python3";

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(default_config_path())
    }

    pub fn load_from(config_path: PathBuf) -> Self {
        let mut map = default_map();

        // Read .pluginrc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), value.into());
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    /// Typed snapshot handed to the plugin at construction time.
    pub fn plugin_configuration(&self) -> PluginConfiguration {
        let timeout_ms = match self.get_u64("PYTHON_EXECUTION_TIMEOUT_MS") {
            Some(ms) => ms,
            None => {
                if let Some(raw) = self.get("PYTHON_EXECUTION_TIMEOUT_MS") {
                    log::warn!("ignoring invalid PYTHON_EXECUTION_TIMEOUT_MS={raw:?}");
                }
                DEFAULT_TIMEOUT_MS
            }
        };
        let interpreter = self
            .get("PYTHON_INTERPRETER")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string());
        PluginConfiguration {
            python_execution_timeout_ms: timeout_ms,
            interpreter,
        }
    }

    pub fn log_filter(&self) -> String {
        self.get("PYTHON_PLUGIN_LOG").unwrap_or_else(|| "info".into())
    }
}

/// Static settings read by the adapter; never taken from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfiguration {
    pub python_execution_timeout_ms: u64,
    pub interpreter: String,
}

impl PluginConfiguration {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.python_execution_timeout_ms)
    }
}

impl Default for PluginConfiguration {
    fn default() -> Self {
        Self {
            python_execution_timeout_ms: DEFAULT_TIMEOUT_MS,
            interpreter: DEFAULT_INTERPRETER.to_string(),
        }
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "PYTHON_EXECUTION_TIMEOUT_MS",
        "PYTHON_INTERPRETER",
        "PYTHON_PLUGIN_LOG",
    ];

    KEYS.contains(&k)
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("python_plugin").join(".pluginrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Numbers
    m.insert(
        "PYTHON_EXECUTION_TIMEOUT_MS".into(),
        DEFAULT_TIMEOUT_MS.to_string(),
    );

    // Strings
    m.insert("PYTHON_INTERPRETER".into(), DEFAULT_INTERPRETER.into());
    m.insert("PYTHON_PLUGIN_LOG".into(), "info".into());

    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc_file_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".pluginrc");
        fs::write(
            &path,
            "# comment\n\nPYTHON_INTERPRETER = /usr/bin/python3.11\nUNRELATED=1\n",
        )
        .unwrap();

        let cfg = Config::load_from(path);
        assert_eq!(cfg.get("UNRELATED").as_deref(), Some("1"));
        if env::var("PYTHON_INTERPRETER").is_err() {
            assert_eq!(
                cfg.plugin_configuration().interpreter,
                "/usr/bin/python3.11"
            );
        }
    }

    #[test]
    fn invalid_timeout_falls_back_to_default() {
        let mut cfg = Config::load_from(PathBuf::from("/nonexistent/.pluginrc"));
        cfg.set("PYTHON_EXECUTION_TIMEOUT_MS", "soon");
        assert_eq!(
            cfg.plugin_configuration().python_execution_timeout_ms,
            DEFAULT_TIMEOUT_MS
        );

        cfg.set("PYTHON_EXECUTION_TIMEOUT_MS", "5000");
        assert_eq!(
            cfg.plugin_configuration().timeout(),
            Duration::from_millis(5000)
        );
    }
}
