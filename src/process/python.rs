//! Python entry script: location, installation and interpreter arguments.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;

pub const ENTRY_SCRIPT_NAME: &str = "run.py";

/// Source of the entry script shipped with this binary.
pub const ENTRY_SCRIPT_SOURCE: &str = include_str!("run.py");

// Computed once; the script location never comes from a request.
static INSTALL_DIR: Lazy<Option<PathBuf>> = Lazy::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryScript {
    path: PathBuf,
}

impl EntryScript {
    /// `run.py` next to the running executable.
    pub fn from_install_dir() -> Result<Self> {
        let dir = INSTALL_DIR
            .as_ref()
            .ok_or_else(|| anyhow!("cannot determine installation directory"))?;
        Ok(Self::in_dir(dir))
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(ENTRY_SCRIPT_NAME) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unbuffered mode plus the script path.
    pub fn interpreter_args(&self) -> Vec<String> {
        vec!["-u".to_string(), self.path.to_string_lossy().into_owned()]
    }

    pub fn is_current(&self) -> bool {
        fs::read_to_string(&self.path)
            .map(|s| s == ENTRY_SCRIPT_SOURCE)
            .unwrap_or(false)
    }

    /// Writes the embedded script, replacing whatever is there.
    pub fn install(&self) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| anyhow!("entry script has no parent directory"))?;
        fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {}", dir.display()))?;
        tmp.write_all(ENTRY_SCRIPT_SOURCE.as_bytes())?;
        tmp.persist(&self.path)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }

    /// Installs only when the script is missing or stale. Returns whether it wrote.
    pub fn ensure_installed(&self) -> Result<bool> {
        if self.is_current() {
            return Ok(false);
        }
        self.install()?;
        log::info!("installed entry script at {}", self.path.display());
        Ok(true)
    }
}
