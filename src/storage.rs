use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::tasks::TaskFile;

/// TOML file holding the [`TaskFile`]
pub struct Storage {
    file_path: PathBuf,
}

impl Storage {
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Load the data file; a missing file is an empty task list
    pub fn load(&self) -> Result<TaskFile> {
        if !self.file_path.exists() {
            return Ok(TaskFile::new());
        }

        let content = fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read {}", self.file_path.display()))?;
        let data: TaskFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.file_path.display()))?;
        Ok(data)
    }

    pub fn save(&self, data: &TaskFile) -> Result<()> {
        let content = toml::to_string_pretty(data)?;
        fs::write(&self.file_path, content)
            .with_context(|| format!("Failed to write {}", self.file_path.display()))?;
        Ok(())
    }
}
