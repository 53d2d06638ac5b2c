use super::error::EngineError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "config.json";
pub const TRANSCRIPT_FILE: &str = "run.err";
pub const PROGRESS_LOG_FILE: &str = "progress.log";
pub const RESULTS_DIR: &str = "results";
pub const MEMORY_FILE: &str = "memory.csv";
pub const SCAFFOLD_MEMORY_FILE: &str = "scaffold_memory.csv";

/// File names of a single run inside its output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn transcript_path(&self) -> PathBuf {
        self.root.join(TRANSCRIPT_FILE)
    }

    /// Where the tool writes its own log, i.e. `logging.logging_path`.
    pub fn logging_path(&self) -> PathBuf {
        self.root.join(PROGRESS_LOG_FILE)
    }

    pub fn result_folder(&self) -> PathBuf {
        self.root.join(RESULTS_DIR)
    }

    pub fn memory_path(&self) -> PathBuf {
        self.result_folder().join(MEMORY_FILE)
    }

    pub fn scaffold_memory_path(&self) -> PathBuf {
        self.result_folder().join(SCAFFOLD_MEMORY_FILE)
    }

    /// Creates the output and result folders. Folders left by an earlier run are reused.
    pub fn prepare(&self) -> Result<(), EngineError> {
        for dir in [self.root.clone(), self.result_folder()] {
            match fs::create_dir(&dir) {
                Ok(()) => debug!(path = %dir.display(), "Created run folder"),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {
                    debug!(path = %dir.display(), "Reusing existing run folder")
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    fs::create_dir_all(&dir).map_err(EngineError::io(&dir))?
                }
                Err(e) => return Err(EngineError::io(&dir)(e)),
            }
        }
        Ok(())
    }
}
