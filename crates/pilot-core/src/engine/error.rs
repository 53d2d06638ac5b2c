use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::config::ConfigFileError;
use crate::core::io::scores::ScoreTableError;
use crate::core::io::smiles::SmilesFileError;
use crate::core::io::transcript::TranscriptError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error(transparent)]
    ConfigFile(#[from] ConfigFileError),

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to record transcript: {0}")]
    Recording(#[source] io::Error),

    #[error("Run was cancelled")]
    Cancelled,

    #[error("Run exceeded the time limit of {}s", limit.as_secs())]
    TimedOut { limit: Duration },

    #[error("External tool failed ({}); last output:\n{tail}", describe_exit(*code))]
    ProcessFailed { code: Option<i32>, tail: String },

    #[error("Failed to parse transcript: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("Failed to read score table '{path}': {source}", path = path.display())]
    ScoreTable {
        path: PathBuf,
        #[source]
        source: ScoreTableError,
    },

    #[error("Failed to read SMILES file '{path}': {source}", path = path.display())]
    Smiles {
        path: PathBuf,
        #[source]
        source: SmilesFileError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_failure_mentions_exit_status_and_tail() {
        let err = EngineError::ProcessFailed {
            code: Some(2),
            tail: "Traceback".into(),
        };
        let text = err.to_string();
        assert!(text.contains("exit status 2"));
        assert!(text.ends_with("Traceback"));

        let killed = EngineError::ProcessFailed {
            code: None,
            tail: String::new(),
        };
        assert!(killed.to_string().contains("signal"));
    }

    #[test]
    fn config_errors_convert() {
        let err: EngineError = ConfigError::MissingParameter("prior").into();
        assert!(matches!(err, EngineError::Config { .. }));
        assert!(err.to_string().contains("prior"));
    }
}
