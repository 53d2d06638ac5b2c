use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_SENDER: &str = "http://127.0.0.1";
pub const LOCAL_RECIPIENT: &str = "local";

/// The `logging` section of a run configuration.
///
/// `logging_frequency` and `result_folder` are only meaningful for reinforcement learning
/// runs and are omitted from the JSON document when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logging {
    pub sender: String,
    pub recipient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging_frequency: Option<u32>,
    pub logging_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_folder: Option<PathBuf>,
    pub job_name: String,
    pub job_id: String,
}

impl Logging {
    pub fn is_local(&self) -> bool {
        self.recipient == LOCAL_RECIPIENT
    }
}
