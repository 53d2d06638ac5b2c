use crate::error::{CliError, Result};
use reinvent_pilot::core::models::diversity::DiversityFilterName;
use reinvent_pilot::core::models::learning::LearningRateMode;
use reinvent_pilot::core::models::run::{ModelType, RunType};
use reinvent_pilot::core::models::scoring::{
    Component, ComponentType, ScoringFunctionName, SpecificParameters,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileJobConfig {
    pub name: Option<String>,
    pub id: Option<String>,
    pub run_type: Option<RunType>,
    pub model_type: Option<ModelType>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileLauncherConfig {
    pub python: Option<String>,
    pub entry_point: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub env: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileLoggingConfig {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub logging_frequency: Option<u32>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileReinforcementLearningConfig {
    pub prior: Option<PathBuf>,
    pub agent: Option<PathBuf>,
    pub n_steps: Option<usize>,
    pub sigma: Option<f64>,
    pub learning_rate: Option<f64>,
    pub batch_size: Option<usize>,
    pub margin_threshold: Option<u32>,
    pub reset: Option<usize>,
    pub reset_score_cutoff: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileDiversityFilterConfig {
    pub name: Option<DiversityFilterName>,
    pub nbmax: Option<usize>,
    pub minscore: Option<f64>,
    pub minsimilarity: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileInceptionConfig {
    pub smiles: Option<Vec<String>>,
    /// Read SMILES from a file, one per line, in addition to `smiles`.
    pub smiles_file: Option<PathBuf>,
    pub memory_size: Option<usize>,
    pub sample_size: Option<usize>,
}

/// A scoring component as written in a recipe. `specific-parameters` is passed through to
/// the tool verbatim, so its keys keep the tool's own snake_case spelling.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileComponentConfig {
    pub component_type: ComponentType,
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub specific_parameters: Option<Map<String, Value>>,
}

fn default_weight() -> f64 {
    1.0
}

impl FileComponentConfig {
    pub fn into_component(self) -> Result<Component> {
        let mut component = Component::new(self.component_type, self.name, self.weight);
        if let Some(params) = self.specific_parameters {
            let parameters: SpecificParameters = serde_json::from_value(Value::Object(params))
                .map_err(|e| {
                    CliError::Config(format!(
                        "Invalid specific-parameters for component '{}': {}",
                        component.name, e
                    ))
                })?;
            component = component.with_parameters(parameters);
        }
        Ok(component)
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileScoringFunctionConfig {
    pub name: Option<ScoringFunctionName>,
    pub parallel: Option<bool>,
    #[serde(default)]
    pub components: Vec<FileComponentConfig>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSamplingConfig {
    pub model_path: Option<PathBuf>,
    pub output_smiles_path: Option<PathBuf>,
    pub num_smiles: Option<usize>,
    pub batch_size: Option<usize>,
    pub with_likelihood: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileLearningRateConfig {
    pub mode: Option<LearningRateMode>,
    pub gamma: Option<f64>,
    pub step: Option<usize>,
    pub start: Option<f64>,
    pub min: Option<f64>,
    pub threshold: Option<f64>,
    pub average_data_size: Option<usize>,
    pub patience: Option<usize>,
    pub restart_value: Option<f64>,
    pub sample_size: Option<usize>,
    pub restart_times: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileTransferLearningConfig {
    pub input_model_path: Option<PathBuf>,
    pub output_model_path: Option<PathBuf>,
    pub input_smiles_path: Option<PathBuf>,
    pub validation_smiles_path: Option<PathBuf>,
    pub save_every_n_epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub num_epochs: Option<usize>,
    pub standardize: Option<bool>,
    pub randomize: Option<bool>,
    pub learning_rate: Option<FileLearningRateConfig>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileCreateModelConfig {
    pub input_smiles_path: Option<PathBuf>,
    pub output_model_path: Option<PathBuf>,
    pub num_layers: Option<usize>,
    pub layer_size: Option<usize>,
    pub cell_type: Option<String>,
    pub embedding_layer_size: Option<usize>,
    pub dropout: Option<f64>,
    pub max_sequence_length: Option<usize>,
    pub layer_normalization: Option<bool>,
    pub standardize: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileScoringRunConfig {
    pub input: Option<PathBuf>,
}

/// A recipe file. Every key is optional; missing values fall back to built-in defaults.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub job: Option<FileJobConfig>,
    pub launcher: Option<FileLauncherConfig>,
    pub logging: Option<FileLoggingConfig>,
    pub reinforcement_learning: Option<FileReinforcementLearningConfig>,
    pub diversity_filter: Option<FileDiversityFilterConfig>,
    pub inception: Option<FileInceptionConfig>,
    pub scoring_function: Option<FileScoringFunctionConfig>,
    pub sampling: Option<FileSamplingConfig>,
    pub transfer_learning: Option<FileTransferLearningConfig>,
    pub create_model: Option<FileCreateModelConfig>,
    pub scoring: Option<FileScoringRunConfig>,
}

impl FileConfig {
    /// Reads a recipe as a raw TOML table so `--set` overrides can be applied before the
    /// typed structure is checked.
    pub fn read_table(path: &Path) -> Result<toml::Table> {
        debug!("Loading recipe from file: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_table(table: toml::Table) -> Result<Self> {
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| CliError::Config(format!("Invalid recipe: {}", e)))
    }
}
