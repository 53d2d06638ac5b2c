use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReinforcementLearning {
    pub prior: PathBuf,
    pub agent: PathBuf,
    pub n_steps: usize,
    pub sigma: f64,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub margin_threshold: u32,
    pub reset: usize,
    pub reset_score_cutoff: f64,
}

/// Replay memory seeded with known actives and refilled with the best molecules of each
/// step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inception {
    pub smiles: Vec<String>,
    pub memory_size: usize,
    pub sample_size: usize,
}

impl Default for Inception {
    fn default() -> Self {
        Self {
            smiles: Vec::new(),
            memory_size: 100,
            sample_size: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    pub model_path: PathBuf,
    pub output_smiles_path: PathBuf,
    pub num_smiles: usize,
    pub batch_size: usize,
    pub with_likelihood: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningRateMode {
    Constant,
    Exponential,
    Adaptive,
}

/// Learning rate schedule for transfer learning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveLearningRate {
    pub mode: LearningRateMode,
    pub gamma: f64,
    pub step: usize,
    pub start: f64,
    pub min: f64,
    pub threshold: f64,
    pub average_data_size: usize,
    pub patience: usize,
    pub restart_value: f64,
    pub sample_size: usize,
    pub restart_times: usize,
}

impl Default for AdaptiveLearningRate {
    fn default() -> Self {
        Self {
            mode: LearningRateMode::Constant,
            gamma: 0.8,
            step: 1,
            start: 5e-4,
            min: 1e-5,
            threshold: 1e-4,
            average_data_size: 15,
            patience: 8,
            restart_value: 1e-5,
            sample_size: 100,
            restart_times: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferLearning {
    pub input_model_path: PathBuf,
    pub output_model_path: PathBuf,
    pub input_smiles_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_smiles_path: Option<PathBuf>,
    pub save_every_n_epochs: usize,
    pub batch_size: usize,
    pub num_epochs: usize,
    pub standardize: bool,
    pub randomize: bool,
    pub adaptive_lr_config: AdaptiveLearningRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateModel {
    pub input_smiles_path: PathBuf,
    pub output_model_path: PathBuf,
    pub num_layers: usize,
    pub layer_size: usize,
    pub cell_type: String,
    pub embedding_layer_size: usize,
    pub dropout: f64,
    pub max_sequence_length: usize,
    pub layer_normalization: bool,
    pub standardize: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn adaptive_lr_mode_is_snake_case() {
        let value = serde_json::to_value(AdaptiveLearningRate::default()).unwrap();
        assert_eq!(value["mode"], json!("constant"));
        assert_eq!(value["restart_times"], json!(0));
    }

    #[test]
    fn transfer_learning_omits_missing_validation_set() {
        let tl = TransferLearning {
            input_model_path: "prior.ckpt".into(),
            output_model_path: "focused.ckpt".into(),
            input_smiles_path: "train.smi".into(),
            validation_smiles_path: None,
            save_every_n_epochs: 1,
            batch_size: 128,
            num_epochs: 10,
            standardize: true,
            randomize: true,
            adaptive_lr_config: AdaptiveLearningRate::default(),
        };
        let value = serde_json::to_value(&tl).unwrap();
        assert!(value.get("validation_smiles_path").is_none());
        let back: TransferLearning = serde_json::from_value(value).unwrap();
        assert_eq!(back, tl);
    }

    #[test]
    fn inception_defaults_match_tool_defaults() {
        let inception = Inception::default();
        assert!(inception.smiles.is_empty());
        assert_eq!(inception.memory_size, 100);
        assert_eq!(inception.sample_size, 10);
    }
}
