use reinvent_pilot::core::models::diversity::DiversityFilter;
use reinvent_pilot::core::models::learning::{AdaptiveLearningRate, Inception};
use reinvent_pilot::core::models::logging::{DEFAULT_SENDER, LOCAL_RECIPIENT};
use reinvent_pilot::core::models::run::RunType;
use reinvent_pilot::core::models::scoring::ScoringFunctionName;

pub struct DefaultsConfig {
    pub job_name: String,
    pub run_type: RunType,
    pub output_dir: String,
    pub python: String,
    pub entry_point: String,
    pub sender: String,
    pub recipient: String,
    pub logging_frequency: u32,
    pub n_steps: usize,
    pub sigma: f64,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub margin_threshold: u32,
    pub reset: usize,
    pub reset_score_cutoff: f64,
    pub diversity_filter: DiversityFilter,
    pub inception: Inception,
    pub scoring_function: ScoringFunctionName,
    pub num_smiles: usize,
    pub with_likelihood: bool,
    pub sampled_smiles_file: String,
    pub num_epochs: usize,
    pub save_every_n_epochs: usize,
    pub adaptive_lr: AdaptiveLearningRate,
    pub num_layers: usize,
    pub layer_size: usize,
    pub cell_type: String,
    pub embedding_layer_size: usize,
    pub dropout: f64,
    pub max_sequence_length: usize,
    pub top_n: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            job_name: "reinvent-pilot".to_string(),
            run_type: RunType::ReinforcementLearning,
            output_dir: ".".to_string(),
            python: "python".to_string(),
            entry_point: "input.py".to_string(),
            sender: DEFAULT_SENDER.to_string(),
            recipient: LOCAL_RECIPIENT.to_string(),
            logging_frequency: 10,
            n_steps: 125,
            sigma: 128.0,
            learning_rate: 0.0001,
            batch_size: 128,
            margin_threshold: 50,
            reset: 0,
            reset_score_cutoff: 0.5,
            diversity_filter: DiversityFilter::default(),
            inception: Inception::default(),
            scoring_function: ScoringFunctionName::CustomProduct,
            num_smiles: 1024,
            with_likelihood: true,
            sampled_smiles_file: "sampled.smi".to_string(),
            num_epochs: 10,
            save_every_n_epochs: 1,
            adaptive_lr: AdaptiveLearningRate::default(),
            num_layers: 3,
            layer_size: 512,
            cell_type: "lstm".to_string(),
            embedding_layer_size: 256,
            dropout: 0.0,
            max_sequence_length: 256,
            top_n: 5,
        }
    }
}
