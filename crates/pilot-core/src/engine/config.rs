use crate::core::models::diversity::{DiversityFilter, DiversityFilterName};
use crate::core::models::learning::{
    CreateModel, Inception, ReinforcementLearning, Sampling, TransferLearning,
};
use crate::core::models::logging::{DEFAULT_SENDER, LOCAL_RECIPIENT, Logging};
use crate::core::models::run::{
    CONFIGURATION_VERSION, ModelType, Parameters, ReinforcementLearningParameters,
    RunConfiguration,
};
use crate::core::models::scoring::{ScoringError, ScoringFunction};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Unsupported configuration version {0} (expected {CONFIGURATION_VERSION})")]
    UnsupportedVersion(u32),

    #[error("Invalid scoring function: {0}")]
    Scoring(#[from] ScoringError),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

#[derive(Default)]
pub struct LoggingBuilder {
    sender: Option<String>,
    recipient: Option<String>,
    logging_frequency: Option<u32>,
    logging_path: Option<PathBuf>,
    result_folder: Option<PathBuf>,
    job_name: Option<String>,
    job_id: Option<String>,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }
    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }
    pub fn logging_frequency(mut self, frequency: u32) -> Self {
        self.logging_frequency = Some(frequency);
        self
    }
    pub fn logging_path(mut self, path: PathBuf) -> Self {
        self.logging_path = Some(path);
        self
    }
    pub fn result_folder(mut self, path: PathBuf) -> Self {
        self.result_folder = Some(path);
        self
    }
    pub fn job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }
    pub fn job_id(mut self, id: impl Into<String>) -> Self {
        self.job_id = Some(id.into());
        self
    }

    pub fn build(self) -> Result<Logging, ConfigError> {
        Ok(Logging {
            sender: self.sender.unwrap_or_else(|| DEFAULT_SENDER.to_string()),
            recipient: self
                .recipient
                .unwrap_or_else(|| LOCAL_RECIPIENT.to_string()),
            logging_frequency: self.logging_frequency,
            logging_path: self
                .logging_path
                .ok_or(ConfigError::MissingParameter("logging_path"))?,
            result_folder: self.result_folder,
            job_name: self
                .job_name
                .ok_or(ConfigError::MissingParameter("job_name"))?,
            job_id: self.job_id.ok_or(ConfigError::MissingParameter("job_id"))?,
        })
    }
}

#[derive(Default)]
pub struct ReinforcementLearningBuilder {
    prior: Option<PathBuf>,
    agent: Option<PathBuf>,
    n_steps: Option<usize>,
    sigma: Option<f64>,
    learning_rate: Option<f64>,
    batch_size: Option<usize>,
    margin_threshold: Option<u32>,
    reset: Option<usize>,
    reset_score_cutoff: Option<f64>,
    diversity_filter: Option<DiversityFilter>,
    inception: Option<Inception>,
    scoring_function: Option<ScoringFunction>,
}

impl ReinforcementLearningBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prior(mut self, path: PathBuf) -> Self {
        self.prior = Some(path);
        self
    }
    pub fn agent(mut self, path: PathBuf) -> Self {
        self.agent = Some(path);
        self
    }
    pub fn n_steps(mut self, n: usize) -> Self {
        self.n_steps = Some(n);
        self
    }
    pub fn sigma(mut self, sigma: f64) -> Self {
        self.sigma = Some(sigma);
        self
    }
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = Some(rate);
        self
    }
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }
    pub fn margin_threshold(mut self, threshold: u32) -> Self {
        self.margin_threshold = Some(threshold);
        self
    }
    pub fn reset(mut self, reset: usize, score_cutoff: f64) -> Self {
        self.reset = Some(reset);
        self.reset_score_cutoff = Some(score_cutoff);
        self
    }
    pub fn diversity_filter(mut self, filter: DiversityFilter) -> Self {
        self.diversity_filter = Some(filter);
        self
    }
    pub fn inception(mut self, inception: Inception) -> Self {
        self.inception = Some(inception);
        self
    }
    pub fn scoring_function(mut self, function: ScoringFunction) -> Self {
        self.scoring_function = Some(function);
        self
    }

    /// Builds the parameters. The agent defaults to the prior, which is how a fresh run
    /// starts; filter and inception fall back to the tool's customary defaults.
    pub fn build(self) -> Result<ReinforcementLearningParameters, ConfigError> {
        let prior = self.prior.ok_or(ConfigError::MissingParameter("prior"))?;
        let agent = self.agent.unwrap_or_else(|| prior.clone());
        Ok(ReinforcementLearningParameters {
            diversity_filter: self.diversity_filter.unwrap_or_default(),
            inception: self.inception.unwrap_or_default(),
            reinforcement_learning: ReinforcementLearning {
                prior,
                agent,
                n_steps: self.n_steps.ok_or(ConfigError::MissingParameter("n_steps"))?,
                sigma: self.sigma.ok_or(ConfigError::MissingParameter("sigma"))?,
                learning_rate: self
                    .learning_rate
                    .ok_or(ConfigError::MissingParameter("learning_rate"))?,
                batch_size: self
                    .batch_size
                    .ok_or(ConfigError::MissingParameter("batch_size"))?,
                margin_threshold: self.margin_threshold.unwrap_or(50),
                reset: self.reset.unwrap_or(0),
                reset_score_cutoff: self.reset_score_cutoff.unwrap_or(0.5),
            },
            scoring_function: self
                .scoring_function
                .ok_or(ConfigError::MissingParameter("scoring_function"))?,
        })
    }
}

#[derive(Default)]
pub struct RunConfigurationBuilder {
    model_type: Option<ModelType>,
    logging: Option<Logging>,
    parameters: Option<Parameters>,
}

impl RunConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model_type(mut self, model_type: ModelType) -> Self {
        self.model_type = Some(model_type);
        self
    }
    pub fn logging(mut self, logging: Logging) -> Self {
        self.logging = Some(logging);
        self
    }
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Assembles and validates the configuration.
    pub fn build(self) -> Result<RunConfiguration, ConfigError> {
        let mut config = RunConfiguration::new(
            self.logging.ok_or(ConfigError::MissingParameter("logging"))?,
            self.parameters
                .ok_or(ConfigError::MissingParameter("parameters"))?,
        );
        config.model_type = self.model_type.unwrap_or_default();
        validate(&config)?;
        Ok(config)
    }
}

fn require_path(path: &Path, field: &'static str) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(invalid(field, "path must not be empty"));
    }
    Ok(())
}

fn require_positive(value: usize, field: &'static str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(field, "must be greater than zero"));
    }
    Ok(())
}

/// Checks a configuration against the rules the external tool relies on but reports
/// poorly (or only after loading its models).
pub fn validate(config: &RunConfiguration) -> Result<(), ConfigError> {
    if config.version != CONFIGURATION_VERSION {
        return Err(ConfigError::UnsupportedVersion(config.version));
    }
    validate_logging(&config.logging)?;

    match &config.parameters {
        Parameters::ReinforcementLearning(params) => {
            if config.logging.result_folder.is_none() {
                return Err(ConfigError::MissingParameter("logging.result_folder"));
            }
            validate_reinforcement_learning(params)
        }
        Parameters::Sampling(params) => validate_sampling(params),
        Parameters::TransferLearning(params) => validate_transfer_learning(params),
        Parameters::CreateModel(params) => validate_create_model(params),
        Parameters::Scoring(params) => {
            require_path(&params.input, "input")?;
            params.scoring_function.validate().map_err(Into::into)
        }
    }
}

fn validate_logging(logging: &Logging) -> Result<(), ConfigError> {
    if logging.job_name.trim().is_empty() {
        return Err(invalid("logging.job_name", "must not be empty"));
    }
    if logging.logging_frequency == Some(0) {
        return Err(invalid("logging.logging_frequency", "must be greater than zero"));
    }
    require_path(&logging.logging_path, "logging.logging_path")
}

pub fn validate_diversity_filter(filter: &DiversityFilter) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&filter.minscore) {
        return Err(invalid(
            "diversity_filter.minscore",
            format!("{} is outside [0, 1]", filter.minscore),
        ));
    }
    if !(0.0..=1.0).contains(&filter.minsimilarity) {
        return Err(invalid(
            "diversity_filter.minsimilarity",
            format!("{} is outside [0, 1]", filter.minsimilarity),
        ));
    }
    if filter.name != DiversityFilterName::NoFilter {
        require_positive(filter.nbmax, "diversity_filter.nbmax")?;
    }
    Ok(())
}

fn validate_reinforcement_learning(
    params: &ReinforcementLearningParameters,
) -> Result<(), ConfigError> {
    let rl = &params.reinforcement_learning;
    require_path(&rl.prior, "reinforcement_learning.prior")?;
    require_path(&rl.agent, "reinforcement_learning.agent")?;
    require_positive(rl.n_steps, "reinforcement_learning.n_steps")?;
    require_positive(rl.batch_size, "reinforcement_learning.batch_size")?;
    if !(rl.sigma.is_finite() && rl.sigma > 0.0) {
        return Err(invalid(
            "reinforcement_learning.sigma",
            format!("{} must be positive", rl.sigma),
        ));
    }
    if !(rl.learning_rate > 0.0 && rl.learning_rate < 1.0) {
        return Err(invalid(
            "reinforcement_learning.learning_rate",
            format!("{} is outside (0, 1)", rl.learning_rate),
        ));
    }
    if params.inception.sample_size > params.inception.memory_size {
        return Err(invalid(
            "inception.sample_size",
            format!(
                "{} exceeds memory_size {}",
                params.inception.sample_size, params.inception.memory_size
            ),
        ));
    }
    validate_diversity_filter(&params.diversity_filter)?;
    params.scoring_function.validate()?;
    Ok(())
}

fn validate_sampling(params: &Sampling) -> Result<(), ConfigError> {
    require_path(&params.model_path, "model_path")?;
    require_path(&params.output_smiles_path, "output_smiles_path")?;
    require_positive(params.num_smiles, "num_smiles")?;
    require_positive(params.batch_size, "batch_size")
}

fn validate_transfer_learning(params: &TransferLearning) -> Result<(), ConfigError> {
    require_path(&params.input_model_path, "input_model_path")?;
    require_path(&params.output_model_path, "output_model_path")?;
    require_path(&params.input_smiles_path, "input_smiles_path")?;
    require_positive(params.num_epochs, "num_epochs")?;
    require_positive(params.batch_size, "batch_size")?;
    require_positive(params.save_every_n_epochs, "save_every_n_epochs")?;
    let lr = &params.adaptive_lr_config;
    if lr.min > lr.start {
        return Err(invalid(
            "adaptive_lr_config.min",
            format!("{} exceeds start {}", lr.min, lr.start),
        ));
    }
    Ok(())
}

const CELL_TYPES: [&str; 2] = ["lstm", "gru"];

fn validate_create_model(params: &CreateModel) -> Result<(), ConfigError> {
    require_path(&params.input_smiles_path, "input_smiles_path")?;
    require_path(&params.output_model_path, "output_model_path")?;
    require_positive(params.num_layers, "num_layers")?;
    require_positive(params.layer_size, "layer_size")?;
    if !(0.0..1.0).contains(&params.dropout) {
        return Err(invalid(
            "dropout",
            format!("{} is outside [0, 1)", params.dropout),
        ));
    }
    if !CELL_TYPES.contains(&params.cell_type.as_str()) {
        return Err(invalid(
            "cell_type",
            format!("'{}' is not one of {:?}", params.cell_type, CELL_TYPES),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::learning::AdaptiveLearningRate;
    use crate::core::models::run::ScoringParameters;
    use crate::core::models::scoring::{
        Component, ComponentType, ScoringFunctionName, SpecificParameters,
    };
    use serde_json::json;

    fn scoring_function() -> ScoringFunction {
        ScoringFunction::new(ScoringFunctionName::CustomProduct)
            .with_component(
                Component::new(ComponentType::MatchingSubstructure, "Matching substructure", 1.0)
                    .with_parameters(
                        SpecificParameters::default().with("smiles", json!(["c1ccccc1CC"])),
                    ),
            )
            .with_component(Component::new(ComponentType::QedScore, "QED Score", 1.0))
    }

    fn logging(result_folder: Option<&str>) -> Logging {
        let mut builder = LoggingBuilder::new()
            .logging_frequency(10)
            .logging_path("out/progress.log".into())
            .job_name("RL demo")
            .job_id("demo");
        if let Some(folder) = result_folder {
            builder = builder.result_folder(folder.into());
        }
        builder.build().unwrap()
    }

    fn rl_builder() -> ReinforcementLearningBuilder {
        ReinforcementLearningBuilder::new()
            .prior("models/random.prior.new".into())
            .n_steps(125)
            .sigma(128.0)
            .learning_rate(0.0001)
            .batch_size(128)
            .scoring_function(scoring_function())
    }

    fn rl_config(params: ReinforcementLearningParameters) -> Result<RunConfiguration, ConfigError> {
        RunConfigurationBuilder::new()
            .logging(logging(Some("out/results")))
            .parameters(Parameters::ReinforcementLearning(Box::new(params)))
            .build()
    }

    #[test]
    fn logging_builder_fills_sender_and_recipient() {
        let logging = logging(None);
        assert_eq!(logging.sender, DEFAULT_SENDER);
        assert_eq!(logging.recipient, LOCAL_RECIPIENT);
    }

    #[test]
    fn logging_builder_requires_path() {
        let err = LoggingBuilder::new()
            .job_name("x")
            .job_id("y")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("logging_path"));
    }

    #[test]
    fn rl_builder_defaults_agent_to_prior() {
        let params = rl_builder().build().unwrap();
        let rl = &params.reinforcement_learning;
        assert_eq!(rl.agent, rl.prior);
        assert_eq!(rl.margin_threshold, 50);
        assert_eq!(params.diversity_filter, DiversityFilter::default());
        assert_eq!(params.inception, Inception::default());
    }

    #[test]
    fn rl_builder_reports_missing_scoring_function() {
        let err = ReinforcementLearningBuilder::new()
            .prior("p".into())
            .n_steps(1)
            .sigma(1.0)
            .learning_rate(0.1)
            .batch_size(1)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("scoring_function"));
    }

    #[test]
    fn valid_rl_configuration_builds() {
        let config = rl_config(rl_builder().build().unwrap()).unwrap();
        assert_eq!(config.version, CONFIGURATION_VERSION);
        assert_eq!(config.model_type, ModelType::Default);
    }

    #[test]
    fn rl_requires_result_folder() {
        let err = RunConfigurationBuilder::new()
            .logging(logging(None))
            .parameters(Parameters::ReinforcementLearning(Box::new(
                rl_builder().build().unwrap(),
            )))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("logging.result_folder"));
    }

    #[test]
    fn rl_numeric_rules_are_enforced() {
        let cases: Vec<(ReinforcementLearningBuilder, &str)> = vec![
            (rl_builder().n_steps(0), "reinforcement_learning.n_steps"),
            (rl_builder().batch_size(0), "reinforcement_learning.batch_size"),
            (rl_builder().sigma(-1.0), "reinforcement_learning.sigma"),
            (rl_builder().learning_rate(1.5), "reinforcement_learning.learning_rate"),
        ];
        for (builder, expected) in cases {
            match rl_config(builder.build().unwrap()) {
                Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected invalid {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn inception_sample_must_fit_memory() {
        let inception = Inception {
            smiles: vec![],
            memory_size: 5,
            sample_size: 10,
        };
        let err = rl_config(rl_builder().inception(inception).build().unwrap()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "inception.sample_size", .. }
        ));
    }

    #[test]
    fn diversity_filter_bounds() {
        let mut filter = DiversityFilter::default();
        filter.minscore = 1.2;
        assert!(validate_diversity_filter(&filter).is_err());

        let no_filter = DiversityFilter {
            name: DiversityFilterName::NoFilter,
            nbmax: 0,
            minscore: 0.0,
            minsimilarity: 0.0,
        };
        assert!(validate_diversity_filter(&no_filter).is_ok());

        let empty_buckets = DiversityFilter {
            nbmax: 0,
            ..DiversityFilter::default()
        };
        assert!(validate_diversity_filter(&empty_buckets).is_err());
    }

    #[test]
    fn scoring_errors_are_wrapped() {
        let params = rl_builder()
            .scoring_function(ScoringFunction::new(ScoringFunctionName::CustomSum))
            .build()
            .unwrap();
        assert_eq!(
            rl_config(params).unwrap_err(),
            ConfigError::Scoring(ScoringError::NoComponents)
        );
    }

    #[test]
    fn sampling_rules() {
        let sampling = Sampling {
            model_path: "agent.ckpt".into(),
            output_smiles_path: "out.smi".into(),
            num_smiles: 0,
            batch_size: 128,
            with_likelihood: true,
        };
        let err = RunConfigurationBuilder::new()
            .logging(logging(None))
            .parameters(Parameters::Sampling(sampling))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "num_smiles", .. }));
    }

    #[test]
    fn transfer_learning_rules() {
        let mut tl = TransferLearning {
            input_model_path: "prior".into(),
            output_model_path: "focused".into(),
            input_smiles_path: "train.smi".into(),
            validation_smiles_path: None,
            save_every_n_epochs: 1,
            batch_size: 64,
            num_epochs: 10,
            standardize: true,
            randomize: true,
            adaptive_lr_config: AdaptiveLearningRate::default(),
        };
        assert!(validate_transfer_learning(&tl).is_ok());
        tl.adaptive_lr_config.min = 1.0;
        assert!(validate_transfer_learning(&tl).is_err());
        tl.adaptive_lr_config.min = 1e-5;
        tl.input_smiles_path = PathBuf::new();
        assert!(matches!(
            validate_transfer_learning(&tl),
            Err(ConfigError::InvalidValue { field: "input_smiles_path", .. })
        ));
    }

    #[test]
    fn create_model_rules() {
        let mut model = CreateModel {
            input_smiles_path: "chembl.smi".into(),
            output_model_path: "empty.prior".into(),
            num_layers: 3,
            layer_size: 512,
            cell_type: "lstm".into(),
            embedding_layer_size: 256,
            dropout: 0.0,
            max_sequence_length: 256,
            layer_normalization: false,
            standardize: true,
        };
        assert!(validate_create_model(&model).is_ok());
        model.cell_type = "transformer".into();
        assert!(validate_create_model(&model).is_err());
        model.cell_type = "gru".into();
        model.dropout = 1.0;
        assert!(validate_create_model(&model).is_err());
    }

    #[test]
    fn scoring_run_requires_input() {
        let config = RunConfiguration::new(
            logging(None),
            Parameters::Scoring(ScoringParameters {
                input: PathBuf::new(),
                scoring_function: scoring_function(),
            }),
        );
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidValue { field: "input", .. })
        ));
    }

    #[test]
    fn version_and_logging_checks() {
        let mut config = rl_config(rl_builder().build().unwrap()).unwrap();
        config.version = 2;
        assert_eq!(validate(&config), Err(ConfigError::UnsupportedVersion(2)));
        config.version = CONFIGURATION_VERSION;
        config.logging.logging_frequency = Some(0);
        assert!(validate(&config).is_err());
        config.logging.logging_frequency = None;
        config.logging.job_name = "  ".into();
        assert!(validate(&config).is_err());
    }
}
