use super::defaults::DefaultsConfig;
use super::file::{
    FileConfig, FileCreateModelConfig, FileDiversityFilterConfig, FileInceptionConfig,
    FileLearningRateConfig, FileReinforcementLearningConfig, FileSamplingConfig,
    FileScoringFunctionConfig, FileTransferLearningConfig,
};
use super::models::AppConfig;
use crate::cli::{LaunchArgs, RecipeArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use reinvent_pilot::core::io::smiles::SampledSmiles;
use reinvent_pilot::core::io::traits::ResultFile;
use reinvent_pilot::core::models::diversity::DiversityFilter;
use reinvent_pilot::core::models::learning::{
    AdaptiveLearningRate, CreateModel, Inception, Sampling, TransferLearning,
};
use reinvent_pilot::core::models::run::{Parameters, RunType, ScoringParameters};
use reinvent_pilot::core::models::scoring::ScoringFunction;
use reinvent_pilot::engine::config::{
    LoggingBuilder, ReinforcementLearningBuilder, RunConfigurationBuilder,
};
use reinvent_pilot::engine::launcher::Launcher;
use reinvent_pilot::engine::layout::RunLayout;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub fn build_config(recipe: &RecipeArgs, launch: &LaunchArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let mut table = FileConfig::read_table(&recipe.config)?;
    apply_set_values(&mut table, &recipe.set_values)?;
    let mut file_config = FileConfig::from_table(table)?;

    let job = file_config.job.take().unwrap_or_default();
    let run_type = job.run_type.unwrap_or(defaults.run_type);
    let job_name = recipe
        .job_name
        .clone()
        .or(job.name)
        .unwrap_or_else(|| defaults.job_name.clone());
    let job_id = job.id.unwrap_or_else(|| slugify(&job_name));

    let output_dir = recipe
        .output_dir
        .clone()
        .or(job.output_dir)
        .unwrap_or_else(|| PathBuf::from(&defaults.output_dir));
    // The tool may run from another working directory, so every path it sees is absolute.
    let layout = RunLayout::new(std::path::absolute(&output_dir)?);
    debug!(run_type = %run_type, root = %layout.root().display(), "Resolved run layout");

    let logging_file = file_config.logging.take().unwrap_or_default();
    let mut logging = LoggingBuilder::new()
        .sender(logging_file.sender.unwrap_or_else(|| defaults.sender.clone()))
        .recipient(
            logging_file
                .recipient
                .unwrap_or_else(|| defaults.recipient.clone()),
        )
        .job_name(job_name)
        .job_id(job_id);
    logging = match run_type {
        RunType::ReinforcementLearning => logging
            .logging_path(layout.logging_path())
            .result_folder(layout.result_folder())
            .logging_frequency(
                logging_file
                    .logging_frequency
                    .unwrap_or(defaults.logging_frequency),
            ),
        // Scoring runs write their table into the logging path, which must be a folder.
        RunType::Scoring => logging.logging_path(layout.result_folder()),
        _ => logging.logging_path(layout.logging_path()),
    };
    if run_type != RunType::ReinforcementLearning {
        if let Some(frequency) = logging_file.logging_frequency {
            logging = logging.logging_frequency(frequency);
        }
    }

    let parameters = match run_type {
        RunType::ReinforcementLearning => {
            build_reinforcement_learning(recipe, &mut file_config, &defaults)?
        }
        RunType::Sampling => build_sampling(
            recipe,
            file_config.sampling.take().unwrap_or_default(),
            &layout,
            &defaults,
        )?,
        RunType::TransferLearning => build_transfer_learning(
            recipe,
            file_config.transfer_learning.take().unwrap_or_default(),
            &defaults,
        )?,
        RunType::CreateModel => build_create_model(
            file_config.create_model.take().unwrap_or_default(),
            &defaults,
        )?,
        RunType::Scoring => {
            let scoring = file_config.scoring.take().unwrap_or_default();
            Parameters::Scoring(ScoringParameters {
                input: required_path(scoring.input, "scoring.input")?,
                scoring_function: build_scoring_function(
                    file_config.scoring_function.take().unwrap_or_default(),
                    &defaults,
                )?,
            })
        }
    };

    let run_config = RunConfigurationBuilder::new()
        .model_type(job.model_type.unwrap_or_default())
        .logging(logging.build()?)
        .parameters(parameters)
        .build()?;

    let launcher = build_launcher(launch, &mut file_config, &defaults);

    Ok(AppConfig {
        run_config,
        layout,
        launcher,
    })
}

/// Recipe paths are relative to where rpilot runs; the tool may start elsewhere.
fn absolute(path: PathBuf) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

fn required_path(value: Option<PathBuf>, key: &str) -> Result<PathBuf> {
    absolute(required(value, key)?)
}

fn required<T>(value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| {
        CliError::Config(format!(
            "A value for '{}' is required either in the recipe or via CLI argument.",
            key
        ))
    })
}

fn slugify(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    slug.split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn build_launcher(
    launch: &LaunchArgs,
    file_config: &mut FileConfig,
    defaults: &DefaultsConfig,
) -> Launcher {
    let file = file_config.launcher.take().unwrap_or_default();
    let python = launch
        .python
        .clone()
        .or(file.python)
        .unwrap_or_else(|| defaults.python.clone());
    let entry_point = launch
        .entry_point
        .clone()
        .or(file.entry_point)
        .unwrap_or_else(|| PathBuf::from(&defaults.entry_point));

    let mut launcher = Launcher::new(python).arg(entry_point.display().to_string());
    if let Some(dir) = file.working_dir {
        launcher = launcher.working_dir(dir);
    }
    for (key, value) in file.env.unwrap_or_default() {
        launcher = launcher.env(key, value);
    }
    if let Some(secs) = launch.timeout.or(file.timeout_secs) {
        launcher = launcher.timeout(Duration::from_secs(secs));
    }
    launcher
}

fn build_reinforcement_learning(
    recipe: &RecipeArgs,
    file_config: &mut FileConfig,
    defaults: &DefaultsConfig,
) -> Result<Parameters> {
    let rl: FileReinforcementLearningConfig =
        file_config.reinforcement_learning.take().unwrap_or_default();

    let prior = required_path(
        recipe.prior.clone().or(rl.prior),
        "reinforcement-learning.prior",
    )?;
    let mut builder = ReinforcementLearningBuilder::new()
        .prior(prior)
        .n_steps(recipe.n_steps.or(rl.n_steps).unwrap_or(defaults.n_steps))
        .sigma(rl.sigma.unwrap_or(defaults.sigma))
        .learning_rate(rl.learning_rate.unwrap_or(defaults.learning_rate))
        .batch_size(
            recipe
                .batch_size
                .or(rl.batch_size)
                .unwrap_or(defaults.batch_size),
        )
        .margin_threshold(rl.margin_threshold.unwrap_or(defaults.margin_threshold))
        .reset(
            rl.reset.unwrap_or(defaults.reset),
            rl.reset_score_cutoff.unwrap_or(defaults.reset_score_cutoff),
        )
        .diversity_filter(build_diversity_filter(
            file_config.diversity_filter.take().unwrap_or_default(),
            defaults,
        ))
        .inception(build_inception(
            file_config.inception.take().unwrap_or_default(),
            defaults,
        )?)
        .scoring_function(build_scoring_function(
            file_config.scoring_function.take().unwrap_or_default(),
            defaults,
        )?);
    if let Some(agent) = recipe.agent.clone().or(rl.agent) {
        builder = builder.agent(absolute(agent)?);
    }

    Ok(Parameters::ReinforcementLearning(Box::new(builder.build()?)))
}

fn build_diversity_filter(
    file: FileDiversityFilterConfig,
    defaults: &DefaultsConfig,
) -> DiversityFilter {
    let base = &defaults.diversity_filter;
    DiversityFilter {
        name: file.name.unwrap_or(base.name),
        nbmax: file.nbmax.unwrap_or(base.nbmax),
        minscore: file.minscore.unwrap_or(base.minscore),
        minsimilarity: file.minsimilarity.unwrap_or(base.minsimilarity),
    }
}

fn build_inception(file: FileInceptionConfig, defaults: &DefaultsConfig) -> Result<Inception> {
    let mut smiles = file.smiles.unwrap_or_default();
    if let Some(path) = file.smiles_file {
        let listed = SampledSmiles::read_from_path(&path).map_err(|e| CliError::FileParsing {
            path: path.clone(),
            source: e.into(),
        })?;
        smiles.extend(listed.molecules.into_iter().map(|m| m.smiles));
    }
    Ok(Inception {
        smiles,
        memory_size: file.memory_size.unwrap_or(defaults.inception.memory_size),
        sample_size: file.sample_size.unwrap_or(defaults.inception.sample_size),
    })
}

fn build_scoring_function(
    file: FileScoringFunctionConfig,
    defaults: &DefaultsConfig,
) -> Result<ScoringFunction> {
    let mut function = ScoringFunction::new(file.name.unwrap_or(defaults.scoring_function));
    function.parallel = file.parallel.unwrap_or(false);
    for component in file.components {
        function = function.with_component(component.into_component()?);
    }
    Ok(function)
}

fn build_sampling(
    recipe: &RecipeArgs,
    file: FileSamplingConfig,
    layout: &RunLayout,
    defaults: &DefaultsConfig,
) -> Result<Parameters> {
    Ok(Parameters::Sampling(Sampling {
        model_path: required_path(
            recipe.agent.clone().or(file.model_path),
            "sampling.model-path",
        )?,
        output_smiles_path: match file.output_smiles_path {
            Some(path) => absolute(path)?,
            None => layout.root().join(&defaults.sampled_smiles_file),
        },
        num_smiles: file.num_smiles.unwrap_or(defaults.num_smiles),
        batch_size: recipe
            .batch_size
            .or(file.batch_size)
            .unwrap_or(defaults.batch_size),
        with_likelihood: file.with_likelihood.unwrap_or(defaults.with_likelihood),
    }))
}

fn build_learning_rate(
    file: Option<FileLearningRateConfig>,
    defaults: &DefaultsConfig,
) -> AdaptiveLearningRate {
    let file = file.unwrap_or_default();
    let base = &defaults.adaptive_lr;
    AdaptiveLearningRate {
        mode: file.mode.unwrap_or(base.mode),
        gamma: file.gamma.unwrap_or(base.gamma),
        step: file.step.unwrap_or(base.step),
        start: file.start.unwrap_or(base.start),
        min: file.min.unwrap_or(base.min),
        threshold: file.threshold.unwrap_or(base.threshold),
        average_data_size: file.average_data_size.unwrap_or(base.average_data_size),
        patience: file.patience.unwrap_or(base.patience),
        restart_value: file.restart_value.unwrap_or(base.restart_value),
        sample_size: file.sample_size.unwrap_or(base.sample_size),
        restart_times: file.restart_times.unwrap_or(base.restart_times),
    }
}

fn build_transfer_learning(
    recipe: &RecipeArgs,
    file: FileTransferLearningConfig,
    defaults: &DefaultsConfig,
) -> Result<Parameters> {
    Ok(Parameters::TransferLearning(TransferLearning {
        input_model_path: required_path(
            recipe.prior.clone().or(file.input_model_path),
            "transfer-learning.input-model-path",
        )?,
        output_model_path: required_path(
            file.output_model_path,
            "transfer-learning.output-model-path",
        )?,
        input_smiles_path: required_path(
            file.input_smiles_path,
            "transfer-learning.input-smiles-path",
        )?,
        validation_smiles_path: file.validation_smiles_path.map(absolute).transpose()?,
        save_every_n_epochs: file
            .save_every_n_epochs
            .unwrap_or(defaults.save_every_n_epochs),
        batch_size: recipe
            .batch_size
            .or(file.batch_size)
            .unwrap_or(defaults.batch_size),
        num_epochs: file.num_epochs.unwrap_or(defaults.num_epochs),
        standardize: file.standardize.unwrap_or(true),
        randomize: file.randomize.unwrap_or(true),
        adaptive_lr_config: build_learning_rate(file.learning_rate, defaults),
    }))
}

fn build_create_model(file: FileCreateModelConfig, defaults: &DefaultsConfig) -> Result<Parameters> {
    Ok(Parameters::CreateModel(CreateModel {
        input_smiles_path: required_path(
            file.input_smiles_path,
            "create-model.input-smiles-path",
        )?,
        output_model_path: required_path(
            file.output_model_path,
            "create-model.output-model-path",
        )?,
        num_layers: file.num_layers.unwrap_or(defaults.num_layers),
        layer_size: file.layer_size.unwrap_or(defaults.layer_size),
        cell_type: file.cell_type.unwrap_or_else(|| defaults.cell_type.clone()),
        embedding_layer_size: file
            .embedding_layer_size
            .unwrap_or(defaults.embedding_layer_size),
        dropout: file.dropout.unwrap_or(defaults.dropout),
        max_sequence_length: file
            .max_sequence_length
            .unwrap_or(defaults.max_sequence_length),
        layer_normalization: file.layer_normalization.unwrap_or(false),
        standardize: file.standardize.unwrap_or(true),
    }))
}

/// Applies `KEY=VALUE` overrides to the raw recipe. Keys are dotted recipe paths such as
/// `reinforcement-learning.n-steps`; values are TOML literals, and anything that does not
/// parse as one is taken as a plain string.
fn apply_set_values(table: &mut toml::Table, set_values: &[String]) -> Result<()> {
    for kv_pair in set_values {
        let (key, raw) =
            parser::parse_key_value(kv_pair).map_err(|e| CliError::Config(e.to_string()))?;
        let value = parse_toml_literal(raw);
        debug!("Applying override {} = {}", key, value);
        insert_dotted(table, key, value)?;
    }
    Ok(())
}

fn parse_toml_literal(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("value = {}", raw))
        .ok()
        .and_then(|mut parsed| parsed.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

fn insert_dotted(table: &mut toml::Table, key: &str, value: toml::Value) -> Result<()> {
    let segments: Vec<&str> = key.split('.').map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(CliError::Config(format!("Invalid --set key: '{}'", key)));
    }
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| CliError::Config(format!("Invalid --set key: '{}'", key)))?;

    let mut current = table;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()));
        current = match entry {
            toml::Value::Table(inner) => inner,
            _ => {
                return Err(CliError::Config(format!(
                    "Cannot set '{}': '{}' is not a section",
                    key, segment
                )));
            }
        };
    }
    current.insert(last.to_string(), value);
    Ok(())
}
