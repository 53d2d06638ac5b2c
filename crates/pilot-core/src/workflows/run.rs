use crate::core::io::config::write_configuration;
use crate::core::io::scores::ScoreTable;
use crate::core::io::smiles::SampledSmiles;
use crate::core::io::traits::ResultFile;
use crate::core::io::transcript::Transcript;
use crate::core::models::run::{Parameters, RunConfiguration, RunType};
use crate::engine::config::validate;
use crate::engine::error::EngineError;
use crate::engine::launcher::{CancelFlag, LaunchOutcome, Launcher};
use crate::engine::layout::{MEMORY_FILE, RunLayout, SCAFFOLD_MEMORY_FILE};
use crate::engine::progress::{Progress, ProgressReporter};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Lines of transcript quoted back when the tool exits with an error.
const FAILURE_TAIL_LINES: usize = 20;

const SCORED_SMILES_FILE: &str = "scored_smiles.csv";

#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub path: PathBuf,
    pub table: ScoreTable,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_type: RunType,
    pub config_path: PathBuf,
    pub transcript_path: PathBuf,
    pub outcome: LaunchOutcome,
    pub transcript: Transcript,
    /// Score tables found after the run, in the order they were looked for.
    pub tables: Vec<LoadedTable>,
    pub sampled: Option<SampledSmiles>,
}

impl RunReport {
    pub fn table(&self, file_name: &str) -> Option<&ScoreTable> {
        self.tables
            .iter()
            .find(|t| t.path.file_name().is_some_and(|name| name == file_name))
            .map(|t| &t.table)
    }
}

/// Validates `config`, writes it into `layout`, runs the tool and gathers what it
/// produced.
#[instrument(skip_all, name = "run_workflow", fields(job = %config.logging.job_name))]
pub fn run(
    config: &RunConfiguration,
    layout: &RunLayout,
    launcher: &Launcher,
    reporter: &ProgressReporter,
    cancel: &CancelFlag,
) -> Result<RunReport, EngineError> {
    // === Phase 1: Validation and preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    validate(config)?;
    layout.prepare()?;
    let config_path = layout.config_path();
    write_configuration(config, &config_path)?;
    info!(path = %config_path.display(), run_type = %config.run_type(), "Configuration written");
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: External tool ===
    reporter.report(Progress::PhaseStart { name: "Running" });
    let transcript_path = layout.transcript_path();
    let outcome = {
        let file = File::create(&transcript_path).map_err(EngineError::io(&transcript_path))?;
        let mut writer = BufWriter::new(file);
        if let Some(total_steps) = expected_steps(config) {
            reporter.report(Progress::TaskStart { total_steps });
        }
        let outcome = launcher.launch(&config_path, &mut writer, reporter, cancel);
        reporter.report(Progress::TaskFinish);
        outcome?
    };
    reporter.report(Progress::PhaseFinish);

    if !outcome.success {
        let tail = transcript_tail(&transcript_path, FAILURE_TAIL_LINES)?;
        return Err(EngineError::ProcessFailed {
            code: outcome.exit_code,
            tail,
        });
    }
    info!(
        elapsed_secs = outcome.elapsed.as_secs_f64(),
        lines = outcome.lines,
        "External tool finished successfully"
    );

    // === Phase 3: Collect results ===
    reporter.report(Progress::PhaseStart {
        name: "Collecting results",
    });
    let transcript = match Transcript::read_from_path(&transcript_path) {
        Ok(transcript) => transcript,
        Err(e) => {
            warn!(error = %e, "Transcript could not be parsed, continuing without step reports");
            Transcript::default()
        }
    };
    for record in transcript.problems() {
        warn!(origin = %record.origin, level = %record.level, "{}", record.message.trim());
    }

    let mut tables = Vec::new();
    for path in expected_tables(config, layout, launcher) {
        if let Some(table) = load_optional(&path, |p| ScoreTable::read_from_path(p), |source| {
            EngineError::ScoreTable {
                path: path.clone(),
                source,
            }
        })? {
            tables.push(LoadedTable { path, table });
        }
    }

    let sampled = match &config.parameters {
        Parameters::Sampling(params) => {
            let path = &launcher.resolve(&params.output_smiles_path);
            load_optional(path, |p| SampledSmiles::read_from_path(p), |source| {
                EngineError::Smiles {
                    path: path.clone(),
                    source,
                }
            })?
        }
        _ => None,
    };
    reporter.report(Progress::PhaseFinish);

    info!(
        epochs = transcript.epochs.len(),
        tables = tables.len(),
        "Run complete"
    );
    Ok(RunReport {
        run_type: config.run_type(),
        config_path,
        transcript_path,
        outcome,
        transcript,
        tables,
        sampled,
    })
}

fn expected_steps(config: &RunConfiguration) -> Option<u64> {
    match &config.parameters {
        Parameters::ReinforcementLearning(params) => {
            Some(params.reinforcement_learning.n_steps as u64)
        }
        Parameters::TransferLearning(params) => Some(params.num_epochs as u64),
        _ => None,
    }
}

fn expected_tables(
    config: &RunConfiguration,
    layout: &RunLayout,
    launcher: &Launcher,
) -> Vec<PathBuf> {
    let paths = match &config.parameters {
        Parameters::ReinforcementLearning(_) => {
            let folder = config
                .logging
                .result_folder
                .clone()
                .unwrap_or_else(|| layout.result_folder());
            vec![
                folder.join(SCAFFOLD_MEMORY_FILE),
                folder.join(MEMORY_FILE),
            ]
        }
        // Scoring runs treat the logging path as a folder for their output table.
        Parameters::Scoring(_) => vec![config.logging.logging_path.join(SCORED_SMILES_FILE)],
        _ => Vec::new(),
    };
    paths.iter().map(|path| launcher.resolve(path)).collect()
}

fn load_optional<T, E>(
    path: &Path,
    read: impl FnOnce(&Path) -> Result<T, E>,
    wrap: impl FnOnce(E) -> EngineError,
) -> Result<Option<T>, EngineError> {
    if !path.is_file() {
        warn!(path = %path.display(), "Expected output not found, skipping");
        return Ok(None);
    }
    read(path).map(Some).map_err(wrap)
}

fn transcript_tail(path: &Path, lines: usize) -> Result<String, EngineError> {
    let bytes = fs::read(path).map_err(EngineError::io(path))?;
    let text = String::from_utf8_lossy(&bytes);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    Ok(all[start..].join("\n"))
}
