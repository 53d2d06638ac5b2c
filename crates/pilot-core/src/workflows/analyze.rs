use crate::core::io::scores::{ScoreTable, ScoredMolecule};
use crate::core::io::smiles::SampledSmiles;
use crate::core::io::traits::ResultFile;
use crate::core::io::transcript::Transcript;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// What to read. Every input is optional; an empty request yields an empty analysis.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub transcript: Option<PathBuf>,
    pub tables: Vec<PathBuf>,
    pub sampled: Option<PathBuf>,
    pub top_n: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub rows: usize,
    pub unique_smiles: usize,
    pub unique_scaffolds: usize,
    pub mean_score: Option<f64>,
    pub max_score: Option<f64>,
    pub top: Vec<ScoredMolecule>,
    /// Largest scaffold buckets, biggest first.
    pub scaffold_buckets: Vec<(String, usize)>,
    pub rows_per_step: BTreeMap<usize, usize>,
    /// Mean of each component column over the rows that carry it.
    pub component_means: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampledSummary {
    pub total: usize,
    pub unique: usize,
    pub mean_nll: Option<f64>,
}

impl From<&SampledSmiles> for SampledSummary {
    fn from(sampled: &SampledSmiles) -> Self {
        Self {
            total: sampled.len(),
            unique: sampled.unique(),
            mean_nll: sampled.mean_nll(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub transcript: Option<Transcript>,
    pub tables: Vec<(PathBuf, TableSummary)>,
    pub sampled: Option<SampledSummary>,
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn summarize(table: &ScoreTable, top_n: usize) -> TableSummary {
    let scores = || table.molecules.iter().filter_map(|m| m.total_score);

    let mut buckets: HashMap<&str, usize> = HashMap::new();
    let mut rows_per_step: BTreeMap<usize, usize> = BTreeMap::new();
    for molecule in &table.molecules {
        if let Some(scaffold) = molecule.scaffold.as_deref() {
            *buckets.entry(scaffold).or_default() += 1;
        }
        if let Some(step) = molecule.step {
            *rows_per_step.entry(step).or_default() += 1;
        }
    }
    let unique_scaffolds = buckets.len();
    let mut scaffold_buckets: Vec<(String, usize)> = buckets
        .into_iter()
        .map(|(scaffold, count)| (scaffold.to_string(), count))
        .collect();
    scaffold_buckets.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scaffold_buckets.truncate(top_n);

    let component_means = table
        .component_names
        .iter()
        .filter_map(|name| {
            mean(
                table
                    .molecules
                    .iter()
                    .filter_map(|m| m.components.get(name).copied()),
            )
            .map(|value| (name.clone(), value))
        })
        .collect();

    TableSummary {
        rows: table.len(),
        unique_smiles: table.unique_smiles(),
        unique_scaffolds,
        mean_score: mean(scores()),
        max_score: scores().reduce(f64::max),
        top: table.top(top_n).into_iter().cloned().collect(),
        scaffold_buckets,
        rows_per_step,
        component_means,
    }
}

/// Reads and summarizes the outputs named in `request`.
#[instrument(skip_all, name = "analyze_workflow")]
pub fn analyze(
    request: &AnalysisRequest,
    reporter: &ProgressReporter,
) -> Result<Analysis, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Analysis" });
    let inputs = request.tables.len()
        + usize::from(request.transcript.is_some())
        + usize::from(request.sampled.is_some());
    reporter.report(Progress::TaskStart {
        total_steps: inputs as u64,
    });

    let mut analysis = Analysis::default();

    if let Some(path) = &request.transcript {
        let transcript = Transcript::read_from_path(path)?;
        info!(
            path = %path.display(),
            records = transcript.records.len(),
            epochs = transcript.epochs.len(),
            "Transcript parsed"
        );
        analysis.transcript = Some(transcript);
        reporter.report(Progress::TaskIncrement);
    }

    for path in &request.tables {
        let table = read_table(path)?;
        info!(path = %path.display(), rows = table.len(), "Score table read");
        analysis
            .tables
            .push((path.clone(), summarize(&table, request.top_n)));
        reporter.report(Progress::TaskIncrement);
    }

    if let Some(path) = &request.sampled {
        let sampled =
            SampledSmiles::read_from_path(path).map_err(|source| EngineError::Smiles {
                path: path.clone(),
                source,
            })?;
        analysis.sampled = Some(SampledSummary::from(&sampled));
        reporter.report(Progress::TaskIncrement);
    }

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    Ok(analysis)
}

fn read_table(path: &Path) -> Result<ScoreTable, EngineError> {
    ScoreTable::read_from_path(path).map_err(|source| EngineError::ScoreTable {
        path: path.to_path_buf(),
        source,
    })
}

/// Scaffolds seen in more than one table, for comparing runs.
pub fn shared_scaffolds<'a>(tables: impl IntoIterator<Item = &'a ScoreTable>) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for table in tables {
        let scaffolds: HashSet<&str> = table
            .molecules
            .iter()
            .filter_map(|m| m.scaffold.as_deref())
            .collect();
        for scaffold in scaffolds {
            *counts.entry(scaffold).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(s, _)| s.to_string())
        .collect()
}
