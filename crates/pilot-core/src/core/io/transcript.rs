//! Parser for the console transcript of a run.
//!
//! The external tool logs through a formatter of the shape
//! `HH:MM:SS: module.function +LINE: LEVEL    message`, where a message may span many
//! lines. Reinforcement learning runs emit one record per step whose message starts with
//! a `Step N   Fraction valid SMILES: ...` line, followed by a table of sampled molecules
//! and a per-component score breakdown. This module splits the transcript into records
//! and lifts those step reports into [`EpochSummary`] values.

use super::traits::ResultFile;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::io::{self, BufRead};
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

static RECORD_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^(?:\d{4}-\d{2}-\d{2}\s+)?(?P<time>\d{1,2}:\d{2}:\d{2}(?:[.,]\d+)?):\s+(?P<origin>[\w.<>-]+)\s+\+(?P<line>\d+):\s+(?P<level>DEBUG|INFO|WARNING|ERROR|CRITICAL)\b[ \t]*",
    )
    .expect("record header pattern is valid")
});

static STEP_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Step\s+(?P<step>\d+)\s+Fraction valid SMILES:\s*(?P<valid>\S+)\s+Score:\s*(?P<score>\S+)\s+Time elapsed:\s*(?P<elapsed>\S+)\s+Time left:\s*(?P<left>\S+)",
    )
    .expect("step header pattern is valid")
});

static SAMPLE_TABLE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*Agent\s+Prior\s+Target\s+Score\s+SMILES\s*$")
        .expect("sample table pattern is valid")
});

static COLUMN_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("column separator pattern is valid"));

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed step report (step {step}): invalid {field} value '{value}'")]
    InvalidNumber {
        step: String,
        field: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: String,
    pub origin: String,
    pub line: u32,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub agent: f64,
    pub prior: f64,
    pub target: f64,
    pub score: f64,
    pub smiles: String,
}

/// One reinforcement learning step as reported in the transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    pub step: usize,
    pub fraction_valid: f64,
    pub mean_score: f64,
    pub time_elapsed: f64,
    pub time_left: f64,
    pub samples: Vec<SampleRow>,
    pub component_names: Vec<String>,
    pub component_scores: Vec<Vec<f64>>,
    /// The report exactly as printed, from the `Step` line on.
    pub text: String,
}

impl EpochSummary {
    /// Mean of each breakdown column, paired with its component name.
    pub fn component_means(&self) -> Vec<(&str, f64)> {
        if self.component_scores.is_empty() {
            return Vec::new();
        }
        let n = self.component_scores.len() as f64;
        self.component_names
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let sum: f64 = self.component_scores.iter().map(|row| row[col]).sum();
                (name.as_str(), sum / n)
            })
            .collect()
    }

    pub fn best_sample(&self) -> Option<&SampleRow> {
        self.samples
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// Which step reports to pick for display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EpochSelection {
    #[default]
    All,
    /// Zero-based positions in transcript order.
    Positions(Vec<usize>),
    /// Step numbers as printed by the tool.
    Steps(Vec<usize>),
    Every(usize),
    Last(usize),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub records: Vec<LogRecord>,
    pub epochs: Vec<EpochSummary>,
}

impl Transcript {
    pub fn parse(text: &str) -> Result<Self, TranscriptError> {
        let records = split_records(text);

        let mut epochs = Vec::new();
        if records.is_empty() {
            parse_epochs_into(text, &mut epochs)?;
        } else {
            for record in &records {
                parse_epochs_into(&record.message, &mut epochs)?;
            }
        }

        Ok(Self { records, epochs })
    }

    pub fn last_epoch(&self) -> Option<&EpochSummary> {
        self.epochs.last()
    }

    pub fn problems(&self) -> impl Iterator<Item = &LogRecord> {
        self.records
            .iter()
            .filter(|record| record.level >= LogLevel::Warning)
    }

    pub fn select(&self, selection: &EpochSelection) -> Vec<&EpochSummary> {
        match selection {
            EpochSelection::All | EpochSelection::Every(0) => self.epochs.iter().collect(),
            EpochSelection::Positions(positions) => positions
                .iter()
                .filter_map(|&i| self.epochs.get(i))
                .collect(),
            EpochSelection::Steps(steps) => {
                let wanted: HashSet<usize> = steps.iter().copied().collect();
                self.epochs
                    .iter()
                    .filter(|epoch| wanted.contains(&epoch.step))
                    .collect()
            }
            EpochSelection::Every(n) => self.epochs.iter().step_by(*n).collect(),
            EpochSelection::Last(n) => {
                let skip = self.epochs.len().saturating_sub(*n);
                self.epochs.iter().skip(skip).collect()
            }
        }
    }
}

impl ResultFile for Transcript {
    type Error = TranscriptError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::parse(&String::from_utf8_lossy(&bytes))
    }
}

/// Step number announced by a single transcript line, if it carries a step header.
pub fn step_in_line(line: &str) -> Option<usize> {
    STEP_HEADER
        .captures(line)
        .and_then(|caps| caps["step"].parse().ok())
}

fn split_records(text: &str) -> Vec<LogRecord> {
    let headers: Vec<_> = RECORD_HEADER.captures_iter(text).collect();
    headers
        .iter()
        .enumerate()
        .map(|(i, caps)| {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            let end = headers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            LogRecord {
                timestamp: caps["time"].to_string(),
                origin: caps["origin"].to_string(),
                line: caps["line"].parse().unwrap_or_default(),
                level: caps["level"].parse().unwrap_or(LogLevel::Info),
                message: text[whole.end..end].trim_end().to_string(),
            }
        })
        .collect()
}

fn parse_epochs_into(text: &str, epochs: &mut Vec<EpochSummary>) -> Result<(), TranscriptError> {
    let headers: Vec<_> = STEP_HEADER.captures_iter(text).collect();
    for (i, caps) in headers.iter().enumerate() {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let end = headers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        epochs.push(parse_epoch(
            caps,
            &text[whole.start()..end],
            &text[whole.end()..end],
        )?);
    }
    Ok(())
}

fn parse_number(caps: &regex::Captures<'_>, field: &'static str) -> Result<f64, TranscriptError> {
    let value = &caps[field];
    value.parse().map_err(|_| TranscriptError::InvalidNumber {
        step: caps["step"].to_string(),
        field,
        value: value.to_string(),
    })
}

fn numeric_row(line: &str) -> Option<Vec<f64>> {
    let values: Result<Vec<f64>, _> = line.split_whitespace().map(str::parse).collect();
    values.ok().filter(|v| !v.is_empty())
}

fn sample_row(line: &str) -> Option<SampleRow> {
    let mut tokens = line.split_whitespace();
    let mut next_number = || tokens.next().and_then(|t| t.parse::<f64>().ok());
    let (agent, prior, target, score) = (next_number()?, next_number()?, next_number()?, next_number()?);
    let smiles = tokens.collect::<Vec<_>>().join(" ");
    if smiles.is_empty() {
        return None;
    }
    Some(SampleRow {
        agent,
        prior,
        target,
        score,
        smiles,
    })
}

enum Section {
    Preamble,
    Samples,
    Components,
}

fn parse_epoch(
    caps: &regex::Captures<'_>,
    report: &str,
    body: &str,
) -> Result<EpochSummary, TranscriptError> {
    let step = caps["step"]
        .parse()
        .map_err(|_| TranscriptError::InvalidNumber {
            step: caps["step"].to_string(),
            field: "step",
            value: caps["step"].to_string(),
        })?;

    let mut summary = EpochSummary {
        step,
        fraction_valid: parse_number(caps, "valid")?,
        mean_score: parse_number(caps, "score")?,
        time_elapsed: parse_number(caps, "elapsed")?,
        time_left: parse_number(caps, "left")?,
        samples: Vec::new(),
        component_names: Vec::new(),
        component_scores: Vec::new(),
        text: report.trim_end().to_string(),
    };

    let mut section = Section::Preamble;
    for line in body.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match section {
            Section::Preamble | Section::Samples if SAMPLE_TABLE_HEADER.is_match(line) => {
                section = Section::Samples;
            }
            Section::Samples if sample_row(line).is_some() => {
                summary.samples.extend(sample_row(line));
            }
            Section::Preamble | Section::Samples => {
                if numeric_row(line).is_some() {
                    continue;
                }
                summary.component_names = COLUMN_SEPARATOR
                    .split(line.trim())
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect();
                section = Section::Components;
            }
            Section::Components => match numeric_row(line) {
                Some(row) if row.len() == summary.component_names.len() => {
                    summary.component_scores.push(row);
                }
                Some(row) => {
                    warn!(
                        step = summary.step,
                        expected = summary.component_names.len(),
                        found = row.len(),
                        "Skipping component breakdown row with unexpected width."
                    );
                }
                None => break,
            },
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = "\
12:00:01: base_running_mode.run +52: INFO     Starting reinforcement learning
12:00:05: local_reinforcement_logger.timestep_report +41: INFO
 Step 0   Fraction valid SMILES: 99.2   Score: 0.1872   Time elapsed: 0   Time left: 0.0
  Agent     Prior     Target     Score     SMILES
-28.21    -28.21    -10.92     0.27      CCOc1ccccc1
-31.02    -31.02    -22.10     0.14      CC(=O)Nc1ccc(O)cc1

Matching substructure   QED Score   raw_QED Score
0.5   0.6   0.6
1.0   0.3   0.3

12:00:09: local_reinforcement_logger.timestep_report +41: INFO
 Step 1   Fraction valid SMILES: 97.7   Score: 0.3251   Time elapsed: 4   Time left: 394.7
  Agent     Prior     Target     Score     SMILES
-24.90    -24.90    -9.58      0.48      c1ccc2[nH]ccc2c1
12:00:10: scoring_function.compute +88: WARNING  RDKit could not parse 'C1CC'
12:00:13: local_reinforcement_logger.timestep_report +41: INFO
 Step 2   Fraction valid SMILES: 98.4   Score: 0.4100   Time elapsed: 8   Time left: 390.1
";

    #[test]
    fn records_are_split_on_headers() {
        let transcript = Transcript::parse(TRANSCRIPT).unwrap();
        assert_eq!(transcript.records.len(), 5);
        let first = &transcript.records[0];
        assert_eq!(first.timestamp, "12:00:01");
        assert_eq!(first.origin, "base_running_mode.run");
        assert_eq!(first.line, 52);
        assert_eq!(first.level, LogLevel::Info);
        assert_eq!(first.message, "Starting reinforcement learning");
    }

    #[test]
    fn every_step_report_becomes_an_epoch_including_the_last() {
        let transcript = Transcript::parse(TRANSCRIPT).unwrap();
        let steps: Vec<_> = transcript.epochs.iter().map(|e| e.step).collect();
        assert_eq!(steps, vec![0, 1, 2]);
        let last = transcript.last_epoch().unwrap();
        assert_eq!(last.mean_score, 0.41);
        assert_eq!(last.time_left, 390.1);
    }

    #[test]
    fn step_report_tables_are_parsed() {
        let transcript = Transcript::parse(TRANSCRIPT).unwrap();
        let first = &transcript.epochs[0];
        assert_eq!(first.fraction_valid, 99.2);
        assert_eq!(first.samples.len(), 2);
        assert_eq!(first.samples[1].smiles, "CC(=O)Nc1ccc(O)cc1");
        assert_eq!(first.samples[0].target, -10.92);
        assert_eq!(
            first.component_names,
            vec!["Matching substructure", "QED Score", "raw_QED Score"]
        );
        assert_eq!(first.component_scores, vec![vec![0.5, 0.6, 0.6], vec![1.0, 0.3, 0.3]]);

        let means = first.component_means();
        assert_eq!(means[0], ("Matching substructure", 0.75));
        assert_eq!(first.best_sample().unwrap().smiles, "CCOc1ccccc1");
        assert!(first.text.starts_with("Step 0"));
        assert!(!first.text.contains("12:00:09"));
    }

    #[test]
    fn warnings_are_exposed_as_problems() {
        let transcript = Transcript::parse(TRANSCRIPT).unwrap();
        let problems: Vec<_> = transcript.problems().collect();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].message.contains("RDKit"));
    }

    #[test]
    fn plain_output_without_record_headers_is_split_at_steps() {
        let text = "\
 Step 0   Fraction valid SMILES: 90.0   Score: 0.1000   Time elapsed: 1   Time left: 9.0
 Step 1   Fraction valid SMILES: 91.0   Score: 0.2000   Time elapsed: 2   Time left: 8.0
";
        let transcript = Transcript::parse_str(text).unwrap();
        assert!(transcript.records.is_empty());
        assert_eq!(transcript.epochs.len(), 2);
        assert_eq!(transcript.epochs[1].fraction_valid, 91.0);
    }

    #[test]
    fn unparsable_numbers_are_reported() {
        let text = " Step 3   Fraction valid SMILES: 9x.1   Score: 0.1   Time elapsed: 1   Time left: 2";
        let err = Transcript::parse(text).unwrap_err();
        match err {
            TranscriptError::InvalidNumber { step, field, value } => {
                assert_eq!(step, "3");
                assert_eq!(field, "valid");
                assert_eq!(value, "9x.1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn selection_modes() {
        let transcript = Transcript::parse(TRANSCRIPT).unwrap();
        let steps = |sel: EpochSelection| -> Vec<usize> {
            transcript.select(&sel).iter().map(|e| e.step).collect()
        };
        assert_eq!(steps(EpochSelection::All), vec![0, 1, 2]);
        assert_eq!(steps(EpochSelection::Positions(vec![2, 0, 9])), vec![2, 0]);
        assert_eq!(steps(EpochSelection::Steps(vec![1])), vec![1]);
        assert_eq!(steps(EpochSelection::Every(2)), vec![0, 2]);
        assert_eq!(steps(EpochSelection::Last(2)), vec![1, 2]);
        assert_eq!(steps(EpochSelection::Last(10)), vec![0, 1, 2]);
    }

    #[test]
    fn step_in_line_detects_headers_only() {
        assert_eq!(
            step_in_line(" Step 17   Fraction valid SMILES: 98.0   Score: 0.5   Time elapsed: 3   Time left: 4.0"),
            Some(17)
        );
        assert_eq!(step_in_line("Step 17 of the manual"), None);
    }
}
