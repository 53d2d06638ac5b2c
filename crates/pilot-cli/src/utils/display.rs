use reinvent_pilot::core::io::transcript::EpochSummary;
use reinvent_pilot::engine::launcher::LaunchOutcome;
use reinvent_pilot::workflows::analyze::{SampledSummary, TableSummary};
use std::fmt::Write;
use std::path::Path;

fn score(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v))
}

/// One block per step report: the headline numbers, the best sample and the component
/// means of that step.
pub fn format_epoch(epoch: &EpochSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Step {:>4}  valid {:>6.2}%  score {:.4}  elapsed {:.0}s  left {:.1}s",
        epoch.step, epoch.fraction_valid, epoch.mean_score, epoch.time_elapsed, epoch.time_left
    );
    if let Some(best) = epoch.best_sample() {
        let _ = writeln!(out, "  best  {:.4}  {}", best.score, best.smiles);
    }
    for (name, value) in epoch.component_means() {
        let _ = writeln!(out, "  {:<28} {:.4}", name, value);
    }
    out
}

pub fn format_epochs(epochs: &[&EpochSummary]) -> String {
    if epochs.is_empty() {
        return "No step reports found.\n".to_string();
    }
    epochs.iter().map(|epoch| format_epoch(epoch)).collect()
}

pub fn format_table_summary(path: &Path, summary: &TableSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", path.display());
    let _ = writeln!(
        out,
        "  rows {}  unique SMILES {}  scaffolds {}",
        summary.rows, summary.unique_smiles, summary.unique_scaffolds
    );
    let _ = writeln!(
        out,
        "  mean score {}  max score {}",
        score(summary.mean_score),
        score(summary.max_score)
    );
    if let (Some(first), Some(last)) = (
        summary.rows_per_step.keys().next(),
        summary.rows_per_step.keys().next_back(),
    ) {
        let _ = writeln!(
            out,
            "  steps {}..={} ({} with hits)",
            first,
            last,
            summary.rows_per_step.len()
        );
    }
    if !summary.top.is_empty() {
        let _ = writeln!(out, "  top molecules:");
        for (rank, molecule) in summary.top.iter().enumerate() {
            let _ = writeln!(
                out,
                "    {:>2}. {}  {}",
                rank + 1,
                score(molecule.total_score),
                molecule.smiles
            );
        }
    }
    if !summary.scaffold_buckets.is_empty() {
        let _ = writeln!(out, "  largest scaffold buckets:");
        for (scaffold, count) in &summary.scaffold_buckets {
            let _ = writeln!(out, "    {:>5}  {}", count, scaffold);
        }
    }
    for (name, value) in &summary.component_means {
        let _ = writeln!(out, "  mean {:<28} {:.4}", name, value);
    }
    out
}

pub fn format_sampled_summary(path: Option<&Path>, summary: &SampledSummary) -> String {
    let mut out = String::new();
    if let Some(path) = path {
        let _ = writeln!(out, "{}", path.display());
    }
    let _ = writeln!(
        out,
        "  sampled {}  unique {}  mean NLL {}",
        summary.total,
        summary.unique,
        score(summary.mean_nll)
    );
    out
}

pub fn format_outcome(outcome: &LaunchOutcome) -> String {
    let status = match outcome.exit_code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    };
    let mut line = format!(
        "Tool finished in {:.1}s ({}), {} transcript lines",
        outcome.elapsed.as_secs_f64(),
        status,
        outcome.lines
    );
    if let Some(step) = outcome.last_step {
        let _ = write!(line, ", last step {}", step);
    }
    line
}

/// Joins a command line for display, quoting arguments that contain whitespace.
pub fn format_command_line(parts: &[String]) -> String {
    parts
        .iter()
        .map(|part| {
            if part.is_empty() || part.chars().any(char::is_whitespace) {
                format!("'{}'", part)
            } else {
                part.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reinvent_pilot::core::io::scores::ScoreTable;
    use reinvent_pilot::core::io::traits::ResultFile;
    use reinvent_pilot::core::io::transcript::Transcript;
    use reinvent_pilot::workflows::analyze::summarize;
    use std::path::PathBuf;
    use std::time::Duration;

    const STEP: &str = "\
 Step 3   Fraction valid SMILES: 96.9   Score: 0.4210   Time elapsed: 12   Time left: 140.5
  Agent     Prior     Target     Score     SMILES
 -21.30    -22.10     -10.50     0.3100    CCO
 -19.80    -20.40     -5.20      0.7200    c1ccccc1O
";

    #[test]
    fn epoch_block_names_best_sample() {
        let transcript = Transcript::parse(STEP).unwrap();
        let text = format_epoch(&transcript.epochs[0]);
        assert!(text.starts_with("Step    3"));
        assert!(text.contains("valid  96.90%"));
        assert!(text.contains("best  0.7200  c1ccccc1O"));
    }

    #[test]
    fn empty_selection_says_so() {
        assert_eq!(format_epochs(&[]), "No step reports found.\n");
    }

    #[test]
    fn table_summary_lists_ranked_molecules() {
        let table = ScoreTable::parse_str(
            "Step,Scaffold,SMILES,total_score\n0,c1ccccc1,Cc1ccccc1,0.4\n4,c1ccccc1,CCc1ccccc1,0.8\n",
        )
        .unwrap();
        let summary = summarize(&table, 5);
        let text = format_table_summary(&PathBuf::from("memory.csv"), &summary);
        assert!(text.starts_with("memory.csv\n"));
        assert!(text.contains("rows 2  unique SMILES 2  scaffolds 1"));
        assert!(text.contains("steps 0..=4 (2 with hits)"));
        assert!(text.contains(" 1. 0.8000  CCc1ccccc1"));
        assert!(text.contains("    2  c1ccccc1"));
    }

    #[test]
    fn sampled_summary_without_likelihoods() {
        let summary = SampledSummary {
            total: 3,
            unique: 2,
            mean_nll: None,
        };
        assert_eq!(
            format_sampled_summary(None, &summary),
            "  sampled 3  unique 2  mean NLL n/a\n"
        );
    }

    #[test]
    fn outcome_mentions_signal_termination() {
        let outcome = LaunchOutcome {
            exit_code: None,
            success: false,
            elapsed: Duration::from_millis(2500),
            lines: 7,
            last_step: Some(4),
        };
        assert_eq!(
            format_outcome(&outcome),
            "Tool finished in 2.5s (terminated by signal), 7 transcript lines, last step 4"
        );
    }

    #[test]
    fn command_line_quotes_spaces() {
        let parts = vec!["python".to_string(), "/opt/my tools/input.py".to_string()];
        assert_eq!(
            format_command_line(&parts),
            "python '/opt/my tools/input.py'"
        );
    }
}
