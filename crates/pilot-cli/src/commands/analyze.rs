use crate::cli::AnalyzeArgs;
use crate::error::{CliError, Result};
use crate::utils::display;
use crate::utils::progress::CliProgressHandler;
use reinvent_pilot::core::io::transcript::EpochSelection;
use reinvent_pilot::engine::progress::ProgressReporter;
use reinvent_pilot::workflows::analyze::{self, Analysis, AnalysisRequest};
use tracing::info;

pub async fn run(args: AnalyzeArgs) -> Result<()> {
    if args.transcript.is_none() && args.tables.is_empty() && args.sampled.is_none() {
        return Err(CliError::Argument(
            "nothing to analyze; pass --transcript, --table or --sampled".to_string(),
        ));
    }
    let selection = args
        .epochs
        .selection()
        .map_err(|e| CliError::Argument(e.to_string()))?;

    let request = AnalysisRequest {
        transcript: args.transcript,
        tables: args.tables,
        sampled: args.sampled,
        top_n: args.top,
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    info!("Invoking the core analysis workflow...");
    let analysis = tokio::task::block_in_place(|| analyze::analyze(&request, &reporter))?;
    progress_handler.clear();

    print!("{}", render_analysis(&analysis, &request, &selection));
    Ok(())
}

fn render_analysis(
    analysis: &Analysis,
    request: &AnalysisRequest,
    selection: &EpochSelection,
) -> String {
    let mut sections = Vec::new();
    if let Some(transcript) = &analysis.transcript {
        let mut text = display::format_epochs(&transcript.select(selection));
        let problems = transcript.problems().count();
        if problems > 0 {
            text.push_str(&format!("{} warning(s) or error(s) logged by the tool\n", problems));
        }
        sections.push(text);
    }
    for (path, summary) in &analysis.tables {
        sections.push(display::format_table_summary(path, summary));
    }
    if let Some(summary) = &analysis.sampled {
        sections.push(display::format_sampled_summary(
            request.sampled.as_deref(),
            summary,
        ));
    }
    sections.join("\n")
}
