use crate::cli::RunArgs;
use crate::config::defaults::DefaultsConfig;
use crate::config::{AppConfig, build_config};
use crate::error::{CliError, Result};
use crate::utils::display;
use crate::utils::progress::CliProgressHandler;
use reinvent_pilot::core::io::config::write_configuration;
use reinvent_pilot::core::io::transcript::EpochSelection;
use reinvent_pilot::engine::config::validate;
use reinvent_pilot::engine::launcher::CancelFlag;
use reinvent_pilot::engine::progress::ProgressReporter;
use reinvent_pilot::workflows::{self, analyze::SampledSummary, run::RunReport};
use tracing::{info, warn};

pub async fn run(args: RunArgs) -> Result<()> {
    info!("Building run configuration from {:?}", &args.recipe.config);
    let app_config = build_config(&args.recipe, &args.launch)?;
    let selection = args.epochs.selection().map_err(|e| CliError::Argument(e.to_string()))?;
    let top_n = args.top.unwrap_or(DefaultsConfig::default().top_n);

    if args.dry_run {
        return dry_run(&app_config);
    }

    let progress_handler = CliProgressHandler::new();
    let callback = progress_handler.get_callback();
    let cancel = CancelFlag::new();

    println!(
        "Starting {} run in {}...",
        app_config.run_config.run_type(),
        app_config.layout.root().display()
    );
    info!("Invoking the core run workflow...");

    let worker_cancel = cancel.clone();
    let mut handle = tokio::task::spawn_blocking(move || {
        let reporter = ProgressReporter::with_callback(callback);
        let AppConfig {
            run_config,
            layout,
            launcher,
        } = app_config;
        workflows::run::run(&run_config, &layout, &launcher, &reporter, &worker_cancel)
    });

    let joined = tokio::select! {
        joined = &mut handle => joined,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupt received, stopping the external tool...");
            progress_handler.clear();
            cancel.cancel();
            handle.await
        }
    };
    progress_handler.clear();
    let report = joined
        .map_err(|e| CliError::Other(anyhow::anyhow!("Run task failed: {}", e)))??;

    info!(
        "Workflow finished with {} step report(s) and {} table(s).",
        report.transcript.epochs.len(),
        report.tables.len()
    );
    print!("{}", render_report(&report, &selection, top_n));
    Ok(())
}

fn dry_run(app_config: &AppConfig) -> Result<()> {
    let AppConfig {
        run_config,
        layout,
        launcher,
    } = app_config;
    validate(run_config)?;
    layout.prepare()?;
    let config_path = layout.config_path();
    write_configuration(run_config, &config_path).map_err(|e| CliError::FileParsing {
        path: config_path.clone(),
        source: e.into(),
    })?;
    info!(path = %config_path.display(), "Dry run: configuration written, tool not started");

    println!("✓ Configuration written to: {}", config_path.display());
    println!(
        "  command: {}",
        display::format_command_line(&launcher.command_line(&config_path))
    );
    Ok(())
}

fn render_report(
    report: &RunReport,
    selection: &EpochSelection,
    top_n: usize,
) -> String {
    let mut out = String::new();
    out.push_str(&display::format_outcome(&report.outcome));
    out.push('\n');
    out.push_str(&format!("Transcript: {}\n", report.transcript_path.display()));

    if !report.transcript.epochs.is_empty() {
        out.push('\n');
        out.push_str(&display::format_epochs(&report.transcript.select(selection)));
    }
    for loaded in &report.tables {
        let summary = workflows::analyze::summarize(&loaded.table, top_n);
        out.push('\n');
        out.push_str(&display::format_table_summary(&loaded.path, &summary));
    }
    if let Some(sampled) = &report.sampled {
        out.push('\n');
        out.push_str(&display::format_sampled_summary(
            None,
            &SampledSummary::from(sampled),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{EpochArgs, LaunchArgs, RecipeArgs};
    use reinvent_pilot::core::io::config::read_configuration;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn args(recipe: &Path, output_dir: &Path, dry_run: bool) -> RunArgs {
        RunArgs {
            recipe: RecipeArgs {
                config: recipe.to_path_buf(),
                output_dir: Some(output_dir.to_path_buf()),
                ..Default::default()
            },
            launch: LaunchArgs::default(),
            dry_run,
            epochs: EpochArgs::default(),
            top: None,
        }
    }

    #[tokio::test]
    async fn dry_run_writes_configuration_only() {
        let dir = tempdir().unwrap();
        let recipe = dir.path().join("recipe.toml");
        fs::write(
            &recipe,
            "[job]\nrun-type = \"sampling\"\n\n[sampling]\nmodel-path = \"focused.agent\"\n\n[launcher]\npython = \"false\"\n",
        )
        .unwrap();
        let run_dir = dir.path().join("run");

        run(args(&recipe, &run_dir, true)).await.unwrap();

        let config = read_configuration(&run_dir.join("config.json")).unwrap();
        assert_eq!(config.logging.job_name, "reinvent-pilot");
        assert!(!run_dir.join("run.err").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sampling_run_launches_the_tool() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("tool.sh");
        fs::write(
            &script,
            "printf 'CCO\\t20.0\\nCCN\\t22.0\\n' > \"$(dirname \"$1\")/sampled.smi\"\n",
        )
        .unwrap();
        let recipe = dir.path().join("recipe.toml");
        fs::write(
            &recipe,
            format!(
                "[job]\nrun-type = \"sampling\"\n\n[sampling]\nmodel-path = \"focused.agent\"\n\n[launcher]\npython = \"sh\"\nentry-point = '{}'\n",
                script.display()
            ),
        )
        .unwrap();
        let run_dir = dir.path().join("run");

        run(args(&recipe, &run_dir, false)).await.unwrap();

        assert!(run_dir.join("run.err").is_file());
        assert!(run_dir.join("sampled.smi").is_file());
    }
}
