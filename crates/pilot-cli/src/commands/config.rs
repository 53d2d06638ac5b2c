use crate::cli::{ConfigArgs, LaunchArgs};
use crate::config::build_config;
use crate::error::{CliError, Result};
use reinvent_pilot::core::io::config::{to_json_string, write_configuration};
use tracing::info;

pub async fn run(args: ConfigArgs) -> Result<()> {
    info!("Building run configuration from {:?}", &args.recipe.config);
    let app_config = build_config(&args.recipe, &LaunchArgs::default())?;
    let run_config = &app_config.run_config;

    match &args.output {
        Some(path) => {
            write_configuration(run_config, path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })?;
            info!(path = %path.display(), "Configuration written");
            println!(
                "✓ {} configuration written to: {}",
                run_config.run_type(),
                path.display()
            );
        }
        None => {
            let json = to_json_string(run_config).map_err(|e| {
                CliError::Other(anyhow::anyhow!("Failed to serialize configuration: {}", e))
            })?;
            println!("{}", json);
        }
    }
    Ok(())
}
