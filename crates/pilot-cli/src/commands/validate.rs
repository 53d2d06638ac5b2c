use crate::cli::ValidateArgs;
use crate::error::{CliError, Result};
use reinvent_pilot::core::io::config::read_configuration;
use reinvent_pilot::engine::config::validate;
use tracing::info;

pub async fn run(args: ValidateArgs) -> Result<()> {
    info!("Validating run configuration {:?}", &args.config);
    let config = read_configuration(&args.config).map_err(|e| CliError::FileParsing {
        path: args.config.clone(),
        source: e.into(),
    })?;
    validate(&config)?;

    println!(
        "✓ {} is a valid {} configuration (version {}).",
        args.config.display(),
        config.run_type(),
        config.version
    );
    if let Some(function) = config.scoring_function() {
        println!(
            "  scoring function {:?} with {} component(s)",
            function.name,
            function.parameters.len()
        );
    }
    Ok(())
}
