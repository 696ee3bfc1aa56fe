use clap::Parser;
use concord::cli::{commands, Cli, Commands};
use concord::types::config::Config;
use concord::ConcordResult;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ConcordResult<()> {
    let cli = Cli::parse();

    // Load configuration first (no logging yet)
    let config = if cli.config.exists() {
        Config::load(&cli.config).unwrap_or_else(|_| Config::default_config())
    } else {
        Config::load_or_default()
    };

    // CLI flags take precedence over config
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        format!("concord={}", log_level)
            .parse()
            .unwrap_or_else(|_| "concord=info".parse().expect("fallback directive is valid")),
    );

    if config.general.log_format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    tracing::debug!("Configuration loaded from: {}", cli.config.display());

    match cli.command {
        Commands::Init { path } => {
            commands::init(path).await?;
        }
        Commands::Ask { query, json } => {
            commands::ask(&query, json, &config).await?;
        }
        Commands::Classify { query } => {
            commands::classify(&query);
        }
        Commands::Agreement {
            file,
            domain,
            threshold,
        } => {
            commands::agreement(&file, domain.as_deref(), threshold, &config).await?;
        }
        Commands::Predict {
            model,
            query,
            confidence,
            prediction,
        } => {
            commands::predict(&model, &query, confidence, &prediction, &config).await?;
        }
        Commands::Outcome { query, truth } => {
            commands::outcome(&query, &truth, &config).await?;
        }
        Commands::Calibration { model } => {
            commands::calibration(model.as_deref(), &config).await?;
        }
        Commands::Status => {
            commands::status(&config).await?;
        }
        Commands::Config => {
            commands::config_cmd(&cli.config).await?;
        }
        Commands::Doctor => {
            commands::doctor(&config).await?;
        }
        Commands::Version => {
            commands::version();
        }
    }

    Ok(())
}
