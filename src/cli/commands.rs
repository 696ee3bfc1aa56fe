//! Implementation of Concord CLI commands.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::calibration::CalibrationTracker;
use crate::consensus::{Domain, PreferenceAggregator, RankingAggregator};
use crate::council::{scores_by_model, Council, CouncilContext, CouncilOutcome, OutcomeStatus};
use crate::executors::{CommandClient, ModelClient};
use crate::types::config::{Config, CONFIG_FILE};
use crate::types::RankingSubmission;
use crate::{ConcordError, ConcordResult};

/// Initializes configuration in the specified directory.
pub async fn init(path: Option<PathBuf>) -> ConcordResult<()> {
    let target_dir = path.unwrap_or_else(|| PathBuf::from("."));

    if !target_dir.exists() {
        std::fs::create_dir_all(&target_dir)?;
        tracing::info!("Directory created: {}", target_dir.display());
    }

    let config_path = target_dir.join(CONFIG_FILE);

    if config_path.exists() {
        println!("Configuration already exists at: {}", config_path.display());
        println!("Use 'concord config' to modify.");
        return Ok(());
    }

    let data_dir = target_dir.join(".concord");
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!(".concord/ directory created");
    }

    update_gitignore(&target_dir)?;

    let config = Config::default_config();
    config.save(&config_path)?;

    println!("Concord initialized successfully!");
    println!("Configuration created at: {}", config_path.display());
    println!("Data directory: .concord/");
    println!();
    println!("Next steps:");
    println!("  1. Set your council models and client command in {}", CONFIG_FILE);
    println!("  2. Check the client is installed: concord status");
    println!("  3. Ask something: concord ask \"What is the capital of Australia?\"");

    Ok(())
}

/// Updates or creates .gitignore to include .concord/
fn update_gitignore(target_dir: &Path) -> ConcordResult<()> {
    let gitignore_path = target_dir.join(".gitignore");
    let entry = ".concord/";
    let comment = "# Concord - local calibration database";

    if gitignore_path.exists() {
        let content = std::fs::read_to_string(&gitignore_path)?;

        if content
            .lines()
            .any(|line| line.trim() == entry || line.trim() == ".concord")
        {
            tracing::debug!(".gitignore already contains .concord/");
            return Ok(());
        }

        let mut new_content = content.trim_end().to_string();
        if !new_content.is_empty() {
            new_content.push_str("\n\n");
        }
        new_content.push_str(comment);
        new_content.push('\n');
        new_content.push_str(entry);
        new_content.push('\n');

        std::fs::write(&gitignore_path, new_content)?;
        println!(".gitignore updated with .concord/");
    } else {
        std::fs::write(&gitignore_path, format!("{}\n{}\n", comment, entry))?;
        println!(".gitignore created with .concord/");
    }

    Ok(())
}

/// Runs a query through the council.
pub async fn ask(query: &str, json: bool, config: &Config) -> ConcordResult<()> {
    config.validate()?;

    let client: Arc<dyn ModelClient> = Arc::new(CommandClient::from_config(&config.client));
    let context = CouncilContext::from_config(config)?;
    let council = Council::new(config.clone(), client, context);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Asking {} models...", council.models().len()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = council.run(query).await;
    spinner.finish_and_clear();
    let outcome = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    Ok(())
}

fn print_outcome(outcome: &CouncilOutcome) {
    println!("Domain: {}", outcome.domain);
    println!(
        "Responses: {}/{}",
        outcome.metrics.models_succeeded, outcome.metrics.models_queried
    );
    if !outcome.failed_models.is_empty() {
        println!("Failed: {}", outcome.failed_models.join(", "));
    }
    if !outcome.skipped_models.is_empty() {
        println!("Skipped (circuit open): {}", outcome.skipped_models.join(", "));
    }
    if outcome.metrics.total_cost > 0.0 {
        println!("Cost: ${:.4}", outcome.metrics.total_cost);
    }

    match outcome.status {
        OutcomeStatus::NoResponses => {
            println!("\nNo model answered. Run 'concord doctor' to check the client.");
            return;
        }
        OutcomeStatus::TimedOut => {
            println!("\nThe council did not finish in time.");
            return;
        }
        OutcomeStatus::Completed => {}
    }

    println!("Agreement (Kendall's W): {:.3}", outcome.agreement_score);
    if let Some(disagreement) = &outcome.disagreement {
        println!("{}", disagreement.recommendation);
    }

    if !outcome.aggregate.is_empty() {
        println!("\nRanking:");
        print!("{}", RankingAggregator::format_scores(&outcome.aggregate));
    }

    if let Some(bt) = &outcome.bradley_terry {
        println!("\nPairwise (Bradley–Terry):");
        for (model, score) in scores_by_model(bt, &outcome.label_to_model) {
            println!("  {} {:.3}", model, score);
        }
    }

    if !outcome.contested_claims.is_empty() {
        println!("\nContested claims:");
        for claim in &outcome.contested_claims {
            println!(
                "  ? {} (for: {}; against: {})",
                claim.claim,
                claim.supporting.join(", "),
                claim.contradicting.join(", ")
            );
        }
    }

    if let Some(answer) = outcome.final_answer() {
        println!("\n{}", "=".repeat(50));
        println!("{}", answer);
    }
}

/// Prints the detected domain of a query.
pub fn classify(query: &str) {
    println!("{}", crate::consensus::classify_domain(query));
}

/// Measures agreement over a file of ranking submissions.
pub async fn agreement(
    file: &Path,
    domain: Option<&str>,
    threshold: Option<f64>,
    config: &Config,
) -> ConcordResult<()> {
    let content = std::fs::read_to_string(file)?;
    let rankings: Vec<RankingSubmission> = serde_json::from_str(&content)?;

    let domain = match domain {
        Some(name) => name.parse::<Domain>()?,
        None => Domain::default(),
    };

    let mut aggregation = config.aggregation.clone();
    if let Some(threshold) = threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConcordError::config("threshold must be within [0, 1]"));
        }
        aggregation.disagreement_threshold = threshold;
    }
    let aggregator = PreferenceAggregator::new(aggregation);

    // Labels in the file are shown as-is.
    let labels: HashMap<String, String> = HashMap::new();
    let report = aggregator.evaluate(&rankings, &labels, domain);

    println!("Judges: {}", rankings.len());
    println!("Domain: {}", report.domain);
    println!("Kendall's W: {:.3}", report.agreement_score);
    println!(
        "Consensus: {}",
        if report.disagreement.has_consensus {
            "yes"
        } else {
            "no"
        }
    );
    for faction in &report.disagreement.factions {
        println!("  {} <- {}", faction.position, faction.members.join(", "));
    }
    println!("{}", report.disagreement.recommendation);

    if !report.scores.is_empty() {
        println!("\nRanking:");
        print!("{}", RankingAggregator::format_scores(&report.scores));
    }

    Ok(())
}

fn open_tracker(config: &Config) -> ConcordResult<CalibrationTracker> {
    if !config.calibration.enabled {
        return Err(ConcordError::config(
            "calibration is disabled in the configuration",
        ));
    }
    CalibrationTracker::from_config(&config.calibration)
}

/// Records a prediction by hand.
pub async fn predict(
    model: &str,
    query: &str,
    confidence: f64,
    prediction: &str,
    config: &Config,
) -> ConcordResult<()> {
    let tracker = open_tracker(config)?;
    tracker.record_prediction(model, query, confidence, prediction)?;
    println!(
        "Prediction recorded for {} (query {})",
        model,
        CalibrationTracker::query_hash(query)
    );
    Ok(())
}

/// Records the true answer for a query.
pub async fn outcome(query: &str, truth: &str, config: &Config) -> ConcordResult<()> {
    let tracker = open_tracker(config)?;
    let graded = tracker.record_outcome(query, truth)?;
    println!("Graded {} prediction(s)", graded);
    Ok(())
}

/// Shows calibration curves.
pub async fn calibration(model: Option<&str>, config: &Config) -> ConcordResult<()> {
    let tracker = open_tracker(config)?;

    let curves = match model {
        Some(model) => vec![tracker.get_calibration_curve(model)?],
        None => tracker
            .get_all_models_calibration()?
            .into_values()
            .collect(),
    };

    if curves.is_empty() {
        println!("No predictions recorded yet.");
        return Ok(());
    }

    for curve in curves {
        println!("{}", curve.model);
        println!("  graded predictions: {}", curve.total_predictions);
        match curve.brier_score {
            Some(brier) => println!("  Brier score: {:.4}", brier),
            None => println!("  Brier score: n/a"),
        }
        for (bucket, accuracy) in &curve.buckets {
            println!("  confidence {} -> accuracy {:.0}%", bucket, accuracy * 100.0);
        }
    }

    Ok(())
}

/// Shows whether the model client is installed.
pub async fn status(config: &Config) -> ConcordResult<()> {
    println!("Checking model client...\n");

    let client = CommandClient::from_config(&config.client);
    if client.is_available().await {
        println!("  ✓ {} - available", client.command());
        if let Ok(version) = client.version().await {
            println!("      version: {}", version);
        }
    } else {
        println!("  ✗ {} - not found", client.command());
    }

    println!();
    println!("Council ({} models):", config.council.models.len());
    for model in &config.council.models {
        let marker = if *model == config.council.chairman {
            " (chairman)"
        } else {
            ""
        };
        println!("  - {}{}", model, marker);
    }

    Ok(())
}

/// Configures options interactively.
pub async fn config_cmd(config_path: &Path) -> ConcordResult<()> {
    use super::interactive::{run_interactive_config, show_config_summary};

    if config_path.exists() {
        let config = Config::load(config_path)?;
        show_config_summary(&config);
    }

    run_interactive_config(config_path)
}

/// Diagnoses configuration problems.
pub async fn doctor(config: &Config) -> ConcordResult<()> {
    println!("Diagnosing Concord configuration...\n");

    let mut issues: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    match config.validate() {
        Ok(()) => println!("✓ Configuration is valid"),
        Err(e) => issues.push(e.to_string()),
    }

    let client = CommandClient::from_config(&config.client);
    if client.is_available().await {
        println!("✓ Client is available (command: {})", client.command());
    } else {
        issues.push(format!(
            "Client is not installed (expected command: {})",
            client.command()
        ));
    }

    if config.council.models.len() < config.dispatch.min_required {
        warnings.push(format!(
            "Council has {} models but quorum requires {}",
            config.council.models.len(),
            config.dispatch.min_required
        ));
    }
    if !config.council.models.contains(&config.council.chairman) {
        warnings.push(format!(
            "Chairman '{}' is not a council member",
            config.council.chairman
        ));
    }
    if config.council.models.len() < 2 {
        warnings.push("Agreement needs at least two judges".to_string());
    }

    println!();
    if issues.is_empty() && warnings.is_empty() {
        println!("✓ All good! Concord is ready to use.");
    } else {
        if !warnings.is_empty() {
            println!("Warnings:");
            for warning in warnings {
                println!("  ⚠ {}", warning);
            }
        }
        if !issues.is_empty() {
            println!("Problems:");
            for issue in issues {
                println!("  ✗ {}", issue);
            }
        }
    }

    Ok(())
}

/// Shows version.
pub fn version() {
    println!("concord {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Resilient multi-model council");
}
