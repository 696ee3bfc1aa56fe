//! Interactive configuration using dialoguer.

use std::path::{Path, PathBuf};

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use crate::types::config::Config;
use crate::ConcordResult;

/// Runs the interactive configuration menu.
pub fn run_interactive_config(config_path: &Path) -> ConcordResult<()> {
    let theme = ColorfulTheme::default();

    println!("\nConcord interactive configuration\n");

    let mut config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        println!("Creating a new configuration...\n");
        Config::default_config()
    };

    loop {
        let options = [
            "General",
            "Council members",
            "Dispatch and circuit breaker",
            "Aggregation",
            "Claims",
            "Calibration and cache",
            "Save and exit",
            "Exit without saving",
        ];

        let selection = Select::with_theme(&theme)
            .with_prompt("What do you want to configure?")
            .items(&options)
            .default(0)
            .interact()?;

        match selection {
            0 => configure_general(&theme, &mut config)?,
            1 => configure_council(&theme, &mut config)?,
            2 => configure_dispatch(&theme, &mut config)?,
            3 => configure_aggregation(&theme, &mut config)?,
            4 => configure_claims(&theme, &mut config)?,
            5 => configure_storage(&theme, &mut config)?,
            6 => {
                if let Err(e) = config.validate() {
                    println!("\n✗ {}\n", e);
                    continue;
                }
                config.save(config_path)?;
                println!("\n✓ Configuration saved to: {}\n", config_path.display());
                break;
            }
            7 => {
                if Confirm::with_theme(&theme)
                    .with_prompt("Really exit without saving?")
                    .default(false)
                    .interact()?
                {
                    println!("\nExiting without saving.\n");
                    break;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn configure_general(theme: &ColorfulTheme, config: &mut Config) -> ConcordResult<()> {
    let log_levels = ["error", "warn", "info", "debug", "trace"];
    let current_idx = log_levels
        .iter()
        .position(|&l| l == config.general.log_level)
        .unwrap_or(2);

    let log_level_idx = Select::with_theme(theme)
        .with_prompt("Log level")
        .items(&log_levels)
        .default(current_idx)
        .interact()?;
    config.general.log_level = log_levels[log_level_idx].to_string();

    let log_formats = ["text", "json"];
    let current_format_idx = log_formats
        .iter()
        .position(|&f| f == config.general.log_format)
        .unwrap_or(0);

    let log_format_idx = Select::with_theme(theme)
        .with_prompt("Log format")
        .items(&log_formats)
        .default(current_format_idx)
        .interact()?;
    config.general.log_format = log_formats[log_format_idx].to_string();

    config.general.timeout_secs = Input::with_theme(theme)
        .with_prompt("Whole-query timeout (seconds)")
        .default(config.general.timeout_secs)
        .interact_text()?;

    Ok(())
}

fn configure_council(theme: &ColorfulTheme, config: &mut Config) -> ConcordResult<()> {
    let models: String = Input::with_theme(theme)
        .with_prompt("Council models (comma separated)")
        .default(config.council.models.join(","))
        .interact_text()?;
    config.council.models = models
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect();

    let chairman_idx = config
        .council
        .models
        .iter()
        .position(|m| *m == config.council.chairman)
        .unwrap_or(0);
    if !config.council.models.is_empty() {
        let idx = Select::with_theme(theme)
            .with_prompt("Chairman")
            .items(&config.council.models)
            .default(chairman_idx)
            .interact()?;
        config.council.chairman = config.council.models[idx].clone();
    }

    let command: String = Input::with_theme(theme)
        .with_prompt("Client command")
        .default(config.client.command.clone())
        .interact_text()?;
    config.client.command = command;

    let args: String = Input::with_theme(theme)
        .with_prompt("Client arguments ({model} is replaced by the model id)")
        .default(config.client.args.join(" "))
        .interact_text()?;
    config.client.args = args.split_whitespace().map(String::from).collect();

    Ok(())
}

fn configure_dispatch(theme: &ColorfulTheme, config: &mut Config) -> ConcordResult<()> {
    config.dispatch.min_required = Input::with_theme(theme)
        .with_prompt("Minimum responses (quorum)")
        .default(config.dispatch.min_required)
        .interact_text()?;

    config.dispatch.allow_partial = Confirm::with_theme(theme)
        .with_prompt("Continue with partial results when quorum is not met?")
        .default(config.dispatch.allow_partial)
        .interact()?;

    config.dispatch.timeout_per_model_secs = Input::with_theme(theme)
        .with_prompt("Per-model timeout (seconds)")
        .default(config.dispatch.timeout_per_model_secs)
        .interact_text()?;

    config.dispatch.max_retries = Input::with_theme(theme)
        .with_prompt("Retries per call")
        .default(config.dispatch.max_retries)
        .interact_text()?;

    config.circuit_breaker.failure_threshold = Input::with_theme(theme)
        .with_prompt("Failures before a model is excluded")
        .default(config.circuit_breaker.failure_threshold)
        .interact_text()?;

    config.circuit_breaker.recovery_timeout_secs = Input::with_theme(theme)
        .with_prompt("Exclusion period (seconds)")
        .default(config.circuit_breaker.recovery_timeout_secs)
        .interact_text()?;

    Ok(())
}

fn configure_aggregation(theme: &ColorfulTheme, config: &mut Config) -> ConcordResult<()> {
    let threshold: f64 = Input::with_theme(theme)
        .with_prompt("Kendall's W needed for consensus (0-1)")
        .default(config.aggregation.disagreement_threshold)
        .interact_text()?;
    config.aggregation.disagreement_threshold = threshold.clamp(0.0, 1.0);

    config.aggregation.pairwise = Confirm::with_theme(theme)
        .with_prompt("Collect pairwise comparisons (Bradley–Terry)?")
        .default(config.aggregation.pairwise)
        .interact()?;

    if config.aggregation.pairwise {
        config.aggregation.bt_iterations = Input::with_theme(theme)
            .with_prompt("Bradley–Terry iterations")
            .default(config.aggregation.bt_iterations)
            .interact_text()?;
    }

    Ok(())
}

fn configure_claims(theme: &ColorfulTheme, config: &mut Config) -> ConcordResult<()> {
    config.claims.enabled = Confirm::with_theme(theme)
        .with_prompt("Extract claims?")
        .default(config.claims.enabled)
        .interact()?;

    if !config.claims.enabled {
        return Ok(());
    }

    config.claims.verify = Confirm::with_theme(theme)
        .with_prompt("Verify extracted claims?")
        .default(config.claims.verify)
        .interact()?;

    if config.claims.verify {
        config.claims.max_concurrent = Input::with_theme(theme)
            .with_prompt("Verifications in flight")
            .default(config.claims.max_concurrent)
            .interact_text()?;
    }

    Ok(())
}

fn configure_storage(theme: &ColorfulTheme, config: &mut Config) -> ConcordResult<()> {
    config.calibration.enabled = Confirm::with_theme(theme)
        .with_prompt("Track calibration?")
        .default(config.calibration.enabled)
        .interact()?;

    if config.calibration.enabled {
        let db_path: String = Input::with_theme(theme)
            .with_prompt("Calibration database path")
            .default(config.calibration.db_path.display().to_string())
            .interact_text()?;
        config.calibration.db_path = PathBuf::from(db_path);
    }

    config.cache.enabled = Confirm::with_theme(theme)
        .with_prompt("Cache model replies?")
        .default(config.cache.enabled)
        .interact()?;

    if config.cache.enabled {
        config.cache.capacity = Input::with_theme(theme)
            .with_prompt("Cache capacity")
            .default(config.cache.capacity)
            .interact_text()?;
        config.cache.ttl_secs = Input::with_theme(theme)
            .with_prompt("Cache TTL (seconds)")
            .default(config.cache.ttl_secs)
            .interact_text()?;
    }

    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Prints a summary of the current configuration.
pub fn show_config_summary(config: &Config) {
    println!();
    println!("┌─────────────────────────────────────────┐");
    println!("│ Current configuration                   │");
    println!("├─────────────────────────────────────────┤");
    println!("│ Log level: {:<28} │", config.general.log_level);
    println!("│ Timeout: {:<29}s │", config.general.timeout_secs);
    println!("├─────────────────────────────────────────┤");
    println!("│ Council                                 │");
    println!("├─────────────────────────────────────────┤");
    for model in &config.council.models {
        println!("│ - {:<37} │", model);
    }
    println!("│ Chairman: {:<29} │", config.council.chairman);
    println!("│ Client: {:<31} │", config.client.command);
    println!("├─────────────────────────────────────────┤");
    println!("│ Dispatch                                │");
    println!("├─────────────────────────────────────────┤");
    println!("│ Quorum: {:<31} │", config.dispatch.min_required);
    println!("│ Partial results: {:<22} │", yes_no(config.dispatch.allow_partial));
    println!("│ Per-model timeout: {:<19}s │", config.dispatch.timeout_per_model_secs);
    println!("├─────────────────────────────────────────┤");
    println!("│ Aggregation                             │");
    println!("├─────────────────────────────────────────┤");
    println!(
        "│ Consensus threshold: {:<18} │",
        config.aggregation.disagreement_threshold
    );
    println!("│ Pairwise: {:<29} │", yes_no(config.aggregation.pairwise));
    println!("│ Claims: {:<31} │", yes_no(config.claims.enabled));
    println!("│ Verify claims: {:<24} │", yes_no(config.claims.verify));
    println!("├─────────────────────────────────────────┤");
    println!("│ Calibration: {:<26} │", yes_no(config.calibration.enabled));
    println!("│ Cache: {:<32} │", yes_no(config.cache.enabled));
    println!("└─────────────────────────────────────────┘");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_config_summary() {
        let config = Config::default_config();
        show_config_summary(&config);
    }
}
