//! Command line interface for Concord.

pub mod commands;
pub mod interactive;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Concord - ask a council of models and aggregate what they think.
#[derive(Parser, Debug)]
#[command(name = "concord")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "concord.toml")]
    pub config: PathBuf,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print errors.
    #[arg(short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initializes configuration in the current directory.
    Init {
        /// Target directory (default: current directory).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Runs a query through the council.
    Ask {
        /// The question to ask.
        query: String,

        /// Print the full outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Prints the detected domain of a query.
    Classify {
        query: String,
    },

    /// Measures agreement over a JSON file of ranking submissions.
    Agreement {
        /// JSON array of rankings (`judge_model`, `ranking`, `confidence`).
        file: PathBuf,

        /// Domain used for expertise weighting (default: factual).
        #[arg(short, long)]
        domain: Option<String>,

        /// Kendall's W needed for consensus.
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Records a prediction in the calibration store.
    Predict {
        model: String,
        query: String,
        /// Stated confidence in [0, 1].
        confidence: f64,
        prediction: String,
    },

    /// Records the true answer for a query and grades stored predictions.
    Outcome {
        query: String,
        truth: String,
    },

    /// Shows calibration curves.
    Calibration {
        /// Only show this model.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Checks whether the model client is installed.
    Status,

    /// Configures options interactively.
    Config,

    /// Diagnoses configuration problems.
    Doctor,

    /// Shows version.
    Version,
}
