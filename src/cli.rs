//! Command-line interface for cardguard
//!
//! Exposes the validator to shell scripts and operators:
//!
//! - `field`: validate a single value against a named rule
//! - `object`: validate a JSON report file
//! - `classify`: detect the issuer of a card number
//! - `region`: check whether a card type is usable in a region
//! - `batch`: validate a JSON-lines file of reports
//!
//! A custom rule file given with `--rules` is registered on top of the
//! built-in rules before any subcommand runs. All results are printed as JSON.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main command-line interface structure for cardguard
///
/// # Examples
///
/// ```no_run
/// use cardguard::cli::{Cli, Commands};
///
/// let cli = Cli {
///     command: Commands::Classify {
///         number: "1234567890123456".to_string(),
///     },
///     rules: None,
/// };
/// assert!(cli.rules.is_none());
/// ```
#[derive(Parser)]
#[command(
    name = "cardguard",
    about = "Input validation and IC card classification for lost-card reports",
    version
)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// JSON file with additional field rules
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,
}

/// Available subcommands
///
/// ```text
/// cardguard field --name employeeId --value EMP001
/// cardguard object --input report.json --required employeeId,employeeName
/// cardguard classify --number 1234567890123456
/// cardguard region --card-type SUICA --region kanto
/// cardguard batch --input-file reports.jsonl --output-file results.jsonl
/// ```
#[derive(Subcommand)]
pub enum Commands {
    /// Validate one field value
    Field {
        /// Registered field name (e.g., employeeId)
        #[arg(short, long)]
        name: String,

        /// Raw value; omit to validate an absent value
        #[arg(short, long)]
        value: Option<String>,

        /// Accept an absent or blank value for a required field
        #[arg(long)]
        allow_empty: bool,
    },
    /// Validate a JSON report object read from a file
    Object {
        /// File containing one JSON object
        #[arg(short, long)]
        input: PathBuf,

        /// Field names that must be present
        #[arg(short, long, value_delimiter = ',')]
        required: Vec<String>,
    },
    /// Classify a card number
    Classify {
        /// Card number digits
        #[arg(short, long)]
        number: String,
    },
    /// Check region support for a card type
    Region {
        /// Card type tag (e.g., SUICA)
        #[arg(short, long)]
        card_type: String,

        /// Region name (e.g., kanto)
        #[arg(short, long)]
        region: String,
    },
    /// Validate a JSON-lines file of reports
    ///
    /// Empty lines and those starting with '#' are skipped.
    Batch {
        /// Input file with one JSON report per line
        #[arg(short, long)]
        input_file: PathBuf,

        /// Output file for results (one JSON record per line)
        /// If not specified, results are printed to stdout
        #[arg(short, long)]
        output_file: Option<PathBuf>,

        /// Number of reports validated together
        #[arg(long, default_value = "1000")]
        chunk_size: usize,

        /// Field names every report must carry
        #[arg(short, long, value_delimiter = ',')]
        required: Vec<String>,
    },
}
