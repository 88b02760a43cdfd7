use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::runtime::Builder;
use tracing::{debug, info};

use cardguard::{
    batch,
    card::CardType,
    cli::{Cli, Commands},
    config,
    validation::{FieldValue, InputValidator, ValidateOptions},
};

fn main() -> Result<()> {
    // Validation is CPU-bound and parallelized by rayon; the runtime only drives file I/O.
    let num_cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    let worker_threads = std::cmp::min(num_cpus, 4);

    let runtime = Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let validator = Arc::new(InputValidator::new());

    if let Some(path) = &cli.rules {
        let registered = config::load_rule_set(path)?.apply(validator.registry())?;
        debug!("Registered {} custom rules", registered);
    }

    match &cli.command {
        Commands::Field {
            name,
            value,
            allow_empty,
        } => {
            let value = value.clone().map(FieldValue::from).unwrap_or(FieldValue::Absent);
            let options = ValidateOptions {
                allow_empty: *allow_empty,
            };
            let result = validator.validate_field(name, &value, options);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Object { input, required } => {
            info!("Validating report from file: {:?}", input);
            let text = tokio::fs::read_to_string(input)
                .await
                .context(format!("Failed to read report file: {:?}", input))?;
            let payload: serde_json::Value =
                serde_json::from_str(&text).context("Report file is not valid JSON")?;
            let result = validator.validate_json(&payload, required);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Classify { number } => {
            let result = validator.classify(number);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Region { card_type, region } => {
            let card_type: CardType = card_type.parse().map_err(|e: String| anyhow!(e))?;
            let supported = validator.is_region_supported(card_type, region);
            let mut answer = BTreeMap::new();
            answer.insert("cardType", serde_json::json!(card_type));
            answer.insert("region", serde_json::json!(region));
            answer.insert("supported", serde_json::json!(supported));
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Commands::Batch {
            input_file,
            output_file,
            chunk_size,
            required,
        } => {
            info!("Processing batch from file: {:?}", input_file);
            let summary = batch::validate_reports(
                Arc::clone(&validator),
                input_file,
                output_file.as_ref(),
                *chunk_size,
                required,
            )
            .await?;
            info!("Batch summary: {}", serde_json::to_string(&summary)?);
            info!("Validation statistics: {}", serde_json::to_string(&validator.stats())?);
        }
    }

    Ok(())
}
