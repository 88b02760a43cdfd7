//! Streaming validation of report files
//!
//! Reads a JSON-lines file of report payloads without loading it into memory,
//! validates each chunk in parallel on the rayon pool and streams one
//! `BatchRecord` per payload to the output.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, info, warn};

use crate::sanitize::sanitize_error;
use crate::validation::{InputValidator, ObjectValidationResult};

/// Outcome for one line of the input file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    /// 1-based line number in the input file
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ObjectValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

/// A non-blank input line waiting for validation
enum PendingLine {
    Payload(String),
    /// Bytes that did not decode; carries the decoder's reason
    Undecodable(String),
}

/// Totals for a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub records: usize,
    pub valid: usize,
    pub invalid: usize,
    pub unparsable: usize,
}

impl BatchSummary {
    fn add(&mut self, record: &BatchRecord) {
        self.records += 1;
        match &record.result {
            Some(result) if result.valid => self.valid += 1,
            Some(_) => self.invalid += 1,
            None => self.unparsable += 1,
        }
    }
}

/// Validates every payload in a JSON-lines file
///
/// Blank lines and lines starting with `#` are skipped. A line that is not
/// valid UTF-8 is reported as unparsable and the run continues. Results go to
/// `output_file` as JSON lines when given, otherwise to stdout as pretty JSON.
///
/// # Arguments
/// * `validator` - Shared validator; its statistics accumulate over the run
/// * `input_file` - JSON-lines file with one report object per line
/// * `output_file` - Optional destination for the records
/// * `chunk_size` - Number of payloads validated together
/// * `required_fields` - Field names every payload must carry
///
/// # Returns
/// * `Result<BatchSummary>` - Totals, or an I/O error
pub async fn validate_reports(
    validator: Arc<InputValidator>,
    input_file: &Path,
    output_file: Option<&PathBuf>,
    chunk_size: usize,
    required_fields: &[String],
) -> Result<BatchSummary> {
    let chunk_size = chunk_size.max(1);
    let required: Arc<Vec<String>> = Arc::new(required_fields.to_vec());

    let mut output_writer = if let Some(path) = output_file {
        Some(
            OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(path)
                .await
                .context("Failed to create output file")?,
        )
    } else {
        None
    };

    let file = File::open(input_file)
        .await
        .context(format!("Failed to open report file: {:?}", input_file))?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);

    let mut summary = BatchSummary::default();
    let mut chunk: Vec<(usize, PendingLine)> = Vec::with_capacity(chunk_size);
    let mut line = Vec::new();
    let mut line_number = 0;

    info!("Validating reports from {} in streaming mode", input_file.display());

    loop {
        line.clear();
        let bytes_read = reader.read_until(b'\n', &mut line).await?;
        if bytes_read == 0 {
            break;
        }
        line_number += 1;

        match std::str::from_utf8(&line) {
            Ok(text) => {
                let payload = text.trim();
                if payload.is_empty() || payload.starts_with('#') {
                    continue;
                }
                chunk.push((line_number, PendingLine::Payload(payload.to_string())));
            }
            Err(e) => {
                warn!("Line {} of {} is not valid UTF-8", line_number, input_file.display());
                chunk.push((line_number, PendingLine::Undecodable(e.to_string())));
            }
        }

        if chunk.len() >= chunk_size {
            let records = validate_chunk(&validator, &required, std::mem::take(&mut chunk)).await?;
            write_records(&records, &mut output_writer, &mut summary).await?;
        }
    }

    if !chunk.is_empty() {
        debug!("Validating final chunk of {} reports", chunk.len());
        let records = validate_chunk(&validator, &required, chunk).await?;
        write_records(&records, &mut output_writer, &mut summary).await?;
    }

    info!(
        "Batch validation completed: {} records, {} valid, {} invalid, {} unparsable",
        summary.records, summary.valid, summary.invalid, summary.unparsable
    );
    Ok(summary)
}

async fn validate_chunk(
    validator: &Arc<InputValidator>,
    required: &Arc<Vec<String>>,
    chunk: Vec<(usize, PendingLine)>,
) -> Result<Vec<BatchRecord>> {
    debug!("Validating chunk of {} reports", chunk.len());
    let validator = Arc::clone(validator);
    let required = Arc::clone(required);

    tokio::task::spawn_blocking(move || {
        chunk
            .into_par_iter()
            .map(|(line, pending)| match pending {
                PendingLine::Payload(payload) => validate_line(&validator, &required, line, &payload),
                PendingLine::Undecodable(reason) => BatchRecord {
                    line,
                    result: None,
                    parse_error: Some(format!("Line is not valid UTF-8: {}", sanitize_error(&reason))),
                },
            })
            .collect()
    })
    .await
    .context("Validation worker failed")
}

fn validate_line(
    validator: &InputValidator,
    required: &[String],
    line: usize,
    payload: &str,
) -> BatchRecord {
    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(value) => BatchRecord {
            line,
            result: Some(validator.validate_json(&value, required)),
            parse_error: None,
        },
        Err(e) => BatchRecord {
            line,
            result: None,
            parse_error: Some(sanitize_error(&e.to_string())),
        },
    }
}

async fn write_records(
    records: &[BatchRecord],
    output_writer: &mut Option<File>,
    summary: &mut BatchSummary,
) -> Result<()> {
    for record in records {
        summary.add(record);
        if let Some(writer) = output_writer.as_mut() {
            let json_line = format!("{}\n", serde_json::to_string(record)?);
            writer.write_all(json_line.as_bytes()).await?;
        } else {
            println!("{}", serde_json::to_string_pretty(record)?);
        }
    }

    if let Some(writer) = output_writer.as_mut() {
        writer.flush().await?;
    }
    Ok(())
}
