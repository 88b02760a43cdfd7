//! Field and object validation
//!
//! `InputValidator` owns the rule registry and the statistics counters and
//! runs every value through the same pipeline:
//! - Rule lookup (unknown fields are rejected)
//! - Presence check for absent values
//! - Attack-pattern scan, failing closed on any match
//! - Length check against the rule's limit
//! - Blank check for required fields
//! - Structural pattern check
//! - Semantic check (card number, calendar date) where the rule has one
//! - Sanitization, re-checking required fields against the result
//!
//! Expected failures come back as data in `ValidationResult`; nothing here
//! returns `Err` or lets a panic escape to the caller.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, warn};

use crate::card::{self, CardClassification, CardType};
use crate::fingerprint::data_hash;
use crate::rules::{FieldCheck, FieldRule, FieldRuleDescriptor, RuleRegistry};
use crate::sanitize::{preview, sanitize_error, sanitize_value};
use crate::scanner::{scan, SecurityViolationKind};
use crate::stats::{StatsRecorder, ValidationStats};

/// A raw input value as handed over by the caller
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// No value at all (null / not supplied)
    Absent,
    Text(String),
    /// Any non-string value; validated through its textual rendering
    Other(serde_json::Value),
}

impl FieldValue {
    /// Textual form used by the pipeline, `None` when absent
    pub fn coerce(&self) -> Option<String> {
        match self {
            FieldValue::Absent => None,
            FieldValue::Text(text) => Some(text.clone()),
            FieldValue::Other(serde_json::Value::String(text)) => Some(text.clone()),
            FieldValue::Other(serde_json::Value::Null) => None,
            FieldValue::Other(other) => Some(other.to_string()),
        }
    }

    pub fn is_absent(&self) -> bool {
        self.coerce().is_none()
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Absent,
            serde_json::Value::String(text) => FieldValue::Text(text),
            other => FieldValue::Other(other),
        }
    }
}

/// Per-call options for `validate_field`
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    /// Accept absent or blank values even for required fields
    pub allow_empty: bool,
}

/// Kind of validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    RequiredField,
    SecurityViolation,
    ExcessiveLength,
    InvalidFormat,
    UnknownField,
    ValidationError,
    MissingRequiredField,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::RequiredField => "REQUIRED_FIELD",
            ErrorKind::SecurityViolation => "SECURITY_VIOLATION",
            ErrorKind::ExcessiveLength => "EXCESSIVE_LENGTH",
            ErrorKind::InvalidFormat => "INVALID_FORMAT",
            ErrorKind::UnknownField => "UNKNOWN_FIELD",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::MissingRequiredField => "MISSING_REQUIRED_FIELD",
        };
        f.write_str(text)
    }
}

/// Description of one failed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field: String,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<SecurityViolationKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Safe to display: echoes at most an escaped preview of the input
    pub message: String,
}

impl FieldError {
    fn new(field: &str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            kind,
            violation: None,
            actual_length: None,
            max_length: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.field, self.kind, self.message)
    }
}

/// Outcome of validating one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub sanitized_value: Option<String>,
    pub error: Option<FieldError>,
}

impl ValidationResult {
    fn success(sanitized: String) -> Self {
        Self {
            valid: true,
            sanitized_value: Some(sanitized),
            error: None,
        }
    }

    fn failure(error: FieldError) -> Self {
        Self {
            valid: false,
            sanitized_value: None,
            error: Some(error),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn violation(&self) -> Option<SecurityViolationKind> {
        self.error.as_ref().and_then(|e| e.violation)
    }
}

/// Outcome of validating a keyed bag of values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectValidationResult {
    pub valid: bool,
    /// Missing required fields first, then per-field failures by field name
    pub errors: Vec<FieldError>,
    /// Values of the fields that validated successfully
    pub sanitized_data: BTreeMap<String, String>,
    /// Hex SHA-256 of `sanitized_data`
    pub data_hash: String,
}

/// Validator for lost-card report input
///
/// # Examples
///
/// ```
/// use cardguard::validation::{ErrorKind, FieldValue, InputValidator, ValidateOptions};
///
/// let validator = InputValidator::new();
///
/// let ok = validator.validate_field("employeeId", &FieldValue::from("EMP001"), ValidateOptions::default());
/// assert!(ok.valid);
///
/// let bad = validator.validate_field("employeeName", &"<script>x</script>".into(), ValidateOptions::default());
/// assert_eq!(bad.error_kind(), Some(ErrorKind::SecurityViolation));
///
/// assert_eq!(validator.stats().total_validations, 2);
/// ```
#[derive(Debug, Default)]
pub struct InputValidator {
    registry: RuleRegistry,
    stats: StatsRecorder,
}

impl InputValidator {
    /// Creates a validator with the built-in rule table
    pub fn new() -> Self {
        Self::with_registry(RuleRegistry::new())
    }

    pub fn with_registry(registry: RuleRegistry) -> Self {
        Self {
            registry,
            stats: StatsRecorder::new(),
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn get_rule(&self, field: &str) -> Option<FieldRule> {
        self.registry.get_rule(field)
    }

    pub fn register_rule(&self, field: &str, descriptor: &FieldRuleDescriptor) -> bool {
        self.registry.register_rule(field, descriptor)
    }

    pub fn stats(&self) -> ValidationStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    pub fn classify(&self, digits: &str) -> CardClassification {
        card::classify(digits)
    }

    pub fn is_region_supported(&self, card_type: CardType, region: &str) -> bool {
        card::is_region_supported(card_type, region)
    }

    /// Validates one field value and records the outcome in the statistics
    ///
    /// # Arguments
    /// * `field` - Registered field name
    /// * `value` - Raw value
    /// * `options` - Per-call options
    ///
    /// # Returns
    /// * `ValidationResult` - Sanitized value on success, typed error otherwise
    pub fn validate_field(
        &self,
        field: &str,
        value: &FieldValue,
        options: ValidateOptions,
    ) -> ValidationResult {
        self.guarded(field, || self.run_pipeline(field, value, options))
    }

    /// Runs a pipeline behind the fault boundary and records its outcome
    fn guarded(&self, field: &str, pipeline: impl FnOnce() -> ValidationResult) -> ValidationResult {
        let outcome = panic::catch_unwind(AssertUnwindSafe(pipeline));

        let result = outcome.unwrap_or_else(|payload| {
            let reason = panic_message(payload.as_ref());
            error!("Internal fault while validating field {}", field);
            ValidationResult::failure(FieldError::new(
                field,
                ErrorKind::ValidationError,
                format!("Validation failed unexpectedly: {}", sanitize_error(&reason)),
            ))
        });

        match result.error.as_ref().and_then(|e| e.violation) {
            Some(kind) => self.stats.record_violation(kind),
            None if result.valid => self.stats.record_success(),
            None => self.stats.record_failure(),
        }

        result
    }

    fn run_pipeline(&self, field: &str, value: &FieldValue, options: ValidateOptions) -> ValidationResult {
        let Some(rule) = self.registry.get_rule(field) else {
            return ValidationResult::failure(FieldError::new(
                field,
                ErrorKind::UnknownField,
                format!("Unknown field: {}", sanitize_error(field)),
            ));
        };

        let Some(text) = value.coerce() else {
            if rule.required && !options.allow_empty {
                return ValidationResult::failure(FieldError::new(
                    field,
                    ErrorKind::RequiredField,
                    format!("{} is required", rule.description),
                ));
            }
            return ValidationResult::success(String::new());
        };

        let scan_result = scan(&text);
        if !scan_result.is_safe() {
            warn!(
                "Security violation in field {}: {} ({})",
                field,
                scan_result.violation,
                scan_result.detail.as_deref().unwrap_or("unspecified")
            );
            let mut error = FieldError::new(
                field,
                ErrorKind::SecurityViolation,
                format!(
                    "{} contains a potential {} pattern (input: {})",
                    rule.description,
                    scan_result.violation,
                    preview(&text)
                ),
            );
            error.violation = Some(scan_result.violation);
            return ValidationResult::failure(error);
        }

        let length = text.chars().count();
        if length > rule.max_length {
            let mut error = FieldError::new(
                field,
                ErrorKind::ExcessiveLength,
                format!(
                    "{} is {} characters long; the limit is {}",
                    rule.description, length, rule.max_length
                ),
            );
            error.actual_length = Some(length);
            error.max_length = Some(rule.max_length);
            return ValidationResult::failure(error);
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            if rule.required && !options.allow_empty {
                return ValidationResult::failure(FieldError::new(
                    field,
                    ErrorKind::RequiredField,
                    format!("{} is required", rule.description),
                ));
            }
            return ValidationResult::success(String::new());
        }

        if let Some(pattern) = &rule.pattern {
            if !pattern.is_match(trimmed) {
                return ValidationResult::failure(FieldError::new(
                    field,
                    ErrorKind::InvalidFormat,
                    format!("{} has an invalid format", rule.description),
                ));
            }
        }

        match rule.check {
            Some(FieldCheck::CardNumber) => {
                let digits = card::normalize(trimmed);
                let classification = card::classify(&digits);
                if let Some(card_error) = classification.error {
                    return ValidationResult::failure(FieldError::new(
                        field,
                        ErrorKind::InvalidFormat,
                        format!(
                            "{} {} is not accepted: {}",
                            rule.description, classification.masked_number, card_error
                        ),
                    ));
                }
                debug!("Field {} accepted as {} card", field, classification.card_type);
                return ValidationResult::success(digits);
            }
            Some(FieldCheck::CalendarDate) => {
                if let Err(message) = check_calendar_date(trimmed) {
                    return ValidationResult::failure(FieldError::new(
                        field,
                        ErrorKind::InvalidFormat,
                        format!("{} {}", rule.description, message),
                    ));
                }
            }
            None => {}
        }

        let sanitized = if rule.sanitize {
            sanitize_value(&text)
        } else {
            text
        };
        if sanitized.trim().is_empty() && rule.required && !options.allow_empty {
            debug!("Field {} is blank after sanitization", field);
            return ValidationResult::failure(FieldError::new(
                field,
                ErrorKind::RequiredField,
                format!("{} is required", rule.description),
            ));
        }
        ValidationResult::success(sanitized)
    }

    /// Validates every present field and checks that the named fields exist
    ///
    /// Required-field presence is checked independently of each rule's own
    /// `required` flag. Fields are validated in name order, so `errors` is
    /// deterministic for a given input.
    pub fn validate_object<S: AsRef<str>>(
        &self,
        data: &BTreeMap<String, FieldValue>,
        required_fields: &[S],
    ) -> ObjectValidationResult {
        let mut errors = Vec::new();

        for name in required_fields {
            let name = name.as_ref();
            let present = data.get(name).map(|v| !v.is_absent()).unwrap_or(false);
            if !present {
                errors.push(FieldError::new(
                    name,
                    ErrorKind::MissingRequiredField,
                    format!("Required field is missing: {}", sanitize_error(name)),
                ));
            }
        }

        let mut sanitized_data = BTreeMap::new();
        for (field, value) in data {
            let result = self.validate_field(field, value, ValidateOptions::default());
            match result.error {
                None => {
                    sanitized_data.insert(field.clone(), result.sanitized_value.unwrap_or_default());
                }
                Some(error) => errors.push(error),
            }
        }

        let data_hash = data_hash(&sanitized_data);
        debug!(
            "Validated object with {} fields, {} errors",
            data.len(),
            errors.len()
        );

        ObjectValidationResult {
            valid: errors.is_empty(),
            errors,
            sanitized_data,
            data_hash,
        }
    }

    /// Validates a JSON payload; anything but a JSON object is one
    /// `VALIDATION_ERROR`
    pub fn validate_json<S: AsRef<str>>(
        &self,
        payload: &serde_json::Value,
        required_fields: &[S],
    ) -> ObjectValidationResult {
        match payload {
            serde_json::Value::Object(map) => {
                let data: BTreeMap<String, FieldValue> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), FieldValue::from(v.clone())))
                    .collect();
                self.validate_object(&data, required_fields)
            }
            _ => {
                let sanitized_data = BTreeMap::new();
                ObjectValidationResult {
                    valid: false,
                    errors: vec![FieldError::new(
                        "",
                        ErrorKind::ValidationError,
                        "Payload must be a JSON object",
                    )],
                    data_hash: data_hash(&sanitized_data),
                    sanitized_data,
                }
            }
        }
    }
}

fn check_calendar_date(value: &str) -> Result<(), &'static str> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| "is not a calendar date")?;
    if date > Local::now().date_naive() {
        return Err("lies in the future");
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown fault".to_string()
    }
}
