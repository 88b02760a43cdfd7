//! Field rule registry
//!
//! Maps a field name to the rule used to validate it. The registry starts
//! from the built-in lost-card report table and accepts runtime
//! registrations; the last registration for a name wins.

use dashmap::DashMap;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GuardError, GuardResult};
use crate::patterns;

/// Upper bound on the compiled size of a custom rule pattern
const CUSTOM_PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Semantic check run after the structural pattern matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldCheck {
    /// Value must classify as a known IC card with a valid checksum
    CardNumber,
    /// Value must be a real calendar date no later than today
    CalendarDate,
}

/// How to validate one named field
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub pattern: Option<Regex>,
    pub max_length: usize,
    pub required: bool,
    pub sanitize: bool,
    pub description: String,
    pub check: Option<FieldCheck>,
}

/// Registration-time form of a rule
///
/// `max_length`, `required`, `sanitize` and `description` carry no serde
/// defaults: a JSON descriptor lacking any of them does not decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRuleDescriptor {
    #[serde(default)]
    pub pattern: Option<String>,
    pub max_length: usize,
    pub required: bool,
    pub sanitize: bool,
    pub description: String,
    #[serde(default)]
    pub check: Option<FieldCheck>,
}

impl FieldRuleDescriptor {
    /// Validates the descriptor and compiles its pattern
    pub fn compile(&self, field: &str) -> GuardResult<FieldRule> {
        if self.max_length == 0 {
            return Err(GuardError::ZeroMaxLength {
                field: field.to_string(),
            });
        }

        let pattern = match &self.pattern {
            Some(source) => Some(
                RegexBuilder::new(source)
                    .size_limit(CUSTOM_PATTERN_SIZE_LIMIT)
                    .build()
                    .map_err(|source| GuardError::InvalidPattern {
                        field: field.to_string(),
                        source,
                    })?,
            ),
            None => None,
        };

        Ok(FieldRule {
            pattern,
            max_length: self.max_length,
            required: self.required,
            sanitize: self.sanitize,
            description: self.description.clone(),
            check: self.check,
        })
    }
}

/// Concurrent map of field name to rule
#[derive(Debug)]
pub struct RuleRegistry {
    rules: DashMap<String, FieldRule>,
}

impl RuleRegistry {
    /// Creates a registry holding the built-in rule table
    pub fn new() -> Self {
        let registry = Self::empty();
        for (name, rule) in builtin_rules() {
            registry.rules.insert(name.to_string(), rule);
        }
        registry
    }

    /// Creates a registry with no rules at all
    pub fn empty() -> Self {
        Self {
            rules: DashMap::new(),
        }
    }

    pub fn get_rule(&self, field: &str) -> Option<FieldRule> {
        self.rules.get(field).map(|entry| entry.value().clone())
    }

    /// Registers a rule, reporting why it was rejected
    pub fn try_register_rule(&self, field: &str, descriptor: &FieldRuleDescriptor) -> GuardResult<()> {
        if field.trim().is_empty() {
            return Err(GuardError::EmptyFieldName);
        }
        let rule = descriptor.compile(field)?;
        if self.rules.insert(field.to_string(), rule).is_some() {
            debug!("Replaced rule for field: {}", field);
        } else {
            debug!("Registered rule for field: {}", field);
        }
        Ok(())
    }

    /// Registers a rule; returns false and leaves the registry untouched if
    /// the name or descriptor is invalid
    pub fn register_rule(&self, field: &str, descriptor: &FieldRuleDescriptor) -> bool {
        match self.try_register_rule(field, descriptor) {
            Ok(()) => true,
            Err(e) => {
                warn!("Rejected rule registration: {}", e);
                false
            }
        }
    }

    /// Registers a rule from an untyped JSON descriptor
    pub fn register_rule_value(&self, field: &str, descriptor: &serde_json::Value) -> bool {
        match serde_json::from_value::<FieldRuleDescriptor>(descriptor.clone()) {
            Ok(descriptor) => self.register_rule(field, &descriptor),
            Err(e) => {
                let err = GuardError::MalformedDescriptor {
                    field: field.to_string(),
                    reason: e.to_string(),
                };
                warn!("Rejected rule registration: {}", err);
                false
            }
        }
    }

    /// Registered field names in sorted order
    pub fn rule_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rules.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn rule(
    pattern: Option<&Regex>,
    max_length: usize,
    required: bool,
    description: &str,
    check: Option<FieldCheck>,
) -> FieldRule {
    FieldRule {
        pattern: pattern.cloned(),
        max_length,
        required,
        sanitize: true,
        description: description.to_string(),
        check,
    }
}

/// The fields of a lost IC card report
fn builtin_rules() -> Vec<(&'static str, FieldRule)> {
    vec![
        ("employeeId", rule(Some(&*patterns::EMPLOYEE_ID), 20, true, "Employee ID", None)),
        ("employeeName", rule(None, 50, true, "Employee name", None)),
        ("department", rule(None, 100, false, "Department", None)),
        ("email", rule(Some(&*patterns::EMAIL), 254, false, "Email address", None)),
        ("phoneNumber", rule(Some(&*patterns::PHONE), 20, false, "Phone number", None)),
        (
            "cardNumber",
            rule(
                Some(&*patterns::CARD_NUMBER_INPUT),
                30,
                false,
                "IC card number",
                Some(FieldCheck::CardNumber),
            ),
        ),
        ("cardType", rule(Some(&*patterns::CARD_TYPE_NAME), 20, false, "Card type", None)),
        (
            "lostDate",
            rule(
                Some(&*patterns::DATE),
                10,
                true,
                "Date of loss",
                Some(FieldCheck::CalendarDate),
            ),
        ),
        ("lostTime", rule(Some(&*patterns::TIME), 5, false, "Time of loss", None)),
        ("lostLocation", rule(None, 200, true, "Place of loss", None)),
        ("description", rule(None, 1000, false, "Circumstances", None)),
        ("contactInfo", rule(None, 200, false, "Contact information", None)),
    ]
}
