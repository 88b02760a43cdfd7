// cardguard: validation core for lost IC card reports
// Exposes the validator, scanner and card classifier as a library

pub mod batch;
pub mod card;
pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod patterns;
pub mod rules;
pub mod sanitize;
pub mod scanner;
pub mod stats;
pub mod validation;

pub use card::{classify, is_region_supported, CardClassification, CardType};
pub use error::GuardError;
pub use rules::{FieldRuleDescriptor, RuleRegistry};
pub use scanner::{scan, SecurityViolationKind};
pub use stats::ValidationStats;
pub use validation::{
    ErrorKind, FieldValue, InputValidator, ObjectValidationResult, ValidateOptions,
    ValidationResult,
};
