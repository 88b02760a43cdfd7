//! IC card classification
//!
//! Detects the issuer of a numeric card string from its length and prefix,
//! verifies the Luhn checksum where the issuer defines one, and produces a
//! masked rendering that is safe to log or display.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::patterns::{CardFormat, CARD_FORMATS, NATIONWIDE};

/// Smallest digit count accepted before format matching
pub const MIN_CARD_DIGITS: usize = 4;
/// Largest digit count accepted before format matching
pub const MAX_CARD_DIGITS: usize = 20;

const MASK_CHAR: char = '*';
const SHORT_MASK: &str = "****";

/// Issuer or network identifier of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardType {
    Suica,
    Pasmo,
    Icoca,
    Jcb,
    Visa,
    Mastercard,
    Amex,
    EmployeeId,
    Unknown,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Suica => "SUICA",
            CardType::Pasmo => "PASMO",
            CardType::Icoca => "ICOCA",
            CardType::Jcb => "JCB",
            CardType::Visa => "VISA",
            CardType::Mastercard => "MASTERCARD",
            CardType::Amex => "AMEX",
            CardType::EmployeeId => "EMPLOYEE_ID",
            CardType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUICA" => Ok(CardType::Suica),
            "PASMO" => Ok(CardType::Pasmo),
            "ICOCA" => Ok(CardType::Icoca),
            "JCB" => Ok(CardType::Jcb),
            "VISA" => Ok(CardType::Visa),
            "MASTERCARD" => Ok(CardType::Mastercard),
            "AMEX" => Ok(CardType::Amex),
            "EMPLOYEE_ID" => Ok(CardType::EmployeeId),
            "UNKNOWN" => Ok(CardType::Unknown),
            other => Err(format!("unknown card type: {}", other)),
        }
    }
}

/// Why a classification did not produce a valid card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardError {
    /// Not purely decimal digits, or outside the global length bound
    InvalidInput,
    /// Well-formed digits that match no known format
    UnknownCardType,
    /// Matched a format whose Luhn checksum failed
    InvalidChecksum,
}

impl fmt::Display for CardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CardError::InvalidInput => "INVALID_INPUT",
            CardError::UnknownCardType => "UNKNOWN_CARD_TYPE",
            CardError::InvalidChecksum => "INVALID_CHECKSUM",
        };
        f.write_str(text)
    }
}

/// Result of classifying a digit string against the known card formats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardClassification {
    pub valid: bool,
    pub card_type: CardType,
    pub issuer: Option<String>,
    pub description: Option<String>,
    pub regions: Vec<String>,
    pub checksum_valid: bool,
    pub masked_number: String,
    pub error: Option<CardError>,
}

impl CardClassification {
    fn rejected(masked_number: String, error: CardError) -> Self {
        Self {
            valid: false,
            card_type: CardType::Unknown,
            issuer: None,
            description: None,
            regions: Vec::new(),
            checksum_valid: false,
            masked_number,
            error: Some(error),
        }
    }

    fn matched(format: &CardFormat, checksum_valid: bool, masked_number: String) -> Self {
        Self {
            valid: checksum_valid,
            card_type: format.card_type,
            issuer: Some(format.issuer.to_string()),
            description: Some(format.description.to_string()),
            regions: format.regions.iter().map(|r| r.to_string()).collect(),
            checksum_valid,
            masked_number,
            error: if checksum_valid {
                None
            } else {
                Some(CardError::InvalidChecksum)
            },
        }
    }
}

/// Classifies a card number given as bare decimal digits
///
/// # Examples
///
/// ```
/// use cardguard::card::{classify, CardType};
///
/// let result = classify("1234567890123456");
/// assert_eq!(result.card_type, CardType::Suica);
/// assert_eq!(result.masked_number, "1234********3456");
/// ```
pub fn classify(digits: &str) -> CardClassification {
    let masked = mask(digits);

    if !is_well_formed(digits) {
        debug!("Rejected card input {} before format matching", masked);
        return CardClassification::rejected(masked, CardError::InvalidInput);
    }

    let Some(format) = CARD_FORMATS.iter().find(|f| f.matches(digits)) else {
        debug!("No card format matched {}", masked);
        return CardClassification::rejected(masked, CardError::UnknownCardType);
    };

    let checksum_valid = !format.has_checksum || luhn_valid(digits);
    debug!(
        "Classified {} as {} (checksum valid: {})",
        masked, format.card_type, checksum_valid
    );
    CardClassification::matched(format, checksum_valid, masked)
}

fn is_well_formed(digits: &str) -> bool {
    (MIN_CARD_DIGITS..=MAX_CARD_DIGITS).contains(&digits.len())
        && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Strips the spaces and hyphens people type between digit groups
pub fn normalize(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Standard Luhn check over a string of ASCII digits
///
/// Returns false for empty input or any non-digit character.
pub fn luhn_valid(digits: &str) -> bool {
    if digits.is_empty() {
        return false;
    }

    let mut sum = 0u32;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(d) = c.to_digit(10) else {
            return false;
        };
        sum += if i % 2 == 1 {
            let doubled = d * 2;
            if doubled > 9 {
                doubled - 9
            } else {
                doubled
            }
        } else {
            d
        };
    }

    sum % 10 == 0
}

/// Masks all but the first and last four characters
///
/// Inputs shorter than eight characters collapse to a constant mask so that
/// nothing of them is revealed.
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 8 {
        return SHORT_MASK.to_string();
    }

    let hidden = chars.len() - 8;
    let mut masked = String::with_capacity(chars.len());
    masked.extend(&chars[..4]);
    masked.extend(std::iter::repeat(MASK_CHAR).take(hidden));
    masked.extend(&chars[chars.len() - 4..]);
    masked
}

/// Whether a card type is usable in the given region
///
/// True if the format lists the region (case-insensitive) or is marked
/// nationwide. Unknown card types support no region.
pub fn is_region_supported(card_type: CardType, region: &str) -> bool {
    let region = region.trim();
    CARD_FORMATS
        .iter()
        .filter(|f| f.card_type == card_type)
        .flat_map(|f| f.regions.iter())
        .any(|r| *r == NATIONWIDE || r.eq_ignore_ascii_case(region))
}
