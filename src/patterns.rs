//! Canonical regular expressions used by the scanner, the sanitizer and the
//! built-in field rules
//!
//! Patterns are grouped by purpose:
//! - Attack grammars (SQL injection, OS command / path traversal, XSS), each
//!   carrying a short name reported as the scan detail
//! - Sanitizer targets (dangerous elements, handler attributes, script schemes)
//! - Well-formed domain values (employee ID, phone, email, date, time)
//! - IC card formats with their length set and checksum flag
//!
//! Everything here is compiled once on first use and shared read-only.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::card::CardType;

/// Sentinel region marker meaning "usable everywhere"
pub const NATIONWIDE: &str = "nationwide";

/// A compiled pattern with a short label used in scan details
#[derive(Debug)]
pub struct NamedPattern {
    pub name: &'static str,
    pub regex: Regex,
}

fn named(name: &'static str, pattern: &str) -> NamedPattern {
    NamedPattern {
        name,
        regex: compile(pattern),
    }
}

// Every pattern in this module is a literal; a compile failure is a programming error.
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("built-in pattern {pattern:?} is invalid: {e}"))
}

/// Keyword + punctuation combinations typical of SQL injection payloads
pub static SQL_INJECTION_PATTERNS: Lazy<Vec<NamedPattern>> = Lazy::new(|| {
    vec![
        named(
            "tautology",
            r#"(?i)['"]\s*(?:or|and)\s+['"]?\w+['"]?\s*=\s*['"]?\w+"#,
        ),
        named(
            "stacked query",
            r"(?i);\s*(?:drop|delete|insert|update|alter|create|truncate|exec(?:ute)?|shutdown)\b",
        ),
        named("union select", r"(?i)\bunion\b(?:\s+all)?\s+select\b"),
        named(
            "select from",
            r"(?i)\bselect\s+(?:\*|\w+(?:\s*,\s*\w+)*)\s+from\s+\w+",
        ),
        named(
            "schema statement",
            r"(?i)\b(?:drop|truncate|alter)\s+(?:table|database|schema|view|index)\b",
        ),
        named("insert into", r"(?i)\binsert\s+into\s+\w+"),
        named("delete from", r"(?i)\bdelete\s+from\s+\w+"),
        named("update set", r"(?i)\bupdate\s+\w+\s+set\s+\w+\s*="),
        named("quote comment", r#"['"]\s*(?:--|#|/\*)"#),
        named(
            "time delay",
            r"(?i)\b(?:sleep|benchmark|pg_sleep)\s*\(|\bwaitfor\s+delay\b",
        ),
        named(
            "stored procedure",
            r"(?i)\b(?:xp_cmdshell|sp_executesql|sp_oacreate)\b",
        ),
    ]
});

/// Shell metacharacter sequences and path traversal
pub static OS_COMMAND_PATTERNS: Lazy<Vec<NamedPattern>> = Lazy::new(|| {
    vec![
        named(
            "command chaining",
            r"(?i)(?:;|&&|\|\|?|&)\s*(?:rm|cat|ls|wget|curl|nc|ncat|bash|sh|zsh|chmod|chown|whoami|uname|ping|powershell|cmd)\b",
        ),
        named("command substitution", r"\$\([^)]*\)|`[^`]+`"),
        named("variable expansion", r"\$\{[^}]+\}"),
        named(
            "path traversal",
            r"(?i)\.\./|\.\.\\|%2e%2e(?:%2f|%5c|/|\\)",
        ),
        named(
            "sensitive path",
            r"(?i)/etc/(?:passwd|shadow|hosts)\b|/bin/(?:ba|z)?sh\b|\bcmd\.exe\b|\bpowershell\.exe\b",
        ),
        named("device redirection", r"(?i)>\s*/dev/(?:null|tcp|udp)\b"),
    ]
});

/// Broad tag, attribute and URL-scheme patterns for script injection
pub static XSS_PATTERNS: Lazy<Vec<NamedPattern>> = Lazy::new(|| {
    vec![
        named("script tag", r"(?i)<\s*/?\s*script\b"),
        named("script scheme", r"(?i)\b(?:java|vb)script\s*:"),
        named("event handler", r"(?i)\bon[a-z]{3,}\s*="),
        named(
            "embedded element",
            r"(?i)<\s*(?:iframe|object|embed|applet|frameset|frame|meta|base|link|svg|math)\b",
        ),
        named("html data url", r"(?i)\bdata\s*:\s*text/html"),
        named("css expression", r"(?i)\bexpression\s*\("),
    ]
});

/// Complete `<script>`, `<iframe>` and `<object>` elements, content included
pub static DANGEROUS_ELEMENTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["script", "iframe", "object"]
        .iter()
        .map(|tag| compile(&format!(r"(?is)<\s*{tag}\b[^>]*>.*?<\s*/\s*{tag}\s*>")))
        .collect()
});

/// Unpaired opening or closing tags left after element removal
pub static DANGEROUS_TAG_FRAGMENTS: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)<\s*/?\s*(?:script|iframe|object)\b[^>]*>?"));

/// `on*=` handler attributes together with their value
pub static EVENT_HANDLER_ATTRIBUTES: Lazy<Regex> = Lazy::new(|| {
    compile(
        r#"(?i)(?:\bon[a-z]{3,}|on(?:error|load|click|dblclick|mouseover|mouseout|focus|blur|submit|change|input|keydown|keyup|keypress|unload|abort))\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]*)"#,
    )
});

/// `javascript:` and `vbscript:` URL schemes, including forms split by tabs or
/// newlines
pub static SCRIPT_SCHEMES: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?i)(?:j[\t\n]*a[\t\n]*v[\t\n]*a|v[\t\n]*b)[\t\n]*s[\t\n]*c[\t\n]*r[\t\n]*i[\t\n]*p[\t\n]*t\s*:",
    )
});

pub static EMPLOYEE_ID: Lazy<Regex> = Lazy::new(|| compile(r"^(?:[A-Za-z]{1,5}-?)?\d{3,10}$"));

/// Japanese landline/mobile numbers, optionally in +81 form
pub static PHONE: Lazy<Regex> = Lazy::new(|| {
    compile(r"^(?:\+81[-\s]?|0)\d{1,4}[-\s]?\d{1,4}[-\s]?\d{3,4}$")
});

pub static EMAIL: Lazy<Regex> =
    Lazy::new(|| compile(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$"));

pub static DATE: Lazy<Regex> =
    Lazy::new(|| compile(r"^\d{4}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12]\d|3[01])$"));

pub static TIME: Lazy<Regex> = Lazy::new(|| compile(r"^(?:[01]\d|2[0-3]):[0-5]\d$"));

/// Card number as typed by a person: digits with optional spaces or hyphens
pub static CARD_NUMBER_INPUT: Lazy<Regex> =
    Lazy::new(|| compile(r"^[0-9](?:[0-9 \-]*[0-9])?$"));

pub static CARD_TYPE_NAME: Lazy<Regex> = Lazy::new(|| {
    compile(r"^(?:SUICA|PASMO|ICOCA|JCB|VISA|MASTERCARD|AMEX|EMPLOYEE_ID|OTHER)$")
});

/// Structural definition of one IC card issuer format
#[derive(Debug)]
pub struct CardFormat {
    pub card_type: CardType,
    pub issuer: &'static str,
    pub description: &'static str,
    /// Accepted digit counts
    pub lengths: &'static [usize],
    pub pattern: Regex,
    pub has_checksum: bool,
    pub regions: &'static [&'static str],
}

impl CardFormat {
    pub fn matches(&self, digits: &str) -> bool {
        self.lengths.contains(&digits.len()) && self.pattern.is_match(digits)
    }
}

/// Known card formats in match order; the first matching entry wins, so the
/// prefix-specific formats precede the generic 16-digit transit format.
pub static CARD_FORMATS: Lazy<Vec<CardFormat>> = Lazy::new(|| {
    vec![
        CardFormat {
            card_type: CardType::Jcb,
            issuer: "JCB Co., Ltd.",
            description: "JCB credit card with IC chip",
            lengths: &[16],
            pattern: compile(r"^35(?:2[89]|[3-8]\d)\d{12}$"),
            has_checksum: true,
            regions: &[NATIONWIDE],
        },
        CardFormat {
            card_type: CardType::Visa,
            issuer: "Visa Inc.",
            description: "Visa credit card with IC chip",
            lengths: &[13, 16],
            pattern: compile(r"^4\d{12}(?:\d{3})?$"),
            has_checksum: true,
            regions: &[NATIONWIDE],
        },
        CardFormat {
            card_type: CardType::Mastercard,
            issuer: "Mastercard Inc.",
            description: "Mastercard credit card with IC chip",
            lengths: &[16],
            pattern: compile(r"^(?:5[1-5]\d{2}|222[1-9]|22[3-9]\d|2[3-6]\d{2}|27[01]\d|2720)\d{12}$"),
            has_checksum: true,
            regions: &[NATIONWIDE],
        },
        CardFormat {
            card_type: CardType::Amex,
            issuer: "American Express",
            description: "American Express card with IC chip",
            lengths: &[15],
            pattern: compile(r"^3[47]\d{13}$"),
            has_checksum: true,
            regions: &[NATIONWIDE],
        },
        CardFormat {
            card_type: CardType::Pasmo,
            issuer: "PASMO Co., Ltd.",
            description: "PASMO transit IC card",
            lengths: &[16],
            pattern: compile(r"^3[0-3]\d{14}$"),
            has_checksum: false,
            regions: &["kanto", "yamanashi", "shizuoka"],
        },
        CardFormat {
            card_type: CardType::Icoca,
            issuer: "West Japan Railway Company",
            description: "ICOCA transit IC card",
            lengths: &[16],
            pattern: compile(r"^6\d{15}$"),
            has_checksum: false,
            regions: &["kansai", "chugoku", "hokuriku", "okayama"],
        },
        CardFormat {
            card_type: CardType::Suica,
            issuer: "East Japan Railway Company",
            description: "Suica transit IC card",
            lengths: &[16],
            pattern: compile(r"^\d{16}$"),
            has_checksum: false,
            regions: &["kanto", "tohoku", "niigata", "sendai"],
        },
        CardFormat {
            card_type: CardType::EmployeeId,
            issuer: "Company",
            description: "Employee identification IC card",
            lengths: &[10],
            pattern: compile(r"^\d{10}$"),
            has_checksum: false,
            regions: &[NATIONWIDE],
        },
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_patterns() {
        assert!(EMPLOYEE_ID.is_match("EMP001"));
        assert!(EMPLOYEE_ID.is_match("12345"));
        assert!(!EMPLOYEE_ID.is_match("EMP 001"));

        assert!(PHONE.is_match("03-1234-5678"));
        assert!(PHONE.is_match("090-1234-5678"));
        assert!(PHONE.is_match("+81-90-1234-5678"));
        assert!(!PHONE.is_match("phone"));

        assert!(EMAIL.is_match("taro.yamada@example.co.jp"));
        assert!(!EMAIL.is_match("taro@"));

        assert!(DATE.is_match("2024-03-15"));
        assert!(!DATE.is_match("2024-13-01"));

        assert!(TIME.is_match("23:59"));
        assert!(!TIME.is_match("24:00"));

        assert!(CARD_NUMBER_INPUT.is_match("1234-5678 9012"));
        assert!(!CARD_NUMBER_INPUT.is_match("-1234"));
    }

    #[test]
    fn test_card_formats_have_consistent_lengths() {
        for format in CARD_FORMATS.iter() {
            assert!(!format.lengths.is_empty(), "{:?}", format.card_type);
            assert!(!format.regions.is_empty(), "{:?}", format.card_type);
            for len in format.lengths {
                assert!((4..=20).contains(len), "{:?}", format.card_type);
            }
        }
    }
}
