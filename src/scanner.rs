//! Attack-pattern detection
//!
//! A heuristic blacklist over the pattern sets in `patterns`. The scan is a
//! pure predicate: it never modifies its input and keeps no state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::patterns::{NamedPattern, OS_COMMAND_PATTERNS, SQL_INJECTION_PATTERNS, XSS_PATTERNS};

/// The single highest-priority violation found in a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityViolationKind {
    SqlInjection,
    OsCommandInjection,
    Xss,
    None,
}

impl SecurityViolationKind {
    pub fn label(&self) -> &'static str {
        match self {
            SecurityViolationKind::SqlInjection => "SQL injection",
            SecurityViolationKind::OsCommandInjection => "OS command injection",
            SecurityViolationKind::Xss => "cross-site scripting",
            SecurityViolationKind::None => "none",
        }
    }
}

impl fmt::Display for SecurityViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub violation: SecurityViolationKind,
    /// Name of the matched pattern, absent when the value is clean
    pub detail: Option<String>,
}

impl ScanResult {
    pub fn is_safe(&self) -> bool {
        self.violation == SecurityViolationKind::None
    }
}

/// Scans a value against the SQL, OS command and XSS pattern sets in that
/// order and reports the first match.
///
/// A value carrying control characters is also scanned with them removed,
/// so `java\tscript:` or a NUL inside `<script>` is still caught.
///
/// # Examples
///
/// ```
/// use cardguard::scanner::{scan, SecurityViolationKind};
///
/// assert_eq!(scan("'; DROP TABLE users; --").violation, SecurityViolationKind::SqlInjection);
/// assert!(scan("Lost at Shinjuku station").is_safe());
/// ```
pub fn scan(value: &str) -> ScanResult {
    let result = scan_text(value);
    if !result.is_safe() || !value.chars().any(char::is_control) {
        return result;
    }

    // Control characters dropped on output must not split a pattern
    let collapsed: String = value.chars().filter(|c| !c.is_control()).collect();
    scan_text(&collapsed)
}

fn scan_text(value: &str) -> ScanResult {
    let groups: [(SecurityViolationKind, &[NamedPattern]); 3] = [
        (SecurityViolationKind::SqlInjection, SQL_INJECTION_PATTERNS.as_slice()),
        (SecurityViolationKind::OsCommandInjection, OS_COMMAND_PATTERNS.as_slice()),
        (SecurityViolationKind::Xss, XSS_PATTERNS.as_slice()),
    ];

    for (kind, patterns) in groups {
        if let Some(hit) = patterns.iter().find(|p| p.regex.is_match(value)) {
            return ScanResult {
                violation: kind,
                detail: Some(hit.name.to_string()),
            };
        }
    }

    ScanResult {
        violation: SecurityViolationKind::None,
        detail: None,
    }
}
