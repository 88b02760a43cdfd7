//! Validation counters owned by a validator instance
//!
//! Counters are lock-free atomics so that validations running on several
//! threads never lose updates. The last-validation timestamp lives in an
//! `ArcSwapOption` for the same reason.

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::scanner::SecurityViolationKind;

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStats {
    pub total_validations: u64,
    pub successful_validations: u64,
    pub failed_validations: u64,
    pub security_violations: u64,
    pub sql_injection_attempts: u64,
    pub os_command_injection_attempts: u64,
    pub xss_attempts: u64,
    pub last_validation: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct StatsRecorder {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    security: AtomicU64,
    sql_injection: AtomicU64,
    os_command: AtomicU64,
    xss: AtomicU64,
    last_validation: ArcSwapOption<DateTime<Utc>>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.successful.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    pub fn record_failure(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    /// Counts a failed validation caused by a detected attack pattern
    pub fn record_violation(&self, kind: SecurityViolationKind) {
        self.record_failure();
        self.security.fetch_add(1, Ordering::Relaxed);
        let counter = match kind {
            SecurityViolationKind::SqlInjection => &self.sql_injection,
            SecurityViolationKind::OsCommandInjection => &self.os_command,
            SecurityViolationKind::Xss => &self.xss,
            SecurityViolationKind::None => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ValidationStats {
        ValidationStats {
            total_validations: self.total.load(Ordering::Relaxed),
            successful_validations: self.successful.load(Ordering::Relaxed),
            failed_validations: self.failed.load(Ordering::Relaxed),
            security_violations: self.security.load(Ordering::Relaxed),
            sql_injection_attempts: self.sql_injection.load(Ordering::Relaxed),
            os_command_injection_attempts: self.os_command.load(Ordering::Relaxed),
            xss_attempts: self.xss.load(Ordering::Relaxed),
            last_validation: self.last_validation.load_full().map(|t| *t),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.total,
            &self.successful,
            &self.failed,
            &self.security,
            &self.sql_injection,
            &self.os_command,
            &self.xss,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.last_validation.store(None);
    }

    fn touch(&self) {
        self.last_validation.store(Some(Arc::new(Utc::now())));
    }
}
