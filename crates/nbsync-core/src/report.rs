// ── Sync report ──
//
// Outcome of one pass: write counters, cable outcomes, skipped links and
// every per-object failure. Serialisable for `--output json|yaml`.

use serde::Serialize;

use crate::apply::ApplyStats;
use crate::cable::CableOutcome;
use crate::error::CoreError;

/// A declared object whose pipeline failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Declaration kind, e.g. `device` or `vlan`.
    pub kind: &'static str,
    pub name: String,
    pub error: String,
}

/// A link intent that could not be resolved to two ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLink {
    pub device: String,
    pub port: String,
    pub peer_device: String,
    pub peer_port: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CableStats {
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub already_connected: u64,
    pub duplicates: u64,
}

impl CableStats {
    pub fn record(&mut self, outcome: CableOutcome) {
        match outcome {
            CableOutcome::Created => self.created += 1,
            CableOutcome::Updated => self.updated += 1,
            CableOutcome::Unchanged => self.unchanged += 1,
            CableOutcome::AlreadyConnected => self.already_connected += 1,
            CableOutcome::AlreadyProcessed => self.duplicates += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub dry_run: bool,
    /// Object writes, cables included.
    pub objects: ApplyStats,
    pub cables: CableStats,
    pub skipped_links: Vec<SkippedLink>,
    pub failures: Vec<Failure>,
}

impl SyncReport {
    pub fn fail(&mut self, kind: &'static str, name: &str, error: &CoreError) {
        tracing::error!(kind, name, error = %error, "reconciliation failed");
        self.failures.push(Failure {
            kind,
            name: name.to_owned(),
            error: error.to_string(),
        });
    }

    /// `true` when every declared object converged.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cable_outcomes_are_counted() {
        let mut stats = CableStats::default();
        stats.record(CableOutcome::Created);
        stats.record(CableOutcome::AlreadyProcessed);
        stats.record(CableOutcome::AlreadyProcessed);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.duplicates, 2);
    }

    #[test]
    fn failures_make_report_incomplete() {
        let mut report = SyncReport::default();
        assert!(report.is_complete());
        report.fail(
            "device",
            "srv01",
            &CoreError::NotFound {
                kind: "site",
                identifier: "dc9".into(),
            },
        );
        assert!(!report.is_complete());
        assert_eq!(report.failures[0].error, "site not found: dc9");
    }
}
