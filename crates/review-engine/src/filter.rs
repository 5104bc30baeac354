//! Severity filter for the findings list

use review_types::{Finding, Severity};
use serde::Serialize;
use std::collections::BTreeSet;

/// Active severity filters. Empty means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityFilter {
    active: BTreeSet<Severity>,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome<'a> {
    pub visible: Vec<&'a Finding>,
    pub hidden: usize,
}

impl SeverityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the level if absent, remove it if present. Returns whether it is now active.
    pub fn toggle(&mut self, severity: Severity) -> bool {
        if self.active.remove(&severity) {
            false
        } else {
            self.active.insert(severity);
            true
        }
    }

    pub fn contains(&self, severity: Severity) -> bool {
        self.active.contains(&severity)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn levels(&self) -> impl Iterator<Item = Severity> + '_ {
        self.active.iter().copied()
    }

    pub fn admits(&self, finding: &Finding) -> bool {
        self.active.is_empty() || self.active.contains(&finding.severity)
    }

    pub fn apply<'a>(&self, findings: &'a [Finding]) -> FilterOutcome<'a> {
        let visible: Vec<&Finding> = findings.iter().filter(|f| self.admits(f)).collect();
        let hidden = findings.len().saturating_sub(visible.len());
        FilterOutcome { visible, hidden }
    }
}
