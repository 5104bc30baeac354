//! Stage state machine for the seven-step review wizard
//!
//! `max_unlocked` is the highest stage ever reached in the session. The
//! navigation bar may jump to any stage at or below it; anything higher is
//! silently refused because those controls are disabled in the UI anyway.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum Stage {
    Connect = 1,
    Analyze = 2,
    ReviewResults = 3,
    SelectAudits = 4,
    RunAudits = 5,
    ReviewFindings = 6,
    Export = 7,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Connect,
        Stage::Analyze,
        Stage::ReviewResults,
        Stage::SelectAudits,
        Stage::RunAudits,
        Stage::ReviewFindings,
        Stage::Export,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Stage> {
        Self::ALL.into_iter().find(|s| s.number() == n)
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::Connect => "ARR Connection",
            Stage::Analyze => "ARR Processing",
            Stage::ReviewResults => "ARR Results",
            Stage::SelectAudits => "Audit Selection",
            Stage::RunAudits => "Audit Processing",
            Stage::ReviewFindings => "Audit Findings",
            Stage::Export => "Export Report",
        }
    }

    pub fn subtitle(self) -> &'static str {
        match self {
            Stage::Connect => "Auto-detect ARR document inside workspace",
            Stage::Analyze => "Extraction + risk detection",
            Stage::ReviewResults => "PDF + commentary view",
            Stage::SelectAudits => "Choose which audits to run",
            Stage::RunAudits => "Cross-checking policies and matters",
            Stage::ReviewFindings => "Interactive findings dashboard",
            Stage::Export => "Distribute polished PDF output",
        }
    }

    pub fn nav_group(self) -> NavGroup {
        match self {
            Stage::Connect | Stage::Analyze | Stage::ReviewResults => NavGroup::Arr,
            Stage::SelectAudits | Stage::RunAudits | Stage::ReviewFindings => NavGroup::Audits,
            Stage::Export => NavGroup::Reports,
        }
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> u8 {
        stage.number()
    }
}

impl TryFrom<u8> for Stage {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Stage::from_number(n).ok_or_else(|| format!("stage {} is out of range 1..=7", n))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.title())
    }
}

/// Top-level navigation tabs grouping the stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavGroup {
    Arr,
    Audits,
    Reports,
}

impl NavGroup {
    pub fn label(self) -> &'static str {
        match self {
            NavGroup::Arr => "ARR Analysis",
            NavGroup::Audits => "Compliance Audits",
            NavGroup::Reports => "Reports",
        }
    }

    /// First stage of the group; the tab navigates there
    pub fn entry_stage(self) -> Stage {
        match self {
            NavGroup::Arr => Stage::Connect,
            NavGroup::Audits => Stage::SelectAudits,
            NavGroup::Reports => Stage::Export,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Complete,
    Active,
    Upcoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved { from: Stage, to: Stage },
    /// Already on the requested stage
    Unchanged,
    /// Locked, out of range, or a forward action issued from the wrong stage
    Rejected,
}

impl Navigation {
    pub fn moved(&self) -> bool {
        matches!(self, Navigation::Moved { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageState {
    current_stage: Stage,
    max_unlocked: Stage,
}

impl Default for StageState {
    fn default() -> Self {
        Self::new()
    }
}

impl StageState {
    pub fn new() -> Self {
        Self {
            current_stage: Stage::Connect,
            max_unlocked: Stage::Connect,
        }
    }

    pub fn current(&self) -> Stage {
        self.current_stage
    }

    pub fn max_unlocked(&self) -> Stage {
        self.max_unlocked
    }

    pub fn is_unlocked(&self, stage: Stage) -> bool {
        stage <= self.max_unlocked
    }

    pub fn step_status(&self, stage: Stage) -> StepStatus {
        match stage.cmp(&self.current_stage) {
            std::cmp::Ordering::Less => StepStatus::Complete,
            std::cmp::Ordering::Equal => StepStatus::Active,
            std::cmp::Ordering::Greater => StepStatus::Upcoming,
        }
    }

    /// Navigation-bar request. Stages above `max_unlocked` are refused.
    pub fn navigate(&mut self, target: u8) -> Navigation {
        match Stage::from_number(target) {
            Some(stage) if self.is_unlocked(stage) => self.transition(stage),
            _ => {
                tracing::debug!(
                    target,
                    max_unlocked = self.max_unlocked.number(),
                    "Refusing navigation to locked stage"
                );
                Navigation::Rejected
            }
        }
    }

    /// Explicit forward transition, accepted only from `from`.
    pub fn advance(&mut self, from: Stage, to: Stage) -> Navigation {
        if self.current_stage != from {
            tracing::debug!(
                current = self.current_stage.number(),
                expected = from.number(),
                "Ignoring transition issued from another stage"
            );
            return Navigation::Rejected;
        }
        self.transition(to)
    }

    fn transition(&mut self, to: Stage) -> Navigation {
        let from = self.current_stage;
        if from == to {
            return Navigation::Unchanged;
        }
        self.current_stage = to;
        self.max_unlocked = self.max_unlocked.max(to);
        tracing::info!(from = from.number(), to = to.number(), "Stage transition");
        Navigation::Moved { from, to }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Navigate(u8),
        Advance(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..10).prop_map(Op::Navigate),
            (1u8..7).prop_map(Op::Advance),
        ]
    }

    proptest! {
        /// Property: max_unlocked never decreases and always covers the current stage
        #[test]
        fn max_unlocked_is_monotone(ops in prop::collection::vec(op(), 0..60)) {
            let mut state = StageState::new();
            for op in ops {
                let before = state.max_unlocked();
                let current = state.current();
                match op {
                    Op::Navigate(target) => {
                        let outcome = state.navigate(target);
                        if target > before.number() {
                            prop_assert_eq!(outcome, Navigation::Rejected);
                            prop_assert_eq!(state.current(), current);
                        }
                    }
                    Op::Advance(n) => {
                        let from = Stage::from_number(n).unwrap();
                        let to = Stage::from_number(n + 1).unwrap();
                        state.advance(from, to);
                    }
                }
                prop_assert!(state.max_unlocked() >= before);
                prop_assert!(state.max_unlocked() >= state.current());
            }
        }
    }
}
