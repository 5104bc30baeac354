//! Simulated progress drivers for the analysis and audit stages
//!
//! A driver owns exactly one stage. While running it arms a tick every
//! `cadence`, bumps `value` by a random amount in the increment range, and once
//! `value` reaches 100 arms a single settle timer whose delivery stops the
//! driver and names the stage to advance to.

use crate::stage::Stage;
use crate::timer::{DriverKind, TimerBook, TimerKind, TimerToken};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

pub const COMPLETE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressProfile {
    pub cadence: Duration,
    pub increment_min: f64,
    pub increment_max: f64,
    pub start_value: f64,
    pub settle: Duration,
    /// Processing step labels shown under the bar
    pub steps: Vec<String>,
    /// Status line per step; may be empty
    pub messages: Vec<String>,
}

impl ProgressProfile {
    pub fn analysis() -> Self {
        Self {
            cadence: Duration::from_millis(850),
            increment_min: 12.0,
            increment_max: 24.0,
            start_value: 5.0,
            settle: Duration::from_millis(500),
            steps: strings(&[
                "Document structure identified",
                "Questions and responses extracted",
                "Analyzing risk indicators",
                "Mapping source locations",
                "Generating commentary",
            ]),
            messages: strings(&[
                "Processing question 14 of 92…",
                "Processing question 32 of 92…",
                "Processing question 58 of 92…",
                "Processing question 74 of 92…",
                "Processing question 91 of 92…",
            ]),
        }
    }

    pub fn audit() -> Self {
        Self {
            cadence: Duration::from_millis(900),
            increment_min: 14.0,
            increment_max: 14.0,
            start_value: 12.0,
            settle: Duration::from_millis(700),
            steps: strings(&[
                "Policy commitments extracted (AML_Policy.pdf)",
                "Cyber policy extracted",
                "Processing matter files (4 of 10)",
                "Cross-referencing against CLC codes",
                "Generating audit findings",
            ]),
            messages: Vec::new(),
        }
    }

    fn draw_increment<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.increment_max <= self.increment_min {
            self.increment_min
        } else {
            rng.gen_range(self.increment_min..=self.increment_max)
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProgressState {
    pub running: bool,
    pub value: f64,
}

impl ProgressState {
    /// Index of the processing step matching the current value
    pub fn step_index(&self, step_count: usize) -> usize {
        if step_count == 0 {
            return 0;
        }
        let raw = (self.value.clamp(0.0, COMPLETE) / COMPLETE * step_count as f64).floor();
        (raw as usize).min(step_count - 1)
    }
}

#[derive(Debug)]
pub struct ProgressDriver {
    kind: DriverKind,
    profile: ProgressProfile,
    state: ProgressState,
    pending: Option<TimerToken>,
}

impl ProgressDriver {
    pub fn new(kind: DriverKind, profile: ProgressProfile) -> Self {
        Self {
            kind,
            profile,
            state: ProgressState::default(),
            pending: None,
        }
    }

    pub fn kind(&self) -> DriverKind {
        self.kind
    }

    /// The stage this driver runs in
    pub fn owner(&self) -> Stage {
        match self.kind {
            DriverKind::Analysis => Stage::Analyze,
            DriverKind::Audit => Stage::RunAudits,
        }
    }

    /// The stage requested once the driver completes
    pub fn completes_to(&self) -> Stage {
        match self.kind {
            DriverKind::Analysis => Stage::ReviewResults,
            DriverKind::Audit => Stage::ReviewFindings,
        }
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    pub fn profile(&self) -> &ProgressProfile {
        &self.profile
    }

    pub fn pending(&self) -> Option<TimerToken> {
        self.pending
    }

    /// (Re)start from the profile's start value. Any pending timer is dropped.
    pub fn start(&mut self, timers: &mut TimerBook) {
        self.cancel_pending(timers);
        self.state = ProgressState {
            running: true,
            value: self.profile.start_value,
        };
        self.schedule_next(timers);
    }

    /// Handle a tick delivery. Returns false when the tick no longer applies.
    pub fn on_tick<R: Rng + ?Sized>(
        &mut self,
        token: TimerToken,
        current: Stage,
        timers: &mut TimerBook,
        rng: &mut R,
    ) -> bool {
        if !self.owns(token, current) {
            return false;
        }
        self.pending = None;
        let increment = self.profile.draw_increment(rng);
        self.state.value = (self.state.value + increment).min(COMPLETE);
        tracing::debug!(driver = ?self.kind, value = self.state.value, "Progress tick");
        self.schedule_next(timers);
        true
    }

    /// Handle the settle delivery: stop and return the stage to advance to.
    pub fn on_settle(&mut self, token: TimerToken, current: Stage) -> Option<Stage> {
        if !self.owns(token, current) {
            return None;
        }
        self.pending = None;
        self.state.running = false;
        tracing::info!(driver = ?self.kind, "Simulated progress complete");
        Some(self.completes_to())
    }

    /// Stop because the owning stage was left. A run still in flight loses its
    /// progress; a finished run keeps its final value.
    pub fn teardown(&mut self, timers: &mut TimerBook) {
        self.cancel_pending(timers);
        if self.state.running {
            tracing::debug!(driver = ?self.kind, value = self.state.value, "Tearing down progress");
            self.state = ProgressState::default();
        }
    }

    fn owns(&self, token: TimerToken, current: Stage) -> bool {
        self.state.running && self.pending == Some(token) && current == self.owner()
    }

    fn cancel_pending(&mut self, timers: &mut TimerBook) {
        if let Some(token) = self.pending.take() {
            timers.disarm(token);
        }
    }

    fn schedule_next(&mut self, timers: &mut TimerBook) {
        let token = if self.state.value >= COMPLETE {
            timers.arm(TimerKind::ProgressSettle(self.kind), self.profile.settle)
        } else {
            timers.arm(TimerKind::ProgressTick(self.kind), self.profile.cadence)
        };
        self.pending = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn deliver(
        driver: &mut ProgressDriver,
        timers: &mut TimerBook,
        rng: &mut StdRng,
        current: Stage,
    ) -> Option<Stage> {
        let token = driver.pending().expect("driver should have a pending timer");
        match timers.fire(token) {
            Some(TimerKind::ProgressTick(_)) => {
                driver.on_tick(token, current, timers, rng);
                None
            }
            Some(TimerKind::ProgressSettle(_)) => driver.on_settle(token, current),
            other => panic!("unexpected timer {:?}", other),
        }
    }

    #[test]
    fn test_start_arms_tick() {
        let mut timers = TimerBook::new();
        let mut driver = ProgressDriver::new(DriverKind::Analysis, ProgressProfile::analysis());
        driver.start(&mut timers);
        assert_eq!(
            driver.state(),
            ProgressState {
                running: true,
                value: 5.0
            }
        );
        assert!(timers.is_armed(driver.pending().unwrap()));
    }

    #[test]
    fn test_audit_run_advances_to_findings() {
        let mut timers = TimerBook::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut driver = ProgressDriver::new(DriverKind::Audit, ProgressProfile::audit());
        driver.start(&mut timers);

        let mut advanced = None;
        let mut ticks = 0;
        while advanced.is_none() {
            advanced = deliver(&mut driver, &mut timers, &mut rng, Stage::RunAudits);
            ticks += 1;
        }
        // 12 + 7 * 14 = 110 -> capped at 100, then one settle delivery
        assert_eq!(ticks, 8);
        assert_eq!(advanced, Some(Stage::ReviewFindings));
        assert_eq!(
            driver.state(),
            ProgressState {
                running: false,
                value: 100.0
            }
        );
        assert_eq!(driver.pending(), None);
        assert_eq!(timers.armed_count(), 0);
    }

    #[test]
    fn test_tick_for_other_stage_is_ignored() {
        let mut timers = TimerBook::new();
        let mut rng = StdRng::seed_from_u64(2);
        let mut driver = ProgressDriver::new(DriverKind::Analysis, ProgressProfile::analysis());
        driver.start(&mut timers);
        let token = driver.pending().unwrap();
        assert!(!driver.on_tick(token, Stage::Connect, &mut timers, &mut rng));
        assert_eq!(driver.state().value, 5.0);
    }

    #[test]
    fn test_teardown_resets_running_driver() {
        let mut timers = TimerBook::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut driver = ProgressDriver::new(DriverKind::Analysis, ProgressProfile::analysis());
        driver.start(&mut timers);
        deliver(&mut driver, &mut timers, &mut rng, Stage::Analyze);
        let token = driver.pending().unwrap();

        driver.teardown(&mut timers);
        assert_eq!(driver.state(), ProgressState::default());
        assert!(!timers.is_armed(token));
        assert_eq!(timers.fire(token), None);
    }

    #[test]
    fn test_teardown_keeps_completed_value() {
        let mut timers = TimerBook::new();
        let mut rng = StdRng::seed_from_u64(4);
        let mut driver = ProgressDriver::new(DriverKind::Audit, ProgressProfile::audit());
        driver.start(&mut timers);
        while deliver(&mut driver, &mut timers, &mut rng, Stage::RunAudits).is_none() {}
        driver.teardown(&mut timers);
        assert_eq!(driver.state().value, 100.0);
        assert!(!driver.state().running);
    }

    #[test]
    fn test_step_index() {
        let state = |value| ProgressState {
            running: true,
            value,
        };
        assert_eq!(state(0.0).step_index(5), 0);
        assert_eq!(state(19.9).step_index(5), 0);
        assert_eq!(state(20.0).step_index(5), 1);
        assert_eq!(state(99.0).step_index(5), 4);
        assert_eq!(state(100.0).step_index(5), 4);
        assert_eq!(state(50.0).step_index(0), 0);
    }
}
