//! Session reducer
//!
//! [`ReviewSession::apply`] handles one [`Action`] to completion and returns
//! the effects the runtime must carry out: arm or disarm timers, and scroll
//! targets into view. It never blocks and never spawns anything itself.

use crate::audits::AuditCatalog;
use crate::config::ReviewConfig;
use crate::dataset::ReviewDataset;
use crate::progress::ProgressDriver;
use crate::selection::SelectionCoordinator;
use crate::stage::{Navigation, Stage, StageState};
use crate::timer::{DriverKind, TimerBook, TimerCommand, TimerKind, TimerToken};
use rand::rngs::StdRng;
use rand::SeedableRng;
use review_types::Severity;
use std::sync::Arc;

pub use crate::selection::FocusTarget;

/// User-facing controls, plus timer deliveries from the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    NavigateTo(u8),
    StartAnalysis,
    ProceedToAudits,
    ToggleAudit(String),
    RunSelectedAudits,
    ExportReport,
    SelectCommentary(String),
    ShowArrHighlights(bool),
    SelectBox {
        document_id: String,
        box_id: String,
    },
    SelectFinding {
        finding_id: String,
        box_id: Option<String>,
    },
    SelectDocumentTab(String),
    ToggleSeverityFilter(Severity),
    ShowDocumentHighlights(bool),
    TimerFired(TimerToken),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Timer(TimerCommand),
    Focus(FocusTarget),
}

pub struct ReviewSession {
    dataset: Arc<ReviewDataset>,
    stages: StageState,
    analysis: ProgressDriver,
    audit: ProgressDriver,
    audits: AuditCatalog,
    selection: SelectionCoordinator,
    timers: TimerBook,
    rng: StdRng,
}

impl ReviewSession {
    pub fn new(dataset: Arc<ReviewDataset>, config: &ReviewConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let selection = SelectionCoordinator::new(&dataset, config.pulse_duration());
        Self {
            stages: StageState::new(),
            analysis: ProgressDriver::new(DriverKind::Analysis, config.analysis_profile()),
            audit: ProgressDriver::new(DriverKind::Audit, config.audit_profile()),
            audits: AuditCatalog::new(config.audits.clone()),
            selection,
            timers: TimerBook::new(),
            rng,
            dataset,
        }
    }

    pub fn dataset(&self) -> &ReviewDataset {
        &self.dataset
    }

    pub fn stages(&self) -> StageState {
        self.stages
    }

    pub fn current_stage(&self) -> Stage {
        self.stages.current()
    }

    pub fn analysis(&self) -> &ProgressDriver {
        &self.analysis
    }

    pub fn audit(&self) -> &ProgressDriver {
        &self.audit
    }

    pub fn audits(&self) -> &AuditCatalog {
        &self.audits
    }

    pub fn selection(&self) -> &SelectionCoordinator {
        &self.selection
    }

    pub fn armed_timers(&self) -> usize {
        self.timers.armed_count()
    }

    pub fn apply(&mut self, action: Action) -> Vec<Effect> {
        let focus = self.handle(action);
        let mut effects: Vec<Effect> = self
            .timers
            .drain_commands()
            .into_iter()
            .map(Effect::Timer)
            .collect();
        effects.extend(focus.into_iter().map(Effect::Focus));
        effects
    }

    fn handle(&mut self, action: Action) -> Vec<FocusTarget> {
        let current = self.stages.current();
        match action {
            Action::NavigateTo(target) => {
                let nav = self.stages.navigate(target);
                self.after_transition(nav);
            }
            Action::StartAnalysis => {
                let nav = self.stages.advance(Stage::Connect, Stage::Analyze);
                if nav.moved() {
                    self.after_transition(nav);
                    self.analysis.start(&mut self.timers);
                }
            }
            Action::ProceedToAudits => {
                let nav = self.stages.advance(Stage::ReviewResults, Stage::SelectAudits);
                self.after_transition(nav);
            }
            Action::ToggleAudit(id) => {
                if self.expect_stage(Stage::SelectAudits) {
                    self.audits.toggle(&id);
                }
            }
            Action::RunSelectedAudits => {
                if current != Stage::SelectAudits || !self.audits.can_run() {
                    tracing::debug!(
                        stage = current.number(),
                        selected = self.audits.selected_count(),
                        "Ignoring run request"
                    );
                    return Vec::new();
                }
                let nav = self.stages.advance(Stage::SelectAudits, Stage::RunAudits);
                self.after_transition(nav);
                self.audit.start(&mut self.timers);
            }
            Action::ExportReport => {
                let nav = self.stages.advance(Stage::ReviewFindings, Stage::Export);
                self.after_transition(nav);
            }
            Action::SelectCommentary(box_id) => {
                if self.expect_stage(Stage::ReviewResults) {
                    return self.selection.select_commentary(&self.dataset, &box_id);
                }
            }
            Action::ShowArrHighlights(show) => {
                if self.expect_stage(Stage::ReviewResults) {
                    self.selection.set_show_arr_boxes(show);
                }
            }
            Action::SelectBox {
                document_id,
                box_id,
            } => {
                if self.expect_stage(Stage::ReviewFindings) {
                    return self
                        .selection
                        .select_box(&self.dataset, &document_id, &box_id);
                }
            }
            Action::SelectFinding { finding_id, box_id } => {
                if self.expect_stage(Stage::ReviewFindings) {
                    return self.selection.select_finding(
                        &self.dataset,
                        &mut self.timers,
                        &finding_id,
                        box_id.as_deref(),
                    );
                }
            }
            Action::SelectDocumentTab(document_id) => {
                if self.expect_stage(Stage::ReviewFindings) {
                    self.selection
                        .select_document_tab(&self.dataset, &document_id);
                }
            }
            Action::ToggleSeverityFilter(severity) => {
                if self.expect_stage(Stage::ReviewFindings) {
                    self.selection.toggle_severity(&self.dataset, severity);
                }
            }
            Action::ShowDocumentHighlights(show) => {
                if self.expect_stage(Stage::ReviewFindings) {
                    self.selection.set_show_document_boxes(show);
                }
            }
            Action::TimerFired(token) => self.on_timer(token),
        }
        Vec::new()
    }

    fn on_timer(&mut self, token: TimerToken) {
        let Some(kind) = self.timers.fire(token) else {
            return;
        };
        let current = self.stages.current();
        match kind {
            TimerKind::ProgressTick(which) => {
                let driver = match which {
                    DriverKind::Analysis => &mut self.analysis,
                    DriverKind::Audit => &mut self.audit,
                };
                driver.on_tick(token, current, &mut self.timers, &mut self.rng);
            }
            TimerKind::ProgressSettle(which) => {
                let driver = match which {
                    DriverKind::Analysis => &mut self.analysis,
                    DriverKind::Audit => &mut self.audit,
                };
                let owner = driver.owner();
                if let Some(next) = driver.on_settle(token, current) {
                    let nav = self.stages.advance(owner, next);
                    self.after_transition(nav);
                }
            }
            TimerKind::PulseClear => {
                self.selection.on_pulse_expired(token);
            }
        }
    }

    /// Tear down whatever was tied to the stage just left.
    fn after_transition(&mut self, nav: Navigation) {
        let Navigation::Moved { from, to } = nav else {
            return;
        };
        for driver in [&mut self.analysis, &mut self.audit] {
            if driver.owner() != to {
                driver.teardown(&mut self.timers);
            }
        }
        if from == Stage::ReviewFindings {
            self.selection.clear_pulse(&mut self.timers);
        }
    }

    fn expect_stage(&self, stage: Stage) -> bool {
        let current = self.stages.current();
        if current != stage {
            tracing::debug!(
                current = current.number(),
                expected = stage.number(),
                "Ignoring control outside its stage"
            );
        }
        current == stage
    }
}
