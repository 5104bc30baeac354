//! Read-only view-model handed to the renderer
//!
//! Built fresh from a session after every action. Everything here is owned
//! and serializable; the renderer never writes back.

use crate::audits::AuditOption;
use crate::dataset::ArrOverlay;
use crate::progress::{ProgressDriver, ProgressState};
use crate::session::ReviewSession;
use crate::stage::{NavGroup, Stage, StageState, StepStatus};
use review_types::{Document, Finding, Severity, SummaryCounts};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ViewModel {
    pub stage: StageState,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub timeline: Vec<TimelineStep>,
    pub nav: Vec<NavTab>,
    pub content: StageView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineStep {
    pub stage: Stage,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub status: StepStatus,
    /// Reachable from the navigation bar
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavTab {
    pub group: NavGroup,
    pub label: &'static str,
    pub stage: Stage,
    pub active: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum StageView {
    Connect {
        arr_document: String,
        document_count: usize,
    },
    Analyzing(ProcessingView),
    ArrResults(ArrResultsView),
    AuditSelection {
        options: Vec<AuditOption>,
        selected_count: usize,
        can_run: bool,
    },
    Auditing {
        processing: ProcessingView,
        audits: Vec<String>,
    },
    Findings(FindingsView),
    Export {
        audits: Vec<String>,
        document_count: usize,
        finding_count: usize,
        summary: Vec<SummaryCard>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingView {
    pub progress: ProgressState,
    pub steps: Vec<ProcessingStep>,
    /// Status line for the active step, when the profile has one
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingStep {
    pub label: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArrResultsView {
    #[serde(flatten)]
    pub overlay: ArrOverlay,
    pub active_box_id: Option<String>,
    pub show_highlights: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryCard {
    pub level: Severity,
    pub label: &'static str,
    pub count: u32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentTab {
    pub id: String,
    pub label: String,
    pub severity: Severity,
    pub active: bool,
    pub pulse: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentPane {
    pub document: Document,
    pub active_box_id: Option<String>,
    pub show_highlights: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindingRow {
    #[serde(flatten)]
    pub finding: Finding,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindingsView {
    pub summary: Vec<SummaryCard>,
    pub tabs: Vec<DocumentTab>,
    pub document: Option<DocumentPane>,
    pub findings: Vec<FindingRow>,
    pub hidden_count: usize,
}

impl ViewModel {
    pub fn build(session: &ReviewSession) -> Self {
        let stages = session.stages();
        let current = stages.current();

        let timeline = Stage::ALL
            .iter()
            .map(|&stage| TimelineStep {
                stage,
                title: stage.title(),
                subtitle: stage.subtitle(),
                status: stages.step_status(stage),
                enabled: stages.is_unlocked(stage),
            })
            .collect();

        let nav = [NavGroup::Arr, NavGroup::Audits, NavGroup::Reports]
            .into_iter()
            .map(|group| NavTab {
                group,
                label: group.label(),
                stage: group.entry_stage(),
                active: current.nav_group() == group,
                enabled: stages.is_unlocked(group.entry_stage()),
            })
            .collect();

        Self {
            stage: stages,
            title: current.title(),
            subtitle: current.subtitle(),
            timeline,
            nav,
            content: StageView::build(session),
        }
    }
}

impl StageView {
    fn build(session: &ReviewSession) -> Self {
        let dataset = session.dataset();
        match session.current_stage() {
            Stage::Connect => StageView::Connect {
                arr_document: dataset.arr().display_name.clone(),
                document_count: dataset.documents().len(),
            },
            Stage::Analyze => StageView::Analyzing(ProcessingView::build(session.analysis())),
            Stage::ReviewResults => {
                let selection = session.selection();
                StageView::ArrResults(ArrResultsView {
                    overlay: dataset.arr().clone(),
                    active_box_id: selection.active_arr_box_id().map(str::to_string),
                    show_highlights: selection.show_arr_boxes(),
                })
            }
            Stage::SelectAudits => StageView::AuditSelection {
                options: session.audits().options().to_vec(),
                selected_count: session.audits().selected_count(),
                can_run: session.audits().can_run(),
            },
            Stage::RunAudits => StageView::Auditing {
                processing: ProcessingView::build(session.audit()),
                audits: session.audits().selected_titles(),
            },
            Stage::ReviewFindings => StageView::Findings(FindingsView::build(session)),
            Stage::Export => StageView::Export {
                audits: session.audits().selected_titles(),
                document_count: dataset.documents().len(),
                finding_count: dataset.findings().len(),
                summary: summary_cards(dataset.summary(), |_| false),
            },
        }
    }
}

impl ProcessingView {
    fn build(driver: &ProgressDriver) -> Self {
        let progress = driver.state();
        let profile = driver.profile();
        let active = progress.step_index(profile.steps.len());
        let steps = profile
            .steps
            .iter()
            .enumerate()
            .map(|(i, label)| ProcessingStep {
                label: label.clone(),
                status: match i.cmp(&active) {
                    std::cmp::Ordering::Less => StepStatus::Complete,
                    std::cmp::Ordering::Equal => StepStatus::Active,
                    std::cmp::Ordering::Greater => StepStatus::Upcoming,
                },
            })
            .collect();
        Self {
            progress,
            steps,
            message: profile.messages.get(active).cloned(),
        }
    }
}

impl FindingsView {
    fn build(session: &ReviewSession) -> Self {
        let dataset = session.dataset();
        let selection = session.selection();
        let state = selection.state();
        let pulsing = selection.pulse().map(|p| p.document_id.as_str());

        let tabs = dataset
            .documents()
            .iter()
            .map(|doc| DocumentTab {
                id: doc.id.clone(),
                label: doc.label.clone(),
                severity: doc.severity,
                active: state.active_document_id.as_deref() == Some(doc.id.as_str()),
                pulse: pulsing == Some(doc.id.as_str()),
            })
            .collect();

        let document = selection.active_document(dataset).map(|doc| DocumentPane {
            document: doc.clone(),
            active_box_id: state.active_box_id.clone(),
            show_highlights: selection.show_document_boxes(),
        });

        let outcome = selection.visible_findings(dataset);
        let findings = outcome
            .visible
            .iter()
            .map(|f| FindingRow {
                finding: (*f).clone(),
                active: state.active_finding_id.as_deref() == Some(f.id.as_str()),
            })
            .collect();

        Self {
            summary: summary_cards(dataset.summary(), |level| {
                state.severity_filters.contains(level)
            }),
            tabs,
            document,
            findings,
            hidden_count: outcome.hidden,
        }
    }
}

/// The four summary cards in display order. A missing count shows as zero.
pub fn summary_cards(counts: SummaryCounts, active: impl Fn(Severity) -> bool) -> Vec<SummaryCard> {
    [
        (Severity::Critical, "Critical", counts.critical),
        (Severity::Warning, "Warnings", counts.warning),
        (Severity::Pass, "Passed", counts.pass),
        (Severity::BestPractice, "Best Practice", counts.best_practice),
    ]
    .into_iter()
    .map(|(level, label, count)| SummaryCard {
        level,
        label,
        count: count.unwrap_or(0),
        active: active(level),
    })
    .collect()
}
