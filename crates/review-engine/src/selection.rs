//! Selection and highlight coordination
//!
//! One authoritative [`SelectionState`] behind three entry points: select a
//! box on the document overlay, select a finding in the list, or select a
//! document tab. Each entry point re-derives the active document, box and
//! finding together so the three views cannot drift apart. After any of them
//! the active box belongs to the active document (or is `None`).

use crate::dataset::ReviewDataset;
use crate::filter::{FilterOutcome, SeverityFilter};
use crate::timer::{TimerBook, TimerKind, TimerToken};
use review_types::{Document, Severity};
use serde::Serialize;
use std::time::Duration;

/// Scroll-into-view requests for the renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", content = "id", rename_all = "snake_case")]
pub enum FocusTarget {
    /// Bring this finding's entry in the findings list into view
    Finding(String),
    /// Bring the document viewer into view
    DocumentView,
    /// Bring this ARR commentary entry into view
    Commentary(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionState {
    pub active_document_id: Option<String>,
    pub active_box_id: Option<String>,
    pub active_finding_id: Option<String>,
    pub severity_filters: SeverityFilter,
}

/// Transient highlight on a document tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pulse {
    pub document_id: String,
    token: TimerToken,
}

#[derive(Debug)]
pub struct SelectionCoordinator {
    state: SelectionState,
    pulse: Option<Pulse>,
    pulse_duration: Duration,
    show_document_boxes: bool,
    active_arr_box_id: Option<String>,
    show_arr_boxes: bool,
}

impl SelectionCoordinator {
    /// Anchor on the first document, its first box and its first finding.
    pub fn new(dataset: &ReviewDataset, pulse_duration: Duration) -> Self {
        let mut state = SelectionState::default();
        if let Some(doc) = dataset.first_document() {
            state.active_document_id = Some(doc.id.clone());
            state.active_box_id = doc.first_box_id().map(str::to_string);
            state.active_finding_id = dataset.first_finding_of(&doc.id).map(|f| f.id.clone());
        }
        Self {
            state,
            pulse: None,
            pulse_duration,
            show_document_boxes: true,
            active_arr_box_id: dataset.arr().boxes.first().map(|b| b.id.clone()),
            show_arr_boxes: true,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn pulse(&self) -> Option<&Pulse> {
        self.pulse.as_ref()
    }

    pub fn show_document_boxes(&self) -> bool {
        self.show_document_boxes
    }

    pub fn active_arr_box_id(&self) -> Option<&str> {
        self.active_arr_box_id.as_deref()
    }

    pub fn show_arr_boxes(&self) -> bool {
        self.show_arr_boxes
    }

    pub fn active_document<'a>(&self, dataset: &'a ReviewDataset) -> Option<&'a Document> {
        self.state
            .active_document_id
            .as_deref()
            .and_then(|id| dataset.document(id))
    }

    pub fn visible_findings<'a>(&self, dataset: &'a ReviewDataset) -> FilterOutcome<'a> {
        self.state.severity_filters.apply(dataset.findings())
    }

    /// A box was clicked on the document overlay.
    ///
    /// A box without a finding clears an active finding that belongs to a
    /// different document, so the selection never spans two documents.
    pub fn select_box(
        &mut self,
        dataset: &ReviewDataset,
        document_id: &str,
        box_id: &str,
    ) -> Vec<FocusTarget> {
        let Some(doc) = dataset.document(document_id) else {
            tracing::debug!(document_id, "Box selection for unknown document");
            return Vec::new();
        };
        if !doc.has_box(box_id) {
            tracing::debug!(document_id, box_id, "Box selection for unknown box");
            return Vec::new();
        }

        self.state.active_document_id = Some(doc.id.clone());
        self.state.active_box_id = Some(box_id.to_string());

        match dataset.finding_for_box(&doc.id, box_id) {
            Some(finding) => {
                self.state.active_finding_id = Some(finding.id.clone());
                vec![FocusTarget::Finding(finding.id.clone())]
            }
            None => {
                // keep the active finding only if it still belongs to this document
                let stale = self
                    .state
                    .active_finding_id
                    .as_deref()
                    .and_then(|id| dataset.finding(id))
                    .map_or(true, |f| f.document_id != doc.id);
                if stale {
                    self.state.active_finding_id = None;
                }
                Vec::new()
            }
        }
    }

    /// "View in document" on a finding. `explicit_box_id` wins over the
    /// finding's own box when it belongs to the finding's document.
    pub fn select_finding(
        &mut self,
        dataset: &ReviewDataset,
        timers: &mut TimerBook,
        finding_id: &str,
        explicit_box_id: Option<&str>,
    ) -> Vec<FocusTarget> {
        let Some(finding) = dataset.finding(finding_id) else {
            tracing::debug!(finding_id, "Selection for unknown finding");
            return Vec::new();
        };
        let Some(doc) = dataset.document(&finding.document_id) else {
            tracing::warn!(
                finding_id,
                document_id = %finding.document_id,
                "Finding references unknown document"
            );
            return Vec::new();
        };

        let box_id = explicit_box_id
            .filter(|b| doc.has_box(b))
            .or_else(|| finding.box_id.as_deref().filter(|b| doc.has_box(b)))
            .or_else(|| doc.first_box_id());

        self.state.active_document_id = Some(doc.id.clone());
        self.state.active_box_id = box_id.map(str::to_string);
        self.state.active_finding_id = Some(finding.id.clone());
        self.start_pulse(timers, &doc.id);

        vec![
            FocusTarget::Finding(finding.id.clone()),
            FocusTarget::DocumentView,
        ]
    }

    /// A document tab was clicked. Box and finding re-anchor on the document.
    pub fn select_document_tab(&mut self, dataset: &ReviewDataset, document_id: &str) {
        let Some(doc) = dataset.document(document_id) else {
            tracing::debug!(document_id, "Tab selection for unknown document");
            return;
        };
        self.state.active_document_id = Some(doc.id.clone());
        self.state.active_box_id = doc.first_box_id().map(str::to_string);
        self.state.active_finding_id = dataset.first_finding_of(&doc.id).map(|f| f.id.clone());
    }

    /// Toggle a severity filter. If the active finding drops out of the visible
    /// list, the first visible finding takes its place.
    pub fn toggle_severity(&mut self, dataset: &ReviewDataset, severity: Severity) {
        self.state.severity_filters.toggle(severity);

        let outcome = self.visible_findings(dataset);
        let still_visible = self
            .state
            .active_finding_id
            .as_deref()
            .is_some_and(|id| outcome.visible.iter().any(|f| f.id == id));
        if !still_visible {
            self.state.active_finding_id = outcome.visible.first().map(|f| f.id.clone());
        }
    }

    pub fn set_show_document_boxes(&mut self, show: bool) {
        self.show_document_boxes = show;
    }

    /// A commentary entry or ARR overlay box was selected on the results stage.
    pub fn select_commentary(&mut self, dataset: &ReviewDataset, box_id: &str) -> Vec<FocusTarget> {
        if !dataset.arr().boxes.iter().any(|b| b.id == box_id) {
            tracing::debug!(box_id, "Commentary selection for unknown box");
            return Vec::new();
        }
        self.active_arr_box_id = Some(box_id.to_string());
        vec![FocusTarget::Commentary(box_id.to_string())]
    }

    pub fn set_show_arr_boxes(&mut self, show: bool) {
        self.show_arr_boxes = show;
    }

    /// Clear the pulse if `token` is the timer that armed it.
    pub fn on_pulse_expired(&mut self, token: TimerToken) -> bool {
        match &self.pulse {
            Some(pulse) if pulse.token == token => {
                self.pulse = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear_pulse(&mut self, timers: &mut TimerBook) {
        if let Some(pulse) = self.pulse.take() {
            timers.disarm(pulse.token);
        }
    }

    /// Active box belongs to the active document
    pub fn is_consistent(&self, dataset: &ReviewDataset) -> bool {
        match (&self.state.active_document_id, &self.state.active_box_id) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(doc_id), Some(box_id)) => dataset
                .document(doc_id)
                .is_some_and(|doc| doc.has_box(box_id)),
        }
    }

    fn start_pulse(&mut self, timers: &mut TimerBook, document_id: &str) {
        self.clear_pulse(timers);
        let token = timers.arm(TimerKind::PulseClear, self.pulse_duration);
        self.pulse = Some(Pulse {
            document_id: document_id.to_string(),
            token,
        });
    }
}
