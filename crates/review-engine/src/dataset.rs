//! The loaded case: normalized documents and findings plus their index.
//!
//! Immutable after construction. A session holds it behind an `Arc`.

use crate::error::{ReviewError, Result};
use crate::index::CrossReferenceIndex;
use crate::normalize::{normalize_arr_boxes, normalize_records, NormalizeWarning};
use review_types::{Document, Finding, OverlayBox, RawDataset, SummaryCounts};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ArrOverlay {
    pub display_name: String,
    pub summary: String,
    pub boxes: Vec<OverlayBox>,
    pub insights: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ReviewDataset {
    documents: Vec<Document>,
    findings: Vec<Finding>,
    index: CrossReferenceIndex,
    arr: ArrOverlay,
    summary: SummaryCounts,
    warnings: Vec<NormalizeWarning>,
}

impl ReviewDataset {
    /// Normalize and index a raw bundle.
    ///
    /// # Errors
    ///
    /// Returns `EmptyDataset` when no document record survives normalization
    pub fn from_raw(raw: RawDataset) -> Result<Self> {
        let mut normalized = normalize_records(&raw.documents);
        if normalized.documents.is_empty() {
            return Err(ReviewError::EmptyDataset {
                dropped: normalized.warnings.len(),
            });
        }

        let arr = raw
            .arr
            .map(|overlay| {
                let source = overlay.source.clone().unwrap_or_default();
                ArrOverlay {
                    display_name: source.display_name.unwrap_or_default(),
                    summary: source.summary.unwrap_or_default(),
                    boxes: normalize_arr_boxes(&overlay, &mut normalized.warnings),
                    insights: overlay.insights,
                }
            })
            .unwrap_or_default();

        let index = CrossReferenceIndex::build(&normalized.documents, &normalized.findings);

        tracing::info!(
            documents = normalized.documents.len(),
            findings = normalized.findings.len(),
            warnings = normalized.warnings.len(),
            "Loaded review dataset"
        );

        Ok(Self {
            documents: normalized.documents,
            findings: normalized.findings,
            index,
            arr,
            summary: raw
                .summary
                .and_then(|record| record.summary)
                .unwrap_or_default(),
            warnings: normalized.warnings,
        })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: RawDataset = serde_json::from_str(s)?;
        Self::from_raw(raw)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Documents in input order, which is also tab order
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn arr(&self) -> &ArrOverlay {
        &self.arr
    }

    pub fn summary(&self) -> SummaryCounts {
        self.summary
    }

    pub fn warnings(&self) -> &[NormalizeWarning] {
        &self.warnings
    }

    pub fn first_document(&self) -> Option<&Document> {
        self.documents.first()
    }

    pub fn document(&self, document_id: &str) -> Option<&Document> {
        self.index
            .document(document_id)
            .map(|pos| &self.documents[pos])
    }

    pub fn finding(&self, finding_id: &str) -> Option<&Finding> {
        self.index.finding(finding_id).map(|pos| &self.findings[pos])
    }

    pub fn finding_for_box(&self, document_id: &str, box_id: &str) -> Option<&Finding> {
        self.index
            .finding_for_box(document_id, box_id)
            .map(|pos| &self.findings[pos])
    }

    pub fn first_finding_of(&self, document_id: &str) -> Option<&Finding> {
        self.index
            .first_finding_of(document_id)
            .map(|pos| &self.findings[pos])
    }
}
