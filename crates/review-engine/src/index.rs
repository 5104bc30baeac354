//! Cross-reference index
//!
//! Position lookups into the normalized document and finding vectors, built
//! once per dataset. Every lookup is a hash probe: document by id, finding by
//! id, finding by `(document, box)`, and first finding of a document.

use review_types::{Document, Finding};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct CrossReferenceIndex {
    documents: HashMap<String, usize>,
    findings: HashMap<String, usize>,
    by_box: HashMap<String, HashMap<String, usize>>,
    first_finding: HashMap<String, usize>,
}

impl CrossReferenceIndex {
    pub fn build(documents: &[Document], findings: &[Finding]) -> Self {
        let mut index = Self::default();

        for (pos, doc) in documents.iter().enumerate() {
            index.documents.entry(doc.id.clone()).or_insert(pos);
        }

        for (pos, finding) in findings.iter().enumerate() {
            let Some(&doc_pos) = index.documents.get(&finding.document_id) else {
                tracing::warn!(
                    finding = %finding.id,
                    document = %finding.document_id,
                    "Finding references unknown document; not indexed"
                );
                continue;
            };

            // Normalized input never repeats a finding id; only hand-built
            // finding lists reach this branch.
            if index.findings.contains_key(&finding.id) {
                tracing::warn!(finding = %finding.id, "Duplicate finding id; keeping the first");
            } else {
                index.findings.insert(finding.id.clone(), pos);
            }

            index
                .first_finding
                .entry(finding.document_id.clone())
                .or_insert(pos);

            if let Some(box_id) = &finding.box_id {
                if documents[doc_pos].has_box(box_id) {
                    index
                        .by_box
                        .entry(finding.document_id.clone())
                        .or_default()
                        .entry(box_id.clone())
                        .or_insert(pos);
                } else {
                    tracing::warn!(
                        finding = %finding.id,
                        box_id = %box_id,
                        "Finding references a box its document does not have"
                    );
                }
            }
        }

        index
    }

    pub fn document(&self, document_id: &str) -> Option<usize> {
        self.documents.get(document_id).copied()
    }

    pub fn finding(&self, finding_id: &str) -> Option<usize> {
        self.findings.get(finding_id).copied()
    }

    pub fn finding_for_box(&self, document_id: &str, box_id: &str) -> Option<usize> {
        self.by_box.get(document_id)?.get(box_id).copied()
    }

    /// First finding of the document in source order
    pub fn first_finding_of(&self, document_id: &str) -> Option<usize> {
        self.first_finding.get(document_id).copied()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}
