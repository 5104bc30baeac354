//! Finding normalization
//!
//! Turns exported case-file records into [`Document`]s with overlay boxes and
//! a flat [`Finding`] list. Pure: the same input always yields the same ids.
//!
//! Id rules when the exporter left them out:
//! - box: `<documentId>-box-<n>`
//! - finding: `<documentId>-finding-<n>`
//!
//! where `n` is the 1-based position of the finding inside its document.
//! The same positional id replaces an explicit one that is already taken:
//! box ids are unique within a document, finding ids across the batch.

use review_types::{
    Document, Finding, OverlayBox, RawArrBox, RawArrOverlay, RawDocument, RawFinding, Severity,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrigin {
    #[default]
    Document,
    ArrBox,
}

/// A record that was dropped or degraded during normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizeWarning {
    pub origin: RecordOrigin,
    /// Position of the record in its input list
    pub record: usize,
    /// Position of the finding within the record, if the warning is about one
    pub finding: Option<usize>,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub documents: Vec<Document>,
    pub findings: Vec<Finding>,
    pub warnings: Vec<NormalizeWarning>,
}

pub fn box_id(document_id: &str, position: usize) -> String {
    format!("{}-box-{}", document_id, position + 1)
}

pub fn finding_id(document_id: &str, position: usize) -> String {
    format!("{}-finding-{}", document_id, position + 1)
}

/// Normalize a batch of raw document records.
///
/// Malformed records are dropped and reported in `warnings`; the rest of the
/// batch is still returned.
pub fn normalize_records(records: &[Value]) -> Normalized {
    let mut out = Normalized::default();
    let mut seen_documents = HashSet::new();
    let mut seen_findings = HashSet::new();

    for (record_idx, value) in records.iter().enumerate() {
        let raw: RawDocument = match serde_json::from_value(value.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                warn_dropped(&mut out, record_idx, None, format!("unreadable record: {}", e));
                continue;
            }
        };

        let Some(document_id) = raw.identifier().map(str::to_string) else {
            warn_dropped(&mut out, record_idx, None, "missing file_id/filename".to_string());
            continue;
        };
        if raw.document_type.as_deref().map_or(true, str::is_empty) {
            warn_dropped(&mut out, record_idx, None, "missing document_type".to_string());
            continue;
        }
        if !seen_documents.insert(document_id.clone()) {
            warn_dropped(
                &mut out,
                record_idx,
                None,
                format!("duplicate document id {}", document_id),
            );
            continue;
        }

        let (document, findings) = normalize_document(
            &raw,
            &document_id,
            record_idx,
            &mut seen_findings,
            &mut out.warnings,
        );
        out.documents.push(document);
        out.findings.extend(findings);
    }

    out
}

fn warn_dropped(out: &mut Normalized, record: usize, finding: Option<usize>, reason: String) {
    tracing::warn!(record, ?finding, %reason, "Dropping malformed record");
    out.warnings.push(NormalizeWarning {
        origin: RecordOrigin::Document,
        record,
        finding,
        reason,
    });
}

fn warn_renamed(
    warnings: &mut Vec<NormalizeWarning>,
    record: usize,
    position: usize,
    reason: String,
) {
    tracing::warn!(record, position, %reason, "Renaming duplicate id");
    warnings.push(NormalizeWarning {
        origin: RecordOrigin::Document,
        record,
        finding: Some(position),
        reason,
    });
}

/// Hand out `explicit` if it is still free, otherwise a positional id.
/// Returns the id and whether the explicit one was replaced.
fn claim_id(
    explicit: Option<&str>,
    positional: String,
    seen: &mut HashSet<String>,
) -> (String, bool) {
    if let Some(id) = explicit {
        if seen.insert(id.to_string()) {
            return (id.to_string(), false);
        }
    }
    let mut candidate = positional.clone();
    let mut suffix = 2;
    while !seen.insert(candidate.clone()) {
        candidate = format!("{}-{}", positional, suffix);
        suffix += 1;
    }
    (candidate, explicit.is_some())
}

fn normalize_document(
    raw: &RawDocument,
    document_id: &str,
    record_idx: usize,
    seen_findings: &mut HashSet<String>,
    warnings: &mut Vec<NormalizeWarning>,
) -> (Document, Vec<Finding>) {
    let document_type = raw.document_type.clone().unwrap_or_default();
    let severity = Severity::normalize(raw.severity.as_deref(), Severity::Pass);

    let mut boxes = Vec::new();
    let mut findings = Vec::new();
    let mut seen_boxes = HashSet::new();

    for (position, value) in raw.finding_values().iter().enumerate() {
        let finding: RawFinding = match serde_json::from_value(value.clone()) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    record = record_idx,
                    position,
                    error = %e,
                    "Dropping malformed finding"
                );
                warnings.push(NormalizeWarning {
                    origin: RecordOrigin::Document,
                    record: record_idx,
                    finding: Some(position),
                    reason: format!("unreadable finding: {}", e),
                });
                continue;
            }
        };

        let finding_severity = Severity::normalize(finding.kind.as_deref(), severity);
        let title = finding
            .title
            .clone()
            .unwrap_or_else(|| document_type.clone());
        let details = finding
            .deviation
            .clone()
            .or_else(|| finding.source_text().map(str::to_string))
            .unwrap_or_default();

        let explicit = finding.id.as_deref();
        let overlay = match finding.bbox() {
            Some(bbox) => {
                let (id, replaced) =
                    claim_id(explicit, box_id(document_id, position), &mut seen_boxes);
                if replaced {
                    let reason = format!(
                        "duplicate box id {}, using {}",
                        explicit.unwrap_or_default(),
                        id
                    );
                    warn_renamed(warnings, record_idx, position, reason);
                }
                Some((id, bbox))
            }
            None => None,
        };
        let overlay = overlay.map(|(id, bbox)| OverlayBox {
            id,
            bbox,
            page: finding.page(),
            category: finding
                .section()
                .map(str::to_string)
                .unwrap_or_else(|| document_type.clone()),
            severity: finding_severity,
            title: title.clone(),
            details: details.clone(),
        });

        let (id, replaced) =
            claim_id(explicit, finding_id(document_id, position), seen_findings);
        if replaced {
            let reason = format!(
                "duplicate finding id {}, using {}",
                explicit.unwrap_or_default(),
                id
            );
            warn_renamed(warnings, record_idx, position, reason);
        }

        findings.push(Finding {
            id,
            severity: finding_severity,
            title,
            detail: details,
            document_id: document_id.to_string(),
            box_id: overlay.as_ref().map(|b| b.id.clone()),
            source: finding.source.clone(),
            reference: finding.reference.clone(),
        });

        if let Some(overlay) = overlay {
            boxes.push(overlay);
        }
    }

    let document = Document {
        id: document_id.to_string(),
        label: document_type,
        severity,
        source_ref: raw
            .filename
            .clone()
            .unwrap_or_else(|| document_id.to_string()),
        boxes,
    };

    (document, findings)
}

/// Overlay boxes for the ARR results view. Boxes without a usable bounding
/// box are skipped, the same as document findings. An unreadable box is
/// dropped with a warning and the rest are kept.
pub fn normalize_arr_boxes(
    overlay: &RawArrOverlay,
    warnings: &mut Vec<NormalizeWarning>,
) -> Vec<OverlayBox> {
    let mut seen = HashSet::new();
    let mut boxes = Vec::new();

    for (position, value) in overlay.boxes.iter().enumerate() {
        let raw: RawArrBox = match serde_json::from_value(value.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(position, error = %e, "Dropping malformed ARR box");
                warnings.push(NormalizeWarning {
                    origin: RecordOrigin::ArrBox,
                    record: position,
                    finding: None,
                    reason: format!("unreadable ARR box: {}", e),
                });
                continue;
            }
        };
        let Some(bbox) = raw.bbox() else {
            continue;
        };

        let explicit = raw.id.as_deref();
        let (id, replaced) = claim_id(explicit, box_id("arr", position), &mut seen);
        if replaced {
            let reason = format!(
                "duplicate ARR box id {}, using {}",
                explicit.unwrap_or_default(),
                id
            );
            tracing::warn!(position, %reason, "Renaming duplicate id");
            warnings.push(NormalizeWarning {
                origin: RecordOrigin::ArrBox,
                record: position,
                finding: None,
                reason,
            });
        }

        boxes.push(OverlayBox {
            id,
            bbox,
            page: raw.page(),
            category: raw.category.clone().unwrap_or_default(),
            severity: Severity::normalize(raw.severity.as_deref(), Severity::Note),
            title: raw.title.clone().unwrap_or_default(),
            details: raw.details.clone().unwrap_or_default(),
        });
    }

    boxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client_id_record() -> Value {
        json!({
            "file_id": "01_Client_ID",
            "filename": "01_Client_ID_Verification.pdf",
            "document_type": "Client ID Verification",
            "severity": "Warning",
            "findings": [
                {
                    "type": "critical",
                    "title": "Passport expired",
                    "deviation": "Expired 2021-03-01",
                    "source": { "bbox": [0.1, 0.2, 0.6, 0.3], "page": 2, "section": "Identity" }
                },
                {
                    "title": "Address mismatch",
                    "source": { "text": "12 High St" }
                },
                {
                    "id": "CID-9",
                    "type": "nonsense",
                    "source": { "bbox": [1, 1, 2, 2] }
                }
            ]
        })
    }

    #[test]
    fn test_document_fields() {
        let out = normalize_records(&[client_id_record()]);
        assert!(out.warnings.is_empty());
        let doc = &out.documents[0];
        assert_eq!(doc.id, "01_Client_ID");
        assert_eq!(doc.label, "Client ID Verification");
        assert_eq!(doc.severity, Severity::Warning);
        assert_eq!(doc.source_ref, "01_Client_ID_Verification.pdf");
    }

    #[test]
    fn test_boxes_only_for_valid_bbox() {
        let out = normalize_records(&[client_id_record()]);
        let doc = &out.documents[0];
        let ids: Vec<&str> = doc.boxes.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["01_Client_ID-box-1", "CID-9"]);
        assert_eq!(doc.boxes[0].page, 2);
        assert_eq!(doc.boxes[0].category, "Identity");
        assert_eq!(doc.boxes[1].category, "Client ID Verification");
        assert_eq!(doc.boxes[1].page, 1);
    }

    #[test]
    fn test_findings_link_to_boxes() {
        let out = normalize_records(&[client_id_record()]);
        let findings = &out.findings;
        assert_eq!(findings.len(), 3);

        assert_eq!(findings[0].id, "01_Client_ID-finding-1");
        assert_eq!(findings[0].box_id.as_deref(), Some("01_Client_ID-box-1"));
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].detail, "Expired 2021-03-01");

        assert_eq!(findings[1].id, "01_Client_ID-finding-2");
        assert_eq!(findings[1].box_id, None);
        assert_eq!(findings[1].detail, "12 High St");

        assert_eq!(findings[2].id, "CID-9");
        assert_eq!(findings[2].box_id.as_deref(), Some("CID-9"));
        assert_eq!(findings[2].title, "Client ID Verification");
    }

    #[test]
    fn test_severity_falls_back_to_document() {
        let out = normalize_records(&[client_id_record()]);
        // no type -> document severity
        assert_eq!(out.findings[1].severity, Severity::Warning);
        // unrecognized type -> document severity
        assert_eq!(out.findings[2].severity, Severity::Warning);
    }

    #[test]
    fn test_unknown_document_severity_becomes_pass() {
        let out = normalize_records(&[json!({
            "filename": "x.pdf",
            "document_type": "Policy",
            "severity": "amber",
            "findings": [{ "title": "t" }]
        })]);
        assert_eq!(out.documents[0].severity, Severity::Pass);
        assert_eq!(out.findings[0].severity, Severity::Pass);
    }

    #[test]
    fn test_malformed_records_are_dropped() {
        let out = normalize_records(&[
            json!({ "filename": "no_type.pdf" }),
            json!({ "document_type": "Orphan" }),
            json!("not an object"),
            client_id_record(),
            json!({ "file_id": "01_Client_ID", "document_type": "Duplicate" }),
        ]);
        assert_eq!(out.documents.len(), 1);
        assert_eq!(out.warnings.len(), 4);
        let records: Vec<usize> = out.warnings.iter().map(|w| w.record).collect();
        assert_eq!(records, vec![0, 1, 2, 4]);
    }

    #[test]
    fn test_malformed_finding_keeps_document() {
        let out = normalize_records(&[json!({
            "filename": "a.pdf",
            "document_type": "Policy",
            "findings": [42, { "title": "kept" }]
        })]);
        assert_eq!(out.documents.len(), 1);
        assert_eq!(out.findings.len(), 1);
        // positional ids keep counting over the dropped entry
        assert_eq!(out.findings[0].id, "a.pdf-finding-2");
        assert_eq!(out.warnings[0].finding, Some(0));
    }

    #[test]
    fn test_document_without_findings() {
        let out = normalize_records(&[json!({
            "filename": "b.pdf",
            "document_type": "PEP Screening"
        })]);
        assert!(out.documents[0].boxes.is_empty());
        assert!(out.findings.is_empty());
    }

    #[test]
    fn test_arr_boxes() {
        let overlay: RawArrOverlay = serde_json::from_value(json!({
            "boxes": [
                { "id": "Q36", "bbox": [10, 8, 86, 18], "pageno": 4, "severity": "critical", "title": "Reconciliations" },
                { "id": "Q99", "bbox": [1, 2] },
                { "bbox": [1, 2, 3, 4] }
            ]
        }))
        .unwrap();
        let mut warnings = Vec::new();
        let boxes = normalize_arr_boxes(&overlay, &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].page, 4);
        assert_eq!(boxes[0].severity, Severity::Critical);
        assert_eq!(boxes[1].id, "arr-box-3");
        assert_eq!(boxes[1].severity, Severity::Note);
    }

    #[test]
    fn test_unreadable_arr_box_is_dropped_alone() {
        let overlay: RawArrOverlay = serde_json::from_value(json!({
            "boxes": [
                { "id": 36, "bbox": [1, 2, 3, 4] },
                { "id": "Q38", "bbox": [1, 2, 3, 4], "page": 2.5 },
                { "id": "Q38", "bbox": [5, 6, 7, 8] }
            ]
        }))
        .unwrap();
        let mut warnings = Vec::new();
        let boxes = normalize_arr_boxes(&overlay, &mut warnings);
        let ids: Vec<&str> = boxes.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["Q38", "arr-box-3"]);
        assert_eq!(boxes[0].page, 2);
        let origins: Vec<(RecordOrigin, usize)> =
            warnings.iter().map(|w| (w.origin, w.record)).collect();
        assert_eq!(
            origins,
            vec![(RecordOrigin::ArrBox, 0), (RecordOrigin::ArrBox, 2)]
        );
    }

    #[test]
    fn test_repeated_explicit_ids_fall_back_to_position() {
        let out = normalize_records(&[json!({
            "file_id": "D",
            "document_type": "Policy",
            "findings": [
                { "id": "X", "source": { "bbox": [0, 0, 1, 1] } },
                { "id": "X", "source": { "bbox": [0, 1, 1, 2] } },
                { "id": "X" }
            ]
        })]);
        let box_ids: Vec<&str> = out.documents[0].boxes.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(box_ids, vec!["X", "D-box-2"]);
        let finding_ids: Vec<&str> = out.findings.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(finding_ids, vec!["X", "D-finding-2", "D-finding-3"]);
        assert_eq!(out.findings[1].box_id.as_deref(), Some("D-box-2"));
        assert_eq!(out.findings[2].box_id, None);
        // one renamed box, two renamed findings
        assert_eq!(out.warnings.len(), 3);
        assert!(out.warnings.iter().all(|w| w.origin == RecordOrigin::Document));
    }

    #[test]
    fn test_finding_ids_unique_across_documents() {
        let out = normalize_records(&[
            json!({ "file_id": "A", "document_type": "Policy", "findings": [{ "id": "F", "source": { "bbox": [0, 0, 1, 1] } }] }),
            json!({ "file_id": "B", "document_type": "Policy", "findings": [{ "id": "F", "source": { "bbox": [0, 0, 1, 1] } }] }),
        ]);
        let ids: Vec<&str> = out.findings.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["F", "B-finding-1"]);
        // box ids only need to be unique within their document
        assert_eq!(out.documents[1].boxes[0].id, "F");
        assert_eq!(out.findings[1].box_id.as_deref(), Some("F"));
    }

    #[test]
    fn test_positional_id_already_taken_gets_suffix() {
        let out = normalize_records(&[json!({
            "file_id": "D",
            "document_type": "Policy",
            "findings": [{ "id": "D-finding-2" }, { "id": "D-finding-2" }]
        })]);
        let ids: Vec<&str> = out.findings.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["D-finding-2", "D-finding-2-2"]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn raw_finding() -> impl Strategy<Value = Value> {
        (
            prop::option::of("[a-z]{1,6}"),
            prop::option::of(prop::collection::vec(0.0f64..1.0, 0..6)),
            prop::option::of(1u32..20),
            prop::option::of("[xy]"),
        )
            .prop_map(|(kind, bbox, page, id)| {
                let mut source = serde_json::Map::new();
                if let Some(bbox) = bbox {
                    source.insert("bbox".to_string(), json!(bbox));
                }
                if let Some(page) = page {
                    source.insert("page".to_string(), json!(page));
                }
                json!({ "id": id, "type": kind, "title": "t", "source": source })
            })
    }

    fn raw_document() -> impl Strategy<Value = Value> {
        (
            prop::option::of("[a-z]{1,8}"),
            prop::option::of("[A-Z][a-z]{2,8}"),
            prop::collection::vec(raw_finding(), 0..6),
        )
            .prop_map(|(filename, document_type, findings)| {
                json!({ "filename": filename, "document_type": document_type, "findings": findings })
            })
    }

    proptest! {
        /// Property: every finding points at a document that survived normalization
        #[test]
        fn findings_reference_existing_documents(records in prop::collection::vec(raw_document(), 0..8)) {
            let out = normalize_records(&records);
            for finding in &out.findings {
                prop_assert!(out.documents.iter().any(|d| d.id == finding.document_id));
            }
        }

        /// Property: boxes never outnumber findings and always carry four coordinates
        #[test]
        fn boxes_bounded_by_findings(records in prop::collection::vec(raw_document(), 0..8)) {
            let out = normalize_records(&records);
            for doc in &out.documents {
                let finding_count = out.findings.iter().filter(|f| f.document_id == doc.id).count();
                prop_assert!(doc.boxes.len() <= finding_count);
                for b in &doc.boxes {
                    prop_assert_eq!(b.bbox.len(), 4);
                    prop_assert!(b.page >= 1);
                }
            }
        }

        /// Property: normalizing twice yields identical ids
        #[test]
        fn ids_are_deterministic(records in prop::collection::vec(raw_document(), 0..8)) {
            let first = normalize_records(&records);
            let second = normalize_records(&records);
            let ids = |n: &Normalized| -> Vec<(String, Option<String>)> {
                n.findings.iter().map(|f| (f.id.clone(), f.box_id.clone())).collect()
            };
            prop_assert_eq!(ids(&first), ids(&second));
        }

        /// Property: finding ids are unique in the batch, box ids within their document
        #[test]
        fn ids_are_unique(records in prop::collection::vec(raw_document(), 0..8)) {
            let out = normalize_records(&records);
            let finding_ids: HashSet<&str> = out.findings.iter().map(|f| f.id.as_str()).collect();
            prop_assert_eq!(finding_ids.len(), out.findings.len());
            for doc in &out.documents {
                let box_ids: HashSet<&str> = doc.boxes.iter().map(|b| b.id.as_str()).collect();
                prop_assert_eq!(box_ids.len(), doc.boxes.len());
            }
        }
    }
}
