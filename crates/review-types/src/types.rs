use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Rectangle anchored to a page: `[x0, y0, x1, y1]`.
///
/// Units are either normalized (0..1) or pixels; a single document never mixes them.
pub type BoundingBox = [f64; 4];

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    #[default]
    Pass,
    BestPractice,
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown severity: {0}")]
pub struct UnknownSeverity(pub String);

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::Warning,
        Severity::Pass,
        Severity::BestPractice,
        Severity::Note,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Pass => "pass",
            Severity::BestPractice => "best_practice",
            Severity::Note => "note",
        }
    }

    /// Case-insensitive lookup; surrounding whitespace is ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let key = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|level| level.as_str() == key)
    }

    /// Resolve a raw severity string, falling back when it is absent or unrecognized.
    pub fn normalize(value: Option<&str>, fallback: Severity) -> Severity {
        value.and_then(Self::parse).unwrap_or(fallback)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownSeverity(s.to_string()))
    }
}

/// A rectangular region on a rendered page that a finding was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayBox {
    /// Unique within the owning document only
    pub id: String,
    pub bbox: BoundingBox,
    /// 1-indexed page number
    pub page: u32,
    pub category: String,
    pub severity: Severity,
    pub title: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub label: String,
    pub severity: Severity,
    /// Handle the renderer uses to locate the document file
    pub source_ref: String,
    pub boxes: Vec<OverlayBox>,
}

impl Document {
    pub fn first_box_id(&self) -> Option<&str> {
        self.boxes.first().map(|b| b.id.as_str())
    }

    pub fn find_box(&self, box_id: &str) -> Option<&OverlayBox> {
        self.boxes.iter().find(|b| b.id == box_id)
    }

    pub fn has_box(&self, box_id: &str) -> bool {
        self.find_box(box_id).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub detail: String,
    pub document_id: String,
    /// Set only when the finding produced an overlay box
    pub box_id: Option<String>,
    pub source: Option<serde_json::Value>,
    pub reference: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Severity::parse("CRITICAL"), Some(Severity::Critical));
        assert_eq!(Severity::parse(" Best_Practice "), Some(Severity::BestPractice));
        assert_eq!(Severity::parse("note"), Some(Severity::Note));
        assert_eq!(Severity::parse("fatal"), None);
        assert_eq!(Severity::parse(""), None);
    }

    #[test]
    fn test_normalize_falls_back() {
        assert_eq!(
            Severity::normalize(None, Severity::Warning),
            Severity::Warning
        );
        assert_eq!(
            Severity::normalize(Some("bogus"), Severity::Critical),
            Severity::Critical
        );
        assert_eq!(
            Severity::normalize(Some("Pass"), Severity::Critical),
            Severity::Pass
        );
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&Severity::BestPractice).unwrap();
        assert_eq!(json, "\"best_practice\"");
        let back: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(back, Severity::Warning);
    }

    #[test]
    fn test_from_str_reports_unknown_value() {
        let err = "severe".parse::<Severity>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown severity: severe");
    }

    #[test]
    fn test_document_box_lookup() {
        let doc = Document {
            id: "doc".to_string(),
            label: "Doc".to_string(),
            severity: Severity::Pass,
            source_ref: "doc.pdf".to_string(),
            boxes: vec![OverlayBox {
                id: "doc-box-1".to_string(),
                bbox: [0.1, 0.1, 0.5, 0.2],
                page: 1,
                category: "Identity".to_string(),
                severity: Severity::Warning,
                title: "Expired passport".to_string(),
                details: String::new(),
            }],
        };
        assert_eq!(doc.first_box_id(), Some("doc-box-1"));
        assert!(doc.has_box("doc-box-1"));
        assert!(!doc.has_box("doc-box-2"));
    }
}
