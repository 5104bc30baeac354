//! Raw input records as they arrive from the case-file exporter.
//!
//! These mirror the exported JSON closely and are deliberately permissive:
//! nearly every field is optional, and the `source` block of a finding is kept
//! as an untyped value so it can be handed through to the renderer untouched.

use crate::types::BoundingBox;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One exported document record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    /// Anything other than an array is treated as "no findings"
    #[serde(default)]
    pub findings: Option<Value>,
}

impl RawDocument {
    /// `file_id`, then `filename`; empty strings do not count
    pub fn identifier(&self) -> Option<&str> {
        self.file_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.filename.as_deref().filter(|s| !s.is_empty()))
    }

    pub fn finding_values(&self) -> &[Value] {
        self.findings
            .as_ref()
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFinding {
    #[serde(default)]
    pub id: Option<String>,
    /// Severity of the finding as written by the exporter
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub deviation: Option<String>,
    #[serde(default)]
    pub source: Option<Value>,
    #[serde(default)]
    pub reference: Option<Value>,
}

impl RawFinding {
    /// The bounding box, only if `source.bbox` is exactly four finite numbers.
    pub fn bbox(&self) -> Option<BoundingBox> {
        bbox_from(self.source.as_ref()?.get("bbox")?)
    }

    /// `source.page` when it is a finite number >= 1, otherwise page 1.
    pub fn page(&self) -> u32 {
        page_from(self.source.as_ref().and_then(|s| s.get("page")))
    }

    pub fn section(&self) -> Option<&str> {
        self.source.as_ref()?.get("section")?.as_str()
    }

    pub fn source_text(&self) -> Option<&str> {
        self.source.as_ref()?.get("text")?.as_str()
    }
}

fn bbox_from(value: &Value) -> Option<BoundingBox> {
    let values = value.as_array()?;
    if values.len() != 4 {
        return None;
    }
    let mut bbox = [0.0; 4];
    for (slot, value) in bbox.iter_mut().zip(values) {
        let n = value.as_f64()?;
        if !n.is_finite() {
            return None;
        }
        *slot = n;
    }
    Some(bbox)
}

fn page_from(value: Option<&Value>) -> u32 {
    value
        .and_then(Value::as_f64)
        .filter(|p| p.is_finite() && *p >= 1.0)
        .map(|p| p.floor().min(u32::MAX as f64) as u32)
        .unwrap_or(1)
}

/// Aggregate counts shown on the summary cards.
///
/// A count that is not a non-negative number reads as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    #[serde(default, deserialize_with = "lenient_count")]
    pub critical: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub warning: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub pass: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub best_practice: Option<u32>,
}

/// The separately exported `{ "summary": { ... } }` record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub summary: Option<SummaryCounts>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArrSource {
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawArrBox {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub bbox: Option<Value>,
    #[serde(default, alias = "pageno")]
    pub page: Option<Value>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl RawArrBox {
    /// Only a bbox of exactly four finite numbers counts
    pub fn bbox(&self) -> Option<BoundingBox> {
        bbox_from(self.bbox.as_ref()?)
    }

    pub fn page(&self) -> u32 {
        page_from(self.page.as_ref())
    }
}

/// Overlay for the annual regulatory return shown on the ARR results stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawArrOverlay {
    #[serde(default, deserialize_with = "lenient")]
    pub source: Option<ArrSource>,
    /// Untyped so each box can be read, or dropped, on its own
    #[serde(default)]
    pub boxes: Vec<Value>,
    #[serde(default, deserialize_with = "string_items")]
    pub insights: Vec<String>,
}

/// A complete case-file bundle. Documents stay untyped so a single bad record
/// can be dropped without rejecting the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDataset {
    #[serde(default)]
    pub documents: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub summary: Option<SummaryRecord>,
    #[serde(default, deserialize_with = "lenient")]
    pub arr: Option<RawArrOverlay>,
}

/// Read an optional section, treating a malformed one as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.floor().min(u32::MAX as f64) as u32))
}

/// Keep the string entries of an array; anything else yields nothing.
fn string_items<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}
