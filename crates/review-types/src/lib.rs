pub mod raw;
pub mod types;

pub use raw::{
    ArrSource, RawArrBox, RawArrOverlay, RawDataset, RawDocument, RawFinding, SummaryCounts,
    SummaryRecord,
};
pub use types::{BoundingBox, Document, Finding, OverlayBox, Severity, UnknownSeverity};
