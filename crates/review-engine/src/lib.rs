//! Review workflow engine
//!
//! Drives the seven-stage review wizard (connect, analyze, review ARR results,
//! select audits, run audits, review findings, export) and keeps the document
//! overlays, finding list and document tabs in sync while the user navigates.
//!
//! The engine is split into a pure reducer ([`session::ReviewSession`]) that
//! only emits timer and focus effects, and an async shell
//! ([`runtime::SessionRuntime`]) that turns those effects into tokio timers.

pub mod audits;
pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod index;
pub mod normalize;
pub mod progress;
pub mod runtime;
pub mod selection;
pub mod session;
pub mod stage;
pub mod timer;
pub mod view;

pub use config::ReviewConfig;
pub use dataset::ReviewDataset;
pub use error::{ReviewError, Result};
pub use runtime::SessionRuntime;
pub use session::{Action, Effect, FocusTarget, ReviewSession};
pub use stage::{Navigation, Stage, StageState};
pub use view::ViewModel;
