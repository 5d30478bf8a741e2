//! # chart-ledger
//!
//! Versioned chart/graph storage with draft publishing, append-only
//! history, and owner/editor permissions.
//!
//! A **chart** is a named, owned document referencing exactly one
//! *published* graph plus, while edits are pending, one *editing* draft
//! graph. Publishing promotes the draft to the published slot and records
//! the superseded (version, graph) pair in an append-only history.
//!
//! ## Architecture
//!
//! ```text
//! ChartApi ─┬─ Permissions        (owner/editor predicates)
//!           ├─ GraphLifecycle     (lazy draft creation, draft replacement)
//!           └─ HistoryRecorder    (publish, history append)
//!                    ↓
//!              EntityStore (in-memory, or your backend)
//! ```
//!
//! ## Guarantees
//!
//! - A chart always references exactly one published graph; the draft
//!   reference exists only between the first edit and the next publish.
//! - A graph's owner always equals its parent chart's owner; lifecycle
//!   operations force it, overriding caller-supplied values.
//! - History is append-only and records the pair being *superseded*.
//! - Draft materialization is idempotent, including under concurrent
//!   first access (compare-and-swap on the draft reference).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod permissions;
pub mod store;
pub mod types;
pub mod validate;

// Re-exports
pub use api::ChartApi;
pub use error::{ChartError, Result};
pub use history::HistoryRecorder;
pub use lifecycle::GraphLifecycle;
pub use permissions::Permissions;
pub use store::{ChartUpdate, EntityStore, InMemoryStore, UpdateResult};
pub use types::{
    Chart, ChartId, Comment, Graph, GraphId, HistoryEntry, Link, Node, NodeId, UserId, Version,
    VersionError,
};
pub use validate::{validate_chart, validate_graph, FieldError, ValidationErrors};

/// Schema version for stored document types.
/// Increment on breaking changes to any document shape.
pub const CHART_SCHEMA_VERSION: &str = "1.0.0";
