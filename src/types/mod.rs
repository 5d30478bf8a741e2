//! Core document types.

pub mod chart;
pub mod comment;
pub mod graph;
pub mod ids;
pub mod version;

pub use chart::{Chart, HistoryEntry};
pub use comment::Comment;
pub use graph::{Graph, Link, Node};
pub use ids::{ChartId, GraphId, NodeId, UserId};
pub use version::{Version, VersionError};
