//! Storage backends for chart and graph documents.
//!
//! The store exposes single-document operations only. Each `ChartUpdate`
//! variant is one atomic mutation of one chart document; multi-step
//! operations (lazy draft creation, publish-then-clear) are composed from
//! these primitives by the lifecycle and history modules and are not
//! transactional across documents.

pub mod memory;

use async_trait::async_trait;

use crate::types::{Chart, ChartId, Graph, GraphId, HistoryEntry, UserId, Version};

/// Outcome of a single-document update or delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Number of documents matched by the selector (0 or 1).
    pub matched: u64,
    /// Number of documents actually modified (0 or 1).
    pub modified: u64,
}

impl UpdateResult {
    /// A matched-and-modified result.
    pub fn hit() -> Self {
        Self {
            matched: 1,
            modified: 1,
        }
    }

    /// A matched-but-unchanged result.
    pub fn unchanged() -> Self {
        Self {
            matched: 1,
            modified: 0,
        }
    }

    /// A no-match result.
    pub fn miss() -> Self {
        Self::default()
    }

    /// Whether the update modified at least one document.
    pub fn touched(&self) -> bool {
        self.modified > 0
    }
}

/// One atomic mutation of a single chart document.
#[derive(Debug, Clone)]
pub enum ChartUpdate {
    /// Set the editing-graph reference, but only if none is present.
    ///
    /// Compare-and-swap semantics: when an editing graph already exists the
    /// update matches the document but modifies nothing, which lets
    /// concurrent lazy-creation callers detect that they lost the race.
    SetEditingGraphIfAbsent(GraphId),
    /// Remove the editing-graph reference.
    ClearEditingGraph,
    /// Append a history entry and swap in a new published graph and
    /// version, as one atomic update.
    RecordPublish {
        /// History entry for the graph and version being superseded.
        entry: HistoryEntry,
        /// The incoming published graph.
        graph_id: GraphId,
        /// The incoming version.
        version: Version,
    },
    /// Increment the download counter by exactly 1.
    IncrementDownloads,
    /// Record a vote: remove `user` from the opposite set and add them to
    /// the indicated set, atomically.
    SetFeedback {
        /// The voting identity.
        user: UserId,
        /// `true` for an upvote, `false` for a downvote.
        upvote: bool,
    },
    /// Remove `user` from both feedback sets.
    ClearFeedback {
        /// The identity whose feedback is cleared.
        user: UserId,
    },
}

/// Trait for chart/graph storage backends.
///
/// Individual operations are atomic; the trait offers no cross-document
/// transactions. All methods are async to support remote document stores.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync;

    /// Fetch a chart by id.
    async fn get_chart(&self, id: &ChartId) -> Result<Option<Chart>, Self::Error>;

    /// Fetch multiple charts by id, ordered by `ChartId`. Missing ids are
    /// skipped.
    async fn get_charts(&self, ids: &[ChartId]) -> Result<Vec<Chart>, Self::Error>;

    /// Insert a new chart. Fails if the id is already taken.
    async fn insert_chart(&self, chart: Chart) -> Result<ChartId, Self::Error>;

    /// Insert the chart, or replace the stored document with the same id.
    async fn upsert_chart(&self, chart: Chart) -> Result<UpdateResult, Self::Error>;

    /// Delete a chart by id.
    async fn remove_chart(&self, id: &ChartId) -> Result<UpdateResult, Self::Error>;

    /// Apply one atomic mutation to a chart document.
    async fn update_chart(
        &self,
        id: &ChartId,
        update: ChartUpdate,
    ) -> Result<UpdateResult, Self::Error>;

    /// All charts owned by `owner`, ordered by `ChartId`.
    async fn list_charts_by_owner(&self, owner: &UserId) -> Result<Vec<Chart>, Self::Error>;

    /// All charts flagged for the public catalog, ordered by `ChartId`.
    async fn list_catalog_charts(&self) -> Result<Vec<Chart>, Self::Error>;

    /// Up to `limit` charts ordered by descending download count. Ties are
    /// broken by `ChartId`.
    async fn top_charts_by_downloads(&self, limit: usize) -> Result<Vec<Chart>, Self::Error>;

    /// Fetch a graph by id.
    async fn get_graph(&self, id: &GraphId) -> Result<Option<Graph>, Self::Error>;

    /// Insert a new graph. Fails if the id is already taken.
    async fn insert_graph(&self, graph: Graph) -> Result<GraphId, Self::Error>;

    /// Replace the stored graph at `id` wholesale (not a merge). Any id
    /// carried by `graph` itself is overridden by `id`.
    async fn replace_graph(&self, id: &GraphId, graph: Graph)
        -> Result<UpdateResult, Self::Error>;

    /// Delete a graph by id.
    async fn remove_graph(&self, id: &GraphId) -> Result<UpdateResult, Self::Error>;
}

pub use memory::InMemoryStore;
