//! In-memory store for testing and embedding.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::{Chart, ChartId, Graph, GraphId, UserId};

use super::{ChartUpdate, EntityStore, UpdateResult};

/// Error type for the in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// A chart with this id already exists.
    #[error("chart id already taken: {0}")]
    DuplicateChart(ChartId),
    /// A graph with this id already exists.
    #[error("graph id already taken: {0}")]
    DuplicateGraph(GraphId),
}

/// In-memory chart/graph store.
///
/// Uses `BTreeMap` so listings iterate in id order, which keeps query
/// results deterministic. Each trait method takes one write or read lock,
/// making every single-document operation atomic with respect to the
/// others.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    charts: RwLock<BTreeMap<ChartId, Chart>>,
    graphs: RwLock<BTreeMap<GraphId, Graph>>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored charts.
    pub fn num_charts(&self) -> usize {
        self.charts.read().len()
    }

    /// Number of stored graphs.
    pub fn num_graphs(&self) -> usize {
        self.graphs.read().len()
    }
}

fn apply_update(chart: &mut Chart, update: ChartUpdate) -> UpdateResult {
    match update {
        ChartUpdate::SetEditingGraphIfAbsent(graph_id) => {
            if chart.editing_graph_id.is_some() {
                UpdateResult::unchanged()
            } else {
                chart.editing_graph_id = Some(graph_id);
                UpdateResult::hit()
            }
        }
        ChartUpdate::ClearEditingGraph => {
            if chart.editing_graph_id.take().is_some() {
                UpdateResult::hit()
            } else {
                UpdateResult::unchanged()
            }
        }
        ChartUpdate::RecordPublish {
            entry,
            graph_id,
            version,
        } => {
            chart.history.push(entry);
            chart.graph_id = graph_id;
            chart.version = version;
            UpdateResult::hit()
        }
        ChartUpdate::IncrementDownloads => {
            chart.downloads += 1;
            UpdateResult::hit()
        }
        ChartUpdate::SetFeedback { user, upvote } => {
            let (add, remove) = if upvote {
                (&mut chart.upvoters, &mut chart.downvoters)
            } else {
                (&mut chart.downvoters, &mut chart.upvoters)
            };
            let removed = remove.remove(&user);
            let added = add.insert(user);
            if removed || added {
                UpdateResult::hit()
            } else {
                UpdateResult::unchanged()
            }
        }
        ChartUpdate::ClearFeedback { user } => {
            let up = chart.upvoters.remove(&user);
            let down = chart.downvoters.remove(&user);
            if up || down {
                UpdateResult::hit()
            } else {
                UpdateResult::unchanged()
            }
        }
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    type Error = InMemoryError;

    async fn get_chart(&self, id: &ChartId) -> Result<Option<Chart>, Self::Error> {
        Ok(self.charts.read().get(id).cloned())
    }

    async fn get_charts(&self, ids: &[ChartId]) -> Result<Vec<Chart>, Self::Error> {
        let charts = self.charts.read();
        let mut sorted: Vec<ChartId> = ids.to_vec();
        sorted.sort();
        sorted.dedup();
        Ok(sorted
            .iter()
            .filter_map(|id| charts.get(id).cloned())
            .collect())
    }

    async fn insert_chart(&self, chart: Chart) -> Result<ChartId, Self::Error> {
        let mut charts = self.charts.write();
        if charts.contains_key(&chart.id) {
            return Err(InMemoryError::DuplicateChart(chart.id));
        }
        let id = chart.id;
        charts.insert(id, chart);
        Ok(id)
    }

    async fn upsert_chart(&self, chart: Chart) -> Result<UpdateResult, Self::Error> {
        let mut charts = self.charts.write();
        match charts.insert(chart.id, chart) {
            Some(_) => Ok(UpdateResult::hit()),
            None => Ok(UpdateResult {
                matched: 0,
                modified: 1,
            }),
        }
    }

    async fn remove_chart(&self, id: &ChartId) -> Result<UpdateResult, Self::Error> {
        match self.charts.write().remove(id) {
            Some(_) => Ok(UpdateResult::hit()),
            None => Ok(UpdateResult::miss()),
        }
    }

    async fn update_chart(
        &self,
        id: &ChartId,
        update: ChartUpdate,
    ) -> Result<UpdateResult, Self::Error> {
        let mut charts = self.charts.write();
        match charts.get_mut(id) {
            Some(chart) => Ok(apply_update(chart, update)),
            None => Ok(UpdateResult::miss()),
        }
    }

    async fn list_charts_by_owner(&self, owner: &UserId) -> Result<Vec<Chart>, Self::Error> {
        Ok(self
            .charts
            .read()
            .values()
            .filter(|c| c.owner == *owner)
            .cloned()
            .collect())
    }

    async fn list_catalog_charts(&self) -> Result<Vec<Chart>, Self::Error> {
        Ok(self
            .charts
            .read()
            .values()
            .filter(|c| c.in_catalog)
            .cloned()
            .collect())
    }

    async fn top_charts_by_downloads(&self, limit: usize) -> Result<Vec<Chart>, Self::Error> {
        let mut all: Vec<Chart> = self.charts.read().values().cloned().collect();
        // Stable sort over id-ordered input: ties stay in ChartId order.
        all.sort_by(|a, b| b.downloads.cmp(&a.downloads));
        all.truncate(limit);
        Ok(all)
    }

    async fn get_graph(&self, id: &GraphId) -> Result<Option<Graph>, Self::Error> {
        Ok(self.graphs.read().get(id).cloned())
    }

    async fn insert_graph(&self, graph: Graph) -> Result<GraphId, Self::Error> {
        let mut graphs = self.graphs.write();
        if graphs.contains_key(&graph.id) {
            return Err(InMemoryError::DuplicateGraph(graph.id));
        }
        let id = graph.id;
        graphs.insert(id, graph);
        Ok(id)
    }

    async fn replace_graph(
        &self,
        id: &GraphId,
        mut graph: Graph,
    ) -> Result<UpdateResult, Self::Error> {
        let mut graphs = self.graphs.write();
        match graphs.get_mut(id) {
            Some(stored) => {
                graph.id = *id;
                *stored = graph;
                Ok(UpdateResult::hit())
            }
            None => Ok(UpdateResult::miss()),
        }
    }

    async fn remove_graph(&self, id: &GraphId) -> Result<UpdateResult, Self::Error> {
        match self.graphs.write().remove(id) {
            Some(_) => Ok(UpdateResult::hit()),
            None => Ok(UpdateResult::miss()),
        }
    }
}
