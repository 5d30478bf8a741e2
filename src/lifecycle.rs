//! Graph lifecycle: lazy draft materialization and draft replacement.
//!
//! A chart's editing graph is created on first access by deep-copying the
//! published graph under a fresh identifier. Creation uses a
//! compare-and-swap update on the chart's editing-graph field, so two
//! near-simultaneous first accesses converge on one draft: the loser
//! deletes its freshly inserted copy and returns the winner's identifier.

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{ChartError, Result};
use crate::permissions::Permissions;
use crate::store::{ChartUpdate, EntityStore, UpdateResult};
use crate::types::{ChartId, Graph, GraphId, UserId};
use crate::validate::validate_graph;

/// Manages the editing-vs-published graph split of a chart.
pub struct GraphLifecycle<S: EntityStore> {
    store: Arc<S>,
    permissions: Permissions<S>,
}

impl<S: EntityStore> GraphLifecycle<S> {
    /// Create a lifecycle manager over `store`.
    pub fn new(store: Arc<S>) -> Self {
        let permissions = Permissions::new(Arc::clone(&store));
        Self { store, permissions }
    }

    /// Return the chart's editing graph, materializing it on first access.
    ///
    /// Returns `Ok(None)` when the chart does not exist or its published
    /// graph reference is broken (the latter is logged as an error).
    /// Idempotent once a draft exists: subsequent calls return the same
    /// identifier without touching the store.
    pub async fn get_or_create_editing_graph(
        &self,
        chart_id: &ChartId,
    ) -> Result<Option<GraphId>> {
        let Some(chart) = self
            .store
            .get_chart(chart_id)
            .await
            .map_err(ChartError::from_store)?
        else {
            return Ok(None);
        };

        if let Some(editing) = chart.editing_graph_id {
            return Ok(Some(editing));
        }

        // No draft yet: duplicate the published graph.
        let Some(published) = self
            .store
            .get_graph(&chart.graph_id)
            .await
            .map_err(ChartError::from_store)?
        else {
            error!(
                chart_id = %chart_id,
                graph_id = %chart.graph_id,
                "chart references a published graph that does not exist"
            );
            return Ok(None);
        };

        let draft = published.duplicate_with_owner(chart.owner);
        let draft_id = self
            .store
            .insert_graph(draft)
            .await
            .map_err(ChartError::from_store)?;

        let result = self
            .store
            .update_chart(chart_id, ChartUpdate::SetEditingGraphIfAbsent(draft_id))
            .await
            .map_err(ChartError::from_store)?;

        if result.touched() {
            debug!(chart_id = %chart_id, graph_id = %draft_id, "materialized editing graph");
            return Ok(Some(draft_id));
        }

        // Lost the race (or the chart vanished): drop our copy and defer to
        // whatever the chart now references.
        self.store
            .remove_graph(&draft_id)
            .await
            .map_err(ChartError::from_store)?;
        let chart = self
            .store
            .get_chart(chart_id)
            .await
            .map_err(ChartError::from_store)?;
        Ok(chart.and_then(|c| c.editing_graph_id))
    }

    /// Replace the chart's editing graph with `graph`, wholesale.
    ///
    /// The replacement is validated (shape, then link integrity) before any
    /// store access; validation failures are hard errors. Returns
    /// `Ok(None)` when the chart does not exist or `actor` may not edit it.
    /// The graph's owner field is forced to the chart's owner and its
    /// identifier is pinned to the chart's current editing graph, so a
    /// caller can neither reassign ownership nor relocate the document.
    pub async fn update_editing_graph(
        &self,
        chart_id: &ChartId,
        mut graph: Graph,
        actor: Option<&UserId>,
    ) -> Result<Option<UpdateResult>> {
        validate_graph(&graph)?;

        let Some(chart) = self
            .store
            .get_chart(chart_id)
            .await
            .map_err(ChartError::from_store)?
        else {
            return Ok(None);
        };
        if !self.permissions.can_edit(chart_id, actor).await? {
            return Ok(None);
        }
        let Some(editing_id) = chart.editing_graph_id else {
            return Ok(None);
        };

        graph.owner = chart.owner;
        let result = self
            .store
            .replace_graph(&editing_id, graph)
            .await
            .map_err(ChartError::from_store)?;
        debug!(chart_id = %chart_id, graph_id = %editing_id, "replaced editing graph");
        Ok(Some(result))
    }

    /// Insert a fresh empty graph owned by `owner` and return its id.
    pub async fn insert_empty_graph(&self, owner: UserId) -> Result<GraphId> {
        self.store
            .insert_graph(Graph::empty(owner))
            .await
            .map_err(ChartError::from_store)
    }
}

impl<S: EntityStore> Clone for GraphLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            permissions: self.permissions.clone(),
        }
    }
}
