//! Versioning and publish history.
//!
//! Every publish appends one immutable history entry capturing the
//! (version, graph) pair being superseded, then swaps in the new pair. The
//! append and the swap are one atomic store update; clearing the draft
//! reference afterwards is a second update, so a crash between the two
//! leaves the history correct and the draft still attached (re-running
//! publish is safe).

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::error::{ChartError, Result};
use crate::permissions::Permissions;
use crate::store::{ChartUpdate, EntityStore, UpdateResult};
use crate::types::{ChartId, GraphId, HistoryEntry, UserId, Version};

/// Records graph transitions into a chart's append-only history.
pub struct HistoryRecorder<S: EntityStore> {
    store: Arc<S>,
    permissions: Permissions<S>,
}

impl<S: EntityStore> HistoryRecorder<S> {
    /// Create a recorder over `store`.
    pub fn new(store: Arc<S>) -> Self {
        let permissions = Permissions::new(Arc::clone(&store));
        Self { store, permissions }
    }

    /// Swap the chart's published graph to `graph_id` at `version`,
    /// recording the outgoing pair in history.
    ///
    /// Returns `Ok(None)` when no acting identity is supplied. Fails with
    /// [`ChartError::BadIdentifiers`] if the chart or the candidate graph
    /// is missing, and with [`ChartError::AccessDenied`] if `actor` may not
    /// edit the chart. The version is taken as given; no numbering policy
    /// is imposed here.
    pub async fn record_graph_change(
        &self,
        chart_id: &ChartId,
        graph_id: &GraphId,
        version: Version,
        comments: impl Into<String>,
        actor: Option<&UserId>,
    ) -> Result<Option<UpdateResult>> {
        let Some(user) = actor else {
            return Ok(None);
        };

        let chart = self
            .store
            .get_chart(chart_id)
            .await
            .map_err(ChartError::from_store)?;
        let graph = self
            .store
            .get_graph(graph_id)
            .await
            .map_err(ChartError::from_store)?;
        let (Some(chart), Some(_)) = (chart, graph) else {
            return Err(ChartError::BadIdentifiers(
                "the supplied chart or graph id was not found",
            ));
        };
        if !self.permissions.can_edit(chart_id, actor).await? {
            return Err(ChartError::AccessDenied(
                "only the chart owner or a listed editor may change its graph",
            ));
        }

        let entry = HistoryEntry {
            version: chart.version,
            graph_id: chart.graph_id,
            comments: comments.into(),
            user_id: *user,
            recorded_at: Utc::now(),
        };
        let result = self
            .store
            .update_chart(
                chart_id,
                ChartUpdate::RecordPublish {
                    entry,
                    graph_id: *graph_id,
                    version,
                },
            )
            .await
            .map_err(ChartError::from_store)?;
        debug!(chart_id = %chart_id, graph_id = %graph_id, "recorded graph change");
        Ok(Some(result))
    }

    /// Publish the chart's editing graph, carrying the version forward.
    ///
    /// Returns `Ok(None)` when the chart does not exist, has no draft, or
    /// no acting identity is supplied; permission failures are hard errors.
    /// Afterwards the draft reference is cleared, so a second publish with
    /// no intervening edits returns `Ok(None)`.
    pub async fn publish(
        &self,
        chart_id: &ChartId,
        comments: impl Into<String>,
        actor: Option<&UserId>,
    ) -> Result<Option<UpdateResult>> {
        let version = match self.current_version(chart_id).await? {
            Some(version) => version,
            None => return Ok(None),
        };
        self.publish_as(chart_id, version, comments, actor).await
    }

    /// Publish the chart's editing graph under an explicit next version.
    pub async fn publish_as(
        &self,
        chart_id: &ChartId,
        version: Version,
        comments: impl Into<String>,
        actor: Option<&UserId>,
    ) -> Result<Option<UpdateResult>> {
        let Some(chart) = self
            .store
            .get_chart(chart_id)
            .await
            .map_err(ChartError::from_store)?
        else {
            return Ok(None);
        };
        let Some(editing_id) = chart.editing_graph_id else {
            return Ok(None);
        };

        let recorded = self
            .record_graph_change(chart_id, &editing_id, version, comments, actor)
            .await?;
        if recorded.is_none() {
            return Ok(None);
        }

        let result = self
            .store
            .update_chart(chart_id, ChartUpdate::ClearEditingGraph)
            .await
            .map_err(ChartError::from_store)?;
        Ok(Some(result))
    }

    async fn current_version(&self, chart_id: &ChartId) -> Result<Option<Version>> {
        let chart = self
            .store
            .get_chart(chart_id)
            .await
            .map_err(ChartError::from_store)?;
        Ok(chart.map(|c| c.version))
    }
}

impl<S: EntityStore> Clone for HistoryRecorder<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            permissions: self.permissions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::types::{Chart, Graph};

    struct Fixture {
        store: Arc<InMemoryStore>,
        recorder: HistoryRecorder<InMemoryStore>,
        chart_id: ChartId,
        owner: UserId,
        published_id: GraphId,
        draft_id: GraphId,
    }

    async fn seed_with_draft() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let owner = UserId::generate();
        let published_id = store.insert_graph(Graph::empty(owner)).await.unwrap();
        let draft_id = store.insert_graph(Graph::empty(owner)).await.unwrap();
        let mut chart = Chart::new(owner, "chart", "desc", published_id);
        chart.editing_graph_id = Some(draft_id);
        let chart_id = store.insert_chart(chart).await.unwrap();
        let recorder = HistoryRecorder::new(Arc::clone(&store));
        Fixture {
            store,
            recorder,
            chart_id,
            owner,
            published_id,
            draft_id,
        }
    }

    #[tokio::test]
    async fn test_publish_swaps_graph_and_records_history() {
        let fx = seed_with_draft().await;
        let result = fx
            .recorder
            .publish(&fx.chart_id, "first edit", Some(&fx.owner))
            .await
            .unwrap();
        assert!(result.is_some());

        let chart = fx.store.get_chart(&fx.chart_id).await.unwrap().unwrap();
        assert_eq!(chart.graph_id, fx.draft_id);
        assert!(chart.editing_graph_id.is_none());
        assert_eq!(chart.version.as_str(), "1.0");

        let entry = chart.history.last().unwrap();
        assert_eq!(entry.graph_id, fx.published_id);
        assert_eq!(entry.version.as_str(), "1.0");
        assert_eq!(entry.comments, "first edit");
        assert_eq!(entry.user_id, fx.owner);
    }

    #[tokio::test]
    async fn test_publish_without_draft_is_a_soft_failure() {
        let fx = seed_with_draft().await;
        fx.recorder
            .publish(&fx.chart_id, "once", Some(&fx.owner))
            .await
            .unwrap();

        // Draft is gone now; a second publish changes nothing.
        let before = fx.store.get_chart(&fx.chart_id).await.unwrap().unwrap();
        let result = fx
            .recorder
            .publish(&fx.chart_id, "twice", Some(&fx.owner))
            .await
            .unwrap();
        assert!(result.is_none());

        let after = fx.store.get_chart(&fx.chart_id).await.unwrap().unwrap();
        assert_eq!(after.graph_id, before.graph_id);
        assert_eq!(after.version, before.version);
        assert_eq!(after.history.len(), before.history.len());
    }

    #[tokio::test]
    async fn test_publish_as_bumps_version() {
        let fx = seed_with_draft().await;
        fx.recorder
            .publish_as(
                &fx.chart_id,
                Version::parse("1.1").unwrap(),
                "v1.1 notes",
                Some(&fx.owner),
            )
            .await
            .unwrap()
            .unwrap();

        let chart = fx.store.get_chart(&fx.chart_id).await.unwrap().unwrap();
        assert_eq!(chart.version.as_str(), "1.1");
        // History still records the superseded version.
        assert_eq!(chart.history[0].version.as_str(), "1.0");
    }

    #[tokio::test]
    async fn test_record_graph_change_rejects_bad_ids() {
        let fx = seed_with_draft().await;
        let err = fx
            .recorder
            .record_graph_change(
                &fx.chart_id,
                &GraphId::generate(),
                Version::initial(),
                "",
                Some(&fx.owner),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ChartError::BadIdentifiers(_)));
    }

    #[tokio::test]
    async fn test_record_graph_change_denies_non_editor() {
        let fx = seed_with_draft().await;
        let stranger = UserId::generate();
        let err = fx
            .recorder
            .record_graph_change(
                &fx.chart_id,
                &fx.draft_id,
                Version::initial(),
                "",
                Some(&stranger),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ChartError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_unauthenticated_publish_leaves_draft_attached() {
        let fx = seed_with_draft().await;
        let result = fx.recorder.publish(&fx.chart_id, "", None).await.unwrap();
        assert!(result.is_none());

        let chart = fx.store.get_chart(&fx.chart_id).await.unwrap().unwrap();
        assert_eq!(chart.editing_graph_id, Some(fx.draft_id));
        assert!(chart.history.is_empty());
    }

    #[tokio::test]
    async fn test_editor_may_publish() {
        let fx = seed_with_draft().await;
        let editor = UserId::generate();
        let mut chart = fx.store.get_chart(&fx.chart_id).await.unwrap().unwrap();
        chart.editors.insert(editor);
        fx.store.upsert_chart(chart).await.unwrap();

        let result = fx
            .recorder
            .publish(&fx.chart_id, "by editor", Some(&editor))
            .await
            .unwrap();
        assert!(result.is_some());

        let chart = fx.store.get_chart(&fx.chart_id).await.unwrap().unwrap();
        assert_eq!(chart.history[0].user_id, editor);
    }
}
