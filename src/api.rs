//! The public operation surface over charts and graphs.
//!
//! `ChartApi` composes the permission evaluator, graph lifecycle, and
//! history recorder over a shared store handle. There is no ambient
//! session: every operation that depends on identity takes the acting
//! identity explicitly, so a caller can only ever act as itself.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{ChartError, Result};
use crate::history::HistoryRecorder;
use crate::lifecycle::GraphLifecycle;
use crate::permissions::Permissions;
use crate::store::{ChartUpdate, EntityStore, UpdateResult};
use crate::types::{Chart, ChartId, Comment, Graph, GraphId, UserId, Version};
use crate::validate::validate_chart;

/// The composed chart access API.
pub struct ChartApi<S: EntityStore> {
    store: Arc<S>,
    permissions: Permissions<S>,
    lifecycle: GraphLifecycle<S>,
    history: HistoryRecorder<S>,
}

impl<S: EntityStore> ChartApi<S> {
    /// Create the API over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            permissions: Permissions::new(Arc::clone(&store)),
            lifecycle: GraphLifecycle::new(Arc::clone(&store)),
            history: HistoryRecorder::new(Arc::clone(&store)),
            store,
        }
    }

    // ── Creation and removal ────────────────────────────────────────────

    /// Insert a new chart with a fresh empty graph, owned by `actor`.
    ///
    /// Requires an authenticated identity and a well-formed name and
    /// description.
    pub async fn insert(
        &self,
        name: &str,
        description: &str,
        actor: Option<&UserId>,
    ) -> Result<ChartId> {
        let Some(owner) = actor else {
            return Err(ChartError::AccessDenied(
                "a user must be authenticated to insert a new chart",
            ));
        };

        let graph = Graph::empty(*owner);
        let chart = Chart::new(*owner, name, description, graph.id);
        validate_chart(&chart)?;

        self.store
            .insert_graph(graph)
            .await
            .map_err(ChartError::from_store)?;
        let id = self
            .store
            .insert_chart(chart)
            .await
            .map_err(ChartError::from_store)?;
        debug!(chart_id = %id, owner = %owner, "inserted chart");
        Ok(id)
    }

    /// Insert `chart`, or replace the stored chart with the same id.
    ///
    /// Requires an authenticated identity. Replacing an existing chart
    /// requires ownership (editors do not qualify); inserting a new one
    /// requires that the document's owner field match the acting identity.
    pub async fn upsert(&self, chart: Chart, actor: Option<&UserId>) -> Result<UpdateResult> {
        let Some(user) = actor else {
            return Err(ChartError::AccessDenied(
                "a user must be authenticated to insert or update a chart",
            ));
        };
        validate_chart(&chart)?;

        let existing = self
            .store
            .get_chart(&chart.id)
            .await
            .map_err(ChartError::from_store)?;
        let permitted = match &existing {
            Some(stored) => stored.owner == *user,
            None => chart.owner == *user,
        };
        if !permitted {
            return Err(ChartError::AccessDenied(
                "the chart's owner does not match the acting identity",
            ));
        }

        self.store
            .upsert_chart(chart)
            .await
            .map_err(ChartError::from_store)
    }

    /// Remove a chart, and its published and editing graphs, by id.
    ///
    /// Owner-only; returns `Ok(None)` as a no-op when the chart does not
    /// exist or `actor` is not the owner. Graphs referenced only by
    /// history entries are retained for audit.
    pub async fn remove(
        &self,
        chart_id: &ChartId,
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
        if !self.permissions.is_owner(chart_id, actor).await? {
            return Ok(None);
        }

        let result = self
            .store
            .remove_chart(chart_id)
            .await
            .map_err(ChartError::from_store)?;
        // Cascade to the current graphs so removal does not leak documents.
        self.store
            .remove_graph(&chart.graph_id)
            .await
            .map_err(ChartError::from_store)?;
        if let Some(editing_id) = chart.editing_graph_id {
            self.store
                .remove_graph(&editing_id)
                .await
                .map_err(ChartError::from_store)?;
        }
        debug!(chart_id = %chart_id, "removed chart");
        Ok(Some(result))
    }

    // ── Permission predicates ───────────────────────────────────────────

    /// Whether `actor` may edit the chart (owner or listed editor).
    pub async fn can_edit(&self, chart_id: &ChartId, actor: Option<&UserId>) -> Result<bool> {
        self.permissions.can_edit(chart_id, actor).await
    }

    /// Whether `actor` owns the chart.
    pub async fn is_owner(&self, chart_id: &ChartId, actor: Option<&UserId>) -> Result<bool> {
        self.permissions.is_owner(chart_id, actor).await
    }

    // ── Draft lifecycle and publishing ──────────────────────────────────

    /// The chart's editing graph id, materializing the draft on first
    /// access. See [`GraphLifecycle::get_or_create_editing_graph`].
    pub async fn get_or_create_editing_graph(
        &self,
        chart_id: &ChartId,
    ) -> Result<Option<GraphId>> {
        self.lifecycle.get_or_create_editing_graph(chart_id).await
    }

    /// Replace the chart's editing graph wholesale. See
    /// [`GraphLifecycle::update_editing_graph`].
    pub async fn update_editing_graph(
        &self,
        chart_id: &ChartId,
        graph: Graph,
        actor: Option<&UserId>,
    ) -> Result<Option<UpdateResult>> {
        self.lifecycle
            .update_editing_graph(chart_id, graph, actor)
            .await
    }

    /// Publish the chart's draft, carrying the current version forward.
    /// See [`HistoryRecorder::publish`].
    pub async fn publish(
        &self,
        chart_id: &ChartId,
        comments: &str,
        actor: Option<&UserId>,
    ) -> Result<Option<UpdateResult>> {
        self.history.publish(chart_id, comments, actor).await
    }

    /// Publish the chart's draft under an explicit next version.
    pub async fn publish_as(
        &self,
        chart_id: &ChartId,
        version: Version,
        comments: &str,
        actor: Option<&UserId>,
    ) -> Result<Option<UpdateResult>> {
        self.history
            .publish_as(chart_id, version, comments, actor)
            .await
    }

    /// Swap the chart's published graph with history. See
    /// [`HistoryRecorder::record_graph_change`].
    pub async fn record_graph_change(
        &self,
        chart_id: &ChartId,
        graph_id: &GraphId,
        version: Version,
        comments: &str,
        actor: Option<&UserId>,
    ) -> Result<Option<UpdateResult>> {
        self.history
            .record_graph_change(chart_id, graph_id, version, comments, actor)
            .await
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Fetch a chart by id.
    pub async fn get(&self, chart_id: &ChartId) -> Result<Option<Chart>> {
        self.store
            .get_chart(chart_id)
            .await
            .map_err(ChartError::from_store)
    }

    /// Fetch multiple charts by id, skipping missing ones.
    pub async fn get_many(&self, ids: &[ChartId]) -> Result<Vec<Chart>> {
        self.store
            .get_charts(ids)
            .await
            .map_err(ChartError::from_store)
    }

    /// Fetch a graph by id.
    pub async fn get_graph(&self, graph_id: &GraphId) -> Result<Option<Graph>> {
        self.store
            .get_graph(graph_id)
            .await
            .map_err(ChartError::from_store)
    }

    /// All charts owned by `actor`; empty when unauthenticated.
    pub async fn list_mine(&self, actor: Option<&UserId>) -> Result<Vec<Chart>> {
        let Some(owner) = actor else {
            return Ok(Vec::new());
        };
        self.store
            .list_charts_by_owner(owner)
            .await
            .map_err(ChartError::from_store)
    }

    /// All charts flagged for the public catalog.
    pub async fn list_catalog(&self) -> Result<Vec<Chart>> {
        self.store
            .list_catalog_charts()
            .await
            .map_err(ChartError::from_store)
    }

    /// Up to `n` charts by descending download count. The tiebreak among
    /// equal counts is backend-defined.
    pub async fn find_top_by_downloads(&self, n: usize) -> Result<Vec<Chart>> {
        self.store
            .top_charts_by_downloads(n)
            .await
            .map_err(ChartError::from_store)
    }

    /// Atomically increment the chart's download counter. Public: no
    /// permission check.
    pub async fn increment_downloads(&self, chart_id: &ChartId) -> Result<UpdateResult> {
        self.store
            .update_chart(chart_id, ChartUpdate::IncrementDownloads)
            .await
            .map_err(ChartError::from_store)
    }

    // ── Aggregation ─────────────────────────────────────────────────────

    /// All unique resource references reachable from the chart.
    ///
    /// Unions the chart's own image, every node image and resource of the
    /// *published* graph (drafts are not included), and every comment
    /// attachment at the chart and node level. Returns `Ok(None)` when the
    /// chart is missing, or when its published graph reference is broken
    /// (logged as an error). The result is deduplicated and sorted.
    pub async fn collect_resources(&self, chart_id: &ChartId) -> Result<Option<Vec<String>>> {
        let Some((chart, graph)) = self.chart_with_published_graph(chart_id).await? else {
            return Ok(None);
        };

        let mut resources: BTreeSet<String> = BTreeSet::new();
        let mut comments: Vec<&Comment> = chart.comments.iter().collect();
        for node in &graph.nodes {
            comments.extend(node.comments.iter());
            resources.extend(node.images.iter().cloned());
            resources.extend(node.resources.iter().cloned());
        }
        for comment in comments {
            if let Some(attachment) = &comment.attachment {
                resources.insert(attachment.clone());
            }
        }
        if let Some(image) = &chart.image {
            resources.insert(image.clone());
        }
        Ok(Some(resources.into_iter().collect()))
    }

    /// All unique identities contributing to the chart: the owner plus
    /// every comment author at the chart and node level of the published
    /// graph. Returns `Ok(None)` when the chart is missing or its
    /// published graph reference is broken.
    pub async fn collect_contributing_users(
        &self,
        chart_id: &ChartId,
    ) -> Result<Option<Vec<UserId>>> {
        let Some((chart, graph)) = self.chart_with_published_graph(chart_id).await? else {
            return Ok(None);
        };

        let mut users: BTreeSet<UserId> = BTreeSet::new();
        users.insert(chart.owner);
        users.extend(chart.comments.iter().map(|c| c.author));
        for node in &graph.nodes {
            users.extend(node.comments.iter().map(|c| c.author));
        }
        Ok(Some(users.into_iter().collect()))
    }

    async fn chart_with_published_graph(
        &self,
        chart_id: &ChartId,
    ) -> Result<Option<(Chart, Graph)>> {
        let Some(chart) = self.get(chart_id).await? else {
            return Ok(None);
        };
        let Some(graph) = self.get_graph(&chart.graph_id).await? else {
            error!(
                chart_id = %chart_id,
                graph_id = %chart.graph_id,
                "chart references a published graph that does not exist"
            );
            return Ok(None);
        };
        // Aggregation walks node content only.
        Ok(Some((chart, graph.without_links())))
    }

    // ── Feedback ────────────────────────────────────────────────────────

    /// Record or clear a user's vote on a chart.
    ///
    /// With `clear`, removes `user` from both feedback sets and returns
    /// `true` unconditionally (`upvote` is ignored). Otherwise moves the
    /// user to the indicated set in one atomic update and returns whether
    /// any document changed.
    pub async fn set_feedback(
        &self,
        chart_id: &ChartId,
        user: &UserId,
        upvote: bool,
        clear: bool,
    ) -> Result<bool> {
        if clear {
            self.store
                .update_chart(chart_id, ChartUpdate::ClearFeedback { user: *user })
                .await
                .map_err(ChartError::from_store)?;
            return Ok(true);
        }
        let result = self
            .store
            .update_chart(
                chart_id,
                ChartUpdate::SetFeedback {
                    user: *user,
                    upvote,
                },
            )
            .await
            .map_err(ChartError::from_store)?;
        Ok(result.touched())
    }
}

impl<S: EntityStore> Clone for ChartApi<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            permissions: self.permissions.clone(),
            lifecycle: self.lifecycle.clone(),
            history: self.history.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::types::Node;

    fn api() -> (Arc<InMemoryStore>, ChartApi<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let api = ChartApi::new(Arc::clone(&store));
        (store, api)
    }

    #[tokio::test]
    async fn test_insert_requires_authentication() {
        let (_, api) = api();
        let err = api.insert("chart", "desc", None).await.unwrap_err();
        assert!(matches!(err, ChartError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_insert_creates_chart_and_graph() {
        let (store, api) = api();
        let owner = UserId::generate();
        let id = api.insert("chart", "desc", Some(&owner)).await.unwrap();

        let chart = api.get(&id).await.unwrap().unwrap();
        assert_eq!(chart.owner, owner);
        let graph = store.get_graph(&chart.graph_id).await.unwrap().unwrap();
        assert_eq!(graph.owner, owner);
        assert!(graph.nodes.is_empty());
    }

    #[tokio::test]
    async fn test_insert_rejects_empty_name() {
        let (store, api) = api();
        let owner = UserId::generate();
        let err = api.insert("  ", "desc", Some(&owner)).await.unwrap_err();
        assert!(matches!(err, ChartError::Validation(_)));
        // Nothing was written.
        assert_eq!(store.num_charts(), 0);
        assert_eq!(store.num_graphs(), 0);
    }

    #[tokio::test]
    async fn test_upsert_denies_non_owner() {
        let (_, api) = api();
        let owner = UserId::generate();
        let id = api.insert("chart", "desc", Some(&owner)).await.unwrap();

        let mut chart = api.get(&id).await.unwrap().unwrap();
        chart.name = "hijacked".to_string();
        let editor = UserId::generate();
        let err = api.upsert(chart, Some(&editor)).await.unwrap_err();
        assert!(matches!(err, ChartError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_upsert_replaces_owned_chart() {
        let (_, api) = api();
        let owner = UserId::generate();
        let id = api.insert("chart", "desc", Some(&owner)).await.unwrap();

        let mut chart = api.get(&id).await.unwrap().unwrap();
        chart.description = "updated".to_string();
        let result = api.upsert(chart, Some(&owner)).await.unwrap();
        assert!(result.touched());
        assert_eq!(api.get(&id).await.unwrap().unwrap().description, "updated");
    }

    #[tokio::test]
    async fn test_remove_by_editor_is_a_no_op() {
        let (store, api) = api();
        let owner = UserId::generate();
        let editor = UserId::generate();
        let id = api.insert("chart", "desc", Some(&owner)).await.unwrap();
        let mut chart = api.get(&id).await.unwrap().unwrap();
        chart.editors.insert(editor);
        api.upsert(chart, Some(&owner)).await.unwrap();

        let result = api.remove(&id, Some(&editor)).await.unwrap();
        assert!(result.is_none());
        assert!(store.get_chart(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_cascades_to_graphs() {
        let (store, api) = api();
        let owner = UserId::generate();
        let id = api.insert("chart", "desc", Some(&owner)).await.unwrap();
        api.get_or_create_editing_graph(&id).await.unwrap();
        assert_eq!(store.num_graphs(), 2);

        let result = api.remove(&id, Some(&owner)).await.unwrap();
        assert!(result.is_some());
        assert_eq!(store.num_charts(), 0);
        assert_eq!(store.num_graphs(), 0);
    }

    #[tokio::test]
    async fn test_downloads_increment_and_rank() {
        let (_, api) = api();
        let owner = UserId::generate();
        let quiet = api.insert("quiet", "d", Some(&owner)).await.unwrap();
        let popular = api.insert("popular", "d", Some(&owner)).await.unwrap();
        for _ in 0..3 {
            api.increment_downloads(&popular).await.unwrap();
        }
        api.increment_downloads(&quiet).await.unwrap();

        let top = api.find_top_by_downloads(1).await.unwrap();
        assert_eq!(top[0].id, popular);
        assert_eq!(top[0].downloads, 3);
    }

    #[tokio::test]
    async fn test_list_mine_empty_when_unauthenticated() {
        let (_, api) = api();
        let owner = UserId::generate();
        api.insert("chart", "desc", Some(&owner)).await.unwrap();

        assert!(api.list_mine(None).await.unwrap().is_empty());
        assert_eq!(api.list_mine(Some(&owner)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_catalog_filters_flag() {
        let (_, api) = api();
        let owner = UserId::generate();
        let listed = api.insert("listed", "d", Some(&owner)).await.unwrap();
        api.insert("unlisted", "d", Some(&owner)).await.unwrap();

        let mut chart = api.get(&listed).await.unwrap().unwrap();
        chart.in_catalog = true;
        api.upsert(chart, Some(&owner)).await.unwrap();

        let catalog = api.list_catalog().await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].id, listed);
    }

    #[tokio::test]
    async fn test_collect_resources_unions_all_sources() {
        let (store, api) = api();
        let owner = UserId::generate();
        let id = api.insert("chart", "desc", Some(&owner)).await.unwrap();

        let mut chart = api.get(&id).await.unwrap().unwrap();
        chart.image = Some("cover.png".to_string());
        chart
            .comments
            .push(Comment::new(owner, "see attached").with_attachment("notes.pdf"));
        let graph_id = chart.graph_id;
        api.upsert(chart, Some(&owner)).await.unwrap();

        let mut graph = store.get_graph(&graph_id).await.unwrap().unwrap();
        let mut first = Node::new("first");
        first.images.push("a.png".to_string());
        first.resources.push("a.bib".to_string());
        let mut second = Node::new("second");
        second.images.push("b.png".to_string());
        second.resources.push("a.bib".to_string()); // duplicate across nodes
        graph.nodes.push(first);
        graph.nodes.push(second);
        store.replace_graph(&graph_id, graph).await.unwrap();

        let resources = api.collect_resources(&id).await.unwrap().unwrap();
        assert_eq!(
            resources,
            vec!["a.bib", "a.png", "b.png", "cover.png", "notes.pdf"]
        );
    }

    #[tokio::test]
    async fn test_collect_resources_missing_chart() {
        let (_, api) = api();
        assert!(
            api.collect_resources(&ChartId::generate())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_collect_contributing_users() {
        let (store, api) = api();
        let owner = UserId::generate();
        let commenter = UserId::generate();
        let node_commenter = UserId::generate();
        let id = api.insert("chart", "desc", Some(&owner)).await.unwrap();

        let mut chart = api.get(&id).await.unwrap().unwrap();
        chart.comments.push(Comment::new(commenter, "nice"));
        chart.comments.push(Comment::new(owner, "thanks"));
        let graph_id = chart.graph_id;
        api.upsert(chart, Some(&owner)).await.unwrap();

        let mut graph = store.get_graph(&graph_id).await.unwrap().unwrap();
        let mut node = Node::new("n");
        node.comments.push(Comment::new(node_commenter, "hm"));
        graph.nodes.push(node);
        store.replace_graph(&graph_id, graph).await.unwrap();

        let users = api.collect_contributing_users(&id).await.unwrap().unwrap();
        assert_eq!(users.len(), 3);
        assert!(users.contains(&owner));
        assert!(users.contains(&commenter));
        assert!(users.contains(&node_commenter));
    }

    #[tokio::test]
    async fn test_feedback_vote_switch_and_clear() {
        let (_, api) = api();
        let owner = UserId::generate();
        let voter = UserId::generate();
        let id = api.insert("chart", "desc", Some(&owner)).await.unwrap();

        assert!(api.set_feedback(&id, &voter, true, false).await.unwrap());
        assert!(api.set_feedback(&id, &voter, false, false).await.unwrap());

        let chart = api.get(&id).await.unwrap().unwrap();
        assert!(!chart.upvoters.contains(&voter));
        assert!(chart.downvoters.contains(&voter));

        // Clear removes the vote regardless of prior state, and reports
        // success unconditionally.
        assert!(api.set_feedback(&id, &voter, true, true).await.unwrap());
        let chart = api.get(&id).await.unwrap().unwrap();
        assert!(chart.upvoters.is_empty());
        assert!(chart.downvoters.is_empty());
        assert!(api.set_feedback(&id, &voter, false, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_repeated_vote_does_not_touch() {
        let (_, api) = api();
        let owner = UserId::generate();
        let voter = UserId::generate();
        let id = api.insert("chart", "desc", Some(&owner)).await.unwrap();

        assert!(api.set_feedback(&id, &voter, true, false).await.unwrap());
        assert!(!api.set_feedback(&id, &voter, true, false).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_many_skips_missing() {
        let (_, api) = api();
        let owner = UserId::generate();
        let a = api.insert("a", "d", Some(&owner)).await.unwrap();
        let b = api.insert("b", "d", Some(&owner)).await.unwrap();

        let charts = api
            .get_many(&[a, ChartId::generate(), b])
            .await
            .unwrap();
        assert_eq!(charts.len(), 2);
    }
}
