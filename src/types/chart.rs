//! Chart documents and their publish history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::comment::Comment;
use super::ids::{ChartId, GraphId, UserId};
use super::version::Version;

/// One immutable record of a superseded (version, graph) pair.
///
/// Appended to a chart's history when a new graph is published. Entries
/// reference the graph being *replaced*, not the incoming one, so the full
/// lineage of a chart can be replayed from its history plus its current
/// published graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The version string that was superseded.
    pub version: Version,
    /// The published graph that was superseded.
    pub graph_id: GraphId,
    /// Free-text publish comments.
    pub comments: String,
    /// Identity of the publishing user.
    pub user_id: UserId,
    /// When the publish was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// A chart document.
///
/// A chart always references exactly one published graph (`graph_id`). The
/// editing-graph reference is present only while a draft exists and is
/// cleared by publish. `history` is append-only: entries are never edited
/// or reordered once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chart {
    /// Unique chart identifier.
    pub id: ChartId,
    /// Identity with full control (edit, publish, remove).
    pub owner: UserId,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Optional cover image reference.
    pub image: Option<String>,
    /// Identities granted edit (not removal) rights.
    pub editors: BTreeSet<UserId>,
    /// The published graph.
    pub graph_id: GraphId,
    /// The draft graph, present only while a draft differs from the
    /// published graph.
    pub editing_graph_id: Option<GraphId>,
    /// Current published version.
    pub version: Version,
    /// Append-only publish history.
    pub history: Vec<HistoryEntry>,
    /// Download counter, publicly incrementable.
    pub downloads: u64,
    /// Users who upvoted this chart.
    pub upvoters: BTreeSet<UserId>,
    /// Users who downvoted this chart.
    pub downvoters: BTreeSet<UserId>,
    /// Chart-level comments.
    pub comments: Vec<Comment>,
    /// Whether the chart is listed in the public catalog.
    pub in_catalog: bool,
}

impl Chart {
    /// Create a new chart referencing `graph_id` as its published graph.
    ///
    /// Starts at version 1.0 with no draft, no history, and no feedback.
    pub fn new(
        owner: UserId,
        name: impl Into<String>,
        description: impl Into<String>,
        graph_id: GraphId,
    ) -> Self {
        Self {
            id: ChartId::generate(),
            owner,
            name: name.into(),
            description: description.into(),
            image: None,
            editors: BTreeSet::new(),
            graph_id,
            editing_graph_id: None,
            version: Version::initial(),
            history: Vec::new(),
            downloads: 0,
            upvoters: BTreeSet::new(),
            downvoters: BTreeSet::new(),
            comments: Vec::new(),
            in_catalog: false,
        }
    }

    /// Whether `user` is the owner or a listed editor.
    pub fn grants_edit(&self, user: &UserId) -> bool {
        self.owner == *user || self.editors.contains(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_chart_starts_clean() {
        let chart = Chart::new(UserId::generate(), "c", "d", GraphId::generate());
        assert_eq!(chart.version, Version::initial());
        assert!(chart.editing_graph_id.is_none());
        assert!(chart.history.is_empty());
        assert_eq!(chart.downloads, 0);
        assert!(!chart.in_catalog);
    }

    #[test]
    fn test_grants_edit_owner_and_editors() {
        let owner = UserId::generate();
        let editor = UserId::generate();
        let stranger = UserId::generate();
        let mut chart = Chart::new(owner, "c", "d", GraphId::generate());
        chart.editors.insert(editor);

        assert!(chart.grants_edit(&owner));
        assert!(chart.grants_edit(&editor));
        assert!(!chart.grants_edit(&stranger));
    }
}
