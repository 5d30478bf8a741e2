//! Graph documents: the node-and-link content of a chart.

use serde::{Deserialize, Serialize};

use super::comment::Comment;
use super::ids::{GraphId, NodeId, UserId};

/// A node in a chart's graph.
///
/// Nodes carry free text plus references to uploaded images and resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, unique within the graph.
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// Free-text details.
    pub details: String,
    /// Opaque references to attached images.
    pub images: Vec<String>,
    /// Opaque references to attached resources.
    pub resources: Vec<String>,
    /// Comments left on this node.
    pub comments: Vec<Comment>,
}

impl Node {
    /// Create an empty node with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::generate(),
            name: name.into(),
            details: String::new(),
            images: Vec::new(),
            resources: Vec::new(),
            comments: Vec::new(),
        }
    }
}

/// A directed link between two nodes of the same graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    /// Source node.
    pub from: NodeId,
    /// Target node.
    pub to: NodeId,
}

impl Link {
    /// Create a link from `from` to `to`.
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }
}

/// A graph document.
///
/// The `owner` field always mirrors the owning chart's owner; the lifecycle
/// operations force it on every insert and replace, overriding whatever the
/// caller supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    /// Unique graph identifier.
    pub id: GraphId,
    /// Owner identity, mirroring the parent chart's owner.
    pub owner: UserId,
    /// Graph content.
    pub nodes: Vec<Node>,
    /// Node-to-node links.
    pub links: Vec<Link>,
}

impl Graph {
    /// Create an empty graph owned by `owner`, with a fresh identifier.
    pub fn empty(owner: UserId) -> Self {
        Self {
            id: GraphId::generate(),
            owner,
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Deep-copy this graph under a fresh identifier.
    ///
    /// Used to materialize an editing draft from a published graph: the
    /// identifier is replaced so the store treats the copy as a new
    /// document, and the owner is set explicitly by the caller.
    pub fn duplicate_with_owner(&self, owner: UserId) -> Self {
        Self {
            id: GraphId::generate(),
            owner,
            nodes: self.nodes.clone(),
            links: self.links.clone(),
        }
    }

    /// A copy of this graph with its links stripped.
    ///
    /// Aggregation over node content does not need link structure.
    pub fn without_links(&self) -> Self {
        Self {
            id: self.id,
            owner: self.owner,
            nodes: self.nodes.clone(),
            links: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_gets_fresh_id_and_owner() {
        let original_owner = UserId::generate();
        let new_owner = UserId::generate();
        let mut graph = Graph::empty(original_owner);
        graph.nodes.push(Node::new("a"));

        let copy = graph.duplicate_with_owner(new_owner);
        assert_ne!(copy.id, graph.id);
        assert_eq!(copy.owner, new_owner);
        assert_eq!(copy.nodes, graph.nodes);
    }

    #[test]
    fn test_without_links_keeps_nodes() {
        let mut graph = Graph::empty(UserId::generate());
        let a = Node::new("a");
        let b = Node::new("b");
        graph.links.push(Link::new(a.id, b.id));
        graph.nodes.push(a);
        graph.nodes.push(b);

        let stripped = graph.without_links();
        assert_eq!(stripped.nodes.len(), 2);
        assert!(stripped.links.is_empty());
    }
}
