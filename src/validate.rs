//! Validation pipeline for chart and graph documents.
//!
//! Validators are plain functions returning field-level errors. Graph
//! validation runs in two explicit stages: shape (field bounds, duplicate
//! node identifiers) and link integrity (every link must join two distinct,
//! known nodes). Both stages run before any store mutation, including
//! whole-document replaces, so there is no unvalidated write path.

use std::collections::BTreeSet;
use std::fmt;

use crate::types::{Chart, Graph, NodeId};

/// Maximum length of chart and node names.
pub const NAME_MAX_LEN: usize = 120;
/// Maximum length of a chart description.
pub const DESCRIPTION_MAX_LEN: usize = 2000;

/// A single field-level validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The collected errors of a failed validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    /// All field errors, in evaluation order.
    pub errors: Vec<FieldError>,
}

impl std::error::Error for ValidationErrors {}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed ({} error(s))", self.errors.len())?;
        for err in &self.errors {
            write!(f, "; {err}")?;
        }
        Ok(())
    }
}

fn into_result(errors: Vec<FieldError>) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { errors })
    }
}

/// Check the field bounds of a chart document.
pub fn check_chart_shape(chart: &Chart) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if chart.name.trim().is_empty() {
        errors.push(FieldError::new("name", "must not be empty"));
    }
    if chart.name.chars().count() > NAME_MAX_LEN {
        errors.push(FieldError::new(
            "name",
            format!("must be at most {NAME_MAX_LEN} characters"),
        ));
    }
    if chart.description.chars().count() > DESCRIPTION_MAX_LEN {
        errors.push(FieldError::new(
            "description",
            format!("must be at most {DESCRIPTION_MAX_LEN} characters"),
        ));
    }
    errors
}

/// Check the field bounds and node uniqueness of a graph document.
pub fn check_graph_shape(graph: &Graph) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let mut seen: BTreeSet<NodeId> = BTreeSet::new();
    for (i, node) in graph.nodes.iter().enumerate() {
        if node.name.trim().is_empty() {
            errors.push(FieldError::new(format!("nodes[{i}].name"), "must not be empty"));
        }
        if node.name.chars().count() > NAME_MAX_LEN {
            errors.push(FieldError::new(
                format!("nodes[{i}].name"),
                format!("must be at most {NAME_MAX_LEN} characters"),
            ));
        }
        if !seen.insert(node.id) {
            errors.push(FieldError::new(
                format!("nodes[{i}].id"),
                format!("duplicate node id {}", node.id),
            ));
        }
    }
    errors
}

/// Check link integrity: every link must join two distinct, known nodes.
pub fn check_graph_integrity(graph: &Graph) -> Vec<FieldError> {
    let node_ids: BTreeSet<NodeId> = graph.nodes.iter().map(|n| n.id).collect();
    let mut errors = Vec::new();
    for (i, link) in graph.links.iter().enumerate() {
        if !node_ids.contains(&link.from) {
            errors.push(FieldError::new(
                format!("links[{i}].from"),
                format!("references unknown node {}", link.from),
            ));
        }
        if !node_ids.contains(&link.to) {
            errors.push(FieldError::new(
                format!("links[{i}].to"),
                format!("references unknown node {}", link.to),
            ));
        }
        if link.from == link.to {
            errors.push(FieldError::new(
                format!("links[{i}]"),
                "must not link a node to itself",
            ));
        }
    }
    errors
}

/// Run the full chart validation pipeline.
pub fn validate_chart(chart: &Chart) -> Result<(), ValidationErrors> {
    into_result(check_chart_shape(chart))
}

/// Run the full graph validation pipeline: shape, then link integrity.
pub fn validate_graph(graph: &Graph) -> Result<(), ValidationErrors> {
    let mut errors = check_graph_shape(graph);
    errors.extend(check_graph_integrity(graph));
    into_result(errors)
}
