//! Permission predicates for chart mutation.
//!
//! Pure read-based checks with no side effects. Every mutating operation in
//! the crate gates on one of these before touching the store.

use std::sync::Arc;

use crate::error::{ChartError, Result};
use crate::store::EntityStore;
use crate::types::{ChartId, UserId};

/// Evaluates owner/editor permissions against stored charts.
pub struct Permissions<S: EntityStore> {
    store: Arc<S>,
}

impl<S: EntityStore> Permissions<S> {
    /// Create an evaluator over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Whether `actor` may edit the chart.
    ///
    /// False when no identity is supplied, the chart does not exist, or the
    /// actor is neither the owner nor a listed editor.
    pub async fn can_edit(&self, chart_id: &ChartId, actor: Option<&UserId>) -> Result<bool> {
        let Some(user) = actor else {
            return Ok(false);
        };
        let chart = self
            .store
            .get_chart(chart_id)
            .await
            .map_err(ChartError::from_store)?;
        Ok(chart.map(|c| c.grants_edit(user)).unwrap_or(false))
    }

    /// Whether `actor` owns the chart. Editors do not qualify.
    pub async fn is_owner(&self, chart_id: &ChartId, actor: Option<&UserId>) -> Result<bool> {
        let Some(user) = actor else {
            return Ok(false);
        };
        let chart = self
            .store
            .get_chart(chart_id)
            .await
            .map_err(ChartError::from_store)?;
        Ok(chart.map(|c| c.owner == *user).unwrap_or(false))
    }
}

// Manual impl: a derived Clone would require S: Clone.
impl<S: EntityStore> Clone for Permissions<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}
