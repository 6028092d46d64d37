use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Expanded rows of a single table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowExpansion {
    expanded: HashSet<String>,
}

impl RowExpansion {
    /// Flips one row and returns its new state
    pub fn toggle(&mut self, row_id: &str) -> bool {
        if self.expanded.remove(row_id) {
            false
        } else {
            self.expanded.insert(row_id.to_string());
            true
        }
    }

    pub fn remove(&mut self, row_id: &str) -> bool {
        self.expanded.remove(row_id)
    }

    pub fn is_expanded(&self, row_id: &str) -> bool {
        self.expanded.contains(row_id)
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackofficeTable {
    Users,
    Recipes,
}

/// Row expansion per (viewer, table)
#[derive(Debug, Default)]
pub struct ViewStates {
    inner: RwLock<HashMap<(String, BackofficeTable), RowExpansion>>,
}

impl ViewStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn toggle(&self, viewer: &str, table: BackofficeTable, row_id: &str) -> bool {
        let mut states = self.inner.write().await;
        states
            .entry((viewer.to_string(), table))
            .or_default()
            .toggle(row_id)
    }

    pub async fn snapshot(&self, viewer: &str, table: BackofficeTable) -> RowExpansion {
        self.inner
            .read()
            .await
            .get(&(viewer.to_string(), table))
            .cloned()
            .unwrap_or_default()
    }

    /// Drops a deleted row from every viewer's state for `table`.
    /// Viewers left with nothing expanded are removed.
    pub async fn forget(&self, table: BackofficeTable, row_id: &str) {
        let mut states = self.inner.write().await;
        states.retain(|(_, t), rows| {
            if *t == table {
                rows.remove(row_id);
                !rows.is_empty()
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_affects_only_that_row() {
        let mut rows = RowExpansion::default();
        rows.toggle("a");
        rows.toggle("b");
        assert!(rows.is_expanded("a") && rows.is_expanded("b"));

        assert!(!rows.toggle("a"));
        assert!(!rows.is_expanded("a"));
        assert!(rows.is_expanded("b"));
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_view_states_are_per_viewer_and_table() {
        let views = ViewStates::new();
        assert!(views.toggle("admin-1", BackofficeTable::Users, "u1").await);

        assert!(views.snapshot("admin-1", BackofficeTable::Users).await.is_expanded("u1"));
        assert!(!views.snapshot("admin-1", BackofficeTable::Recipes).await.is_expanded("u1"));
        assert!(views.snapshot("admin-2", BackofficeTable::Users).await.is_empty());
    }

    #[tokio::test]
    async fn test_forget_clears_row_for_every_viewer() {
        let views = ViewStates::new();
        views.toggle("admin-1", BackofficeTable::Users, "u1").await;
        views.toggle("admin-2", BackofficeTable::Users, "u1").await;
        views.toggle("admin-2", BackofficeTable::Users, "u2").await;
        views.toggle("admin-1", BackofficeTable::Recipes, "u1").await;

        views.forget(BackofficeTable::Users, "u1").await;

        assert!(views.snapshot("admin-1", BackofficeTable::Users).await.is_empty());
        assert!(!views.snapshot("admin-2", BackofficeTable::Users).await.is_expanded("u1"));
        assert!(views.snapshot("admin-2", BackofficeTable::Users).await.is_expanded("u2"));
        assert!(views.snapshot("admin-1", BackofficeTable::Recipes).await.is_expanded("u1"));
        assert_eq!(views.inner.read().await.len(), 2);
    }
}
