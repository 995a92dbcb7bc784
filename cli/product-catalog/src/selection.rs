//! Checked rows of the product listing.

use std::collections::BTreeSet;

use crate::types::ProductId;

/// Identifiers of the checked rows.
///
/// Only identifiers of the currently visible rows are ever selected,
/// callers pass the visible set to every operation that adds to the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: BTreeSet<ProductId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, id: &ProductId) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductId> {
        self.selected.iter()
    }

    /// Flip the checked state of a visible row.
    ///
    /// Returns the new state, or `None` if the row is not visible.
    pub fn toggle<'a>(
        &mut self,
        id: &ProductId,
        visible: impl IntoIterator<Item = &'a ProductId>,
    ) -> Option<bool> {
        if !visible.into_iter().any(|visible_id| visible_id == id) {
            return None;
        }
        if self.selected.remove(id) {
            Some(false)
        } else {
            self.selected.insert(id.clone());
            Some(true)
        }
    }

    /// Select every visible row, or clear the selection if all of them
    /// are selected already.
    pub fn toggle_all<'a>(&mut self, visible: impl IntoIterator<Item = &'a ProductId>) {
        let visible: Vec<&ProductId> = visible.into_iter().collect();
        if self.all_selected(visible.iter().copied()) {
            self.selected.clear();
        } else {
            self.selected = visible.into_iter().cloned().collect();
        }
    }

    /// Whether at least one row is visible and all visible rows are selected.
    pub fn all_selected<'a>(&self, visible: impl IntoIterator<Item = &'a ProductId>) -> bool {
        let mut visible = visible.into_iter().peekable();
        visible.peek().is_some() && visible.all(|id| self.selected.contains(id))
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }
}
