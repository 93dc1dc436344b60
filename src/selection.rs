use std::collections::BTreeSet;

use tracing::debug;

use crate::catalog::{DrugRecord, RecordId};

pub const DEFAULT_SELECTION_LIMIT: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("Chỉ có thể chọn tối đa {limit} dòng (đã chọn {selected}, thêm {requested})")]
    LimitExceeded {
        limit: usize,
        selected: usize,
        requested: usize,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionMode {
    #[default]
    View,
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionStats {
    pub selected: usize,
    pub selected_on_page: usize,
    pub on_page: usize,
    pub total_rows: u64,
    pub percentage: f64,
}

/// Record ids picked for export. Survives paging and filtering; only
/// [`SelectionSet::clear`] or leaving select mode empties it.
#[derive(Debug, Clone)]
pub struct SelectionSet {
    ids: BTreeSet<RecordId>,
    mode: SelectionMode,
    limit: usize,
}

impl Default for SelectionSet {
    fn default() -> Self {
        Self::new(DEFAULT_SELECTION_LIMIT)
    }
}

impl SelectionSet {
    pub fn new(limit: usize) -> Self {
        Self {
            ids: BTreeSet::new(),
            mode: SelectionMode::View,
            limit,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Switches between viewing and selecting. Going back to view mode drops
    /// the selection.
    pub fn toggle_mode(&mut self) -> SelectionMode {
        self.mode = match self.mode {
            SelectionMode::View => SelectionMode::Select,
            SelectionMode::Select => {
                self.ids.clear();
                SelectionMode::View
            }
        };
        self.mode
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.ids.contains(&id)
    }

    /// Selected ids in ascending order.
    pub fn ids(&self) -> Vec<RecordId> {
        self.ids.iter().copied().collect()
    }

    /// Returns whether `id` is selected afterwards.
    pub fn toggle(&mut self, id: RecordId) -> Result<bool, SelectionError> {
        if self.ids.remove(&id) {
            return Ok(false);
        }
        self.ensure_room(1)?;
        self.ids.insert(id);
        Ok(true)
    }

    /// Adds every visible id. Fails without changing anything if the result
    /// would exceed the limit.
    pub fn select_all_on_page(&mut self, visible: &[RecordId]) -> Result<usize, SelectionError> {
        let missing: BTreeSet<RecordId> = visible
            .iter()
            .copied()
            .filter(|id| !self.ids.contains(id))
            .collect();
        self.ensure_room(missing.len())?;
        let added = missing.len();
        self.ids.extend(missing);
        debug!(added, selected = self.ids.len(), "Selected page rows");
        Ok(added)
    }

    pub fn deselect_all_on_page(&mut self, visible: &[RecordId]) -> usize {
        let before = self.ids.len();
        for id in visible {
            self.ids.remove(id);
        }
        before - self.ids.len()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn is_fully_selected(&self, visible: &[RecordId]) -> bool {
        !visible.is_empty() && visible.iter().all(|id| self.ids.contains(id))
    }

    pub fn is_partially_selected(&self, visible: &[RecordId]) -> bool {
        visible.iter().any(|id| self.ids.contains(id)) && !self.is_fully_selected(visible)
    }

    pub fn selected_on_page<'a>(&self, rows: &'a [DrugRecord]) -> Vec<&'a DrugRecord> {
        rows.iter().filter(|row| self.ids.contains(&row.id)).collect()
    }

    pub fn stats(&self, rows: &[DrugRecord], total_rows: u64) -> SelectionStats {
        let selected = self.ids.len();
        SelectionStats {
            selected,
            selected_on_page: self.selected_on_page(rows).len(),
            on_page: rows.len(),
            total_rows,
            percentage: if total_rows > 0 {
                selected as f64 / total_rows as f64 * 100.0
            } else {
                0.0
            },
        }
    }

    fn ensure_room(&self, requested: usize) -> Result<(), SelectionError> {
        if self.ids.len() + requested > self.limit {
            return Err(SelectionError::LimitExceeded {
                limit: self.limit,
                selected: self.ids.len(),
                requested,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(ids: &[RecordId]) -> Vec<DrugRecord> {
        ids.iter()
            .map(|id| DrugRecord {
                id: *id,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn selection_survives_page_changes() {
        let mut selection = SelectionSet::default();
        let page_one: Vec<RecordId> = (1..=20).collect();
        let page_two: Vec<RecordId> = (21..=40).collect();

        selection.toggle(5).unwrap();
        assert!(!selection.is_partially_selected(&page_two));
        assert!(selection.is_partially_selected(&page_one));
        assert!(selection.contains(5));
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut selection = SelectionSet::default();
        assert!(selection.toggle(7).unwrap());
        assert!(!selection.toggle(7).unwrap());
        assert!(selection.is_empty());
    }

    #[test]
    fn page_select_and_deselect() {
        let mut selection = SelectionSet::default();
        selection.toggle(99).unwrap();
        let visible = [1, 2, 3];
        assert_eq!(selection.select_all_on_page(&visible).unwrap(), 3);
        assert!(selection.is_fully_selected(&visible));
        assert!(!selection.is_partially_selected(&visible));
        assert_eq!(selection.deselect_all_on_page(&visible), 3);
        assert_eq!(selection.ids(), vec![99]);
    }

    #[test]
    fn empty_page_is_never_fully_selected() {
        let selection = SelectionSet::default();
        assert!(!selection.is_fully_selected(&[]));
        assert!(!selection.is_partially_selected(&[]));
    }

    #[test]
    fn limit_is_all_or_nothing() {
        let mut selection = SelectionSet::new(4);
        selection.select_all_on_page(&[1, 2, 3]).unwrap();
        let err = selection.select_all_on_page(&[3, 4, 5]).unwrap_err();
        assert_eq!(
            err,
            SelectionError::LimitExceeded {
                limit: 4,
                selected: 3,
                requested: 2
            }
        );
        assert_eq!(selection.ids(), vec![1, 2, 3]);
        selection.toggle(4).unwrap();
        assert!(selection.toggle(5).is_err());
        // Removing never hits the limit.
        assert!(!selection.toggle(4).unwrap());
    }

    #[test]
    fn leaving_select_mode_clears() {
        let mut selection = SelectionSet::default();
        assert_eq!(selection.toggle_mode(), SelectionMode::Select);
        selection.toggle(1).unwrap();
        assert_eq!(selection.toggle_mode(), SelectionMode::View);
        assert!(selection.is_empty());
    }

    #[test]
    fn stats_report_page_and_total() {
        let mut selection = SelectionSet::default();
        selection.select_all_on_page(&[1, 2, 30]).unwrap();
        let page = rows(&[1, 2, 3, 4]);
        let stats = selection.stats(&page, 60);
        assert_eq!(stats.selected, 3);
        assert_eq!(stats.selected_on_page, 2);
        assert_eq!(stats.on_page, 4);
        assert!((stats.percentage - 5.0).abs() < 1e-9);
        assert_eq!(selection.stats(&page, 0).percentage, 0.0);
    }
}
