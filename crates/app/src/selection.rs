//! Selected-process reconciliation.
//!
//! Keeps the "selected process id" consistent with the URL query parameter
//! and with the list of processes actually known to exist. The decisions
//! are pure; each returns a [`UrlEffect`] telling the view shell what to do
//! with the URL parameter (and whether the list needs a refetch), so the
//! logic stays testable without a browser.

use jewelai_core::process::DesignProcess;
use jewelai_core::types::EntityId;

use crate::cache::ProcessCache;

/// What the view shell must do to the URL parameter after a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlEffect {
    /// Leave the parameter alone.
    None,
    /// Write the selected id into the parameter.
    Write(EntityId),
    /// Strip the parameter.
    Clear,
    /// Strip the parameter and invalidate/refetch the process list.
    ClearAndRefetchList,
}

/// The currently selected process id and the rules that keep it valid.
#[derive(Debug, Default)]
pub struct Selection {
    selected: Option<EntityId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<EntityId> {
        self.selected
    }

    /// Initial load: a URL parameter wins; otherwise fall back to the first
    /// list entry when nothing is selected yet.
    pub fn initialize(&mut self, param: Option<EntityId>, list: &[DesignProcess]) {
        if let Some(id) = param {
            self.selected = Some(id);
        } else if self.selected.is_none() {
            self.selected = list.first().map(|p| p.id);
        }
    }

    /// Explicit user selection from the list.
    pub fn select(&mut self, id: EntityId) -> UrlEffect {
        self.selected = Some(id);
        UrlEffect::Write(id)
    }

    /// A fresh list arrived. If the selected id vanished (deleted
    /// elsewhere), clear the selection and strip the parameter rather than
    /// keeping stale data displayed.
    pub fn reconcile(&mut self, list: &[DesignProcess]) -> UrlEffect {
        match self.selected {
            Some(id) if !list.iter().any(|p| p.id == id) => {
                self.selected = None;
                UrlEffect::Clear
            }
            _ => UrlEffect::None,
        }
    }

    /// Whether the detail fetch for the current selection may run: only
    /// once the id is confirmed present in the list, so we never fetch ids
    /// that just disappeared.
    pub fn detail_enabled(&self, list: &[DesignProcess]) -> bool {
        self.selected
            .is_some_and(|id| list.iter().any(|p| p.id == id))
    }

    /// The detail fetch failed: treat it like a disappearance -- clear the
    /// selection, strip the parameter, and refetch the list.
    pub fn on_detail_error(&mut self) -> UrlEffect {
        self.selected = None;
        UrlEffect::ClearAndRefetchList
    }

    /// The selected process was deleted by this client.
    pub fn on_deleted(&mut self, cache: &ProcessCache, id: EntityId) -> UrlEffect {
        cache.remove(id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        UrlEffect::Clear
    }

    /// A process was just created: it becomes the selection, its id goes
    /// into the URL, and the list cache is updated optimistically ahead of
    /// the next full refetch.
    pub fn on_created(&mut self, cache: &ProcessCache, created: DesignProcess) -> UrlEffect {
        let id = created.id;
        cache.upsert_list_entry(created);
        self.selected = Some(id);
        UrlEffect::Write(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jewelai_core::process::DesignProcessStatus;

    fn process(id: EntityId) -> DesignProcess {
        DesignProcess {
            id,
            title: format!("Project {id}"),
            status: DesignProcessStatus::IntakeInProgress,
            r#type: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            visualization_url: None,
            image_url: None,
            external_job_id: None,
        }
    }

    #[test]
    fn url_parameter_wins_on_initialize() {
        let mut selection = Selection::new();
        selection.initialize(Some(7), &[process(1), process(2)]);
        assert_eq!(selection.selected(), Some(7));
    }

    #[test]
    fn first_entry_selected_when_no_parameter() {
        let mut selection = Selection::new();
        selection.initialize(None, &[process(3), process(4)]);
        assert_eq!(selection.selected(), Some(3));

        // A later initialize must not steal an existing selection.
        selection.initialize(None, &[process(9)]);
        assert_eq!(selection.selected(), Some(3));
    }

    #[test]
    fn vanished_selection_is_cleared_and_param_stripped() {
        let mut selection = Selection::new();
        selection.initialize(None, &[process(1), process(2)]);
        assert_eq!(selection.selected(), Some(1));

        // Refetch returns only B: selection must become None.
        let effect = selection.reconcile(&[process(2)]);
        assert_eq!(effect, UrlEffect::Clear);
        assert_eq!(selection.selected(), None);
    }

    #[test]
    fn surviving_selection_is_untouched() {
        let mut selection = Selection::new();
        selection.initialize(Some(2), &[process(1), process(2)]);
        assert_eq!(selection.reconcile(&[process(2)]), UrlEffect::None);
        assert_eq!(selection.selected(), Some(2));
    }

    #[test]
    fn detail_fetch_gated_on_list_membership() {
        let mut selection = Selection::new();
        selection.initialize(Some(5), &[process(1)]);
        assert!(!selection.detail_enabled(&[process(1)]));
        assert!(selection.detail_enabled(&[process(1), process(5)]));
    }

    #[test]
    fn detail_error_clears_and_forces_refetch() {
        let mut selection = Selection::new();
        selection.initialize(Some(5), &[process(5)]);

        let effect = selection.on_detail_error();
        assert_eq!(effect, UrlEffect::ClearAndRefetchList);
        assert_eq!(selection.selected(), None);
    }

    #[test]
    fn creation_selects_and_writes_param_and_updates_cache() {
        let cache = ProcessCache::new();
        cache.replace_list(vec![process(1)]);

        let mut selection = Selection::new();
        let effect = selection.on_created(&cache, process(2));

        assert_eq!(effect, UrlEffect::Write(2));
        assert_eq!(selection.selected(), Some(2));
        // Optimistic insert lands at the front of the cached list.
        assert_eq!(cache.list()[0].id, 2);
    }

    #[test]
    fn deletion_clears_selection_and_cache() {
        let cache = ProcessCache::new();
        cache.replace_list(vec![process(1), process(2)]);

        let mut selection = Selection::new();
        selection.initialize(Some(1), &[process(1), process(2)]);

        let effect = selection.on_deleted(&cache, 1);
        assert_eq!(effect, UrlEffect::Clear);
        assert_eq!(selection.selected(), None);
        assert!(!cache.contains(1));
    }
}
