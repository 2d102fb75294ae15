//! Toplevel handle registry
//!
//! The core state machine: one record per live toplevel, keyed by the
//! server-assigned protocol id. Protocol events mutate records in place;
//! [`ToplevelRegistry::apply_state`] detects the focus-gain transition
//! that produces a host notification.
//!
//! The registry is deliberately free of protocol objects so the full
//! event semantics can be unit-tested without a compositor. The
//! `Dispatch` glue in `handlers` owns the proxies and feeds this type.

use std::collections::HashMap;

use wayland_protocols_wlr::foreign_toplevel::v1::client::zwlr_foreign_toplevel_handle_v1::State;

use crate::types::{FocusSnapshot, ToplevelInfo};

/// Server-assigned identity of a toplevel handle
pub(crate) type ToplevelKey = u32;

/// State tracked for one toplevel window
///
/// `activated` always reflects the most recently applied state set;
/// state updates replace the previous value, they never merge with it.
#[derive(Debug, Default)]
pub(crate) struct ToplevelRecord {
    pub(crate) app_id: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) activated: bool,
}

/// The set of live toplevel records
///
/// Holds exactly one record per open, not-yet-closed handle. Events for
/// ids that were never inserted, or that have been removed, are ignored.
#[derive(Debug, Default)]
pub(crate) struct ToplevelRegistry {
    records: HashMap<ToplevelKey, ToplevelRecord>,
}

impl ToplevelRegistry {
    /// Create a record for a newly announced toplevel
    ///
    /// The record starts with no app id, no title, and not activated;
    /// the compositor follows up with property events.
    pub(crate) fn insert(&mut self, key: ToplevelKey) {
        self.records.insert(key, ToplevelRecord::default());
    }

    /// Replace the stored title (full replacement, not append)
    pub(crate) fn set_title(&mut self, key: ToplevelKey, title: String) {
        if let Some(record) = self.records.get_mut(&key) {
            record.title = Some(title);
        }
    }

    /// Replace the stored application identifier
    pub(crate) fn set_app_id(&mut self, key: ToplevelKey, app_id: String) {
        if let Some(record) = self.records.get_mut(&key) {
            record.app_id = Some(app_id);
        }
    }

    /// Apply a complete state set and detect the focus-gain transition
    ///
    /// `activated` is recomputed as membership of [`State::Activated`] in
    /// `flags`, replacing the prior value. Returns a snapshot of the
    /// record exactly when the flag went from unset to set; all other
    /// transitions (including set to unset) return `None`.
    ///
    /// Compositors may legitimately report several toplevels as
    /// activated at once; no mutual exclusion is enforced here.
    pub(crate) fn apply_state(
        &mut self,
        key: ToplevelKey,
        flags: &[u32],
    ) -> Option<FocusSnapshot> {
        let record = self.records.get_mut(&key)?;
        let was_activated = record.activated;
        record.activated = flags.contains(&(State::Activated as u32));

        if record.activated && !was_activated {
            Some(FocusSnapshot {
                app_id: record.app_id.clone(),
                title: record.title.clone(),
                focused: true,
            })
        } else {
            None
        }
    }

    /// Remove a closed toplevel's record
    ///
    /// Returns whether a record existed. No notification is produced,
    /// even when the removed toplevel was the activated one.
    pub(crate) fn remove(&mut self, key: ToplevelKey) -> bool {
        self.records.remove(&key).is_some()
    }

    /// Drop every record
    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    /// Number of live records
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// View of some currently activated toplevel
    ///
    /// If the compositor reports several simultaneously activated
    /// windows, which one is returned is unspecified.
    pub(crate) fn active_window(&self) -> Option<ToplevelInfo> {
        self.records
            .values()
            .find(|record| record.activated)
            .map(ToplevelInfo::from)
    }

    /// Views of every live toplevel
    pub(crate) fn toplevels(&self) -> Vec<ToplevelInfo> {
        self.records.values().map(ToplevelInfo::from).collect()
    }
}

/// Decode a wire-format state array into native-endian flag values
///
/// The protocol delivers the state set as a byte array of packed 32-bit
/// values. A trailing partial chunk would be a compositor bug and is
/// ignored.
pub(crate) fn decode_state_flags(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIVATED: u32 = State::Activated as u32;
    const MAXIMIZED: u32 = State::Maximized as u32;
    const FULLSCREEN: u32 = State::Fullscreen as u32;

    fn encode_state_flags(flags: &[u32]) -> Vec<u8> {
        flags.iter().flat_map(|flag| flag.to_ne_bytes()).collect()
    }

    #[test]
    fn new_record_has_empty_properties_and_no_focus() {
        let mut registry = ToplevelRegistry::default();

        registry.insert(1);

        let windows = registry.toplevels();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].app_id, None);
        assert_eq!(windows[0].title, None);
        assert!(!windows[0].activated);
        assert_eq!(registry.active_window(), None);
    }

    #[test]
    fn title_and_app_id_are_fully_replaced() {
        let mut registry = ToplevelRegistry::default();
        registry.insert(1);

        registry.set_title(1, "Draft".to_string());
        registry.set_title(1, "Editor".to_string());
        registry.set_app_id(1, "org.example.draft".to_string());
        registry.set_app_id(1, "org.example.editor".to_string());

        let windows = registry.toplevels();
        assert_eq!(windows[0].title.as_deref(), Some("Editor"));
        assert_eq!(windows[0].app_id.as_deref(), Some("org.example.editor"));
    }

    #[test]
    fn focus_gain_produces_exactly_one_snapshot() {
        let mut registry = ToplevelRegistry::default();
        registry.insert(1);
        registry.set_title(1, "Editor".to_string());
        registry.set_app_id(1, "org.example.editor".to_string());

        let snapshot = registry
            .apply_state(1, &[ACTIVATED])
            .expect("focus gain should notify");

        assert_eq!(snapshot.app_id.as_deref(), Some("org.example.editor"));
        assert_eq!(snapshot.title.as_deref(), Some("Editor"));
        assert!(snapshot.focused);

        // Re-asserting the same state set is not a transition.
        assert_eq!(registry.apply_state(1, &[ACTIVATED]), None);
    }

    #[test]
    fn focus_gain_before_properties_snapshots_empty_fields() {
        let mut registry = ToplevelRegistry::default();
        registry.insert(1);

        let snapshot = registry
            .apply_state(1, &[ACTIVATED])
            .expect("focus gain should notify");

        assert_eq!(snapshot.app_id, None);
        assert_eq!(snapshot.title, None);
        assert!(snapshot.focused);
    }

    #[test]
    fn focus_loss_does_not_notify() {
        let mut registry = ToplevelRegistry::default();
        registry.insert(1);

        assert!(registry.apply_state(1, &[ACTIVATED]).is_some());
        assert_eq!(registry.apply_state(1, &[]), None);
        assert_eq!(registry.active_window(), None);

        // Regaining focus notifies again.
        assert!(registry.apply_state(1, &[ACTIVATED]).is_some());
    }

    #[test]
    fn state_sets_replace_rather_than_merge() {
        let mut registry = ToplevelRegistry::default();
        registry.insert(1);

        assert!(registry.apply_state(1, &[MAXIMIZED, ACTIVATED]).is_some());

        // A new set without `activated` clears the flag even though other
        // flags survive in the compositor's view.
        assert_eq!(registry.apply_state(1, &[MAXIMIZED, FULLSCREEN]), None);
        assert_eq!(registry.active_window(), None);
    }

    #[test]
    fn unrelated_flags_never_count_as_focus() {
        let mut registry = ToplevelRegistry::default();
        registry.insert(1);

        assert_eq!(registry.apply_state(1, &[MAXIMIZED]), None);
        assert_eq!(registry.apply_state(1, &[FULLSCREEN, MAXIMIZED]), None);
        assert_eq!(registry.active_window(), None);
    }

    #[test]
    fn multiple_activated_toplevels_are_tolerated() {
        let mut registry = ToplevelRegistry::default();
        registry.insert(1);
        registry.insert(2);

        assert!(registry.apply_state(1, &[ACTIVATED]).is_some());
        assert!(registry.apply_state(2, &[ACTIVATED]).is_some());

        let activated = registry
            .toplevels()
            .iter()
            .filter(|info| info.activated)
            .count();
        assert_eq!(activated, 2);
    }

    #[test]
    fn removed_toplevel_ignores_later_events() {
        let mut registry = ToplevelRegistry::default();
        registry.insert(1);
        registry.set_title(1, "Editor".to_string());

        assert!(registry.remove(1));
        assert_eq!(registry.len(), 0);

        // Stale events for the dead id fall through without effect.
        registry.set_title(1, "Ghost".to_string());
        assert_eq!(registry.apply_state(1, &[ACTIVATED]), None);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn removing_the_focused_toplevel_does_not_notify() {
        let mut registry = ToplevelRegistry::default();
        registry.insert(1);
        assert!(registry.apply_state(1, &[ACTIVATED]).is_some());

        assert!(registry.remove(1));
        assert_eq!(registry.active_window(), None);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut registry = ToplevelRegistry::default();
        registry.insert(1);

        assert!(registry.remove(1));
        assert!(!registry.remove(1));
    }

    #[test]
    fn events_for_unknown_ids_are_ignored() {
        let mut registry = ToplevelRegistry::default();

        registry.set_title(7, "Nobody".to_string());
        registry.set_app_id(7, "org.example.nobody".to_string());
        assert_eq!(registry.apply_state(7, &[ACTIVATED]), None);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn snapshot_is_independent_of_the_registry() {
        let mut registry = ToplevelRegistry::default();
        registry.insert(1);
        registry.set_title(1, "Editor".to_string());

        let snapshot = registry.apply_state(1, &[ACTIVATED]).unwrap();
        registry.set_title(1, "Renamed".to_string());
        registry.remove(1);

        assert_eq!(snapshot.title.as_deref(), Some("Editor"));
    }

    #[test]
    fn decode_state_flags_unpacks_packed_u32s() {
        let bytes = encode_state_flags(&[MAXIMIZED, ACTIVATED]);

        assert_eq!(decode_state_flags(&bytes), vec![MAXIMIZED, ACTIVATED]);
    }

    #[test]
    fn decode_state_flags_handles_empty_array() {
        assert_eq!(decode_state_flags(&[]), Vec::<u32>::new());
    }

    #[test]
    fn decode_state_flags_drops_truncated_tail() {
        let mut bytes = encode_state_flags(&[ACTIVATED]);
        bytes.extend_from_slice(&[0x02, 0x00]);

        assert_eq!(decode_state_flags(&bytes), vec![ACTIVATED]);
    }
}
