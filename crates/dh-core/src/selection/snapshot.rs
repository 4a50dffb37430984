use std::sync::{Arc, Mutex};

use bytes::Bytes;

use super::model::TargetName;
use crate::ports::ContentProvider;

/// The last known contents of the default clipboard: an ordered list of
/// `(target, payload)` pairs.
///
/// Exactly one snapshot is live at a time; a store operation builds a fresh
/// snapshot and replaces the previous one wholesale. Entries are prepended
/// while storing, so no ordering invariant holds afterwards beyond "last
/// stored wins".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSnapshot {
    entries: Vec<(TargetName, Bytes)>,
}

impl SelectionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend(&mut self, target: TargetName, payload: Bytes) {
        self.entries.insert(0, (target, payload));
    }

    /// First entry matching `target`, if any.
    pub fn lookup(&self, target: &TargetName) -> Option<&Bytes> {
        self.entries
            .iter()
            .find(|(t, _)| t == target)
            .map(|(_, payload)| payload)
    }

    /// The targets to advertise when republishing this snapshot.
    pub fn targets(&self) -> Vec<TargetName> {
        self.entries.iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Serves snapshot payloads verbatim when the protocol layer asks the
/// process for the contents of a selection it republished.
///
/// An unknown target supplies nothing; the requester handles the empty
/// result per protocol convention.
pub struct SnapshotProvider {
    snapshot: Arc<Mutex<SelectionSnapshot>>,
}

impl SnapshotProvider {
    pub fn new(snapshot: Arc<Mutex<SelectionSnapshot>>) -> Self {
        Self { snapshot }
    }
}

impl ContentProvider for SnapshotProvider {
    fn supply(&self, target: &TargetName) -> Option<Bytes> {
        self.snapshot.lock().unwrap().lookup(target).cloned()
    }
}
