//! Bounded undo history

use crate::instance::MaterialInstance;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;

/// Entries kept before the oldest is evicted
pub const HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    BindingApply,
}

/// One reversible binding operation.
///
/// `previous_materials` and `previous_skus` run parallel to
/// `affected_mesh_ids`.
#[derive(Debug, Clone)]
pub struct ActionHistoryEntry {
    pub kind: ActionKind,
    pub sku: String,
    pub affected_mesh_ids: Vec<String>,
    pub previous_materials: Vec<Option<Arc<MaterialInstance>>>,
    pub previous_skus: Vec<Option<String>>,
    pub timestamp: DateTime<Utc>,
}

/// Fixed-capacity ring of [`ActionHistoryEntry`]
#[derive(Debug, Clone)]
pub struct ActionHistory {
    entries: VecDeque<ActionHistoryEntry>,
    capacity: usize,
}

impl Default for ActionHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl ActionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push an entry, returning the evicted oldest one when full
    pub fn push(&mut self, entry: ActionHistoryEntry) -> Option<ActionHistoryEntry> {
        if self.capacity == 0 {
            return Some(entry);
        }
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    /// Most recent entry, removed
    pub fn pop(&mut self) -> Option<ActionHistoryEntry> {
        self.entries.pop_back()
    }

    pub fn peek(&self) -> Option<&ActionHistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
