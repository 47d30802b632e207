//! Work lists: the columns of the board.
//!
//! A work list is a FIFO queue of items tagged with the skill needed to move
//! them on. Insertion order is priority. Items a worker has claimed stay in
//! the list but are marked in progress and are skipped by [`WorkList::peek`].

use serde::Serialize;

use crate::event::{EventBus, EventKind, StageRef};
use crate::model::{ItemId, StageId, WorkItem};

#[derive(Debug, Clone)]
struct Entry {
    item: WorkItem,
    in_progress: bool,
}

/// One stage of the board.
#[derive(Debug, Clone)]
pub struct WorkList {
    id: StageId,
    index: usize,
    name: String,
    necessary_skill: Option<String>,
    entries: Vec<Entry>,
}

/// Read-only copy of a stage for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSnapshot {
    pub id: StageId,
    pub name: String,
    pub necessary_skill: Option<String>,
    pub items: Vec<WorkItem>,
}

impl WorkList {
    pub fn new(
        id: StageId,
        index: usize,
        name: impl Into<String>,
        necessary_skill: Option<String>,
    ) -> Self {
        Self {
            id,
            index,
            name: name.into(),
            necessary_skill,
            entries: Vec::new(),
        }
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Skill a worker needs to take items from this list. `None` for done.
    pub fn necessary_skill(&self) -> Option<&str> {
        self.necessary_skill.as_deref()
    }

    pub fn stage_ref(&self) -> StageRef {
        StageRef {
            id: self.id,
            index: self.index,
            name: self.name.clone(),
        }
    }

    /// Number of items in the list, in progress or not.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// True when at least one item is waiting for a worker.
    pub fn has_work(&self) -> bool {
        self.peek().is_some()
    }

    /// Number of items currently claimed by a worker.
    pub fn in_progress(&self) -> usize {
        self.entries.iter().filter(|e| e.in_progress).count()
    }

    /// Snapshot copy of every item, in queue order.
    pub fn items(&self) -> Vec<WorkItem> {
        self.entries.iter().map(|e| e.item.clone()).collect()
    }

    /// The first item waiting for a worker, without removing it.
    pub fn peek(&self) -> Option<&WorkItem> {
        self.entries
            .iter()
            .find(|e| !e.in_progress)
            .map(|e| &e.item)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.entries.iter().any(|e| e.item.id == id)
    }

    /// Append an item at the tail.
    pub fn add(&mut self, item: WorkItem, bus: &mut EventBus) {
        bus.publish(EventKind::WorkItemAdded {
            item: item.clone(),
            stage: self.stage_ref(),
        });
        self.entries.push(Entry {
            item,
            in_progress: false,
        });
    }

    /// Take an item out of the list. Absent items are ignored without an event.
    pub fn remove(&mut self, id: ItemId, bus: &mut EventBus) -> Option<WorkItem> {
        let position = self.entries.iter().position(|e| e.item.id == id)?;
        let entry = self.entries.remove(position);
        bus.publish(EventKind::WorkItemRemoved {
            item: entry.item.clone(),
            stage: self.stage_ref(),
        });
        Some(entry.item)
    }

    /// Remove an item from this list and append it to `target`.
    ///
    /// Does nothing and returns `None` when the item is not here.
    pub fn move_to(
        &mut self,
        target: &mut WorkList,
        id: ItemId,
        bus: &mut EventBus,
    ) -> Option<WorkItem> {
        let item = self.remove(id, bus)?;
        target.add(item.clone(), bus);
        Some(item)
    }

    pub fn snapshot(&self) -> ColumnSnapshot {
        ColumnSnapshot {
            id: self.id,
            name: self.name.clone(),
            necessary_skill: self.necessary_skill.clone(),
            items: self.items(),
        }
    }

    pub(crate) fn mark_in_progress(&mut self, id: ItemId) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.item.id == id) {
            entry.in_progress = true;
        }
    }
}
