use std::collections::HashMap;

use uuid::Uuid;

use crate::models::task::{ChecklistItemInput, TaskView, UpdateChecklistRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Unchecked,
    Checked,
}

/// A checklist write issued by an optimistic toggle.
///
/// Carries the task as it was before the toggle so a failed write can put it
/// back. Hand it back to the store through `SyncSucceeded` or `SyncFailed`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSync {
    pub task_id: Uuid,
    pub request: UpdateChecklistRequest,
    seq: u64,
    snapshot: TaskView,
}

#[derive(Debug, Clone)]
pub enum Action {
    /// A fetch returned this task.
    Loaded(TaskView),
    /// A fetch found nothing for this id.
    Missing(Uuid),
    /// The user flipped the checklist item at `index`. Ignored while an
    /// earlier write for the same task is unanswered.
    Toggle { task_id: Uuid, index: usize },
    /// The server accepted the write and answered with its task.
    SyncSucceeded { pending: PendingSync, task: TaskView },
    /// The write failed (network or non-200).
    SyncFailed { pending: PendingSync },
}

#[derive(Debug, Clone)]
enum Entry {
    Loaded(TaskView),
    Missing,
}

/// Client-held tasks keyed by id. Only `dispatch` mutates it.
///
/// At most one checklist write per task is in flight; `in_flight` holds its
/// sequence number so settling a write that is no longer current is a no-op.
#[derive(Debug, Default)]
pub struct TaskStore {
    entries: HashMap<Uuid, Entry>,
    in_flight: HashMap<Uuid, u64>,
    next_seq: u64,
    send_version: bool,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles carry the held `version`, so the server rejects them with a
    /// conflict when another writer got there first.
    pub fn with_version_check() -> Self {
        Self {
            send_version: true,
            ..Self::default()
        }
    }

    /// Applies an action. `Toggle` returns the write to send when it changed
    /// anything; every other action returns `None`.
    pub fn dispatch(&mut self, action: Action) -> Option<PendingSync> {
        match action {
            Action::Loaded(task) => {
                self.entries.insert(task.id, Entry::Loaded(task));
                None
            }
            Action::Missing(task_id) => {
                self.entries.insert(task_id, Entry::Missing);
                None
            }
            Action::Toggle { task_id, index } => self.toggle(task_id, index),
            Action::SyncSucceeded { pending, task } => {
                if self.settle(&pending) {
                    self.entries.insert(pending.task_id, Entry::Loaded(task));
                }
                None
            }
            Action::SyncFailed { pending } => {
                if self.settle(&pending) {
                    log::warn!(
                        "Checklist update for task {} failed, reverting",
                        pending.task_id
                    );
                    self.entries
                        .insert(pending.task_id, Entry::Loaded(pending.snapshot));
                }
                None
            }
        }
    }

    fn toggle(&mut self, task_id: Uuid, index: usize) -> Option<PendingSync> {
        if self.in_flight.contains_key(&task_id) {
            log::debug!("Checklist write for task {} still pending, toggle ignored", task_id);
            return None;
        }
        let task = match self.entries.get_mut(&task_id) {
            Some(Entry::Loaded(task)) => task,
            _ => return None,
        };
        if index >= task.todo_checklist.len() {
            return None;
        }

        let snapshot = task.clone();
        let item = &mut task.todo_checklist[index];
        item.completed = !item.completed;

        let request = UpdateChecklistRequest {
            todo_checklist: task.todo_checklist.iter().map(ChecklistItemInput::from).collect(),
            version: self.send_version.then_some(task.version),
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight.insert(task_id, seq);

        Some(PendingSync {
            task_id,
            request,
            seq,
            snapshot,
        })
    }

    /// Clears the in-flight marker when `pending` is the current write.
    /// Returns false for a write that was already settled.
    fn settle(&mut self, pending: &PendingSync) -> bool {
        if self.in_flight.get(&pending.task_id) != Some(&pending.seq) {
            log::debug!("Ignoring stale checklist sync for task {}", pending.task_id);
            return false;
        }
        self.in_flight.remove(&pending.task_id);
        true
    }

    pub fn task(&self, task_id: Uuid) -> Option<&TaskView> {
        match self.entries.get(&task_id) {
            Some(Entry::Loaded(task)) => Some(task),
            _ => None,
        }
    }

    pub fn is_missing(&self, task_id: Uuid) -> bool {
        matches!(self.entries.get(&task_id), Some(Entry::Missing))
    }

    /// Whether a checklist write for this task is still unanswered.
    pub fn is_syncing(&self, task_id: Uuid) -> bool {
        self.in_flight.contains_key(&task_id)
    }

    pub fn item_state(&self, task_id: Uuid, index: usize) -> Option<ItemState> {
        let item = self.task(task_id)?.todo_checklist.get(index)?;
        Some(if item.completed {
            ItemState::Checked
        } else {
            ItemState::Unchecked
        })
    }
}
