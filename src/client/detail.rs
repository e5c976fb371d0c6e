use uuid::Uuid;

use super::api::TaskGateway;
use super::links::normalize_link;
use super::store::{Action, TaskStore};
use crate::models::task::{TaskStatus, TaskView};

pub const NOT_FOUND_MESSAGE: &str = "Task not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailPhase {
    Loading,
    Ready,
    NotFound,
}

/// Colour family of the status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Violet,
    Cyan,
    Lime,
}

impl From<TaskStatus> for StatusTone {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::InProgress => StatusTone::Cyan,
            TaskStatus::Completed => StatusTone::Lime,
            TaskStatus::Pending => StatusTone::Violet,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistRow {
    pub title: String,
    pub checked: bool,
    pub syncing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRow {
    /// Two-digit position, `01` onwards.
    pub label: String,
    pub link: String,
}

/// Everything the detail screen renders.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskDetailView {
    Loading,
    NotFound { message: &'static str },
    Ready {
        title: String,
        status: String,
        tone: StatusTone,
        description: String,
        priority: String,
        due_date: String,
        avatars: Vec<String>,
        checklist: Vec<ChecklistRow>,
        attachments: Vec<AttachmentRow>,
    },
}

fn attachment_label(index: usize) -> String {
    format!("{:02}", index + 1)
}

fn render(task: &TaskView, syncing: bool) -> TaskDetailView {
    TaskDetailView::Ready {
        title: task.title.clone(),
        status: task.status.to_string(),
        tone: task.status.into(),
        description: task.description.clone(),
        priority: task.priority.to_string(),
        due_date: task
            .due_date
            .map(|due| due.format("%d %b %Y").to_string())
            .unwrap_or_else(|| "N/A".to_string()),
        avatars: task
            .assigned_to
            .iter()
            .filter_map(|user| user.profile_image_url.clone())
            .collect(),
        checklist: task
            .todo_checklist
            .iter()
            .map(|item| ChecklistRow {
                title: item.title.clone(),
                checked: item.completed,
                syncing,
            })
            .collect(),
        attachments: task
            .attachments
            .iter()
            .enumerate()
            .map(|(index, link)| AttachmentRow {
                label: attachment_label(index),
                link: link.clone(),
            })
            .collect(),
    }
}

/// Drives the detail screen for one task: initial fetch, optimistic checklist
/// toggles and the render model.
pub struct TaskDetail<G: TaskGateway> {
    gateway: G,
    store: TaskStore,
    task_id: Uuid,
    phase: DetailPhase,
}

impl<G: TaskGateway> TaskDetail<G> {
    pub fn new(gateway: G, task_id: Uuid) -> Self {
        Self::with_store(gateway, task_id, TaskStore::new())
    }

    pub fn with_store(gateway: G, task_id: Uuid, store: TaskStore) -> Self {
        Self {
            gateway,
            store,
            task_id,
            phase: DetailPhase::Loading,
        }
    }

    pub fn phase(&self) -> DetailPhase {
        self.phase
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn task(&self) -> Option<&TaskView> {
        self.store.task(self.task_id)
    }

    /// Fetches the task. Any failure, not only a 404, lands on the
    /// not-found state.
    pub async fn load(&mut self) {
        self.phase = DetailPhase::Loading;
        match self.gateway.fetch_task(self.task_id).await {
            Ok(task) => {
                self.store.dispatch(Action::Loaded(task));
                self.phase = DetailPhase::Ready;
            }
            Err(e) => {
                log::error!("Error fetching task {}: {}", self.task_id, e);
                self.store.dispatch(Action::Missing(self.task_id));
                self.phase = DetailPhase::NotFound;
            }
        }
    }

    /// Flips the checklist item at `index`, syncs it and settles the result.
    /// Returns whether a request was sent.
    pub async fn toggle_item(&mut self, index: usize) -> bool {
        let pending = match self.store.dispatch(Action::Toggle {
            task_id: self.task_id,
            index,
        }) {
            Some(pending) => pending,
            None => return false,
        };

        match self
            .gateway
            .update_checklist(pending.task_id, &pending.request)
            .await
        {
            Ok(task) => {
                self.store.dispatch(Action::SyncSucceeded { pending, task });
            }
            Err(e) => {
                log::warn!("Error updating todo checklist: {}", e);
                self.store.dispatch(Action::SyncFailed { pending });
            }
        }
        true
    }

    /// URL to open for the attachment at `index`.
    pub fn attachment_href(&self, index: usize) -> Option<String> {
        self.task()?
            .attachments
            .get(index)
            .map(|link| normalize_link(link))
    }

    pub fn view(&self) -> TaskDetailView {
        match (self.phase, self.task()) {
            (DetailPhase::Loading, _) => TaskDetailView::Loading,
            (_, Some(task)) => render(task, self.store.is_syncing(self.task_id)),
            (_, None) => TaskDetailView::NotFound {
                message: NOT_FOUND_MESSAGE,
            },
        }
    }
}
