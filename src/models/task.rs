use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TaskStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: &[TaskStatus] = &[
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(TaskStatus::Pending),
            "In Progress" => Some(TaskStatus::InProgress),
            "Completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }

    /// Status implied by a checklist: `Completed` when every item is done and
    /// there is at least one, `Pending` when nothing is done, `In Progress`
    /// otherwise.
    pub fn from_checklist(items: &[ChecklistItem]) -> Self {
        let completed = items.iter().filter(|item| item.completed).count();
        if completed == 0 {
            TaskStatus::Pending
        } else if completed == items.len() {
            TaskStatus::Completed
        } else {
            TaskStatus::InProgress
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: &[Priority] = &[Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(Priority::Low),
            "Medium" => Some(Priority::Medium),
            "High" => Some(Priority::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
}

/// Checklist item as sent by callers. Items without an id get one on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChecklistItemInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl ChecklistItemInput {
    pub fn into_item(self) -> ChecklistItem {
        ChecklistItem {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            title: self.title,
            completed: self.completed,
        }
    }
}

impl From<&ChecklistItem> for ChecklistItemInput {
    fn from(item: &ChecklistItem) -> Self {
        ChecklistItemInput {
            id: Some(item.id),
            title: item.title.clone(),
            completed: item.completed,
        }
    }
}

/// Task as stored. `assigned_to` holds user ids only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Vec<Uuid>,
    pub created_by: Uuid,
    pub todo_checklist: Vec<ChecklistItem>,
    pub attachments: Vec<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_assigned_to(&self, user_id: Uuid) -> bool {
        self.assigned_to.contains(&user_id)
    }

    pub fn completed_todo_count(&self) -> usize {
        self.todo_checklist.iter().filter(|item| item.completed).count()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Completed && self.due_date.is_some_and(|due| due < now)
    }
}

/// Task as returned to callers, with assignees expanded to summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Vec<UserSummary>,
    pub created_by: Uuid,
    pub todo_checklist: Vec<ChecklistItem>,
    pub attachments: Vec<String>,
    pub completed_todo_count: usize,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    /// Builds the read projection. Assignees missing from `users` are dropped,
    /// the remaining ones keep the task's ordering.
    pub fn from_task(task: Task, users: &[UserSummary]) -> Self {
        let completed_todo_count = task.completed_todo_count();
        let assigned_to = task
            .assigned_to
            .iter()
            .filter_map(|id| users.iter().find(|user| user.id == *id).cloned())
            .collect();

        TaskView {
            id: task.id,
            title: task.title,
            description: task.description,
            priority: task.priority,
            status: task.status,
            due_date: task.due_date,
            assigned_to,
            created_by: task.created_by,
            todo_checklist: task.todo_checklist,
            attachments: task.attachments,
            completed_todo_count,
            version: task.version,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Fields needed to insert a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Vec<Uuid>,
    pub created_by: Uuid,
    pub todo_checklist: Vec<ChecklistItem>,
    pub attachments: Vec<String>,
}

/// Partial update applied by the generic edit endpoint. `None` keeps the
/// stored value.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assigned_to: Option<Vec<Uuid>>,
    pub todo_checklist: Option<Vec<ChecklistItem>>,
    pub attachments: Option<Vec<String>>,
}

impl TaskChanges {
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(assigned_to) = self.assigned_to {
            task.assigned_to = assigned_to;
        }
        if let Some(todo_checklist) = self.todo_checklist {
            task.todo_checklist = todo_checklist;
        }
        if let Some(attachments) = self.attachments {
            task.attachments = attachments;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<Uuid>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |status| task.status == status)
            && self.assigned_to.map_or(true, |user| task.is_assigned_to(user))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, message = "Task title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, message = "assignedTo must list at least one user"))]
    pub assigned_to: Vec<Uuid>,
    #[serde(default)]
    pub todo_checklist: Vec<ChecklistItemInput>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    /// Absent keeps the stored date, `null` clears it.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assigned_to: Option<Vec<Uuid>>,
    pub todo_checklist: Option<Vec<ChecklistItemInput>>,
    pub attachments: Option<Vec<String>>,
}

// Wraps whatever the field holds, `null` included, so only an absent field
// falls back to the `None` default.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChecklistRequest {
    pub todo_checklist: Vec<ChecklistItemInput>,
    /// When present the write only succeeds if it matches the stored version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub all: usize,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub completed_tasks: usize,
}

impl StatusSummary {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut summary = StatusSummary::default();
        for task in tasks {
            summary.all += 1;
            match task.status {
                TaskStatus::Pending => summary.pending_tasks += 1,
                TaskStatus::InProgress => summary.in_progress_tasks += 1,
                TaskStatus::Completed => summary.completed_tasks += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskListResponse {
    pub tasks: Vec<TaskView>,
    pub status_summary: StatusSummary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskMutationResponse {
    pub message: String,
    pub task: TaskView,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn items(flags: &[bool]) -> Vec<ChecklistItem> {
        flags
            .iter()
            .enumerate()
            .map(|(i, done)| ChecklistItem {
                id: Uuid::new_v4(),
                title: format!("item {i}"),
                completed: *done,
            })
            .collect()
    }

    #[rstest]
    #[case(&[], TaskStatus::Pending)]
    #[case(&[false], TaskStatus::Pending)]
    #[case(&[false, false, false], TaskStatus::Pending)]
    #[case(&[true], TaskStatus::Completed)]
    #[case(&[true, true, true], TaskStatus::Completed)]
    #[case(&[true, false], TaskStatus::InProgress)]
    #[case(&[false, false, true], TaskStatus::InProgress)]
    fn status_follows_checklist(#[case] flags: &[bool], #[case] expected: TaskStatus) {
        assert_eq!(TaskStatus::from_checklist(&items(flags)), expected);
    }

    #[test]
    fn status_is_a_pure_function_of_the_checklist() {
        let checklist = items(&[true, false, true]);
        let first = TaskStatus::from_checklist(&checklist);
        let second = TaskStatus::from_checklist(&checklist);
        assert_eq!(first, second);
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
        let parsed: TaskStatus = serde_json::from_str("\"Completed\"").unwrap();
        assert_eq!(parsed, TaskStatus::Completed);
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(*status));
        }
        assert_eq!(TaskStatus::parse("done"), None);
    }

    #[test]
    fn checklist_input_keeps_or_assigns_ids() {
        let id = Uuid::new_v4();
        let kept = ChecklistItemInput {
            id: Some(id),
            title: "a".into(),
            completed: true,
        }
        .into_item();
        assert_eq!(kept.id, id);

        let parsed: ChecklistItemInput =
            serde_json::from_str(r#"{"title":"b"}"#).unwrap();
        assert_eq!(parsed.id, None);
        assert!(!parsed.completed);
    }

    #[test]
    fn view_expands_assignees_in_task_order() {
        let alice = UserSummary {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            email: "alice@example.com".into(),
            profile_image_url: None,
        };
        let bob = UserSummary {
            id: Uuid::new_v4(),
            name: "Bob".into(),
            email: "bob@example.com".into(),
            profile_image_url: Some("https://img/bob.png".into()),
        };
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: "t".into(),
            description: String::new(),
            priority: Priority::High,
            status: TaskStatus::Pending,
            due_date: None,
            assigned_to: vec![bob.id, Uuid::new_v4(), alice.id],
            created_by: alice.id,
            todo_checklist: items(&[true, false]),
            attachments: vec![],
            version: 1,
            created_at: now,
            updated_at: now,
        };

        let view = TaskView::from_task(task, &[alice.clone(), bob.clone()]);
        assert_eq!(view.assigned_to, vec![bob, alice]);
        assert_eq!(view.completed_todo_count, 1);
    }

    #[test]
    fn summary_counts_each_status() {
        let now = Utc::now();
        let make = |status| Task {
            id: Uuid::new_v4(),
            title: "t".into(),
            description: String::new(),
            priority: Priority::Low,
            status,
            due_date: None,
            assigned_to: vec![],
            created_by: Uuid::new_v4(),
            todo_checklist: vec![],
            attachments: vec![],
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let tasks = vec![
            make(TaskStatus::Pending),
            make(TaskStatus::Completed),
            make(TaskStatus::Completed),
        ];
        let summary = StatusSummary::from_tasks(&tasks);
        assert_eq!(summary.all, 3);
        assert_eq!(summary.pending_tasks, 1);
        assert_eq!(summary.in_progress_tasks, 0);
        assert_eq!(summary.completed_tasks, 2);
    }

    #[test]
    fn update_due_date_distinguishes_absent_from_null() {
        let absent: UpdateTaskRequest = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(absent.due_date, None);

        let cleared: UpdateTaskRequest = serde_json::from_str(r#"{"dueDate":null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let set: UpdateTaskRequest =
            serde_json::from_str(r#"{"dueDate":"2025-03-05T12:00:00Z"}"#).unwrap();
        assert!(matches!(set.due_date, Some(Some(_))));
    }
}
