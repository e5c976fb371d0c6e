use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::auth::User;
use crate::models::task::{Priority, Task, TaskStatus, TaskView};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatistics {
    pub total_tasks: usize,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub completed_tasks: usize,
    pub overdue_tasks: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCharts {
    /// Keyed by status wire name plus an `All` total.
    pub task_distribution: BTreeMap<String, usize>,
    /// Keyed by priority wire name.
    pub task_priority_levels: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub statistics: DashboardStatistics,
    pub charts: DashboardCharts,
    pub recent_tasks: Vec<TaskView>,
}

impl DashboardStatistics {
    pub fn from_tasks(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let count = |status| tasks.iter().filter(|t| t.status == status).count();
        DashboardStatistics {
            total_tasks: tasks.len(),
            pending_tasks: count(TaskStatus::Pending),
            in_progress_tasks: count(TaskStatus::InProgress),
            completed_tasks: count(TaskStatus::Completed),
            overdue_tasks: tasks.iter().filter(|t| t.is_overdue(now)).count(),
        }
    }
}

impl DashboardCharts {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut task_distribution: BTreeMap<String, usize> = TaskStatus::ALL
            .iter()
            .map(|status| (status.as_str().to_string(), 0))
            .collect();
        let mut task_priority_levels: BTreeMap<String, usize> = Priority::ALL
            .iter()
            .map(|priority| (priority.as_str().to_string(), 0))
            .collect();

        for task in tasks {
            *task_distribution
                .entry(task.status.as_str().to_string())
                .or_default() += 1;
            *task_priority_levels
                .entry(task.priority.as_str().to_string())
                .or_default() += 1;
        }
        task_distribution.insert("All".to_string(), tasks.len());

        DashboardCharts {
            task_distribution,
            task_priority_levels,
        }
    }
}

/// Member listing entry for admins.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserWithTaskCounts {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub profile_image_url: Option<String>,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub completed_tasks: usize,
}

impl UserWithTaskCounts {
    pub fn new(user: &User, tasks: &[Task]) -> Self {
        let assigned: Vec<&Task> = tasks.iter().filter(|t| t.is_assigned_to(user.id)).collect();
        let count = |status| assigned.iter().filter(|t| t.status == status).count();
        UserWithTaskCounts {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            profile_image_url: user.profile_image_url.clone(),
            pending_tasks: count(TaskStatus::Pending),
            in_progress_tasks: count(TaskStatus::InProgress),
            completed_tasks: count(TaskStatus::Completed),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskReportRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    /// `name (email)` pairs joined by `, `.
    pub assigned_to: String,
}

impl TaskReportRow {
    pub fn new(task: &Task, users: &[User]) -> Self {
        let assigned_to = task
            .assigned_to
            .iter()
            .filter_map(|id| users.iter().find(|u| u.id == *id))
            .map(|u| format!("{} ({})", u.name, u.email))
            .collect::<Vec<_>>()
            .join(", ");
        TaskReportRow {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            status: task.status,
            due_date: task.due_date,
            assigned_to,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserReportRow {
    pub name: String,
    pub email: String,
    pub task_count: usize,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub completed_tasks: usize,
}

impl UserReportRow {
    pub fn new(user: &User, tasks: &[Task]) -> Self {
        let counts = UserWithTaskCounts::new(user, tasks);
        UserReportRow {
            name: counts.name,
            email: counts.email,
            task_count: counts.pending_tasks + counts.in_progress_tasks + counts.completed_tasks,
            pending_tasks: counts.pending_tasks,
            in_progress_tasks: counts.in_progress_tasks,
            completed_tasks: counts.completed_tasks,
        }
    }
}
