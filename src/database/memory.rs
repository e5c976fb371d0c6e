use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{stale_version, ChecklistWrite, DatabaseStats, RepoError, Repository};
use crate::models::auth::{NewUser, Role, User, UserChanges};
use crate::models::task::{NewTask, Task, TaskChanges, TaskFilter};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    tasks: HashMap<Uuid, Task>,
}

/// In-process repository. Used by the test suite and when no
/// `DATABASE_URL` is configured.
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(state: &State, email: &str, except: Option<Uuid>) -> bool {
    state
        .users
        .values()
        .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let mut state = self.state.write().await;
        if email_taken(&state, &user.email, None) {
            return Err(RepoError::Conflict("User already exists".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email.to_lowercase(),
            password_hash: user.password_hash,
            profile_image_url: user.profile_image_url,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<User, RepoError> {
        let mut state = self.state.write().await;
        if let Some(email) = &changes.email {
            if email_taken(&state, email, Some(id)) {
                return Err(RepoError::Conflict("Email already in use".to_string()));
            }
        }

        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| RepoError::NotFound("User".to_string()))?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email.to_lowercase();
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(url) = changes.profile_image_url {
            user.profile_image_url = Some(url);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, RepoError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, RepoError> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: task.title,
            description: task.description,
            priority: task.priority,
            status: task.status,
            due_date: task.due_date,
            assigned_to: task.assigned_to,
            created_by: task.created_by,
            todo_checklist: task.todo_checklist,
            attachments: task.attachments,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, RepoError> {
        Ok(self.state.read().await.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, RepoError> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> Result<Task, RepoError> {
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or_else(|| RepoError::NotFound("Task".to_string()))?;
        changes.apply(task);
        task.version += 1;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn replace_checklist(&self, id: Uuid, write: ChecklistWrite) -> Result<Task, RepoError> {
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or_else(|| RepoError::NotFound("Task".to_string()))?;
        if let Some(expected) = write.expected_version {
            if expected != task.version {
                return Err(stale_version(expected, task.version));
            }
        }
        task.todo_checklist = write.items;
        task.status = write.status;
        task.version += 1;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), RepoError> {
        match self.state.write().await.tasks.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound("Task".to_string())),
        }
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }

    async fn stats(&self) -> Result<DatabaseStats, RepoError> {
        let state = self.state.read().await;
        Ok(DatabaseStats {
            users: state.users.len() as i64,
            tasks: state.tasks.len() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{ChecklistItem, Priority, TaskStatus};

    fn new_task(assignee: Uuid) -> NewTask {
        NewTask {
            title: "Write report".into(),
            description: String::new(),
            priority: Priority::Medium,
            status: TaskStatus::Pending,
            due_date: None,
            assigned_to: vec![assignee],
            created_by: assignee,
            todo_checklist: vec![],
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn checklist_write_bumps_version() {
        let repo = MemoryRepository::new();
        let task = repo.insert_task(new_task(Uuid::new_v4())).await.unwrap();
        assert_eq!(task.version, 1);

        let write = ChecklistWrite {
            items: vec![ChecklistItem {
                id: Uuid::new_v4(),
                title: "a".into(),
                completed: true,
            }],
            status: TaskStatus::Completed,
            expected_version: Some(1),
        };
        let updated = repo.replace_checklist(task.id, write.clone()).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.status, TaskStatus::Completed);

        // Same token again is now stale.
        let err = repo.replace_checklist(task.id, write).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));
    }

    #[tokio::test]
    async fn checklist_write_without_token_is_last_write_wins() {
        let repo = MemoryRepository::new();
        let task = repo.insert_task(new_task(Uuid::new_v4())).await.unwrap();
        for _ in 0..2 {
            let write = ChecklistWrite {
                items: vec![],
                status: TaskStatus::Pending,
                expected_version: None,
            };
            repo.replace_checklist(task.id, write).await.unwrap();
        }
        let stored = repo.find_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 3);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let repo = MemoryRepository::new();
        let user = NewUser {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password_hash: "x".into(),
            profile_image_url: None,
            role: Role::Member,
        };
        repo.create_user(user.clone()).await.unwrap();
        let dup = NewUser {
            email: "ANA@example.com".into(),
            ..user
        };
        assert!(matches!(
            repo.create_user(dup).await,
            Err(RepoError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn list_filters_by_assignee() {
        let repo = MemoryRepository::new();
        let alice = Uuid::new_v4();
        repo.insert_task(new_task(alice)).await.unwrap();
        repo.insert_task(new_task(Uuid::new_v4())).await.unwrap();

        let filter = TaskFilter {
            assigned_to: Some(alice),
            ..Default::default()
        };
        assert_eq!(repo.list_tasks(&filter).await.unwrap().len(), 1);
        assert_eq!(repo.list_tasks(&TaskFilter::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_filters_by_status_within_assignee() {
        let repo = MemoryRepository::new();
        let alice = Uuid::new_v4();
        repo.insert_task(new_task(alice)).await.unwrap();
        repo.insert_task(NewTask {
            status: TaskStatus::Completed,
            ..new_task(alice)
        })
        .await
        .unwrap();
        repo.insert_task(NewTask {
            status: TaskStatus::Completed,
            ..new_task(Uuid::new_v4())
        })
        .await
        .unwrap();

        let filter = TaskFilter {
            status: Some(TaskStatus::Completed),
            assigned_to: Some(alice),
        };
        let tasks = repo.list_tasks(&filter).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Completed);
    }
}
