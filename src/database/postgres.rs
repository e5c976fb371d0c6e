use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{stale_version, ChecklistWrite, DatabaseStats, RepoError, Repository};
use crate::models::auth::{NewUser, Role, User, UserChanges};
use crate::models::task::{
    ChecklistItem, NewTask, Priority, Task, TaskChanges, TaskFilter, TaskStatus,
};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, profile_image_url, role, created_at, updated_at";

const TASK_COLUMNS: &str = "id, title, description, priority, status, due_date, assigned_to, \
     created_by, todo_checklist, attachments, version, created_at, updated_at";

pub struct PgRepository {
    pub pool: PgPool,
}

impl PgRepository {
    pub async fn connect(database_url: &str) -> Result<Self> {
        log::info!("🔗 Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to the database")?;

        log::info!("✅ Database connection established");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        log::info!("📋 Database migrations applied");

        Ok(PgRepository { pool })
    }
}

fn user_from_row(row: &PgRow) -> Result<User, RepoError> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        profile_image_url: row.try_get("profile_image_url")?,
        role: Role::parse(&role)
            .ok_or_else(|| RepoError::Corrupt(format!("unknown role '{role}'")))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn task_from_row(row: &PgRow) -> Result<Task, RepoError> {
    let priority: String = row.try_get("priority")?;
    let status: String = row.try_get("status")?;
    let Json(todo_checklist): Json<Vec<ChecklistItem>> = row.try_get("todo_checklist")?;

    Ok(Task {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        priority: Priority::parse(&priority)
            .ok_or_else(|| RepoError::Corrupt(format!("unknown priority '{priority}'")))?,
        status: TaskStatus::parse(&status)
            .ok_or_else(|| RepoError::Corrupt(format!("unknown status '{status}'")))?,
        due_date: row.try_get("due_date")?,
        assigned_to: row.try_get("assigned_to")?,
        created_by: row.try_get("created_by")?,
        todo_checklist,
        attachments: row.try_get("attachments")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_unique_violation(err: sqlx::Error, message: &str) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(message.to_string())
        }
        _ => RepoError::Database(err),
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (id, name, email, password_hash, profile_image_url, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(user.email.to_lowercase())
        .bind(&user.password_hash)
        .bind(&user.profile_image_url)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "User already exists"))?;

        user_from_row(&row)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<User, RepoError> {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE users SET updated_at = NOW()");

        if let Some(name) = changes.name {
            query_builder.push(", name = ").push_bind(name);
        }
        if let Some(email) = changes.email {
            query_builder.push(", email = ").push_bind(email.to_lowercase());
        }
        if let Some(hash) = changes.password_hash {
            query_builder.push(", password_hash = ").push_bind(hash);
        }
        if let Some(url) = changes.profile_image_url {
            query_builder.push(", profile_image_url = ").push_bind(url);
        }
        query_builder.push(" WHERE id = ").push_bind(id);
        query_builder.push(format!(" RETURNING {USER_COLUMNS}"));

        let row = query_builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "Email already in use"))?
            .ok_or_else(|| RepoError::NotFound("User".to_string()))?;

        user_from_row(&row)
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, RepoError> {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));
        if let Some(role) = role {
            query_builder.push(" WHERE role = ").push_bind(role.as_str());
        }
        query_builder.push(" ORDER BY created_at");

        let rows = query_builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, RepoError> {
        let row = sqlx::query(&format!(
            "INSERT INTO tasks (id, title, description, priority, status, due_date, assigned_to, \
             created_by, todo_checklist, attachments) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {TASK_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(task.due_date)
        .bind(&task.assigned_to)
        .bind(task.created_by)
        .bind(Json(&task.todo_checklist))
        .bind(&task.attachments)
        .fetch_one(&self.pool)
        .await?;

        task_from_row(&row)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, RepoError> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(task_from_row).transpose()
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, RepoError> {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks WHERE TRUE"));
        if let Some(status) = filter.status {
            query_builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(user_id) = filter.assigned_to {
            query_builder
                .push(" AND ")
                .push_bind(user_id)
                .push(" = ANY(assigned_to)");
        }
        query_builder.push(" ORDER BY created_at DESC");

        let rows = query_builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(task_from_row).collect()
    }

    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> Result<Task, RepoError> {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE tasks SET updated_at = NOW(), version = version + 1");

        if let Some(title) = changes.title {
            query_builder.push(", title = ").push_bind(title);
        }
        if let Some(description) = changes.description {
            query_builder.push(", description = ").push_bind(description);
        }
        if let Some(priority) = changes.priority {
            query_builder.push(", priority = ").push_bind(priority.as_str());
        }
        if let Some(status) = changes.status {
            query_builder.push(", status = ").push_bind(status.as_str());
        }
        if let Some(due_date) = changes.due_date {
            query_builder.push(", due_date = ").push_bind(due_date);
        }
        if let Some(assigned_to) = changes.assigned_to {
            query_builder.push(", assigned_to = ").push_bind(assigned_to);
        }
        if let Some(checklist) = changes.todo_checklist {
            query_builder.push(", todo_checklist = ").push_bind(Json(checklist));
        }
        if let Some(attachments) = changes.attachments {
            query_builder.push(", attachments = ").push_bind(attachments);
        }
        query_builder.push(" WHERE id = ").push_bind(id);
        query_builder.push(format!(" RETURNING {TASK_COLUMNS}"));

        let row = query_builder
            .build()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepoError::NotFound("Task".to_string()))?;

        task_from_row(&row)
    }

    async fn replace_checklist(&self, id: Uuid, write: ChecklistWrite) -> Result<Task, RepoError> {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE tasks SET version = version + 1, updated_at = NOW()");
        query_builder
            .push(", todo_checklist = ")
            .push_bind(Json(write.items));
        query_builder.push(", status = ").push_bind(write.status.as_str());
        query_builder.push(" WHERE id = ").push_bind(id);
        if let Some(expected) = write.expected_version {
            query_builder.push(" AND version = ").push_bind(expected);
        }
        query_builder.push(format!(" RETURNING {TASK_COLUMNS}"));

        if let Some(row) = query_builder.build().fetch_optional(&self.pool).await? {
            return task_from_row(&row);
        }

        // Nothing updated: either the task is gone or the version moved on.
        let current = sqlx::query("SELECT version FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match (current, write.expected_version) {
            (Some(row), Some(expected)) => Err(stale_version(expected, row.try_get("version")?)),
            _ => Err(RepoError::NotFound("Task".to_string())),
        }
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound("Task".to_string()));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        let row = sqlx::query("SELECT 1 as health_check")
            .fetch_one(&self.pool)
            .await?;
        let result: i32 = row.try_get("health_check")?;
        if result == 1 {
            Ok(())
        } else {
            Err(RepoError::Corrupt("health check returned an unexpected value".to_string()))
        }
    }

    async fn stats(&self) -> Result<DatabaseStats, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) as user_count,
                (SELECT COUNT(*) FROM tasks) as task_count
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DatabaseStats {
            users: row.try_get("user_count")?,
            tasks: row.try_get("task_count")?,
        })
    }
}
