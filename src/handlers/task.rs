use std::collections::BTreeSet;

use actix_web::{web, HttpResponse, Result};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::database::{ChecklistWrite, Repository};
use crate::models::auth::UserSummary;
use crate::models::report::{DashboardCharts, DashboardData, DashboardStatistics};
use crate::models::task::{
    ChecklistItemInput, CreateTaskRequest, NewTask, StatusSummary, Task, TaskChanges, TaskFilter,
    TaskListQuery, TaskListResponse, TaskMutationResponse, TaskStatus, TaskView,
    UpdateChecklistRequest, UpdateStatusRequest, UpdateTaskRequest,
};
use crate::utils::auth::AuthUser;
use crate::utils::errors::ServiceError;

const RECENT_TASK_LIMIT: usize = 10;

// Ids that do not parse cannot name an existing task.
fn parse_task_id(raw: &str) -> Result<Uuid, ServiceError> {
    raw.parse()
        .map_err(|_| ServiceError::NotFound("Task not found".to_string()))
}

async fn load_task(db: &dyn Repository, task_id: Uuid) -> Result<Task, ServiceError> {
    db.find_task(task_id).await?.ok_or_else(|| {
        log::warn!("Task not found: {}", task_id);
        ServiceError::NotFound("Task not found".to_string())
    })
}

/// Admins reach every task, members only tasks they are assigned to or created.
fn ensure_can_access(auth: &AuthUser, task: &Task) -> Result<(), ServiceError> {
    if auth.is_admin() || task.created_by == auth.id || task.is_assigned_to(auth.id) {
        Ok(())
    } else {
        log::warn!("User {} denied access to task {}", auth.id, task.id);
        Err(ServiceError::Forbidden("Not authorized to access this task".to_string()))
    }
}

async fn ensure_users_exist(db: &dyn Repository, ids: &[Uuid]) -> Result<(), ServiceError> {
    let unique: BTreeSet<Uuid> = ids.iter().copied().collect();
    let unique: Vec<Uuid> = unique.into_iter().collect();
    let found = db.find_users_by_ids(&unique).await?;
    if found.len() != unique.len() {
        return Err(ServiceError::ValidationError(
            "assignedTo references an unknown user".to_string(),
        ));
    }
    Ok(())
}

async fn expand_tasks(db: &dyn Repository, tasks: Vec<Task>) -> Result<Vec<TaskView>, ServiceError> {
    let ids: BTreeSet<Uuid> = tasks
        .iter()
        .flat_map(|task| task.assigned_to.iter().copied())
        .collect();
    let ids: Vec<Uuid> = ids.into_iter().collect();
    let users: Vec<UserSummary> = db
        .find_users_by_ids(&ids)
        .await?
        .iter()
        .map(UserSummary::from)
        .collect();

    Ok(tasks
        .into_iter()
        .map(|task| TaskView::from_task(task, &users))
        .collect())
}

async fn expand_task(db: &dyn Repository, task: Task) -> Result<TaskView, ServiceError> {
    let mut views = expand_tasks(db, vec![task]).await?;
    views
        .pop()
        .ok_or_else(|| ServiceError::InternalError("Task projection vanished".to_string()))
}

fn mutation_response(message: &str, task: TaskView) -> TaskMutationResponse {
    TaskMutationResponse {
        message: message.to_string(),
        task,
    }
}

/// Get tasks visible to the caller
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("status" = Option<String>, Query, description = "Pending, In Progress or Completed")
    ),
    responses(
        (status = 200, description = "Tasks retrieved successfully", body = TaskListResponse),
        (status = 400, description = "Unknown status filter", body = crate::models::auth::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn get_tasks(
    auth: AuthUser,
    db: web::Data<dyn Repository>,
    query: web::Query<TaskListQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/tasks - user {}", auth.id);

    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(TaskStatus::parse(raw).ok_or_else(|| {
            ServiceError::ValidationError(format!("Unknown task status '{raw}'"))
        })?),
    };

    let scope = TaskFilter {
        status: None,
        assigned_to: (!auth.is_admin()).then_some(auth.id),
    };
    let visible = db.list_tasks(&scope).await?;
    // The summary always counts every visible task.
    let status_summary = StatusSummary::from_tasks(&visible);

    let tasks = match status {
        None => visible,
        Some(status) => {
            db.list_tasks(&TaskFilter {
                status: Some(status),
                ..scope
            })
            .await?
        }
    };
    let tasks = expand_tasks(db.get_ref(), tasks).await?;

    log::info!("Retrieved {} tasks", tasks.len());
    Ok(HttpResponse::Ok().json(TaskListResponse {
        tasks,
        status_summary,
    }))
}

/// Get a specific task by ID
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task retrieved successfully", body = TaskView),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse),
        (status = 403, description = "Not assigned to this task", body = crate::models::auth::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn get_task(
    auth: AuthUser,
    db: web::Data<dyn Repository>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = parse_task_id(&path)?;
    log::info!("GET /api/tasks/{}", task_id);

    let task = load_task(db.get_ref(), task_id).await?;
    ensure_can_access(&auth, &task)?;

    let task = expand_task(db.get_ref(), task).await?;
    log::info!("Task retrieved: {}", task_id);
    Ok(HttpResponse::Ok().json(task))
}

/// Create a new task
#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created successfully", body = TaskMutationResponse),
        (status = 400, description = "Validation error", body = crate::models::auth::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse),
        (status = 403, description = "Admin only", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn create_task(
    auth: AuthUser,
    db: web::Data<dyn Repository>,
    task_req: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/tasks - Creating new task: {}", task_req.title);
    auth.require_admin()?;
    task_req.validate()?;
    let task_req = task_req.into_inner();

    if task_req.title.trim().is_empty() {
        return Err(ServiceError::ValidationError("Task title is required".to_string()));
    }
    ensure_users_exist(db.get_ref(), &task_req.assigned_to).await?;

    let todo_checklist: Vec<_> = task_req
        .todo_checklist
        .into_iter()
        .map(ChecklistItemInput::into_item)
        .collect();

    let task = db
        .insert_task(NewTask {
            title: task_req.title.trim().to_string(),
            description: task_req.description,
            priority: task_req.priority,
            status: TaskStatus::from_checklist(&todo_checklist),
            due_date: task_req.due_date,
            assigned_to: task_req.assigned_to,
            created_by: auth.id,
            todo_checklist,
            attachments: task_req.attachments,
        })
        .await?;

    log::info!("Task created successfully with ID: {}", task.id);
    let task = expand_task(db.get_ref(), task).await?;
    Ok(HttpResponse::Created().json(mutation_response("Task created successfully", task)))
}

/// Update a task
///
/// Status is left as stored; only the checklist and status endpoints change it.
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated successfully", body = TaskMutationResponse),
        (status = 400, description = "Validation error", body = crate::models::auth::ErrorResponse),
        (status = 403, description = "Not assigned to this task", body = crate::models::auth::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::models::auth::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn update_task(
    auth: AuthUser,
    db: web::Data<dyn Repository>,
    path: web::Path<String>,
    update_req: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = parse_task_id(&path)?;
    log::info!("PUT /api/tasks/{}", task_id);

    let task = load_task(db.get_ref(), task_id).await?;
    ensure_can_access(&auth, &task)?;
    let update_req = update_req.into_inner();

    if let Some(title) = &update_req.title {
        if title.trim().is_empty() {
            return Err(ServiceError::ValidationError("Task title is required".to_string()));
        }
    }
    if let Some(assigned_to) = &update_req.assigned_to {
        ensure_users_exist(db.get_ref(), assigned_to).await?;
    }

    let changes = TaskChanges {
        title: update_req.title.map(|title| title.trim().to_string()),
        description: update_req.description,
        priority: update_req.priority,
        status: None,
        due_date: update_req.due_date,
        assigned_to: update_req.assigned_to,
        todo_checklist: update_req
            .todo_checklist
            .map(|items| items.into_iter().map(ChecklistItemInput::into_item).collect()),
        attachments: update_req.attachments,
    };

    let task = db.update_task(task_id, changes).await?;
    log::info!("Task updated successfully: {}", task_id);
    let task = expand_task(db.get_ref(), task).await?;
    Ok(HttpResponse::Ok().json(mutation_response("Task updated successfully", task)))
}

/// Delete a task
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task deleted successfully"),
        (status = 403, description = "Admin only", body = crate::models::auth::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::models::auth::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn delete_task(
    auth: AuthUser,
    db: web::Data<dyn Repository>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = parse_task_id(&path)?;
    log::info!("DELETE /api/tasks/{}", task_id);
    auth.require_admin()?;

    db.delete_task(task_id).await?;

    log::info!("Task deleted successfully: {}", task_id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Task deleted successfully"
    })))
}

/// Set a task's status directly
///
/// Marking a task `Completed` also completes every checklist item.
#[utoipa::path(
    put,
    path = "/api/tasks/{id}/status",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Task status updated", body = TaskMutationResponse),
        (status = 400, description = "Unknown status", body = crate::models::auth::ErrorResponse),
        (status = 403, description = "Not assigned to this task", body = crate::models::auth::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn update_task_status(
    auth: AuthUser,
    db: web::Data<dyn Repository>,
    path: web::Path<String>,
    status_req: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = parse_task_id(&path)?;
    log::info!("PUT /api/tasks/{}/status -> {}", task_id, status_req.status);

    let task = load_task(db.get_ref(), task_id).await?;
    ensure_can_access(&auth, &task)?;

    let status = status_req.status;
    let todo_checklist = (status == TaskStatus::Completed).then(|| {
        task.todo_checklist
            .into_iter()
            .map(|mut item| {
                item.completed = true;
                item
            })
            .collect()
    });

    let task = db
        .update_task(
            task_id,
            TaskChanges {
                status: Some(status),
                todo_checklist,
                ..Default::default()
            },
        )
        .await?;

    let task = expand_task(db.get_ref(), task).await?;
    Ok(HttpResponse::Ok().json(mutation_response("Task status updated", task)))
}

/// Replace a task's checklist and recompute its status
///
/// The stored checklist is replaced wholesale in caller order. Without a
/// `version` in the body the last writer wins; with one, a stale version
/// fails with 409 and nothing is written.
#[utoipa::path(
    put,
    path = "/api/tasks/{id}/checklist",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = UpdateChecklistRequest,
    responses(
        (status = 200, description = "Checklist replaced, status recomputed", body = TaskMutationResponse),
        (status = 400, description = "Malformed checklist", body = crate::models::auth::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse),
        (status = 403, description = "Not assigned to this task", body = crate::models::auth::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::models::auth::ErrorResponse),
        (status = 409, description = "Stale version", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn update_checklist(
    auth: AuthUser,
    db: web::Data<dyn Repository>,
    path: web::Path<String>,
    checklist_req: web::Json<UpdateChecklistRequest>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = parse_task_id(&path)?;
    log::info!(
        "PUT /api/tasks/{}/checklist - {} items",
        task_id,
        checklist_req.todo_checklist.len()
    );

    let task = load_task(db.get_ref(), task_id).await?;
    ensure_can_access(&auth, &task)?;

    let checklist_req = checklist_req.into_inner();
    let items: Vec<_> = checklist_req
        .todo_checklist
        .into_iter()
        .map(ChecklistItemInput::into_item)
        .collect();
    let status = TaskStatus::from_checklist(&items);

    let task = db
        .replace_checklist(
            task_id,
            ChecklistWrite {
                items,
                status,
                expected_version: checklist_req.version,
            },
        )
        .await?;

    log::info!("Checklist updated for task {} -> {}", task_id, task.status);
    let task = expand_task(db.get_ref(), task).await?;
    Ok(HttpResponse::Ok().json(mutation_response("Task checklist updated", task)))
}

async fn dashboard(db: &dyn Repository, filter: TaskFilter) -> Result<DashboardData, ServiceError> {
    let tasks = db.list_tasks(&filter).await?;
    let statistics = DashboardStatistics::from_tasks(&tasks, Utc::now());
    let charts = DashboardCharts::from_tasks(&tasks);
    let recent: Vec<Task> = tasks.into_iter().take(RECENT_TASK_LIMIT).collect();

    Ok(DashboardData {
        statistics,
        charts,
        recent_tasks: expand_tasks(db, recent).await?,
    })
}

/// Dashboard over every task
#[utoipa::path(
    get,
    path = "/api/tasks/dashboard-data",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Dashboard data", body = DashboardData),
        (status = 403, description = "Admin only", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn get_dashboard_data(
    auth: AuthUser,
    db: web::Data<dyn Repository>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/tasks/dashboard-data");
    auth.require_admin()?;
    let data = dashboard(db.get_ref(), TaskFilter::default()).await?;
    Ok(HttpResponse::Ok().json(data))
}

/// Dashboard over the caller's assigned tasks
#[utoipa::path(
    get,
    path = "/api/tasks/user-dashboard-data",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Dashboard data", body = DashboardData),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn get_user_dashboard_data(
    auth: AuthUser,
    db: web::Data<dyn Repository>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/tasks/user-dashboard-data - user {}", auth.id);
    let filter = TaskFilter {
        status: None,
        assigned_to: Some(auth.id),
    };
    let data = dashboard(db.get_ref(), filter).await?;
    Ok(HttpResponse::Ok().json(data))
}

pub fn task_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tasks")
            .route("/dashboard-data", web::get().to(get_dashboard_data))
            .route("/user-dashboard-data", web::get().to(get_user_dashboard_data))
            .route("", web::get().to(get_tasks))
            .route("", web::post().to(create_task))
            .route("/{id}", web::get().to(get_task))
            .route("/{id}", web::put().to(update_task))
            .route("/{id}", web::delete().to(delete_task))
            .route("/{id}/status", web::put().to(update_task_status))
            .route("/{id}/checklist", web::put().to(update_checklist))
            .route("/{id}/todo", web::put().to(update_checklist)),
    );
}
