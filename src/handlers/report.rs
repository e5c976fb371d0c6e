use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse, Result};

use crate::database::Repository;
use crate::models::report::{TaskReportRow, UserReportRow};
use crate::models::task::TaskFilter;
use crate::utils::auth::AuthUser;
use crate::utils::errors::ServiceError;

fn attachment(file_name: &str) -> ContentDisposition {
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(file_name.to_string())],
    }
}

/// Export every task as a report document
#[utoipa::path(
    get,
    path = "/api/reports/export/tasks",
    tag = "reports",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Task report", body = Vec<TaskReportRow>),
        (status = 403, description = "Admin only", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn export_tasks_report(
    auth: AuthUser,
    db: web::Data<dyn Repository>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/reports/export/tasks");
    auth.require_admin()?;

    let tasks = db.list_tasks(&TaskFilter::default()).await?;
    let users = db.list_users(None).await?;
    let rows: Vec<TaskReportRow> = tasks
        .iter()
        .map(|task| TaskReportRow::new(task, &users))
        .collect();

    log::info!("Exported {} task rows", rows.len());
    Ok(HttpResponse::Ok()
        .insert_header(attachment("tasks_report.json"))
        .json(rows))
}

/// Export per-user task counts as a report document
#[utoipa::path(
    get,
    path = "/api/reports/export/users",
    tag = "reports",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "User report", body = Vec<UserReportRow>),
        (status = 403, description = "Admin only", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn export_users_report(
    auth: AuthUser,
    db: web::Data<dyn Repository>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/reports/export/users");
    auth.require_admin()?;

    let users = db.list_users(None).await?;
    let tasks = db.list_tasks(&TaskFilter::default()).await?;
    let rows: Vec<UserReportRow> = users
        .iter()
        .map(|user| UserReportRow::new(user, &tasks))
        .collect();

    log::info!("Exported {} user rows", rows.len());
    Ok(HttpResponse::Ok()
        .insert_header(attachment("users_report.json"))
        .json(rows))
}

pub fn report_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/reports")
            .route("/export/tasks", web::get().to(export_tasks_report))
            .route("/export/users", web::get().to(export_users_report)),
    );
}
