use actix_web::{web, HttpResponse, Result};
use uuid::Uuid;

use crate::database::Repository;
use crate::models::auth::{ApiResponse, Role, UserResponse};
use crate::models::report::UserWithTaskCounts;
use crate::models::task::TaskFilter;
use crate::utils::auth::AuthUser;
use crate::utils::errors::ServiceError;

/// List members with their task counts
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Members retrieved", body = Vec<UserWithTaskCounts>),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse),
        (status = 403, description = "Admin only", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn get_users(
    auth: AuthUser,
    db: web::Data<dyn Repository>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/users");
    auth.require_admin()?;

    let members = db.list_users(Some(Role::Member)).await?;
    let tasks = db.list_tasks(&TaskFilter::default()).await?;
    let users: Vec<UserWithTaskCounts> = members
        .iter()
        .map(|user| UserWithTaskCounts::new(user, &tasks))
        .collect();

    log::info!("Retrieved {} members", users.len());
    Ok(HttpResponse::Ok().json(users))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User retrieved", body = ApiResponse<UserResponse>),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse),
        (status = 404, description = "User not found", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn get_user(
    _auth: AuthUser,
    db: web::Data<dyn Repository>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/users/{}", path);
    let user_id: Uuid = path
        .parse()
        .map_err(|_| ServiceError::NotFound("User not found".to_string()))?;

    let user = db
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "User retrieved successfully",
        UserResponse::from(user),
    )))
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .route("", web::get().to(get_users))
            .route("/{id}", web::get().to(get_user)),
    );
}
