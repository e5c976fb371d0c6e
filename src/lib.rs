//! Task Flow backend: task management REST API with authentication, task
//! checklists, dashboards and reports, plus the client-side data layer used
//! by the task detail view.

pub mod client;
pub mod config;
pub mod database;
pub mod handlers;
pub mod models;
pub mod utils;

use actix_web::web;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::utils::errors::{json_error_handler, query_error_handler};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_profile,
        handlers::auth::update_profile,
        handlers::file::upload_image,
        handlers::user::get_users,
        handlers::user::get_user,
        handlers::task::get_tasks,
        handlers::task::get_task,
        handlers::task::create_task,
        handlers::task::update_task,
        handlers::task::delete_task,
        handlers::task::update_task_status,
        handlers::task::update_checklist,
        handlers::task::get_dashboard_data,
        handlers::task::get_user_dashboard_data,
        handlers::report::export_tasks_report,
        handlers::report::export_users_report,
    ),
    components(schemas(
        models::auth::ErrorResponse,
        models::task::ChecklistItem,
        models::task::ChecklistItemInput,
        models::task::TaskStatus,
        models::task::Priority,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and profile"),
        (name = "users", description = "Team members"),
        (name = "tasks", description = "Tasks, checklists and dashboards"),
        (name = "reports", description = "Admin exports")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Registers every route plus the extractor configs that give malformed
/// bodies and query strings the standard JSON error shape.
///
/// The app still needs `web::Data<AppConfig>`, `web::Data<dyn Repository>`
/// and `web::Data<StartedAt>`, and `handlers::health::not_found` as its
/// default service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .configure(handlers::health::configure)
        .configure(handlers::auth_config)
        .configure(handlers::user_config)
        .configure(handlers::task_config)
        .configure(handlers::report_config)
        .configure(handlers::file_config)
        .service(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        );
}
