use std::time::Instant;

use actix_web::{web, HttpRequest, HttpResponse, Result};
use chrono::Utc;
use serde_json::json;

use crate::database::Repository;

const AVAILABLE_ROUTES: &[&str] = &[
    "/",
    "/api/health",
    "/api/auth",
    "/api/users",
    "/api/tasks",
    "/api/reports",
];

/// Process start, for the uptime reported by the health check.
#[derive(Debug, Clone, Copy)]
pub struct StartedAt(pub Instant);

impl Default for StartedAt {
    fn default() -> Self {
        StartedAt(Instant::now())
    }
}

pub async fn index() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Task Flow API is running successfully!",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "endpoints": {
            "auth": "/api/auth",
            "users": "/api/users",
            "tasks": "/api/tasks",
            "reports": "/api/reports"
        }
    })))
}

pub async fn health_check(
    db: web::Data<dyn Repository>,
    started: web::Data<StartedAt>,
) -> Result<HttpResponse> {
    let uptime = started.0.elapsed().as_secs_f64();

    match db.health_check().await {
        Ok(()) => {
            let stats = match db.stats().await {
                Ok(stats) => Some(stats),
                Err(e) => {
                    log::warn!("Could not read database statistics: {}", e);
                    None
                }
            };
            Ok(HttpResponse::Ok().json(json!({
                "status": "OK",
                "message": "Server is healthy",
                "uptime": uptime,
                "timestamp": Utc::now().to_rfc3339(),
                "database": "connected",
                "stats": stats
            })))
        }
        Err(e) => {
            log::error!("Database health check failed: {}", e);
            Ok(HttpResponse::ServiceUnavailable().json(json!({
                "status": "error",
                "message": "Database connection failed",
                "uptime": uptime,
                "timestamp": Utc::now().to_rfc3339()
            })))
        }
    }
}

pub async fn not_found(req: HttpRequest) -> HttpResponse {
    log::warn!("Route not found: {} {}", req.method(), req.path());
    HttpResponse::NotFound().json(json!({
        "success": false,
        "message": "Route not found",
        "availableRoutes": AVAILABLE_ROUTES
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/api/health", web::get().to(health_check));
}
