use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;

use task_flow::config::AppConfig;
use task_flow::database::{MemoryRepository, PgRepository, Repository};
use task_flow::handlers::health::{not_found, StartedAt};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if config.is_development() {
            "debug"
        } else {
            "info"
        }),
    )
    .init();

    let repository: Arc<dyn Repository> = match &config.database_url {
        Some(url) => Arc::new(PgRepository::connect(url).await?),
        None => {
            log::warn!("⚠️  DATABASE_URL not set, keeping data in memory");
            Arc::new(MemoryRepository::new())
        }
    };

    match repository.stats().await {
        Ok(stats) => stats.log_stats(),
        Err(e) => log::warn!("Could not read database statistics: {}", e),
    }

    log::info!("🚀 Starting Task Flow API on port {}", config.port);
    log::info!("📋 Allowed frontend URLs: {:?}", config.frontend_urls);

    let port = config.port;
    let repository = web::Data::from(repository);
    let config = web::Data::new(config);
    let started = web::Data::new(StartedAt::default());

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept", "Origin"])
            .supports_credentials();

        for origin in &config.frontend_urls {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(config.clone())
            .app_data(repository.clone())
            .app_data(started.clone())
            .configure(task_flow::configure)
            .default_service(web::to(not_found))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    Ok(())
}
