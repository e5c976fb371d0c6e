//! Shared helpers: every test gets its own server on 127.0.0.1:0 backed by
//! the in-memory repository.

#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Value};

use task_flow::config::AppConfig;
use task_flow::database::{MemoryRepository, Repository};
use task_flow::handlers::health::{not_found, StartedAt};
use task_flow::models::auth::AuthResponse;
use task_flow::models::task::{TaskMutationResponse, TaskView};

pub struct TestServer {
    pub base_url: String,
    pub http: Client,
}

pub async fn spawn_test_server() -> TestServer {
    spawn_with_config(AppConfig::for_tests()).await
}

pub async fn spawn_with_config(config: AppConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let repository: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
    let repository = web::Data::from(repository);
    let config = web::Data::new(config);
    let started = web::Data::new(StartedAt::default());

    let server = HttpServer::new(move || {
        App::new()
            .app_data(config.clone())
            .app_data(repository.clone())
            .app_data(started.clone())
            .configure(task_flow::configure)
            .default_service(web::to(not_found))
    })
    .workers(1)
    .disable_signals()
    .listen(listener)
    .unwrap()
    .run();
    actix_web::rt::spawn(server);

    TestServer {
        base_url,
        http: Client::new(),
    }
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn register(&self, name: &str, email: &str, admin: bool) -> AuthResponse {
        let mut body = json!({
            "name": name,
            "email": email,
            "password": "secret123"
        });
        if admin {
            body["adminInviteToken"] = json!("let-me-admin");
        }
        let resp = self
            .http
            .post(self.url("/api/auth/register"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 201, "register {email}");
        resp.json().await.unwrap()
    }

    pub async fn admin(&self) -> AuthResponse {
        self.register("Admin", "admin@example.com", true).await
    }

    pub async fn member(&self, name: &str) -> AuthResponse {
        let email = format!("{}@example.com", name.to_lowercase());
        self.register(name, &email, false).await
    }

    /// Creates a task as `admin` and returns the stored projection.
    pub async fn create_task(&self, admin: &AuthResponse, body: Value) -> TaskView {
        let resp = self
            .request(Method::POST, "/api/tasks", Some(&admin.token))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 201);
        let created: TaskMutationResponse = resp.json().await.unwrap();
        created.task
    }

    pub async fn put_checklist(&self, token: &str, task_id: &str, body: Value) -> reqwest::Response {
        self.request(
            Method::PUT,
            &format!("/api/tasks/{task_id}/checklist"),
            Some(token),
        )
        .json(&body)
        .send()
        .await
        .unwrap()
    }
}

pub fn checklist_body(items: &[(&str, bool)]) -> Value {
    json!({
        "todoChecklist": items
            .iter()
            .map(|(title, completed)| json!({ "title": title, "completed": completed }))
            .collect::<Vec<_>>()
    })
}
