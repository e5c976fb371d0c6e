use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::ErrorResponse;
use crate::models::task::{TaskMutationResponse, TaskView, UpdateChecklistRequest};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("network failure: {0}")]
    NetworkFailure(String),
}

/// The calls the task detail screen makes.
///
/// `ApiClient` implements it over HTTP; tests substitute scripted fakes.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    async fn fetch_task(&self, task_id: Uuid) -> Result<TaskView, ClientError>;
    async fn update_checklist(
        &self,
        task_id: Uuid,
        body: &UpdateChecklistRequest,
    ) -> Result<TaskView, ClientError>;
}

/// HTTP client for the Task Flow API. Every request carries the base URL and,
/// once set, the bearer token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            token: None,
        }
    }

    pub fn with_token(base_url: &str, token: impl Into<String>) -> Self {
        let mut client = Self::new(base_url);
        client.set_token(token);
        client
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ClientError::NetworkFailure(e.to_string()))?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(error_from_response(resp).await)
        }
    }
}

async fn error_from_response(resp: Response) -> ClientError {
    let status = resp.status();
    let message = match resp.json::<ErrorResponse>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string(),
    };

    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
        StatusCode::FORBIDDEN => ClientError::Forbidden(message),
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::BAD_REQUEST => ClientError::InvalidInput(message),
        StatusCode::CONFLICT => ClientError::Conflict(message),
        other => ClientError::Server {
            status: other.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl TaskGateway for ApiClient {
    async fn fetch_task(&self, task_id: Uuid) -> Result<TaskView, ClientError> {
        let resp = self
            .send(self.client.get(self.url(&format!("/api/tasks/{task_id}"))))
            .await?;
        resp.json::<TaskView>()
            .await
            .map_err(|e| ClientError::NetworkFailure(format!("decode task: {e}")))
    }

    async fn update_checklist(
        &self,
        task_id: Uuid,
        body: &UpdateChecklistRequest,
    ) -> Result<TaskView, ClientError> {
        let builder = self
            .client
            .put(self.url(&format!("/api/tasks/{task_id}/checklist")))
            .json(body);
        let resp = self.send(builder).await?;
        resp.json::<TaskMutationResponse>()
            .await
            .map(|body| body.task)
            .map_err(|e| ClientError::NetworkFailure(format!("decode task: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = ApiClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/api/tasks"), "http://localhost:8080/api/tasks");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_failure() {
        // Port 9 (discard) is closed on test machines.
        let client = ApiClient::with_token("http://127.0.0.1:9", "t");
        let err = client.fetch_task(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ClientError::NetworkFailure(_)));
    }
}
