//! History API client.
//!
//! Chat history and the notification archive live behind an HTTP API owned
//! by another service. The channel streams deltas; this client fetches
//! snapshots and mirrors destructive inbox operations to the server.

use async_trait::async_trait;
use thiserror::Error;
use wavelink_protocol::{ChatMessage, Notification};

/// History API errors.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The request could not be sent or the response not read.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server returned {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, best effort.
        body: String,
    },
}

/// Request/response access to chat and notification history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Ordered message snapshot for one room.
    async fn match_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>, HistoryError>;

    /// Notification snapshot for the authenticated user, most recent first.
    async fn notifications(&self) -> Result<Vec<Notification>, HistoryError>;

    /// Mark one notification read.
    async fn mark_read(&self, id: &str) -> Result<(), HistoryError>;

    /// Delete one notification.
    async fn delete_notification(&self, id: &str) -> Result<(), HistoryError>;

    /// Delete every notification.
    async fn clear_notifications(&self) -> Result<(), HistoryError>;
}

/// HTTP implementation of [`HistoryStore`].
pub struct HttpHistory {
    http: reqwest::Client,
    base_url: String,
    bearer: Option<String>,
}

impl HttpHistory {
    /// Create a client for the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer: None,
        }
    }

    /// Attach a bearer credential to every request.
    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, HistoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(HistoryError::Http {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl HistoryStore for HttpHistory {
    async fn match_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>, HistoryError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/matches/{room_id}/messages"))
            .send()
            .await?;
        Ok(expect_success(response).await?.json().await?)
    }

    async fn notifications(&self) -> Result<Vec<Notification>, HistoryError> {
        let response = self
            .request(reqwest::Method::GET, "/notifications")
            .send()
            .await?;
        Ok(expect_success(response).await?.json().await?)
    }

    async fn mark_read(&self, id: &str) -> Result<(), HistoryError> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/notifications/{id}/read"))
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    async fn delete_notification(&self, id: &str) -> Result<(), HistoryError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/notifications/{id}"))
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    async fn clear_notifications(&self) -> Result<(), HistoryError> {
        let response = self
            .request(reqwest::Method::DELETE, "/notifications")
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }
}
