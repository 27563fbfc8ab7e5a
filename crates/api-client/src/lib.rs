//! HTTP client for the admin REST API.
//!
//! One `reqwest::Client` is built per process and shared by every view; the
//! bearer token and JSON headers are attached to each request here so call
//! sites only deal with paths, query pairs and DTOs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use admin_api::{
    DisputeAction, DisputeDecision, DisputesPage, OrdersPage, TrafficEdit, UserRole, UsersPage,
};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

mod error;
mod url;

pub use error::ApiError;
pub use url::join_base_path;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub const ORDERS_PATH: &str = "/orders/all";
pub const DISPUTES_PATH: &str = "/admin/orders/disputes";
pub const USERS_PATH: &str = "/admin/users";
pub const TRAFFIC_EDIT_PATH: &str = "/admin/traffic/edit";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: Client,
    base_url: String,
    token: Option<String>,
    request_timeout: Duration,
    next_request_id: AtomicU64,
}

impl AdminClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        // Validate once up front so every later join only fails on bad paths.
        join_base_path(&config.base_url, "/")?;
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: config.base_url.trim().to_string(),
                token: config
                    .token
                    .map(|token| token.trim().to_string())
                    .filter(|token| !token.is_empty()),
                request_timeout: config.request_timeout,
                next_request_id: AtomicU64::new(1),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub async fn list_orders(&self, query: &[(String, String)]) -> Result<OrdersPage, ApiError> {
        self.get_json(ORDERS_PATH, query).await
    }

    pub async fn list_disputes(
        &self,
        query: &[(String, String)],
    ) -> Result<DisputesPage, ApiError> {
        self.get_json(DISPUTES_PATH, query).await
    }

    pub async fn list_users(&self, role: UserRole) -> Result<UsersPage, ApiError> {
        let query = [("role".to_string(), role.as_str().to_string())];
        self.get_json(USERS_PATH, &query).await
    }

    pub async fn dispute_action(
        &self,
        action: DisputeAction,
        decision: &DisputeDecision,
    ) -> Result<(), ApiError> {
        self.send_json(Method::POST, action.path(), decision).await
    }

    pub async fn edit_traffic(&self, edit: &TrafficEdit) -> Result<(), ApiError> {
        self.send_json(Method::PATCH, TRAFFIC_EDIT_PATH, edit).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path)?.query(query);
        let body = self.execute(Method::GET, path, request).await?;
        serde_json::from_str(&body).map_err(ApiError::Decode)
    }

    async fn send_json<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        payload: &B,
    ) -> Result<(), ApiError> {
        let body = serde_json::to_string(payload).map_err(ApiError::Decode)?;
        let request = self
            .request(method.clone(), path)?
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        self.execute(method, path, request).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = join_base_path(&self.inner.base_url, path)?;
        let mut request = self
            .inner
            .http
            .request(method, url)
            .header(ACCEPT, "application/json")
            .timeout(self.inner.request_timeout);
        if let Some(token) = &self.inner.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        Ok(request)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<String, ApiError> {
        let request_id = self.inner.next_request_id.fetch_add(1, Ordering::Relaxed);
        debug!(
            event = "http.request",
            request_id = request_id,
            method = %method,
            path = path,
            "sending request"
        );
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                debug!(
                    event = "http.transport_error",
                    request_id = request_id,
                    timeout = err.is_timeout(),
                    connect = err.is_connect(),
                    error = %err,
                    "request failed"
                );
                return Err(ApiError::Transport(err));
            }
        };
        let status = response.status().as_u16();
        let body = response.text().await.map_err(ApiError::Transport)?;
        debug!(
            event = "http.response",
            request_id = request_id,
            status = status,
            body_len = body.len(),
            "response received"
        );
        if status / 100 != 2 {
            return Err(ApiError::from_status(status, &body));
        }
        Ok(body)
    }
}
