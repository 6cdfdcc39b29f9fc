//! Manager REST client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::api::{EventQuery, EventsPage, ExecutionApi};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, MonitorResult};
use crate::model::{Event, Execution, ExecutionGroup, Target};

const API_PREFIX: &str = "api/v3.1";

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    items: Vec<T>,
    metadata: ListMetadata,
}

#[derive(Debug, Deserialize)]
struct ListMetadata {
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    total: u64,
}

/// HTTP client for the manager's execution and event endpoints.
///
/// The underlying connection pool is reused across every request of a session.
#[derive(Clone)]
pub struct ManagerClient {
    client: reqwest::Client,
    server_url: String,
}

impl ManagerClient {
    /// Create a client from configuration, attaching token and tenant headers.
    pub fn from_config(config: &MonitorConfig) -> MonitorResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            headers.insert("Authentication-Token", header_value(token)?);
        }
        if let Some(tenant) = &config.tenant {
            headers.insert("Tenant", header_value(tenant)?);
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            server_url: config.manager_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.server_url, API_PREFIX, path)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> MonitorResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "{} request rejected", what);
        Err(classify_status(status, what, body))
    }
}

fn header_value(value: &str) -> MonitorResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| MonitorError::Config(format!("invalid header value: {}", e)))
}

/// Map a non-success HTTP status onto the monitor's error taxonomy.
fn classify_status(status: StatusCode, what: &str, body: String) -> MonitorError {
    match status {
        StatusCode::NOT_FOUND => MonitorError::NotFound(what.to_string()),
        StatusCode::UNAUTHORIZED => MonitorError::Unauthorized(body),
        StatusCode::FORBIDDEN => MonitorError::Forbidden(body),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            MonitorError::Transport(format!("{} returned {}", what, status))
        }
        s if s.is_server_error() => {
            MonitorError::Transport(format!("{} returned {}: {}", what, status, body))
        }
        _ => MonitorError::Api {
            status: status.as_u16(),
            message: body,
        },
    }
}

#[async_trait]
impl ExecutionApi for ManagerClient {
    async fn get_execution(&self, execution_id: &str) -> MonitorResult<Execution> {
        let request = self.client.get(self.url(&format!("executions/{}", execution_id)));
        let response = self
            .send(request, &format!("execution {}", execution_id))
            .await?;

        Ok(response.json().await?)
    }

    async fn get_events(&self, query: &EventQuery) -> MonitorResult<EventsPage> {
        let target_param = match &query.target {
            Target::Execution(_) => "execution_id",
            Target::Group(_) => "execution_group_id",
        };

        let request = self.client.get(self.url("events")).query(&[
            (target_param, query.target.id().to_string()),
            ("_offset", query.offset.to_string()),
            ("_size", query.size.to_string()),
            ("include_logs", query.include_logs.to_string()),
            ("_sort", "@timestamp".to_string()),
        ]);
        let response = self.send(request, &format!("events of {}", query.target)).await?;

        let list: ListResponse<Event> = response.json().await?;
        Ok(EventsPage {
            items: list.items,
            total: list.metadata.pagination.total,
        })
    }

    async fn get_execution_group(&self, group_id: &str) -> MonitorResult<ExecutionGroup> {
        let request = self
            .client
            .get(self.url(&format!("execution-groups/{}", group_id)));
        let response = self
            .send(request, &format!("execution group {}", group_id))
            .await?;

        Ok(response.json().await?)
    }
}
