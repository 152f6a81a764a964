use crate::config::POLL_INTERVAL;
use crate::prelude::{QueryError, QueryFuture, QuerySource};
use crate::query::nrql::NrqlRequest;
use crate::query::response::NrqlResponse;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:9000/nrql";

/// Query source that POSTs NRQL to an HTTP endpoint.
///
/// Every request is bounded by a timeout, the poll interval by default, so a
/// stalled backend surfaces as a [`QueryError::Transport`] instead of a cycle
/// that never finishes.
#[derive(Debug, Clone)]
pub struct HttpQuerySource {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpQuerySource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
            timeout: POLL_INTERVAL,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.max(Duration::from_millis(1));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for HttpQuerySource {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl QuerySource for HttpQuerySource {
    fn query(&self, request: NrqlRequest) -> QueryFuture {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let mut builder = client.post(&endpoint).timeout(timeout).json(&request);
            if let Some(key) = api_key {
                builder = builder.header("API-Key", key);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| transport_error(e, timeout))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(QueryError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let value = response.json::<Value>().await.map_err(|e| {
                if e.is_timeout() {
                    transport_error(e, timeout)
                } else {
                    QueryError::Decode(e.to_string())
                }
            })?;
            Ok(NrqlResponse::rows_from_value(&value))
        })
    }
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> QueryError {
    if err.is_timeout() {
        QueryError::Transport(format!("no answer within {}ms", timeout.as_millis()))
    } else {
        QueryError::Transport(err.to_string())
    }
}
