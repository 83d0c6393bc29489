//! Thin HTTP clients for the web-ui services the bridge sits in front of

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use voxa_common::{DispatchError, TaskStatus};

use crate::dispatch::{join_url, segment_url, transport_error};

/// Checks that the web-ui backend answers before any strategy runs
pub struct WebUiPreflight {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebUiPreflight {
    pub fn new(client: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            url: join_url(base_url, "/"),
            timeout,
        }
    }

    pub async fn check(&self) -> Result<(), DispatchError> {
        let resp = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| match transport_error(&self.url, e) {
                DispatchError::NetworkUnavailable(_) => DispatchError::NetworkUnavailable(
                    "Web-UI backend is not running. Please start it first.".to_string(),
                ),
                other => other,
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(DispatchError::UnexpectedStatus {
                url: self.url.clone(),
                status: resp.status().as_u16(),
            })
        }
    }
}

/// Forwards task status queries to the direct API server
pub struct TaskStatusForwarder {
    client: reqwest::Client,
    api_url: String,
    timeout: Duration,
}

impl TaskStatusForwarder {
    pub fn new(client: reqwest::Client, api_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Remote status body as-is, or a synthesized `error` status.
    ///
    /// The bridge keeps no task state, so an unknown id is whatever the
    /// direct API says it is.
    pub async fn status(&self, task_id: &str) -> Value {
        let Some(url) = segment_url(&self.api_url, &["api", "task", task_id]) else {
            return error_status(task_id, format!("Invalid task id: {:?}", task_id));
        };

        let resp = match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!(%url, error = %e, "direct API unreachable");
                return error_status(task_id, "Web-UI API server is not running");
            }
        };

        let status = resp.status();
        if !status.is_success() {
            return error_status(
                task_id,
                format!("API server returned status {}", status.as_u16()),
            );
        }

        match resp.json::<Value>().await {
            Ok(body) => body,
            Err(e) => {
                warn!(%url, error = %e, "direct API returned a non-JSON status body");
                error_status(task_id, format!("API server returned an invalid body: {}", e))
            }
        }
    }
}

fn error_status(task_id: &str, error: impl Into<String>) -> Value {
    serde_json::to_value(TaskStatus::error(task_id, error)).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_shape() {
        let value = error_status("task_1", "Web-UI API server is not running");
        assert_eq!(
            value,
            serde_json::json!({
                "task_id": "task_1",
                "status": "error",
                "error": "Web-UI API server is not running"
            })
        );
    }
}
