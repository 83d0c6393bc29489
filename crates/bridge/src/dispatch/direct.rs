//! Direct web-ui API strategy

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use voxa_common::{DispatchError, Instruction};

use super::{join_url, segment_url, transport_error, AttemptResult, Delivery, Strategy};

/// Queues the instruction on the direct API server's `/api/execute`
pub struct DirectApiStrategy {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl DirectApiStrategy {
    pub const NAME: &'static str = "direct_api";

    pub fn new(client: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Where progress of a queued task can be polled
    pub fn polling_url(&self, task_id: &str) -> Option<String> {
        segment_url(&self.base_url, &["api", "task", task_id])
    }

    async fn execute(&self, instruction: &Instruction) -> Result<Delivery, DispatchError> {
        let url = join_url(&self.base_url, "/api/execute");
        let payload = json!({
            "instruction": instruction.text(),
            "agent_settings": instruction.agent_settings(),
            "browser_settings": instruction.browser_settings(),
        });

        let resp = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = resp.status();
        debug!(%url, status = status.as_u16(), "direct API responded");
        if !status.is_success() {
            return Err(DispatchError::UnexpectedStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body: Value = resp.json().await.map_err(|e| DispatchError::UnexpectedResponse {
            url: url.clone(),
            reason: format!("body is not JSON: {}", e),
        })?;

        let task_id = task_id_of(&body).ok_or_else(|| DispatchError::UnexpectedResponse {
            url: url.clone(),
            reason: "response has no task_id".to_string(),
        })?;
        let polling_url =
            self.polling_url(&task_id)
                .ok_or_else(|| DispatchError::UnexpectedResponse {
                    url: url.clone(),
                    reason: format!("task_id {:?} cannot be used in a URL", task_id),
                })?;

        Ok(Delivery::started("Instruction queued for execution via direct web-ui API")
            .with_polling_url(polling_url)
            .with_task_id(task_id)
            .with_endpoint(url)
            .with_backend_response(body))
    }
}

/// Accepts string or numeric ids; blank strings do not count
fn task_id_of(body: &Value) -> Option<String> {
    match body.get("task_id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Strategy for DirectApiStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn attempt(&self, instruction: &Instruction) -> AttemptResult {
        match self.execute(instruction).await {
            Ok(delivery) => AttemptResult::Success(delivery, Self::NAME.to_string()),
            Err(err) => AttemptResult::Failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_of() {
        assert_eq!(task_id_of(&json!({"task_id": "abc123"})).as_deref(), Some("abc123"));
        assert_eq!(task_id_of(&json!({"task_id": 42})).as_deref(), Some("42"));
        assert_eq!(task_id_of(&json!({"task_id": ""})), None);
        assert_eq!(task_id_of(&json!({"task_id": null})), None);
        assert_eq!(task_id_of(&json!({"status": "queued"})), None);
    }

    #[test]
    fn test_polling_url_strips_trailing_slash() {
        let strategy = DirectApiStrategy::new(
            reqwest::Client::new(),
            "http://127.0.0.1:7789/",
            Duration::from_secs(1),
        );
        assert_eq!(
            strategy.polling_url("abc123").as_deref(),
            Some("http://127.0.0.1:7789/api/task/abc123")
        );
        assert_eq!(
            strategy.polling_url("a/b?c").as_deref(),
            Some("http://127.0.0.1:7789/api/task/a%2Fb%3Fc")
        );
    }
}
