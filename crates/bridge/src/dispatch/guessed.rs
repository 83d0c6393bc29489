//! Guessed-endpoint strategy
//!
//! The web-ui backend publishes no schema, so this probes a fixed grid of
//! endpoint paths and payload shapes. Endpoints are the outer loop, payload
//! shapes the inner one, and the first 2xx ends the search.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use voxa_common::{DispatchError, Instruction};

use super::{join_url, transport_error, AttemptResult, Delivery, Strategy};

/// How the instruction is wrapped in a guessed request body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    /// `{"data": [instruction], "fn_index": 0}`
    PositionalIndexed,
    /// `{"data": [instruction]}`
    Positional,
    /// `{"instruction": instruction}`
    Instruction,
    /// `{"query": instruction}`
    Query,
}

impl PayloadShape {
    pub const ALL: [PayloadShape; 4] = [
        PayloadShape::PositionalIndexed,
        PayloadShape::Positional,
        PayloadShape::Instruction,
        PayloadShape::Query,
    ];

    pub fn payload(&self, text: &str) -> Value {
        match self {
            PayloadShape::PositionalIndexed => json!({"data": [text], "fn_index": 0}),
            PayloadShape::Positional => json!({"data": [text]}),
            PayloadShape::Instruction => json!({"instruction": text}),
            PayloadShape::Query => json!({"query": text}),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            PayloadShape::PositionalIndexed => "positional_indexed",
            PayloadShape::Positional => "positional",
            PayloadShape::Instruction => "instruction",
            PayloadShape::Query => "query",
        }
    }
}

pub struct GuessedEndpointStrategy {
    client: reqwest::Client,
    base_url: String,
    endpoints: Vec<String>,
    shapes: Vec<PayloadShape>,
    timeout: Duration,
}

impl GuessedEndpointStrategy {
    pub const NAME: &'static str = "guessed_endpoint";

    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        endpoints: Vec<String>,
        shapes: Vec<PayloadShape>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoints,
            shapes,
            timeout,
        }
    }

    async fn try_once(
        &self,
        endpoint: &str,
        shape: PayloadShape,
        text: &str,
    ) -> Result<Delivery, DispatchError> {
        let url = join_url(&self.base_url, endpoint);
        let resp = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&shape.payload(text))
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DispatchError::UnexpectedStatus {
                url,
                status: status.as_u16(),
            });
        }

        // Gradio answers with JSON, but anything 2xx counts as delivered.
        let text = resp.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(Delivery::started(format!(
            "Instruction sent to Gradio web-ui backend via {}",
            endpoint
        ))
        .with_endpoint(endpoint)
        .with_backend_response(body))
    }
}

#[async_trait]
impl Strategy for GuessedEndpointStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn attempt(&self, instruction: &Instruction) -> AttemptResult {
        let mut last_error = DispatchError::UnexpectedResponse {
            url: self.base_url.clone(),
            reason: "no candidate endpoints configured".to_string(),
        };

        for endpoint in &self.endpoints {
            for shape in &self.shapes {
                match self.try_once(endpoint, *shape, instruction.text()).await {
                    Ok(delivery) => {
                        debug!(%endpoint, shape = shape.as_str(), "guessed endpoint accepted instruction");
                        return AttemptResult::Success(delivery, Self::NAME.to_string());
                    }
                    Err(err) if err.is_configuration() => {
                        debug!(%endpoint, error = %err, "guessed endpoint is misconfigured");
                        return AttemptResult::Failure(err);
                    }
                    Err(err) => {
                        debug!(%endpoint, shape = shape.as_str(), error = %err, "guess rejected");
                        last_error = err;
                    }
                }
            }
        }

        AttemptResult::Failure(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shapes() {
        let text = "Open Gmail";
        assert_eq!(
            PayloadShape::PositionalIndexed.payload(text),
            json!({"data": ["Open Gmail"], "fn_index": 0})
        );
        assert_eq!(PayloadShape::Positional.payload(text), json!({"data": ["Open Gmail"]}));
        assert_eq!(PayloadShape::Instruction.payload(text), json!({"instruction": "Open Gmail"}));
        assert_eq!(PayloadShape::Query.payload(text), json!({"query": "Open Gmail"}));
    }

    #[test]
    fn test_shape_serde_names() {
        let names: Vec<String> = PayloadShape::ALL
            .iter()
            .map(|s| serde_json::to_value(s).unwrap().as_str().unwrap().to_string())
            .collect();
        let expected: Vec<&str> = PayloadShape::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, expected);
    }
}
