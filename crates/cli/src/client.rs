//! Bridge HTTP client

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use voxa_common::{
    AgentCatalog, AgentControlResponse, AgentInfo, AgentRequest, DispatchOutcome, ServiceProbe,
    TaskStatus,
};

/// Dispatch can walk the whole strategy chain, so start requests get a long budget
const START_TIMEOUT: Duration = Duration::from_secs(120);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for communicating with the VOXA bridge
pub struct BridgeClient {
    client: reqwest::Client,
    base_url: String,
}

impl BridgeClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Hand an instruction to the bridge dispatcher
    pub async fn start_agent(&self, request: &AgentRequest) -> Result<DispatchOutcome> {
        let url = format!("{}/api/agents/start", self.base_url);
        debug!(%url, "starting agent");

        let resp = self
            .client
            .post(&url)
            .timeout(START_TIMEOUT)
            .json(request)
            .send()
            .await
            .with_context(|| format!("cannot reach bridge at {}", self.base_url))?;

        if resp.status() == StatusCode::BAD_REQUEST {
            let body: Value = resp.json().await.unwrap_or_default();
            bail!(
                "bridge rejected the request: {}",
                body["error"].as_str().unwrap_or("unknown error")
            );
        }

        decode(resp, &url).await
    }

    /// Task progress as forwarded from the direct API
    pub async fn task_status(&self, task_id: &str) -> Result<TaskStatus> {
        let url = self.endpoint(&["api", "task", task_id, "status"])?;
        self.get_url(&url).await
    }

    pub async fn stop_agent(&self, task_id: &str) -> Result<AgentControlResponse> {
        let url = self.endpoint(&["api", "agents", task_id, "stop"])?;
        let resp = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("cannot reach bridge at {}", self.base_url))?;
        decode(resp, &url).await
    }

    pub async fn agents(&self) -> Result<Vec<AgentInfo>> {
        let catalog: AgentCatalog = self.get("/api/agents").await?;
        Ok(catalog.agents)
    }

    /// Bridge URL with each segment percent-encoded on its own
    fn endpoint(&self, segments: &[&str]) -> Result<String> {
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            bail!("invalid path segment {:?}", bad);
        }
        let mut url = url::Url::parse(&self.base_url)
            .with_context(|| format!("invalid bridge URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("invalid bridge URL {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.to_string())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_url(&format!("{}{}", self.base_url, path)).await
    }

    async fn get_url<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("cannot reach bridge at {}", self.base_url))?;
        decode(resp, url).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response, url: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        bail!("{} returned status {}", url, status.as_u16());
    }
    resp.json()
        .await
        .with_context(|| format!("invalid response body from {}", url))
}

/// GET `url` and report whether it answered 2xx
pub async fn probe_service(
    client: &reqwest::Client,
    name: &str,
    url: &str,
    timeout: Duration,
) -> ServiceProbe {
    let (running, detail) = match client.get(url).timeout(timeout).send().await {
        Ok(resp) if resp.status().is_success() => (true, "running".to_string()),
        Ok(resp) => (false, format!("status {}", resp.status().as_u16())),
        Err(e) if e.is_timeout() => (false, "timed out".to_string()),
        Err(e) if e.is_connect() => (false, "not running".to_string()),
        Err(e) => (false, e.to_string()),
    };
    debug!(service = name, %url, running, "probed service");

    ServiceProbe {
        name: name.to_string(),
        url: url.to_string(),
        running,
        detail,
        checked_at: chrono::Utc::now(),
    }
}
