//! Fallback dispatcher
//!
//! Delivers an instruction to the web-ui backend by trying an ordered list of
//! strategies until one reports success:
//!
//! ```text
//! ┌──────────────┐   fail   ┌──────────────────┐   fail   ┌───────────────┐   fail   ┌─────────────────┐
//! │  direct API  │ ───────> │ guessed endpoint │ ───────> │ UI automation │ ───────> │ manual fallback │
//! └──────────────┘          │ path × payload   │          │  (Playwright) │          └─────────────────┘
//!                           └──────────────────┘          └───────────────┘
//! ```
//!
//! Strategies hold no state between calls, so one [`Dispatcher`] can serve any
//! number of concurrent requests.

pub mod automation;
pub mod direct;
pub mod guessed;
pub mod manual;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use voxa_common::{
    AgentRequest, AttemptRecord, DispatchError, DispatchOutcome, DispatchStatus, Instruction,
    WebUiStatus,
};

use crate::backend::WebUiPreflight;
use crate::config::BridgeConfig;
use crate::playwright::{PlaywrightConfig, PlaywrightDriver};

pub use automation::{BrowserDriver, BrowserSession, UiAutomationStrategy};
pub use direct::DirectApiStrategy;
pub use guessed::{GuessedEndpointStrategy, PayloadShape};
pub use manual::ManualFallbackStrategy;

/// What a successful strategy hands back to the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub status: DispatchStatus,
    /// Task id assigned by the backend, replacing the generated one
    pub task_id: Option<String>,
    pub note: String,
    pub endpoint: Option<String>,
    pub polling_url: Option<String>,
    pub backend_response: Option<Value>,
    pub manual_steps: Vec<String>,
    pub webui_url: Option<String>,
}

impl Delivery {
    pub fn started(note: impl Into<String>) -> Self {
        Self {
            status: DispatchStatus::Started,
            task_id: None,
            note: note.into(),
            endpoint: None,
            polling_url: None,
            backend_response: None,
            manual_steps: Vec::new(),
            webui_url: None,
        }
    }

    pub fn manual(note: impl Into<String>, steps: Vec<String>, webui_url: impl Into<String>) -> Self {
        Self {
            status: DispatchStatus::ManualRequired,
            manual_steps: steps,
            webui_url: Some(webui_url.into()),
            ..Self::started(note)
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_polling_url(mut self, url: impl Into<String>) -> Self {
        self.polling_url = Some(url.into());
        self
    }

    pub fn with_backend_response(mut self, body: Value) -> Self {
        self.backend_response = Some(body);
        self
    }

    fn into_outcome(
        self,
        generated_task_id: String,
        strategy: &str,
        instruction: &Instruction,
        attempts: Vec<AttemptRecord>,
    ) -> DispatchOutcome {
        let task_id = self.task_id.unwrap_or(generated_task_id);
        let mut outcome = DispatchOutcome::new(task_id, self.status, instruction);
        outcome.strategy = Some(strategy.to_string());
        outcome.webui_status = Some(WebUiStatus::Connected);
        outcome.note = Some(self.note);
        outcome.endpoint = self.endpoint;
        outcome.polling_url = self.polling_url;
        outcome.backend_response = self.backend_response;
        outcome.manual_steps = self.manual_steps;
        outcome.webui_url = self.webui_url;
        outcome.attempts = attempts;
        outcome
    }
}

/// Outcome of one strategy
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptResult {
    /// Delivered, with the name of the strategy that did it
    Success(Delivery, String),
    Failure(DispatchError),
}

/// One way of getting an instruction to the web-ui backend
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, instruction: &Instruction) -> AttemptResult;
}

/// Runs strategies in order until one succeeds
pub struct Dispatcher {
    strategies: Vec<Box<dyn Strategy>>,
    preflight: Option<WebUiPreflight>,
    span: Span,
}

impl Dispatcher {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self {
            strategies,
            preflight: None,
            span: info_span!("dispatcher"),
        }
    }

    /// Build the standard strategy chain from configuration
    pub fn from_config(cfg: &BridgeConfig) -> voxa_common::Result<Self> {
        let driver: Arc<dyn BrowserDriver> = Arc::new(PlaywrightDriver::new(
            PlaywrightConfig::from_automation(&cfg.automation, cfg.timeouts.automation_step()),
        ));
        Self::from_config_with_driver(cfg, driver)
    }

    /// Same as [`Dispatcher::from_config`] with a caller-supplied browser driver
    pub fn from_config_with_driver(
        cfg: &BridgeConfig,
        driver: Arc<dyn BrowserDriver>,
    ) -> voxa_common::Result<Self> {
        Self::from_config_with_client(cfg, http_client()?, driver)
    }

    /// Build the chain on an existing HTTP client so callers can share its pool
    pub fn from_config_with_client(
        cfg: &BridgeConfig,
        client: reqwest::Client,
        driver: Arc<dyn BrowserDriver>,
    ) -> voxa_common::Result<Self> {
        cfg.validate()?;

        let mut strategies: Vec<Box<dyn Strategy>> = vec![Box::new(DirectApiStrategy::new(
            client.clone(),
            &cfg.direct_api_url,
            cfg.timeouts.direct_api(),
        ))];

        if cfg.guessed.enabled {
            strategies.push(Box::new(GuessedEndpointStrategy::new(
                client.clone(),
                &cfg.webui_base_url,
                cfg.guessed.endpoints.clone(),
                cfg.guessed.payload_shapes.clone(),
                cfg.timeouts.guessed_endpoint(),
            )));
        }

        if cfg.automation.enabled {
            strategies.push(Box::new(UiAutomationStrategy::new(
                driver,
                &cfg.webui_base_url,
                cfg.automation.input_selectors.clone(),
                cfg.automation.submit_selectors.clone(),
                cfg.timeouts.automation_ready(),
            )));
        }

        if cfg.manual_fallback {
            strategies.push(Box::new(ManualFallbackStrategy::new(&cfg.webui_base_url)));
        }

        let mut dispatcher = Self::new(strategies);
        if cfg.preflight_check {
            dispatcher = dispatcher.with_preflight(WebUiPreflight::new(
                client,
                &cfg.webui_base_url,
                cfg.timeouts.preflight(),
            ));
        }
        Ok(dispatcher)
    }

    /// Probe the web-ui backend before trying any strategy
    pub fn with_preflight(mut self, preflight: WebUiPreflight) -> Self {
        self.preflight = Some(preflight);
        self
    }

    /// Parent span for every dispatch logged by this dispatcher
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Deliver an instruction.
    ///
    /// Only [`DispatchError::Configuration`] is returned as an error; every
    /// other failure is absorbed and reflected in the outcome.
    pub async fn dispatch(&self, request: AgentRequest) -> voxa_common::Result<DispatchOutcome> {
        let instruction = Instruction::try_from(request)?;
        let task_id = generate_task_id();
        let span = info_span!(
            parent: &self.span,
            "dispatch",
            task_id = %task_id,
            agent_type = %instruction.agent_type()
        );

        self.run(instruction, task_id).instrument(span).await
    }

    async fn run(
        &self,
        instruction: Instruction,
        task_id: String,
    ) -> voxa_common::Result<DispatchOutcome> {
        debug!(instruction = %instruction.text(), "dispatching instruction");

        if let Some(preflight) = &self.preflight {
            if let Err(err) = preflight.check().await {
                warn!(error = %err, "web-ui backend failed preflight");
                let mut outcome = DispatchOutcome::new(task_id, DispatchStatus::Error, &instruction);
                outcome.webui_status = Some(WebUiStatus::Error);
                outcome.error = Some(err.to_string());
                return Ok(outcome);
            }
        }

        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            debug!(strategy = strategy.name(), "attempting delivery");

            match strategy.attempt(&instruction).await {
                AttemptResult::Success(delivery, name) => {
                    info!(strategy = %name, status = %delivery.status, "instruction delivered");
                    attempts.push(AttemptRecord {
                        strategy: name.clone(),
                        succeeded: true,
                        reason: None,
                    });
                    return Ok(delivery.into_outcome(task_id, &name, &instruction, attempts));
                }
                AttemptResult::Failure(err) if err.is_configuration() => {
                    return Err(err);
                }
                AttemptResult::Failure(err) => {
                    warn!(strategy = strategy.name(), kind = err.kind(), error = %err, "strategy failed");
                    attempts.push(AttemptRecord {
                        strategy: strategy.name().to_string(),
                        succeeded: false,
                        reason: Some(err.to_string()),
                    });
                }
            }
        }

        warn!("no strategy delivered the instruction");
        let mut outcome = DispatchOutcome::new(task_id, DispatchStatus::Error, &instruction);
        outcome.webui_status = Some(WebUiStatus::Error);
        outcome.error = Some("no delivery strategy succeeded".to_string());
        outcome.attempts = attempts;
        Ok(outcome)
    }
}

/// Last millisecond value handed out as a task id
static LAST_TASK_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Task id derived from the wall clock in milliseconds.
///
/// Strictly increasing within the process: calls in the same millisecond, or
/// after the clock steps back, take the previous value plus one.
pub fn generate_task_id() -> String {
    let now = chrono::Utc::now().timestamp_millis();
    let prev = LAST_TASK_MILLIS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    format!("task_{}", now.max(prev + 1))
}

/// Client shared by every outbound call the bridge makes
pub(crate) fn http_client() -> voxa_common::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("voxa-bridge/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| DispatchError::Configuration(format!("failed to build HTTP client: {}", e)))
}

/// Map a transport error onto the dispatch taxonomy
pub(crate) fn transport_error(url: &str, err: reqwest::Error) -> DispatchError {
    if err.is_timeout() {
        DispatchError::NetworkUnavailable(format!("{} timed out", url))
    } else if err.is_connect() {
        DispatchError::NetworkUnavailable(format!("{} refused connection", url))
    } else if err.is_builder() {
        DispatchError::Configuration(format!("cannot build request for {}: {}", url, err))
    } else {
        DispatchError::NetworkUnavailable(format!("{}: {}", url, err))
    }
}

/// Join a base URL and an absolute path without doubling the slash
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// `base` with each segment appended as one percent-encoded path segment.
///
/// `None` when `base` cannot carry a path or a segment is empty, `.` or `..`.
pub(crate) fn segment_url(base: &str, segments: &[&str]) -> Option<String> {
    if segments.iter().any(|s| matches!(*s, "" | "." | "..")) {
        return None;
    }
    let mut url = url::Url::parse(base).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().extend(segments);
    Some(url.to_string())
}
