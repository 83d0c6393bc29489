//! Mock web-ui services and a scripted browser driver for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::Value;

use voxa_bridge::dispatch::{BrowserDriver, BrowserSession};
use voxa_bridge::BridgeConfig;
use voxa_common::DispatchError;

/// One request seen by a mock backend
#[derive(Debug, Clone)]
pub struct Hit {
    pub method: String,
    pub path: String,
    pub user_agent: Option<String>,
    pub body: Value,
}

type Responder = Arc<dyn Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync>;

#[derive(Clone)]
struct MockState {
    hits: Arc<Mutex<Vec<Hit>>>,
    responder: Responder,
    delay: Option<Duration>,
}

/// HTTP server on an ephemeral port that records every request
pub struct MockBackend {
    pub url: String,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl MockBackend {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        Self::start_with_delay(None, responder).await
    }

    pub async fn start_with_delay<F>(delay: Option<Duration>, responder: F) -> Self
    where
        F: Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            hits: hits.clone(),
            responder: Arc::new(responder),
            delay,
        };
        let app = Router::new().fallback(record).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            hits,
        }
    }

    /// Answers 404 to everything
    pub async fn not_found() -> Self {
        Self::start(|_, _| (StatusCode::NOT_FOUND, serde_json::json!({"detail": "Not Found"}))).await
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn hit_count(&self) -> usize {
        self.hits.lock().unwrap().len()
    }
}

async fn record(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.hits.lock().unwrap().push(Hit {
        method: method.to_string(),
        path: uri.path().to_string(),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.clone(),
    });

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }

    let (status, reply) = (state.responder)(uri.path(), &body);
    (status, Json(reply)).into_response()
}

/// URL of a port nothing listens on
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Config pointing at the given services with short timeouts and no Playwright
pub fn test_config(direct_api_url: &str, webui_base_url: &str) -> BridgeConfig {
    let mut cfg = BridgeConfig::default();
    cfg.direct_api_url = direct_api_url.to_string();
    cfg.webui_base_url = webui_base_url.to_string();
    cfg.timeouts.direct_api_secs = 2;
    cfg.timeouts.guessed_endpoint_secs = 2;
    cfg.timeouts.preflight_secs = 2;
    cfg.timeouts.status_secs = 2;
    cfg
}

/// Browser driver that plays back a fixed page
pub struct ScriptedDriver {
    pub available: bool,
    pub page: Vec<String>,
    pub opened: Arc<Mutex<usize>>,
    pub closed: Arc<Mutex<usize>>,
    pub typed: Arc<Mutex<Vec<String>>>,
}

impl ScriptedDriver {
    pub fn unavailable() -> Self {
        Self::with_page(false, &[])
    }

    pub fn with_page(available: bool, page: &[&str]) -> Self {
        Self {
            available,
            page: page.iter().map(|s| s.to_string()).collect(),
            opened: Arc::new(Mutex::new(0)),
            closed: Arc::new(Mutex::new(0)),
            typed: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

struct ScriptedSession {
    page: Vec<String>,
    closed: Arc<Mutex<usize>>,
    typed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn open(
        &self,
        _url: &str,
        _ready_timeout: Duration,
    ) -> Result<Box<dyn BrowserSession>, DispatchError> {
        *self.opened.lock().unwrap() += 1;
        Ok(Box::new(ScriptedSession {
            page: self.page.clone(),
            closed: self.closed.clone(),
            typed: self.typed.clone(),
        }))
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn find_first(&mut self, selectors: &[String]) -> Result<Option<String>, DispatchError> {
        Ok(selectors.iter().find(|s| self.page.contains(s)).cloned())
    }

    async fn fill(&mut self, _selector: &str, text: &str) -> Result<(), DispatchError> {
        self.typed.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn click(&mut self, _selector: &str) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn close(self: Box<Self>) {
        *self.closed.lock().unwrap() += 1;
    }
}
