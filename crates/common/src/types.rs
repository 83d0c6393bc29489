//! Core types for VOXA

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DispatchError, Result};

fn default_agent_type() -> String {
    "browser_use".to_string()
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Body of `POST /api/agents/start`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub instruction: String,
    #[serde(default = "empty_object")]
    pub agent_settings: Value,
    #[serde(default = "empty_object")]
    pub browser_settings: Value,
    #[serde(default = "default_agent_type")]
    pub agent_type: String,
}

impl AgentRequest {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            agent_settings: empty_object(),
            browser_settings: empty_object(),
            agent_type: default_agent_type(),
        }
    }

    pub fn with_agent_settings(mut self, settings: Value) -> Self {
        self.agent_settings = settings;
        self
    }

    pub fn with_browser_settings(mut self, settings: Value) -> Self {
        self.browser_settings = settings;
        self
    }

    pub fn with_agent_type(mut self, agent_type: impl Into<String>) -> Self {
        self.agent_type = agent_type.into();
        self
    }
}

/// An instruction that passed local precondition checks.
///
/// Settings content is opaque; only its shape (a JSON object) is checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    text: String,
    agent_settings: Value,
    browser_settings: Value,
    agent_type: String,
}

impl Instruction {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn agent_settings(&self) -> &Value {
        &self.agent_settings
    }

    pub fn browser_settings(&self) -> &Value {
        &self.browser_settings
    }

    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }
}

impl TryFrom<AgentRequest> for Instruction {
    type Error = DispatchError;

    fn try_from(req: AgentRequest) -> Result<Self> {
        if req.instruction.trim().is_empty() {
            return Err(DispatchError::Configuration(
                "instruction must not be empty".to_string(),
            ));
        }
        if !req.agent_settings.is_object() {
            return Err(DispatchError::Configuration(
                "agent_settings must be a JSON object".to_string(),
            ));
        }
        if !req.browser_settings.is_object() {
            return Err(DispatchError::Configuration(
                "browser_settings must be a JSON object".to_string(),
            ));
        }
        let agent_type = if req.agent_type.trim().is_empty() {
            default_agent_type()
        } else {
            req.agent_type
        };

        Ok(Self {
            text: req.instruction,
            agent_settings: req.agent_settings,
            browser_settings: req.browser_settings,
            agent_type,
        })
    }
}

/// Status tag of a dispatch outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Started,
    ManualRequired,
    Error,
}

impl std::fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchStatus::Started => write!(f, "started"),
            DispatchStatus::ManualRequired => write!(f, "manual_required"),
            DispatchStatus::Error => write!(f, "error"),
        }
    }
}

/// Execution state a caller can expect right after a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// A backend accepted the instruction and is running it
    Processing,
    /// Nothing runs until an operator pastes the instruction into the web-ui
    ManualRequired,
}

impl DispatchStatus {
    /// `None` for errors, where nothing is executing
    pub fn execution_status(self) -> Option<ExecutionStatus> {
        match self {
            DispatchStatus::Started => Some(ExecutionStatus::Processing),
            DispatchStatus::ManualRequired => Some(ExecutionStatus::ManualRequired),
            DispatchStatus::Error => None,
        }
    }
}

/// Reachability of the web-ui backend as seen by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebUiStatus {
    Connected,
    Error,
}

/// Record of one strategy that was tried during a dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub strategy: String,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Final result of a single dispatch call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub task_id: String,
    pub status: DispatchStatus,
    pub message: String,
    pub instruction: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_status: Option<ExecutionStatus>,

    /// Name of the strategy that delivered the instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webui_status: Option<WebUiStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Where to poll the direct API for progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_url: Option<String>,

    /// Backend endpoint that accepted the instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Body returned by the backend that accepted the instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_response: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manual_steps: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webui_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<AttemptRecord>,
}

impl DispatchOutcome {
    pub fn new(task_id: impl Into<String>, status: DispatchStatus, instruction: &Instruction) -> Self {
        let message = match status {
            DispatchStatus::Started => {
                format!("Agent {} started successfully", instruction.agent_type())
            }
            DispatchStatus::ManualRequired => format!(
                "Agent {} requires manual execution in the web-ui",
                instruction.agent_type()
            ),
            DispatchStatus::Error => format!(
                "Agent {} could not be started: web-ui communication failed",
                instruction.agent_type()
            ),
        };
        Self {
            task_id: task_id.into(),
            status,
            message,
            instruction: instruction.text().to_string(),
            execution_status: status.execution_status(),
            strategy: None,
            webui_status: None,
            note: None,
            polling_url: None,
            endpoint: None,
            backend_response: None,
            manual_steps: Vec::new(),
            webui_url: None,
            error: None,
            attempts: Vec::new(),
        }
    }
}

fn unknown_status() -> String {
    "unknown".to_string()
}

/// Task progress as reported by the direct API server.
///
/// `error` is kept as raw JSON since backends report it as a string or an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default = "unknown_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl TaskStatus {
    pub fn error(task_id: &str, error: impl Into<String>) -> Self {
        Self {
            task_id: Some(task_id.to_string()),
            status: "error".to_string(),
            progress: None,
            result: None,
            error: Some(Value::String(error.into())),
        }
    }

    /// Whether the remote task reached a state it will not leave
    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "completed" | "error" | "failed" | "stopped")
    }
}

/// Reply to start/stop control requests that carry no dispatch details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentControlResponse {
    pub task_id: String,
    pub status: String,
    pub message: String,
}

/// Agent advertised by the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: String,
}

impl AgentInfo {
    /// Agents the web-ui backend knows how to run
    pub fn catalog() -> Vec<AgentInfo> {
        vec![
            AgentInfo {
                id: "browser_use".to_string(),
                name: "Browser Use Agent".to_string(),
                description: "Automate browser tasks with AI".to_string(),
                status: "available".to_string(),
            },
            AgentInfo {
                id: "deep_research".to_string(),
                name: "Deep Research Agent".to_string(),
                description: "Perform deep research tasks".to_string(),
                status: "available".to_string(),
            },
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCatalog {
    pub agents: Vec<AgentInfo>,
}

/// Availability of bridge capabilities reported by `/api/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAvailability {
    pub browser_automation: String,
    pub websocket: String,
    pub file_upload: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiStatus {
    pub status: String,
    pub version: String,
    pub services: ServiceAvailability,
}

/// Result of probing one service for liveness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProbe {
    pub name: String,
    pub url: String,
    pub running: bool,
    pub detail: String,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}
