//! Agent commands

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;

use voxa_common::{AgentRequest, DispatchOutcome, DispatchStatus};

use crate::client::BridgeClient;
use crate::output::{print_info, print_list, print_outcome, print_success, OutputFormat};

#[derive(Args)]
pub struct StartArgs {
    /// Natural-language instruction for the agent
    pub instruction: String,

    /// Agent to run
    #[arg(long, default_value = "browser_use")]
    pub agent_type: String,

    /// JSON file with agent settings
    #[arg(long)]
    pub agent_settings: Option<PathBuf>,

    /// JSON file with browser settings
    #[arg(long)]
    pub browser_settings: Option<PathBuf>,
}

impl StartArgs {
    pub fn to_request(&self) -> Result<AgentRequest> {
        let mut request =
            AgentRequest::new(self.instruction.clone()).with_agent_type(self.agent_type.clone());
        if let Some(path) = &self.agent_settings {
            request = request.with_agent_settings(read_settings(path)?);
        }
        if let Some(path) = &self.browser_settings {
            request = request.with_browser_settings(read_settings(path)?);
        }
        Ok(request)
    }
}

fn read_settings(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    if !value.is_object() {
        bail!("{} must contain a JSON object", path.display());
    }
    Ok(value)
}

pub async fn start(
    args: StartArgs,
    client: &BridgeClient,
    format: OutputFormat,
) -> Result<DispatchOutcome> {
    let request = args.to_request()?;
    let outcome = client.start_agent(&request).await?;
    print_outcome(&outcome, format);

    if format == OutputFormat::Table && outcome.status == DispatchStatus::Started {
        print_info(&format!("Follow progress with: voxa task {} --watch", outcome.task_id));
    }
    Ok(outcome)
}

pub async fn stop(task_id: &str, client: &BridgeClient, format: OutputFormat) -> Result<()> {
    let resp = client.stop_agent(task_id).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resp)?),
        OutputFormat::Table => print_success(&format!("{} ({})", resp.message, resp.task_id)),
    }
    Ok(())
}

pub async fn agents(client: &BridgeClient, format: OutputFormat) -> Result<()> {
    let agents = client.agents().await?;
    print_list(&agents, format);
    Ok(())
}
