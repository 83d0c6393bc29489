//! Service status command

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use futures::future::join_all;

use voxa_common::{
    ServiceProbe, DEFAULT_FRONTEND_URL, DEFAULT_WEBUI_API_URL, DEFAULT_WEBUI_BASE_URL,
};

use crate::client::probe_service;
use crate::output::{print_list, print_success, print_warning, OutputFormat};

#[derive(Args)]
pub struct StatusArgs {
    /// Gradio web-ui backend URL
    #[arg(long, env = "VOXA_WEBUI_URL", default_value = DEFAULT_WEBUI_BASE_URL)]
    pub webui_url: String,

    /// Direct web-ui API server URL
    #[arg(long, env = "VOXA_WEBUI_API_URL", default_value = DEFAULT_WEBUI_API_URL)]
    pub webui_api_url: String,

    /// React frontend URL
    #[arg(long, env = "VOXA_FRONTEND_URL", default_value = DEFAULT_FRONTEND_URL)]
    pub frontend_url: String,

    /// Per-service probe timeout in seconds
    #[arg(long, default_value = "5")]
    pub timeout: u64,
}

/// The four services a working VOXA setup needs
pub fn known_services(args: &StatusArgs, bridge_url: &str) -> Vec<(&'static str, String)> {
    vec![
        ("Web-UI Backend", args.webui_url.clone()),
        ("Web-UI API Server", args.webui_api_url.clone()),
        ("Bridge Server", bridge_url.to_string()),
        ("React Frontend", args.frontend_url.clone()),
    ]
}

/// Probe every service; returns whether all of them are running
pub async fn execute(args: StatusArgs, bridge_url: &str, format: OutputFormat) -> Result<bool> {
    let client = reqwest::Client::new();
    let timeout = Duration::from_secs(args.timeout.max(1));

    let services = known_services(&args, bridge_url);
    let probes: Vec<ServiceProbe> = join_all(
        services
            .iter()
            .map(|(name, url)| probe_service(&client, name, url, timeout)),
    )
    .await;

    print_list(&probes, format);

    let running = probes.iter().filter(|p| p.running).count();
    let all_up = running == probes.len();
    if format == OutputFormat::Table {
        if all_up {
            print_success(&format!("All {} services are running", running));
        } else {
            print_warning(&format!(
                "{}/{} services running. Please start the missing ones first.",
                running,
                probes.len()
            ));
        }
    }

    Ok(all_up)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_services_order() {
        let args = StatusArgs {
            webui_url: DEFAULT_WEBUI_BASE_URL.to_string(),
            webui_api_url: DEFAULT_WEBUI_API_URL.to_string(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            timeout: 5,
        };
        let services = known_services(&args, "http://localhost:8001");
        let urls: Vec<_> = services.iter().map(|(_, url)| url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "http://localhost:7788",
                "http://localhost:7789",
                "http://localhost:8001",
                "http://localhost:5174"
            ]
        );
    }

    #[tokio::test]
    async fn test_execute_reports_down_services() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let closed = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let args = StatusArgs {
            webui_url: closed.clone(),
            webui_api_url: closed.clone(),
            frontend_url: closed.clone(),
            timeout: 1,
        };
        let all_up = execute(args, &closed, OutputFormat::Json).await.unwrap();
        assert!(!all_up);
    }
}
