//! Task status command

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tracing::debug;

use voxa_common::TaskStatus;

use crate::client::BridgeClient;
use crate::output::{print_item, print_warning, OutputFormat};

#[derive(Args)]
pub struct TaskArgs {
    /// Task ID returned by `voxa start`
    pub task_id: String,

    /// Keep polling until the task completes or fails
    #[arg(short, long)]
    pub watch: bool,

    /// Seconds between polls
    #[arg(long, default_value = "3")]
    pub interval: u64,

    /// Maximum number of polls
    #[arg(long, default_value = "5")]
    pub attempts: u32,
}

/// Poll until the task is terminal or `attempts` polls have been made
pub async fn poll<F>(
    client: &BridgeClient,
    task_id: &str,
    interval: Duration,
    attempts: u32,
    mut on_update: F,
) -> Result<TaskStatus>
where
    F: FnMut(u32, &TaskStatus),
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        let status = client.task_status(task_id).await?;
        debug!(task_id, attempt, status = %status.status, "polled task");
        on_update(attempt, &status);

        if status.is_terminal() || attempt >= attempts {
            return Ok(status);
        }
        attempt += 1;
        tokio::time::sleep(interval).await;
    }
}

pub async fn execute(args: TaskArgs, client: &BridgeClient, format: OutputFormat) -> Result<()> {
    if !args.watch {
        let status = client.task_status(&args.task_id).await?;
        print_item(&status, format);
        return Ok(());
    }

    let last = poll(
        client,
        &args.task_id,
        Duration::from_secs(args.interval),
        args.attempts,
        |_, status| print_item(status, format),
    )
    .await?;

    if !last.is_terminal() && format == OutputFormat::Table {
        print_warning(&format!(
            "Task {} still {} after {} polls",
            args.task_id, last.status, args.attempts
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn status_server(terminal_after: usize) -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/api/task/:task_id/status",
            get(move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n >= terminal_after {
                        Json(json!({"status": "completed", "result": "done"}))
                    } else {
                        Json(json!({"status": "running", "progress": n * 10}))
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), calls)
    }

    #[tokio::test]
    async fn test_poll_stops_at_terminal_status() {
        let (url, calls) = status_server(3).await;
        let client = BridgeClient::new(&url).unwrap();

        let mut seen = Vec::new();
        let last = poll(&client, "task_1", Duration::from_millis(10), 10, |n, s| {
            seen.push((n, s.status.clone()))
        })
        .await
        .unwrap();

        assert_eq!(last.status, "completed");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], (1, "running".to_string()));
    }

    #[tokio::test]
    async fn test_poll_gives_up_after_attempts() {
        let (url, calls) = status_server(100).await;
        let client = BridgeClient::new(&url).unwrap();

        let last = poll(&client, "task_1", Duration::from_millis(10), 4, |_, _| {})
            .await
            .unwrap();

        assert_eq!(last.status, "running");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
