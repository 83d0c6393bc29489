//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use voxa_common::{AgentInfo, DispatchOutcome, DispatchStatus, ServiceProbe, TaskStatus};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for ServiceProbe {
    fn headers() -> Vec<&'static str> {
        vec!["Service", "URL", "State", "Detail"]
    }

    fn row(&self) -> Vec<String> {
        let state = if self.running {
            "up".green().to_string()
        } else {
            "down".red().to_string()
        };
        vec![self.name.clone(), self.url.clone(), state, self.detail.clone()]
    }
}

impl TableDisplay for AgentInfo {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Name", "Status", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.status.clone(),
            self.description.clone(),
        ]
    }
}

impl TableDisplay for TaskStatus {
    fn headers() -> Vec<&'static str> {
        vec!["Task", "Status", "Progress", "Error"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.task_id.clone().unwrap_or_else(|| "-".to_string()),
            self.status.clone(),
            self.progress.as_ref().map(value_text).unwrap_or_else(|| "-".to_string()),
            self.error.as_ref().map(value_text).unwrap_or_else(|| "-".to_string()),
        ]
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn table<T: TableDisplay>(items: &[T]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(T::headers());
    for item in items {
        table.add_row(item.row());
    }
    table
}

/// Print a single item
pub fn print_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => println!("{}", table(std::slice::from_ref(item))),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(item).unwrap_or_default());
        }
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table if items.is_empty() => println!("No items found."),
        OutputFormat::Table => println!("{}", table(items)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
    }
}

/// Print the result of a start request
pub fn print_outcome(outcome: &DispatchOutcome, format: OutputFormat) {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(outcome).unwrap_or_default());
        return;
    }

    match outcome.status {
        DispatchStatus::Started => print_success(&outcome.message),
        DispatchStatus::ManualRequired => print_warning(&outcome.message),
        DispatchStatus::Error => print_error(&outcome.message),
    }

    println!("  Task:      {}", outcome.task_id.bold());
    if let Some(strategy) = &outcome.strategy {
        println!("  Strategy:  {}", strategy);
    }
    if let Some(note) = &outcome.note {
        println!("  Note:      {}", note);
    }
    if let Some(url) = &outcome.polling_url {
        println!("  Polling:   {}", url);
    }
    if let Some(error) = &outcome.error {
        println!("  Error:     {}", error.red());
    }

    if !outcome.manual_steps.is_empty() {
        println!();
        for step in &outcome.manual_steps {
            println!("  {}", step);
        }
    }

    let failed: Vec<_> = outcome.attempts.iter().filter(|a| !a.succeeded).collect();
    if !failed.is_empty() {
        println!();
        println!("  {}", "Failed attempts:".dimmed());
        for attempt in failed {
            println!(
                "    {} {}",
                attempt.strategy,
                attempt.reason.as_deref().unwrap_or_default().dimmed()
            );
        }
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "!".yellow(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "i".blue(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_status_row() {
        let status = TaskStatus {
            task_id: Some("task_1".to_string()),
            status: "running".to_string(),
            progress: Some(json!("step 3 of 10")),
            result: None,
            error: None,
        };
        assert_eq!(status.row(), vec!["task_1", "running", "step 3 of 10", "-"]);

        let numeric = TaskStatus {
            progress: Some(json!(40)),
            ..status
        };
        assert_eq!(numeric.row()[2], "40");

        let failed = TaskStatus {
            status: "error".to_string(),
            error: Some(json!({"code": 500})),
            ..numeric
        };
        assert_eq!(failed.row()[3], r#"{"code":500}"#);
    }

    #[test]
    fn test_table_has_one_row_per_item() {
        let agents = AgentInfo::catalog();
        let rendered = table(&agents).to_string();
        assert!(rendered.contains("browser_use"));
        assert!(rendered.contains("deep_research"));
    }
}
