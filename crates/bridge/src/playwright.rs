//! Playwright browser automation
//!
//! Playwright runs inside a Node.js child process hosting a small driver
//! script. Commands go to the child as JSON lines on stdin and each one gets
//! exactly one JSON line back on stdout:
//!
//! ```text
//! -> {"cmd":"open","url":"http://localhost:7788","timeout_ms":10000,...}
//! <- {"ok":true,"value":null}
//! -> {"cmd":"find_first","selectors":["textarea","input[type='text']"]}
//! <- {"ok":true,"value":"textarea"}
//! -> {"cmd":"click","selector":".gradio-button","timeout_ms":5000}
//! <- {"ok":false,"error":"Timeout 5000ms exceeded"}
//! ```

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, warn};

use voxa_common::DispatchError;

use crate::config::AutomationConfig;
use crate::dispatch::{BrowserDriver, BrowserSession};

const DRIVER_SCRIPT: &str = r#"
const readline = require('readline');
const playwright = require('playwright');

let browser = null;
let page = null;

function reply(obj) {
  process.stdout.write(JSON.stringify(obj) + '\n');
}

async function shutdown() {
  if (browser) {
    const b = browser;
    browser = null;
    try { await b.close(); } catch (_) {}
  }
  process.exit(0);
}

async function handle(msg) {
  switch (msg.cmd) {
    case 'open': {
      const launcher = playwright[msg.browser];
      if (!launcher) throw new Error('unknown browser: ' + msg.browser);
      const options = { headless: msg.headless };
      if (msg.browser === 'chromium') {
        options.args = ['--no-sandbox', '--disable-dev-shm-usage'];
      }
      browser = await launcher.launch(options);
      const context = await browser.newContext({
        viewport: { width: msg.width, height: msg.height }
      });
      page = await context.newPage();
      await page.goto(msg.url, { timeout: msg.timeout_ms });
      await page.waitForSelector('body', { state: 'attached', timeout: msg.timeout_ms });
      return null;
    }
    case 'find_first': {
      for (const selector of msg.selectors) {
        try {
          if (await page.$(selector)) return selector;
        } catch (_) {
          // Selector syntax the engine rejects counts as a miss.
        }
      }
      return null;
    }
    case 'fill':
      await page.fill(msg.selector, '', { timeout: msg.timeout_ms });
      await page.fill(msg.selector, msg.text, { timeout: msg.timeout_ms });
      return null;
    case 'click':
      await page.click(msg.selector, { timeout: msg.timeout_ms });
      return null;
    case 'close':
      return null;
    default:
      throw new Error('unknown command: ' + msg.cmd);
  }
}

const rl = readline.createInterface({ input: process.stdin });
let queue = Promise.resolve();

rl.on('line', (line) => {
  queue = queue.then(async () => {
    let msg;
    try {
      msg = JSON.parse(line);
    } catch (e) {
      reply({ ok: false, error: 'invalid command: ' + e.message });
      return;
    }
    try {
      reply({ ok: true, value: await handle(msg) });
    } catch (e) {
      reply({ ok: false, error: e.message });
    }
    if (msg.cmd === 'close') await shutdown();
  });
});

rl.on('close', () => {
  queue = queue.then(shutdown);
});
"#;

#[derive(Error, Debug)]
pub enum PlaywrightError {
    #[error("Node.js binary not found: {0}")]
    NodeNotFound(String),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    NotInstalled,

    #[error("Playwright command '{command}' failed: {reason}")]
    Command { command: String, reason: String },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Driver protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PlaywrightResult<T> = Result<T, PlaywrightError>;

impl From<PlaywrightError> for DispatchError {
    fn from(e: PlaywrightError) -> Self {
        match e {
            PlaywrightError::NodeNotFound(_) | PlaywrightError::NotInstalled => {
                DispatchError::AutomationUnavailable(e.to_string())
            }
            other => DispatchError::AutomationFailed(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub node_binary: PathBuf,
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Budget for every command after the page is open
    pub step_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            node_binary: PathBuf::from("node"),
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 1100,
            step_timeout: Duration::from_secs(5),
        }
    }
}

impl PlaywrightConfig {
    pub fn from_automation(cfg: &AutomationConfig, step_timeout: Duration) -> Self {
        Self {
            node_binary: PathBuf::from(&cfg.node_binary),
            browser: cfg.browser,
            headless: cfg.headless,
            step_timeout,
            ..Self::default()
        }
    }
}

/// Launches a Playwright session per delivery attempt
pub struct PlaywrightDriver {
    config: PlaywrightConfig,
}

impl PlaywrightDriver {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }

    /// Check that node runs and can resolve the playwright package
    async fn check_playwright_installed(&self) -> PlaywrightResult<()> {
        let status = TokioCommand::new(&self.config.node_binary)
            .args(["-e", "require.resolve('playwright')"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(self.config.step_timeout, status).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(_)) => Err(PlaywrightError::NotInstalled),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => Err(
                PlaywrightError::NodeNotFound(self.config.node_binary.display().to_string()),
            ),
            Ok(Err(e)) => Err(PlaywrightError::Io(e)),
            Err(_) => Err(PlaywrightError::Timeout("playwright availability check".into())),
        }
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    fn name(&self) -> &str {
        "playwright"
    }

    async fn is_available(&self) -> bool {
        match self.check_playwright_installed().await {
            Ok(()) => true,
            Err(e) => {
                debug!("Playwright unavailable: {}", e);
                false
            }
        }
    }

    async fn open(
        &self,
        url: &str,
        ready_timeout: Duration,
    ) -> Result<Box<dyn BrowserSession>, DispatchError> {
        let mut session = PlaywrightSession::spawn(&self.config)?;

        let command = json!({
            "cmd": "open",
            "url": url,
            "browser": self.config.browser.as_str(),
            "headless": self.config.headless,
            "width": self.config.viewport_width,
            "height": self.config.viewport_height,
            "timeout_ms": ready_timeout.as_millis() as u64,
        });

        // Launch time is charged to the step budget, page readiness to ready_timeout.
        if let Err(e) = session.request(command, ready_timeout + self.config.step_timeout).await {
            session.shutdown().await;
            return Err(e.into());
        }

        debug!("Playwright page open: {}", url);
        Ok(Box::new(session))
    }
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

/// One Node.js child process with one open page
pub struct PlaywrightSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    step_timeout: Duration,
    // Keeps the driver script on disk until the session ends.
    _script_dir: tempfile::TempDir,
}

impl PlaywrightSession {
    fn spawn(config: &PlaywrightConfig) -> PlaywrightResult<Self> {
        let script_dir = tempfile::Builder::new().prefix("voxa-playwright").tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_SCRIPT)?;

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    PlaywrightError::NodeNotFound(config.node_binary.display().to_string())
                }
                _ => PlaywrightError::Io(e),
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PlaywrightError::Protocol("driver stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PlaywrightError::Protocol("driver stdout unavailable".into()))?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            step_timeout: config.step_timeout,
            _script_dir: script_dir,
        })
    }

    async fn request(&mut self, command: Value, timeout: Duration) -> PlaywrightResult<Value> {
        let name = command["cmd"].as_str().unwrap_or("unknown").to_string();

        let mut line = serde_json::to_string(&command)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let reply = tokio::time::timeout(timeout, self.stdout.next_line())
            .await
            .map_err(|_| PlaywrightError::Timeout(name.clone()))??
            .ok_or_else(|| PlaywrightError::Protocol(format!("driver exited during '{}'", name)))?;

        let reply: DriverReply = serde_json::from_str(&reply)?;
        if reply.ok {
            Ok(reply.value)
        } else {
            Err(PlaywrightError::Command {
                command: name,
                reason: reply.error.unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }

    /// Step budget plus a second of slack for the reply to arrive
    fn reply_timeout(&self) -> Duration {
        self.step_timeout + Duration::from_secs(1)
    }

    fn step_timeout_ms(&self) -> u64 {
        self.step_timeout.as_millis() as u64
    }

    /// Close the browser and reap the child, killing it if it lingers
    async fn shutdown(self) {
        let PlaywrightSession {
            mut child,
            mut stdin,
            step_timeout,
            ..
        } = self;

        let _ = stdin.write_all(b"{\"cmd\":\"close\"}\n").await;
        let _ = stdin.flush().await;
        drop(stdin);

        match tokio::time::timeout(step_timeout, child.wait()).await {
            Ok(Ok(status)) => debug!("Playwright driver exited: {}", status),
            Ok(Err(e)) => warn!("Failed to reap Playwright driver: {}", e),
            Err(_) => {
                warn!("Playwright driver did not exit in {:?}, killing it", step_timeout);
                let _ = child.kill().await;
            }
        }
    }
}

#[async_trait]
impl BrowserSession for PlaywrightSession {
    async fn find_first(&mut self, selectors: &[String]) -> Result<Option<String>, DispatchError> {
        let timeout = self.reply_timeout();
        let value = self
            .request(json!({"cmd": "find_first", "selectors": selectors}), timeout)
            .await?;
        Ok(value.as_str().map(String::from))
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), DispatchError> {
        // Two page.fill calls run on the node side, so allow two step budgets.
        let timeout = self.reply_timeout() + self.step_timeout;
        let command = json!({
            "cmd": "fill",
            "selector": selector,
            "text": text,
            "timeout_ms": self.step_timeout_ms(),
        });
        self.request(command, timeout).await?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), DispatchError> {
        let timeout = self.reply_timeout();
        let command = json!({
            "cmd": "click",
            "selector": selector,
            "timeout_ms": self.step_timeout_ms(),
        });
        self.request(command, timeout).await?;
        Ok(())
    }

    async fn close(self: Box<Self>) {
        (*self).shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_names_match_playwright_exports() {
        assert_eq!(Browser::Chromium.as_str(), "chromium");
        assert_eq!(Browser::Firefox.as_str(), "firefox");
        assert_eq!(Browser::Webkit.as_str(), "webkit");
        assert_eq!(serde_json::to_value(Browser::Webkit).unwrap(), "webkit");
    }

    #[test]
    fn test_missing_node_is_unavailable_not_failed() {
        let err: DispatchError =
            PlaywrightError::NodeNotFound("/nonexistent/node".into()).into();
        assert!(matches!(err, DispatchError::AutomationUnavailable(_)));

        let err: DispatchError = PlaywrightError::Timeout("click".into()).into();
        assert!(matches!(err, DispatchError::AutomationFailed(_)));
    }

    #[tokio::test]
    async fn test_driver_without_node_reports_unavailable() {
        let driver = PlaywrightDriver::new(PlaywrightConfig {
            node_binary: PathBuf::from("/nonexistent/voxa-test-node"),
            ..PlaywrightConfig::default()
        });

        assert!(!driver.is_available().await);
        let err = driver
            .open("http://127.0.0.1:1", Duration::from_secs(1))
            .await
            .err()
            .expect("open must fail without node");
        assert!(matches!(err, DispatchError::AutomationUnavailable(_)));
    }

    #[test]
    fn test_driver_script_handles_every_command() {
        for cmd in ["'open'", "'find_first'", "'fill'", "'click'", "'close'"] {
            assert!(DRIVER_SCRIPT.contains(&format!("case {}", cmd)), "missing {}", cmd);
        }
    }
}
