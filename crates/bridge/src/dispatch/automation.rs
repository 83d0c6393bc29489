//! UI-automation strategy: type the instruction into the web-ui page

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use voxa_common::{DispatchError, Instruction};

use super::{AttemptResult, Delivery, Strategy};

/// Something that can drive a browser, if it is installed
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the driver can run in this environment right now
    async fn is_available(&self) -> bool;

    /// Open `url` and wait until the page body is attached.
    ///
    /// On error no session is left running.
    async fn open(
        &self,
        url: &str,
        ready_timeout: Duration,
    ) -> Result<Box<dyn BrowserSession>, DispatchError>;
}

/// A live page. Callers must finish with [`BrowserSession::close`].
#[async_trait]
pub trait BrowserSession: Send {
    /// First selector that matches an element on the page, in list order
    async fn find_first(&mut self, selectors: &[String]) -> Result<Option<String>, DispatchError>;

    /// Clear the element, then enter `text`
    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), DispatchError>;

    async fn click(&mut self, selector: &str) -> Result<(), DispatchError>;

    async fn close(self: Box<Self>);
}

pub struct UiAutomationStrategy {
    driver: Arc<dyn BrowserDriver>,
    page_url: String,
    input_selectors: Vec<String>,
    submit_selectors: Vec<String>,
    ready_timeout: Duration,
}

impl UiAutomationStrategy {
    pub const NAME: &'static str = "ui_automation";

    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        page_url: &str,
        input_selectors: Vec<String>,
        submit_selectors: Vec<String>,
        ready_timeout: Duration,
    ) -> Self {
        Self {
            driver,
            page_url: page_url.to_string(),
            input_selectors,
            submit_selectors,
            ready_timeout,
        }
    }

    async fn submit(&self, session: &mut dyn BrowserSession, text: &str) -> Result<(), DispatchError> {
        let input = session
            .find_first(&self.input_selectors)
            .await?
            .ok_or_else(|| DispatchError::AutomationElementNotFound {
                role: "input".to_string(),
                selectors: self.input_selectors.clone(),
            })?;
        debug!(selector = %input, "found instruction input");
        session.fill(&input, text).await?;

        let submit = session
            .find_first(&self.submit_selectors)
            .await?
            .ok_or_else(|| DispatchError::AutomationElementNotFound {
                role: "submit".to_string(),
                selectors: self.submit_selectors.clone(),
            })?;
        debug!(selector = %submit, "found submit control");
        session.click(&submit).await
    }
}

#[async_trait]
impl Strategy for UiAutomationStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn attempt(&self, instruction: &Instruction) -> AttemptResult {
        if !self.driver.is_available().await {
            return AttemptResult::Failure(DispatchError::AutomationUnavailable(format!(
                "{} is not installed",
                self.driver.name()
            )));
        }

        let mut session = match self.driver.open(&self.page_url, self.ready_timeout).await {
            Ok(session) => session,
            Err(err) => return AttemptResult::Failure(err),
        };

        let result = self.submit(session.as_mut(), instruction.text()).await;
        session.close().await;

        match result {
            Ok(()) => AttemptResult::Success(
                Delivery::started("Instruction sent to web-ui backend via browser automation")
                    .with_endpoint(self.page_url.clone()),
                Self::NAME.to_string(),
            ),
            Err(err) => AttemptResult::Failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use voxa_common::AgentRequest;

    /// Records every call so tests can check the teardown path
    #[derive(Default)]
    struct Log {
        events: Mutex<Vec<String>>,
    }

    impl Log {
        fn push(&self, event: impl Into<String>) {
            self.events.lock().unwrap().push(event.into());
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    struct FakeDriver {
        available: bool,
        page: Vec<&'static str>,
        fail_click: bool,
        log: Arc<Log>,
    }

    struct FakeSession {
        page: Vec<&'static str>,
        fail_click: bool,
        log: Arc<Log>,
    }

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        fn name(&self) -> &str {
            "fake"
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn open(
            &self,
            url: &str,
            _ready_timeout: Duration,
        ) -> Result<Box<dyn BrowserSession>, DispatchError> {
            self.log.push(format!("open {}", url));
            Ok(Box::new(FakeSession {
                page: self.page.clone(),
                fail_click: self.fail_click,
                log: self.log.clone(),
            }))
        }
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn find_first(&mut self, selectors: &[String]) -> Result<Option<String>, DispatchError> {
            Ok(selectors
                .iter()
                .find(|s| self.page.iter().any(|p| *p == s.as_str()))
                .cloned())
        }

        async fn fill(&mut self, selector: &str, text: &str) -> Result<(), DispatchError> {
            self.log.push(format!("fill {} {}", selector, text));
            Ok(())
        }

        async fn click(&mut self, selector: &str) -> Result<(), DispatchError> {
            if self.fail_click {
                return Err(DispatchError::AutomationFailed("element detached".into()));
            }
            self.log.push(format!("click {}", selector));
            Ok(())
        }

        async fn close(self: Box<Self>) {
            self.log.push("close");
        }
    }

    fn strategy(driver: FakeDriver) -> UiAutomationStrategy {
        UiAutomationStrategy::new(
            Arc::new(driver),
            "http://localhost:7788",
            vec!["textarea".into(), "input[type='text']".into()],
            vec!["button[type='submit']".into(), ".gradio-button".into()],
            Duration::from_secs(1),
        )
    }

    fn instruction() -> Instruction {
        Instruction::try_from(AgentRequest::new("Open Gmail")).unwrap()
    }

    #[tokio::test]
    async fn test_unavailable_driver_never_opens() {
        let log = Arc::new(Log::default());
        let result = strategy(FakeDriver {
            available: false,
            page: vec!["textarea"],
            fail_click: false,
            log: log.clone(),
        })
        .attempt(&instruction())
        .await;

        assert!(matches!(
            result,
            AttemptResult::Failure(DispatchError::AutomationUnavailable(_))
        ));
        assert!(log.events().is_empty());
    }

    #[tokio::test]
    async fn test_first_matching_selectors_used() {
        let log = Arc::new(Log::default());
        let result = strategy(FakeDriver {
            available: true,
            page: vec!["input[type='text']", "textarea", ".gradio-button"],
            fail_click: false,
            log: log.clone(),
        })
        .attempt(&instruction())
        .await;

        assert!(matches!(result, AttemptResult::Success(_, ref name) if name == "ui_automation"));
        assert_eq!(
            log.events(),
            vec![
                "open http://localhost:7788",
                "fill textarea Open Gmail",
                "click .gradio-button",
                "close",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_input_closes_session() {
        let log = Arc::new(Log::default());
        let result = strategy(FakeDriver {
            available: true,
            page: vec![".gradio-button"],
            fail_click: false,
            log: log.clone(),
        })
        .attempt(&instruction())
        .await;

        match result {
            AttemptResult::Failure(DispatchError::AutomationElementNotFound { role, .. }) => {
                assert_eq!(role, "input")
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(log.events(), vec!["open http://localhost:7788", "close"]);
    }

    #[tokio::test]
    async fn test_missing_submit_closes_session() {
        let log = Arc::new(Log::default());
        let result = strategy(FakeDriver {
            available: true,
            page: vec!["textarea"],
            fail_click: false,
            log: log.clone(),
        })
        .attempt(&instruction())
        .await;

        match result {
            AttemptResult::Failure(DispatchError::AutomationElementNotFound { role, .. }) => {
                assert_eq!(role, "submit")
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(log.events().last().map(String::as_str), Some("close"));
    }

    #[tokio::test]
    async fn test_step_error_closes_session() {
        let log = Arc::new(Log::default());
        let result = strategy(FakeDriver {
            available: true,
            page: vec!["textarea", "button[type='submit']"],
            fail_click: true,
            log: log.clone(),
        })
        .attempt(&instruction())
        .await;

        assert_eq!(
            result,
            AttemptResult::Failure(DispatchError::AutomationFailed("element detached".into()))
        );
        assert_eq!(log.events().iter().filter(|e| *e == "close").count(), 1);
    }
}
