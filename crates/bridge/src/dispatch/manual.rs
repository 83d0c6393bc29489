//! Manual fallback: tell the user how to run the instruction themselves

use async_trait::async_trait;

use voxa_common::Instruction;

use super::{AttemptResult, Delivery, Strategy};

/// Terminal strategy; never fails
pub struct ManualFallbackStrategy {
    webui_url: String,
}

impl ManualFallbackStrategy {
    pub const NAME: &'static str = "manual_fallback";

    pub fn new(webui_url: &str) -> Self {
        Self {
            webui_url: webui_url.to_string(),
        }
    }

    pub fn steps(&self, text: &str) -> Vec<String> {
        vec![
            format!("1. Open {} in your browser", self.webui_url),
            "2. Go to the 'Run Agent' tab".to_string(),
            format!("3. Enter: '{}'", text),
            "4. Click 'Start Agent' to execute".to_string(),
            "5. Watch the browser automation happen!".to_string(),
        ]
    }
}

#[async_trait]
impl Strategy for ManualFallbackStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn attempt(&self, instruction: &Instruction) -> AttemptResult {
        let text = instruction.text();
        let delivery = Delivery::manual(
            format!("Manual execution required: please execute '{}' in your web-ui", text),
            self.steps(text),
            &self.webui_url,
        );
        AttemptResult::Success(delivery, Self::NAME.to_string())
    }
}
