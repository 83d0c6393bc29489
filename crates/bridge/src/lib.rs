//! VOXA Bridge
//!
//! HTTP bridge between the VOXA frontend and the browser-automation web-ui
//! backend. Start requests are handed to a fallback [`Dispatcher`] that tries
//! the direct API, guessed Gradio endpoints, Playwright-driven UI automation
//! and finally manual instructions, in that order.

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod playwright;
pub mod server;

pub use config::BridgeConfig;
pub use dispatch::{AttemptResult, Delivery, Dispatcher, Strategy};
pub use server::BridgeServer;
