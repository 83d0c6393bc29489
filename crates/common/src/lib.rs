//! VOXA Common Library
//!
//! Wire types shared by the bridge server and the operator CLI, plus the
//! error taxonomy used when delivering an instruction to the web-ui backend.

pub mod error;
pub mod types;

pub use error::{DispatchError, Result};
pub use types::*;

/// VOXA version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default address of the Gradio web-ui backend
pub const DEFAULT_WEBUI_BASE_URL: &str = "http://localhost:7788";

/// Default address of the direct web-ui API server
pub const DEFAULT_WEBUI_API_URL: &str = "http://localhost:7789";

/// Default address of the bridge server
pub const DEFAULT_BRIDGE_URL: &str = "http://localhost:8001";

/// Default address of the React frontend
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5174";
