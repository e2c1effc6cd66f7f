pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{HttpBackend, LocalStorage};
pub use app::ReviewSession;
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{ParameterForm, ReviewConfig};
pub use utils::error::{ReviewError, Result};
