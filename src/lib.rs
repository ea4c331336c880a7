pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::http::HttpTransport;
pub use config::FormConfig;
pub use core::controller::FormController;
pub use domain::model::{FormDocument, MessageCategory, StudentRecord, SubmitOutcome};
pub use utils::error::{FormError, Result};
