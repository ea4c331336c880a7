#[cfg(feature = "cli")]
pub mod cli;
pub mod form_config;

pub use form_config::{ApiConfig, FormConfig, FormSettings, ENV_API_KEY, ENV_API_URL};
