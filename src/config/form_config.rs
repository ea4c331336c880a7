use crate::utils::error::{FormError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_API_URL: &str = "STUDENT_FORM_API_URL";
pub const ENV_API_KEY: &str = "STUDENT_FORM_API_KEY";

const DEFAULT_SUBMIT_PATH: &str = "/submit";
const DEFAULT_MESSAGE_TIMEOUT_SECONDS: u64 = 5;

#[derive(Clone, Serialize, Deserialize)]
pub struct FormConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub form: FormSettings,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    #[serde(default = "default_submit_path")]
    pub submit_path: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSettings {
    #[serde(default = "default_university")]
    pub default_university: String,
    #[serde(default = "default_message_timeout")]
    pub message_timeout_seconds: u64,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            default_university: default_university(),
            message_timeout_seconds: default_message_timeout(),
        }
    }
}

fn default_submit_path() -> String {
    DEFAULT_SUBMIT_PATH.to_string()
}

fn default_university() -> String {
    crate::domain::model::DEFAULT_UNIVERSITY.to_string()
}

fn default_message_timeout() -> u64 {
    DEFAULT_MESSAGE_TIMEOUT_SECONDS
}

// 金鑰不進日誌
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("submit_path", &self.submit_path)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl std::fmt::Debug for FormConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormConfig")
            .field("api", &self.api)
            .field("form", &self.form)
            .finish()
    }
}

impl FormConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                endpoint: endpoint.into(),
                api_key: Some(api_key.into()),
                submit_path: default_submit_path(),
                timeout_seconds: None,
            },
            form: FormSettings::default(),
        }
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FormError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| FormError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 只用環境變數組出配置
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var(ENV_API_URL).map_err(|_| FormError::MissingConfigError {
            field: ENV_API_URL.to_string(),
        })?;
        let api_key = std::env::var(ENV_API_KEY).ok();

        Ok(Self {
            api: ApiConfig {
                endpoint,
                api_key,
                submit_path: default_submit_path(),
                timeout_seconds: None,
            },
            form: FormSettings::default(),
        })
    }

    /// 替換環境變數 (例如 ${STUDENT_FORM_API_KEY})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| FormError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("api.endpoint", &self.api.endpoint)?;
        let api_key = validation::validate_required_field("api.api_key", &self.api.api_key)?;
        validation::validate_secret("api.api_key", api_key)?;
        validation::validate_non_empty_string("api.submit_path", &self.api.submit_path)?;

        if let Some(timeout) = self.api.timeout_seconds {
            validation::validate_range("api.timeout_seconds", timeout, 1, 300)?;
        }

        validation::validate_range(
            "form.message_timeout_seconds",
            self.form.message_timeout_seconds,
            1,
            600,
        )?;
        validation::validate_non_empty_string(
            "form.default_university",
            &self.form.default_university,
        )?;

        Ok(())
    }

    pub fn endpoint(&self) -> &str {
        &self.api.endpoint
    }

    pub fn api_key(&self) -> Result<&str> {
        validation::validate_required_field("api.api_key", &self.api.api_key).map(|k| k.as_str())
    }

    pub fn submit_path(&self) -> &str {
        &self.api.submit_path
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.api.timeout_seconds.map(Duration::from_secs)
    }

    pub fn message_timeout(&self) -> Duration {
        Duration::from_secs(self.form.message_timeout_seconds)
    }

    pub fn default_university(&self) -> &str {
        &self.form.default_university
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api.endpoint = endpoint.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api.api_key = Some(api_key.into());
        self
    }
}

impl Validate for FormConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
