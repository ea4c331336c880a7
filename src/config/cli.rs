use crate::config::FormConfig;
use crate::core::controller::FormController;
use crate::domain::model::CUSTOM_YEAR;
use crate::domain::ports::SubmitTransport;
use crate::utils::error::Result;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "student-form")]
#[command(about = "Submit and look up student records against the student API")]
pub struct CliConfig {
    #[arg(long, help = "TOML configuration file; falls back to environment variables")]
    pub config: Option<String>,

    #[arg(long, help = "Override the API base URL")]
    pub api_endpoint: Option<String>,

    #[arg(long, help = "Override the API key")]
    pub api_key: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add or update one student record
    Submit(SubmitArgs),
    /// List every student
    List,
    /// Look up one student by name
    Get { nama: String },
    /// Show the API info document
    Info,
}

#[derive(Debug, Clone, Args)]
pub struct SubmitArgs {
    #[arg(long)]
    pub nama: String,

    #[arg(long)]
    pub jurusan: Option<String>,

    #[arg(long)]
    pub university: Option<String>,

    #[arg(long)]
    pub provinsi: Option<String>,

    /// One of the year options, or free text such as "FALL 2025"
    #[arg(long, default_value = "Freshman")]
    pub year: String,
}

impl CliConfig {
    /// 讀取配置檔或環境變數，再套用命令列覆寫
    pub fn load_form_config(&self) -> Result<FormConfig> {
        let mut config = match &self.config {
            Some(path) => FormConfig::from_file(path)?,
            None => FormConfig::from_env()?,
        };

        if let Some(endpoint) = &self.api_endpoint {
            config = config.with_endpoint(endpoint.clone());
        }
        if let Some(api_key) = &self.api_key {
            config = config.with_api_key(api_key.clone());
        }

        Ok(config)
    }
}

impl SubmitArgs {
    /// Fills the controller's form the way a user would type into it.
    pub fn fill<T: SubmitTransport>(&self, controller: &FormController<T>) -> Result<()> {
        controller.set_field("nama", &self.nama)?;
        if let Some(jurusan) = &self.jurusan {
            controller.set_field("jurusan", jurusan)?;
        }
        if let Some(university) = &self.university {
            controller.set_field("university", university)?;
        }
        if let Some(provinsi) = &self.provinsi {
            controller.set_field("provinsi", provinsi)?;
        }

        let is_option = controller
            .document()
            .year_select
            .options
            .iter()
            .any(|o| o == &self.year && o != CUSTOM_YEAR);

        if is_option {
            controller.select_year(&self.year)?;
        } else {
            controller.select_year(CUSTOM_YEAR)?;
            controller.input_year_override(&self.year);
        }

        Ok(())
    }
}
