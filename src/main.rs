use clap::Parser;
use student_form::config::cli::Command;
use student_form::domain::ports::RosterSource;
use student_form::utils::error::{ErrorSeverity, FormError};
use student_form::utils::logger::{self, LogFormat};
use student_form::{CliConfig, FormController, HttpTransport, MessageCategory};

fn exit_with(e: &FormError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 4,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let log_format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(log_format, cli.verbose);

    let config = match cli.load_form_config() {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    if cli.verbose {
        tracing::debug!("Form config: {:?}", config);
    }

    match &cli.command {
        Command::Submit(args) => {
            let controller = match FormController::connect(config) {
                Ok(controller) => controller,
                Err(e) => exit_with(&e),
            };
            if let Err(e) = args.fill(&controller) {
                exit_with(&e);
            }

            let outcome = match controller.submit().await {
                Ok(outcome) => outcome,
                Err(e) => exit_with(&e),
            };

            match outcome.category {
                MessageCategory::Success => println!("✅ {}", outcome.message),
                MessageCategory::Updated => println!("🔄 {}", outcome.message),
                _ => {
                    eprintln!("❌ {}", outcome.message);
                    std::process::exit(2);
                }
            }

            if let Some(record) = &outcome.record {
                println!("{}", serde_json::to_string_pretty(record)?);
            }
        }
        Command::List => {
            let transport = HttpTransport::new(&config).unwrap_or_else(|e| exit_with(&e));
            let students = transport
                .list_students()
                .await
                .unwrap_or_else(|e| exit_with(&e));

            println!("📋 {} students", students.len());
            for student in &students {
                println!(
                    "{:>5}  {:<32} {:<12} {}",
                    student.idn.map(|i| i.to_string()).unwrap_or_default(),
                    student.nama,
                    student.year.as_deref().unwrap_or("-"),
                    student.jurusan.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Get { nama } => {
            let transport = HttpTransport::new(&config).unwrap_or_else(|e| exit_with(&e));
            let student = transport
                .get_student(nama)
                .await
                .unwrap_or_else(|e| exit_with(&e));
            println!("{}", serde_json::to_string_pretty(&student)?);
        }
        Command::Info => {
            let transport = HttpTransport::new(&config).unwrap_or_else(|e| exit_with(&e));
            let info = transport.api_info().await.unwrap_or_else(|e| exit_with(&e));
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}
