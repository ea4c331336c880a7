use anyhow::Result;
use httpmock::prelude::*;
use student_form::{FormConfig, FormController, FormError, MessageCategory};
use tempfile::TempDir;

/// 從 TOML 檔案建立控制器並送出一次
#[tokio::test]
async fn test_controller_from_config_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();

    std::env::set_var("CONFIG_TEST_FORM_API_KEY", "file-test-key");

    let config_content = format!(
        r#"
[api]
endpoint = "{}"
api_key = "${{CONFIG_TEST_FORM_API_KEY}}"
timeout_seconds = 10

[form]
default_university = "Western Michigan University"
message_timeout_seconds = 2
"#,
        server.base_url()
    );

    let config_path = temp_dir.path().join("form.toml");
    tokio::fs::write(&config_path, config_content).await?;

    let submit_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/submit")
            .header("x-api-key", "file-test-key");
        then.status(200).json_body(serde_json::json!({
            "status": "added",
            "message": "Successfully added new record for Yan Wenda"
        }));
    });

    let config = FormConfig::from_file(&config_path)?;
    let controller = FormController::connect(config)?;
    controller.set_field("nama", "Yan Wenda")?;

    let outcome = controller.submit().await?;

    submit_mock.assert();
    assert_eq!(outcome.category, MessageCategory::Success);

    std::env::remove_var("CONFIG_TEST_FORM_API_KEY");
    Ok(())
}

#[tokio::test]
async fn test_missing_key_refuses_to_connect() -> Result<()> {
    let config = FormConfig::from_toml_str(
        r#"
[api]
endpoint = "https://api.example.com"
"#,
    )?;

    let result = FormController::connect(config);

    assert!(matches!(result, Err(FormError::MissingConfigError { .. })));
    Ok(())
}

/// 設定的預設學校在第一張表單與重置後都一致
#[tokio::test]
async fn test_configured_university_applies_before_and_after_reset() -> Result<()> {
    let server = MockServer::start();

    let submit_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/submit")
            .body_contains("Kalamazoo College");
        then.status(200).json_body(serde_json::json!({
            "status": "added",
            "message": "Successfully added new record for Yan Wenda"
        }));
    });

    let config = FormConfig::from_toml_str(&format!(
        r#"
[api]
endpoint = "{}"
api_key = "key"

[form]
default_university = "Kalamazoo College"
"#,
        server.base_url()
    ))?;
    let controller = FormController::connect(config)?;
    assert_eq!(
        controller.document().field_value("university"),
        Some("Kalamazoo College")
    );

    controller.set_field("nama", "Yan Wenda")?;
    controller.submit().await?;

    submit_mock.assert();
    let doc = controller.document();
    assert_eq!(doc.field_value("nama"), Some(""));
    assert_eq!(doc.field_value("university"), Some("Kalamazoo College"));
    Ok(())
}
