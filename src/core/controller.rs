use crate::adapters::http::HttpTransport;
use crate::config::FormConfig;
use crate::core::payload::build_payload;
use crate::core::year_toggle::{normalize_override_input, toggle_year_input};
use crate::domain::model::{
    FormDocument, MessageCategory, SubmitOutcome, SubmitResponse, SubmitStatus,
    GENERIC_ERROR_MESSAGE, SUBMITTING_LABEL, SUBMIT_LABEL, UNIVERSITY_FIELD,
};
use crate::domain::ports::SubmitTransport;
use crate::utils::error::{FormError, Result};
use crate::utils::validation::Validate;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

fn lock_document(document: &Mutex<FormDocument>) -> MutexGuard<'_, FormDocument> {
    document.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Hides the message only if no newer message was shown since `generation`.
///
/// Generations are bumped while the document lock is held, so the check and
/// the hide see the same message.
fn clear_message_if_current(
    document: &Mutex<FormDocument>,
    current: &AtomicU64,
    generation: u64,
) -> bool {
    let mut document = lock_document(document);
    if current.load(Ordering::SeqCst) != generation {
        return false;
    }
    document.message.hide();
    true
}

/// 不論成功、失敗或 panic，離開時都把送出按鈕還原
struct SubmitButtonGuard<'a> {
    document: &'a Mutex<FormDocument>,
}

impl Drop for SubmitButtonGuard<'_> {
    fn drop(&mut self) {
        let mut document = lock_document(self.document);
        document.submit_button.disabled = false;
        document.submit_button.label = SUBMIT_LABEL.to_string();
    }
}

/// Owns the form document, the year toggle and the submit lifecycle.
///
/// The document is shared with the deferred message-clear task; at most one
/// clear is pending at a time and showing a new message cancels the old one.
/// A clear that already woke up is still stopped by the message generation.
pub struct FormController<T: SubmitTransport> {
    config: FormConfig,
    document: Arc<Mutex<FormDocument>>,
    transport: T,
    clear_timer: Mutex<Option<JoinHandle<()>>>,
    message_generation: Arc<AtomicU64>,
}

impl FormController<HttpTransport> {
    /// 以標準學生表單與 HTTP 傳輸建立控制器
    pub fn connect(config: FormConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        let document = FormDocument::student_form_with_university(config.default_university());
        Self::new(config, document, transport)
    }
}

impl<T: SubmitTransport> FormController<T> {
    pub fn new(config: FormConfig, mut document: FormDocument, transport: T) -> Result<Self> {
        config.validate()?;
        toggle_year_input(&mut document);

        Ok(Self {
            config,
            document: Arc::new(Mutex::new(document)),
            transport,
            clear_timer: Mutex::new(None),
            message_generation: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Snapshot of the current document state.
    pub fn document(&self) -> FormDocument {
        lock_document(&self.document).clone()
    }

    pub fn set_field(&self, name: &str, value: &str) -> Result<()> {
        lock_document(&self.document).set_field(name, value)
    }

    /// 使用者改變學年下拉選單
    pub fn select_year(&self, value: &str) -> Result<()> {
        let mut document = lock_document(&self.document);
        if !document.year_select.select(value) {
            return Err(FormError::ValidationError {
                message: format!("'{}' is not a year option", value),
            });
        }
        toggle_year_input(&mut document);
        Ok(())
    }

    /// 自訂學年欄位的每次輸入都轉成大寫
    pub fn input_year_override(&self, text: &str) -> String {
        let normalized = normalize_override_input(text);
        lock_document(&self.document).year_override.value = normalized.clone();
        normalized
    }

    /// Runs one submission.
    ///
    /// Transport and decoding failures are rendered as the generic error
    /// message and reported through `Ok`; only a form that fails the
    /// required-field check returns `Err`, before anything is sent.
    pub async fn submit(&self) -> Result<SubmitOutcome> {
        let payload = {
            let mut document = lock_document(&self.document);
            document.check_validity()?;
            document.submit_button.disabled = true;
            document.submit_button.label = SUBMITTING_LABEL.to_string();
            build_payload(&document)
        };
        let _button = SubmitButtonGuard {
            document: &self.document,
        };

        tracing::info!(
            "Submitting record for '{}'",
            payload.get("nama").unwrap_or_default()
        );

        match self.transport.submit(&payload).await {
            Ok(response) => Ok(self.render_response(response)),
            Err(e) => {
                tracing::error!("❌ Submission failed: {}", e);
                Ok(self.render_failure())
            }
        }
    }

    fn render_response(&self, response: SubmitResponse) -> SubmitOutcome {
        let status = response.submit_status();
        let category = match &status {
            SubmitStatus::Added => MessageCategory::Success,
            SubmitStatus::Updated => MessageCategory::Updated,
            SubmitStatus::Other(other) => {
                tracing::warn!("Submission rejected ({}): {}", other, response.message);
                MessageCategory::Error
            }
        };

        let generation = {
            let mut document = lock_document(&self.document);
            document.message.show(category, &response.message);
            let generation = self.message_generation.fetch_add(1, Ordering::SeqCst) + 1;

            if status == SubmitStatus::Added {
                document.reset();
                if let Some(university) = document
                    .fields
                    .iter_mut()
                    .find(|f| f.name == UNIVERSITY_FIELD)
                {
                    university.value = self.config.default_university().to_string();
                }
                toggle_year_input(&mut document);
            }

            generation
        };

        if category != MessageCategory::Error {
            tracing::info!("✅ {}", response.message);
        }

        self.schedule_clear(generation);

        let record = response.record();
        SubmitOutcome {
            category,
            message: response.message,
            record,
        }
    }

    fn render_failure(&self) -> SubmitOutcome {
        self.cancel_pending_clear();
        {
            let mut document = lock_document(&self.document);
            document.message.show(MessageCategory::Error, GENERIC_ERROR_MESSAGE);
            self.message_generation.fetch_add(1, Ordering::SeqCst);
        }

        SubmitOutcome {
            category: MessageCategory::Error,
            message: GENERIC_ERROR_MESSAGE.to_string(),
            record: None,
        }
    }

    fn schedule_clear(&self, generation: u64) {
        let mut slot = self.clear_timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let document = Arc::clone(&self.document);
        let current = Arc::clone(&self.message_generation);
        let timeout = self.config.message_timeout();
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if clear_message_if_current(&document, &current, generation) {
                tracing::debug!("Message cleared after {:?}", timeout);
            }
        }));
    }

    /// 取消尚未觸發的訊息清除
    pub fn cancel_pending_clear(&self) {
        let mut slot = self.clear_timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.abort();
        }
    }
}

impl<T: SubmitTransport> Drop for FormController<T> {
    fn drop(&mut self) {
        self.cancel_pending_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{FormPayload, CUSTOM_YEAR, DEFAULT_UNIVERSITY};
    use async_trait::async_trait;
    use std::time::Duration;

    enum Reply {
        Json(serde_json::Value),
        Transport,
        Panic,
    }

    /// 依序回覆，用完後重複最後一個
    struct ScriptedTransport {
        replies: Vec<Reply>,
        seen: Mutex<Vec<FormPayload>>,
    }

    impl ScriptedTransport {
        fn new(reply: Reply) -> Self {
            Self::sequence(vec![reply])
        }

        fn sequence(replies: Vec<Reply>) -> Self {
            Self {
                replies,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SubmitTransport for ScriptedTransport {
        async fn submit(&self, payload: &FormPayload) -> Result<SubmitResponse> {
            let call = {
                let mut seen = self.seen.lock().unwrap();
                seen.push(payload.clone());
                seen.len() - 1
            };
            match &self.replies[call.min(self.replies.len() - 1)] {
                Reply::Json(value) => Ok(serde_json::from_value(value.clone())?),
                Reply::Transport => Err(FormError::IoError(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))),
                Reply::Panic => panic!("handler blew up"),
            }
        }
    }

    fn controller(reply: Reply) -> FormController<ScriptedTransport> {
        scripted_controller(ScriptedTransport::new(reply))
    }

    fn scripted_controller(transport: ScriptedTransport) -> FormController<ScriptedTransport> {
        let config = FormConfig::new("https://api.example.com", "test-key");
        let controller =
            FormController::new(config, FormDocument::student_form(), transport).unwrap();
        controller.set_field("nama", "Victor Tabuni").unwrap();
        controller
    }

    fn assert_button_restored(doc: &FormDocument) {
        assert!(!doc.submit_button.disabled);
        assert_eq!(doc.submit_button.label, SUBMIT_LABEL);
    }

    #[test]
    fn test_new_runs_toggle_and_rejects_missing_key() {
        let config = FormConfig::new("https://api.example.com", "key");
        let controller = FormController::new(
            config,
            FormDocument::student_form(),
            ScriptedTransport::new(Reply::Transport),
        )
        .unwrap();
        assert_eq!(controller.document().year_override.value, "Freshman");

        let mut config = FormConfig::new("https://api.example.com", "key");
        config.api.api_key = None;
        assert!(FormController::new(
            config,
            FormDocument::student_form(),
            ScriptedTransport::new(Reply::Transport),
        )
        .is_err());
    }

    #[test]
    fn test_select_year_toggles_override() {
        let controller = controller(Reply::Transport);

        controller.select_year(CUSTOM_YEAR).unwrap();
        let doc = controller.document();
        assert!(doc.year_override.visible);
        assert!(doc.year_override.required);
        assert_eq!(doc.year_override.value, "");

        assert_eq!(controller.input_year_override("fall 2025"), "FALL 2025");
        assert_eq!(controller.document().year_override.value, "FALL 2025");

        controller.select_year("Senior").unwrap();
        let doc = controller.document();
        assert!(!doc.year_override.visible);
        assert_eq!(doc.year_override.value, "Senior");

        assert!(controller.select_year("Graduate").is_err());
    }

    #[tokio::test]
    async fn test_added_resets_form_and_restores_university() {
        let controller = controller(Reply::Json(serde_json::json!({
            "status": "added",
            "message": "Created X"
        })));
        controller.set_field("university", "Somewhere Else").unwrap();
        controller.select_year("Junior").unwrap();

        let outcome = controller.submit().await.unwrap();

        assert_eq!(outcome.category, MessageCategory::Success);
        let doc = controller.document();
        assert!(doc.message.visible);
        assert_eq!(doc.message.category, MessageCategory::Success);
        assert_eq!(doc.message.text, "Created X");
        assert_eq!(doc.field_value("nama"), Some(""));
        assert_eq!(doc.field_value("university"), Some(DEFAULT_UNIVERSITY));
        assert_eq!(doc.year_select.value, "Freshman");
        assert_eq!(doc.year_override.value, "Freshman");
        assert_button_restored(&doc);

        let seen = controller.transport().seen.lock().unwrap();
        assert_eq!(seen[0].get("year"), Some("Junior"));
        assert_eq!(seen[0].get("university"), Some("Somewhere Else"));
    }

    #[tokio::test]
    async fn test_updated_keeps_form_values() {
        let controller = controller(Reply::Json(serde_json::json!({
            "status": "updated",
            "message": "Updated Y"
        })));
        controller.set_field("jurusan", "Computer Science").unwrap();

        let outcome = controller.submit().await.unwrap();

        assert_eq!(outcome.category, MessageCategory::Updated);
        let doc = controller.document();
        assert_eq!(doc.message.category, MessageCategory::Updated);
        assert_eq!(doc.message.text, "Updated Y");
        assert_eq!(doc.field_value("nama"), Some("Victor Tabuni"));
        assert_eq!(doc.field_value("jurusan"), Some("Computer Science"));
        assert_button_restored(&doc);
    }

    #[tokio::test]
    async fn test_unknown_status_is_rendered_as_error() {
        let controller = controller(Reply::Json(serde_json::json!({
            "status": "rejected",
            "message": "Bad input"
        })));

        let outcome = controller.submit().await.unwrap();

        assert_eq!(outcome.category, MessageCategory::Error);
        let doc = controller.document();
        assert_eq!(doc.message.category, MessageCategory::Error);
        assert_eq!(doc.message.text, "Bad input");
        assert_eq!(doc.field_value("nama"), Some("Victor Tabuni"));
        assert_button_restored(&doc);
    }

    #[tokio::test]
    async fn test_transport_failure_shows_generic_message() {
        let controller = controller(Reply::Transport);

        let outcome = controller.submit().await.unwrap();

        assert_eq!(outcome.message, GENERIC_ERROR_MESSAGE);
        let doc = controller.document();
        assert!(doc.message.visible);
        assert_eq!(doc.message.category, MessageCategory::Error);
        assert_eq!(doc.message.text, GENERIC_ERROR_MESSAGE);
        assert_button_restored(&doc);
    }

    #[tokio::test]
    async fn test_malformed_body_shows_generic_message() {
        let controller = controller(Reply::Json(serde_json::json!(["not", "an", "object"])));

        let outcome = controller.submit().await.unwrap();

        assert_eq!(outcome.category, MessageCategory::Error);
        assert_eq!(controller.document().message.text, GENERIC_ERROR_MESSAGE);
        assert_button_restored(&controller.document());
    }

    #[tokio::test]
    async fn test_button_restored_when_handler_panics() {
        let controller = Arc::new(controller(Reply::Panic));
        let task_controller = Arc::clone(&controller);

        let result = tokio::spawn(async move { task_controller.submit().await }).await;

        assert!(result.is_err());
        assert_button_restored(&controller.document());
    }

    #[tokio::test]
    async fn test_invalid_form_is_not_sent() {
        let controller = controller(Reply::Transport);
        controller.set_field("nama", "  ").unwrap();

        let result = controller.submit().await;

        assert!(matches!(result, Err(FormError::ValidationError { .. })));
        assert!(controller.transport().seen.lock().unwrap().is_empty());
        assert_button_restored(&controller.document());
    }

    #[tokio::test]
    async fn test_custom_year_without_value_is_not_sent() {
        let controller = controller(Reply::Transport);
        controller.select_year(CUSTOM_YEAR).unwrap();

        assert!(controller.submit().await.is_err());

        controller.input_year_override("spring 2026");
        controller.submit().await.unwrap();
        let seen = controller.transport().seen.lock().unwrap();
        assert_eq!(seen[0].get("year"), Some("SPRING 2026"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_cleared_after_timeout() {
        let controller = controller(Reply::Json(serde_json::json!({
            "status": "updated",
            "message": "Updated Y"
        })));

        controller.submit().await.unwrap();
        assert!(controller.document().message.visible);

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert!(controller.document().message.visible);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let doc = controller.document();
        assert!(!doc.message.visible);
        assert_eq!(doc.message.category, MessageCategory::None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_message_cancels_pending_clear() {
        let controller = controller(Reply::Json(serde_json::json!({
            "status": "updated",
            "message": "Updated Y"
        })));

        controller.submit().await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        controller.submit().await.unwrap();

        // 第一次的計時器原本會在第 5 秒觸發
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(controller.document().message.visible);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!controller.document().message.visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_cancels_pending_clear() {
        let controller = scripted_controller(ScriptedTransport::sequence(vec![
            Reply::Json(serde_json::json!({
                "status": "updated",
                "message": "Updated Y"
            })),
            Reply::Transport,
        ]));

        let first = controller.submit().await.unwrap();
        assert_eq!(first.category, MessageCategory::Updated);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let second = controller.submit().await.unwrap();
        assert_eq!(second.category, MessageCategory::Error);

        tokio::time::sleep(Duration::from_secs(10)).await;

        let doc = controller.document();
        assert!(doc.message.visible);
        assert_eq!(doc.message.category, MessageCategory::Error);
        assert_eq!(doc.message.text, GENERIC_ERROR_MESSAGE);
        assert_button_restored(&doc);
    }

    #[test]
    fn test_stale_clear_leaves_newer_message_visible() {
        let document = Mutex::new(FormDocument::student_form());
        let current = AtomicU64::new(1);
        lock_document(&document)
            .message
            .show(MessageCategory::Updated, "Updated Y");

        // 舊的清除任務已醒來，但之後又顯示了新訊息
        current.store(2, Ordering::SeqCst);
        assert!(!clear_message_if_current(&document, &current, 1));
        assert!(lock_document(&document).message.visible);

        assert!(clear_message_if_current(&document, &current, 2));
        let doc = lock_document(&document);
        assert!(!doc.message.visible);
        assert_eq!(doc.message.category, MessageCategory::None);
    }

    #[tokio::test]
    async fn test_added_with_partial_record_still_succeeds() {
        let controller = controller(Reply::Json(serde_json::json!({
            "status": "added",
            "message": "Created X",
            "data": { "idn": 7 }
        })));
        controller.set_field("jurusan", "Nursing").unwrap();

        let outcome = controller.submit().await.unwrap();

        assert_eq!(outcome.category, MessageCategory::Success);
        assert_eq!(outcome.message, "Created X");
        assert!(outcome.record.is_none());
        let doc = controller.document();
        assert_eq!(doc.message.category, MessageCategory::Success);
        assert_eq!(doc.message.text, "Created X");
        assert_eq!(doc.field_value("nama"), Some(""));
        assert_eq!(doc.field_value("jurusan"), Some(""));
        assert_eq!(doc.field_value("university"), Some(DEFAULT_UNIVERSITY));
        assert_button_restored(&doc);
    }

    #[tokio::test]
    async fn test_configured_university_used_before_and_after_reset() {
        let mut config = FormConfig::new("https://api.example.com", "test-key");
        config.form.default_university = "Kalamazoo College".to_string();
        let document =
            FormDocument::student_form_with_university(config.default_university());
        let controller = FormController::new(
            config,
            document,
            ScriptedTransport::new(Reply::Json(serde_json::json!({
                "status": "added",
                "message": "Created X"
            }))),
        )
        .unwrap();
        assert_eq!(
            controller.document().field_value("university"),
            Some("Kalamazoo College")
        );

        controller.set_field("nama", "Yan Wenda").unwrap();
        controller.set_field("university", "Elsewhere").unwrap();
        controller.submit().await.unwrap();

        assert_eq!(
            controller.document().field_value("university"),
            Some("Kalamazoo College")
        );
    }
}
