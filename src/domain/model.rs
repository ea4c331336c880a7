use crate::utils::error::{FormError, Result};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

pub const CUSTOM_YEAR: &str = "custom";
pub const YEAR_FIELD: &str = "year";
pub const UNIVERSITY_FIELD: &str = "university";
pub const DEFAULT_UNIVERSITY: &str = "Western Michigan University";
pub const SUBMIT_LABEL: &str = "Submit";
pub const SUBMITTING_LABEL: &str = "Submitting...";
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
    pub default_value: String,
    pub required: bool,
}

impl FormField {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: String::new(),
            default_value: String::new(),
            required: false,
        }
    }

    pub fn with_default(mut self, default_value: &str) -> Self {
        self.default_value = default_value.to_string();
        self.value = default_value.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// 學年下拉選單。選到 `custom` 時改由自訂欄位提供 `year`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearSelect {
    pub value: String,
    pub default_value: String,
    pub options: Vec<String>,
}

impl YearSelect {
    pub fn new(options: &[&str], default_value: &str) -> Self {
        Self {
            value: default_value.to_string(),
            default_value: default_value.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    /// Returns false when `value` is not one of the options; the selection is left unchanged.
    pub fn select(&mut self, value: &str) -> bool {
        if !self.options.iter().any(|o| o == value) {
            return false;
        }
        self.value = value.to_string();
        true
    }

    pub fn is_custom(&self) -> bool {
        self.value == CUSTOM_YEAR
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearOverride {
    pub value: String,
    pub visible: bool,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageCategory {
    #[default]
    None,
    Success,
    Updated,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageRegion {
    pub visible: bool,
    pub category: MessageCategory,
    pub text: String,
}

impl MessageRegion {
    pub fn show(&mut self, category: MessageCategory, text: &str) {
        self.visible = true;
        self.category = category;
        self.text = text.to_string();
    }

    /// 只收起樣式，文字保留
    pub fn hide(&mut self) {
        self.visible = false;
        self.category = MessageCategory::None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitButton {
    pub disabled: bool,
    pub label: String,
}

impl Default for SubmitButton {
    fn default() -> Self {
        Self {
            disabled: false,
            label: SUBMIT_LABEL.to_string(),
        }
    }
}

/// In-memory stand-in for the HTML form and the elements around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDocument {
    pub fields: Vec<FormField>,
    pub year_select: YearSelect,
    pub year_override: YearOverride,
    pub message: MessageRegion,
    pub submit_button: SubmitButton,
}

impl FormDocument {
    pub fn new(fields: Vec<FormField>, year_select: YearSelect) -> Self {
        Self {
            fields,
            year_select,
            year_override: YearOverride::default(),
            message: MessageRegion::default(),
            submit_button: SubmitButton::default(),
        }
    }

    /// 學生資料表單：姓名、科系、學校、省份與學年
    pub fn student_form() -> Self {
        Self::student_form_with_university(DEFAULT_UNIVERSITY)
    }

    /// Same form with `university` defaulting to `university`, so `reset()` restores it.
    pub fn student_form_with_university(university: &str) -> Self {
        Self::new(
            vec![
                FormField::new("nama").required(),
                FormField::new("jurusan"),
                FormField::new(UNIVERSITY_FIELD).with_default(university),
                FormField::new("provinsi"),
            ],
            YearSelect::new(
                &["Freshman", "Sophomore", "Junior", "Senior", CUSTOM_YEAR],
                "Freshman",
            ),
        )
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.field(name).map(|f| f.value.as_str())
    }

    pub fn set_field(&mut self, name: &str, value: &str) -> Result<()> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| FormError::ValidationError {
                message: format!("Unknown form field: {}", name),
            })?;
        field.value = value.to_string();
        Ok(())
    }

    /// 回到預設值，等同瀏覽器的 `form.reset()`
    pub fn reset(&mut self) {
        for field in &mut self.fields {
            field.value = field.default_value.clone();
        }
        self.year_select.value = self.year_select.default_value.clone();
        self.year_override.value.clear();
    }

    /// Required-field enforcement only; returns the first offending field.
    pub fn check_validity(&self) -> Result<()> {
        if let Some(field) = self
            .fields
            .iter()
            .find(|f| f.required && f.value.trim().is_empty())
        {
            return Err(FormError::ValidationError {
                message: format!("Please fill out the '{}' field", field.name),
            });
        }

        if self.year_override.required && self.year_override.value.trim().is_empty() {
            return Err(FormError::ValidationError {
                message: format!("Please fill out the '{}' field", YEAR_FIELD),
            });
        }

        Ok(())
    }

    /// Named entries in document order, the override field last under `year`.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect();
        entries.push((YEAR_FIELD.to_string(), self.year_override.value.clone()));
        entries
    }
}

/// 送出的表單資料，保留欄位順序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    entries: Vec<(String, String)>,
}

impl FormPayload {
    pub fn from_entries(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replaces the first entry named `name` and drops any later duplicates, appending when absent.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.entries.iter().position(|(k, _)| k == name) {
            Some(index) => {
                self.entries[index].1 = value.to_string();
                let mut seen = 0usize;
                self.entries.retain(|(k, _)| {
                    if k != name {
                        return true;
                    }
                    seen += 1;
                    seen == 1
                });
            }
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    Added,
    Updated,
    Other(String),
}

impl SubmitStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "added" => SubmitStatus::Added,
            "updated" => SubmitStatus::Updated,
            other => SubmitStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idn: Option<i64>,
    pub nama: String,
    #[serde(default)]
    pub jurusan: Option<String>,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub provinsi: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<NaiveDateTime>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<NaiveDateTime>,
}

/// 後端時間戳記：有時區的 ISO 8601 取當地時間，舊資料則是沒有時區的 `isoformat()`
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok())
}

// Unparseable or non-string timestamps become `None` instead of failing the record.
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse_timestamp))
}

/// Only `status` and `message` are relied on; `data` is kept raw and read
/// through [`SubmitResponse::record`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl SubmitResponse {
    pub fn submit_status(&self) -> SubmitStatus {
        SubmitStatus::parse(&self.status)
    }

    /// 回傳的 `data` 不完整時只記錄警告，不影響表單流程
    pub fn record(&self) -> Option<StudentRecord> {
        let data = self.data.as_ref().filter(|v| !v.is_null())?;
        match serde_json::from_value(data.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Ignoring unreadable record in submit response: {}", e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub data: Vec<StudentRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudentLookupResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<StudentRecord>,
}

/// What the controller rendered for one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitOutcome {
    pub category: MessageCategory,
    pub message: String,
    pub record: Option<StudentRecord>,
}
