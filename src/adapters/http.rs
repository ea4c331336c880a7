use crate::config::FormConfig;
use crate::domain::model::{
    FormPayload, RosterResponse, StudentLookupResponse, StudentRecord, SubmitResponse,
};
use crate::domain::ports::{RosterSource, SubmitTransport};
use crate::utils::error::{FormError, Result};
use crate::utils::validation::Validate;
use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use url::Url;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// reqwest 實作：multipart POST 送出表單，GET 讀取名冊
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    submit_path: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &FormConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        let endpoint = Url::parse(config.endpoint()).map_err(|e| FormError::InvalidConfigValueError {
            field: "api.endpoint".to_string(),
            value: config.endpoint().to_string(),
            reason: format!("Invalid URL format: {}", e),
        })?;

        Ok(Self {
            client: builder.build()?,
            endpoint,
            submit_path: config.submit_path().to_string(),
            api_key: config.api_key()?.to_string(),
        })
    }

    /// Appends path segments to the endpoint, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| FormError::ConfigError {
                message: format!("Endpoint cannot be a base URL: {}", self.endpoint),
            })?
            .pop_if_empty()
            .extend(segments.iter().filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn submit_url(&self) -> Result<Url> {
        let segments: Vec<&str> = self.submit_path.split('/').collect();
        self.url(&segments)
    }
}

#[async_trait]
impl SubmitTransport for HttpTransport {
    async fn submit(&self, payload: &FormPayload) -> Result<SubmitResponse> {
        let url = self.submit_url()?;

        let form = payload
            .entries()
            .iter()
            .fold(Form::new(), |form, (name, value)| {
                form.text(name.clone(), value.clone())
            });

        tracing::debug!("POST {} with {} fields", url, payload.len());
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .send()
            .await?;

        tracing::debug!("Submit response status: {}", response.status());

        // 後端錯誤時也回傳同樣格式的 JSON，所以不看狀態碼直接解碼
        let body: SubmitResponse = response.json().await?;
        Ok(body)
    }
}

#[async_trait]
impl RosterSource for HttpTransport {
    async fn list_students(&self) -> Result<Vec<StudentRecord>> {
        let url = self.url(&["students"])?;
        tracing::debug!("GET {}", url);

        let body: RosterResponse = self.client.get(url).send().await?.json().await?;

        if body.status != "success" {
            return Err(FormError::ApiRejected {
                status: body.status,
                message: body
                    .message
                    .unwrap_or_else(|| "Unable to retrieve students".to_string()),
            });
        }

        if let Some(count) = body.count {
            if count != body.data.len() {
                tracing::warn!(
                    "Roster count mismatch: server reported {}, received {}",
                    count,
                    body.data.len()
                );
            }
        }

        Ok(body.data)
    }

    async fn get_student(&self, nama: &str) -> Result<StudentRecord> {
        let url = self.url(&["students", nama])?;
        tracing::debug!("GET {}", url);

        let body: StudentLookupResponse = self.client.get(url).send().await?.json().await?;

        if body.status == "success" {
            if let Some(record) = body.data {
                return Ok(record);
            }
        }

        Err(FormError::ApiRejected {
            status: body.status,
            message: body
                .message
                .unwrap_or_else(|| "Student not found".to_string()),
        })
    }

    async fn api_info(&self) -> Result<serde_json::Value> {
        let url = self.url(&[])?;
        tracing::debug!("GET {}", url);

        let body: serde_json::Value = self.client.get(url).send().await?.json().await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(endpoint: &str, submit_path: &str) -> HttpTransport {
        let mut config = FormConfig::new(endpoint, "key");
        config.api.submit_path = submit_path.to_string();
        HttpTransport::new(&config).unwrap()
    }

    #[test]
    fn test_submit_url_joins_endpoint_and_path() {
        let t = transport("https://api.example.com/production", "/submit");
        assert_eq!(
            t.submit_url().unwrap().as_str(),
            "https://api.example.com/production/submit"
        );

        let t = transport("https://api.example.com/production/", "/api/submit");
        assert_eq!(
            t.submit_url().unwrap().as_str(),
            "https://api.example.com/production/api/submit"
        );
    }

    #[test]
    fn test_student_url_encodes_name() {
        let t = transport("https://api.example.com", "/submit");
        assert_eq!(
            t.url(&["students", "Victor Tabuni"]).unwrap().as_str(),
            "https://api.example.com/students/Victor%20Tabuni"
        );
    }

    #[test]
    fn test_new_rejects_missing_key() {
        let mut config = FormConfig::new("https://api.example.com", "key");
        config.api.api_key = None;
        assert!(matches!(
            HttpTransport::new(&config),
            Err(FormError::MissingConfigError { .. })
        ));
    }
}
