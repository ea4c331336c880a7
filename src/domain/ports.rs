use crate::domain::model::{FormPayload, StudentRecord, SubmitResponse};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 表單送出的傳輸層。回傳解碼後的 JSON，不論 HTTP 狀態碼
#[async_trait]
pub trait SubmitTransport: Send + Sync {
    async fn submit(&self, payload: &FormPayload) -> Result<SubmitResponse>;
}

#[async_trait]
pub trait RosterSource: Send + Sync {
    async fn list_students(&self) -> Result<Vec<StudentRecord>>;
    async fn get_student(&self, nama: &str) -> Result<StudentRecord>;
    async fn api_info(&self) -> Result<serde_json::Value>;
}
