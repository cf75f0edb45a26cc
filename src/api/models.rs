use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::store::{SummaryListItem, SummaryRecord};

#[derive(Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Serialize)]
pub struct ExtractResponse {
    pub text: String,
    pub url: String,
}

#[derive(Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub target_lang: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_text: String,
}

#[derive(Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub user_id: String,
    pub url: Option<String>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self { status: "success", message: None }
    }
}

#[derive(Deserialize)]
pub struct ListParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Serialize)]
pub struct ListResponse {
    pub summaries: Vec<SummaryListItem>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

#[derive(Serialize)]
pub struct RecordResponse {
    pub summary: SummaryRecord,
}

#[derive(Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Value,
}
