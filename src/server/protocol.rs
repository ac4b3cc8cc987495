//! HTTP 请求与响应结构，字段名与前端保持一致

use serde::{Deserialize, Serialize};

use crate::cache::CachePerformanceReport;
use crate::jobs::{JobStatus, ProgressFlags};

fn default_language() -> String {
    String::from("English")
}

fn default_pages() -> i64 {
    3
}

#[derive(Debug, Deserialize)]
pub struct GenerateReportRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_pages")]
    pub pages: i64,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GenerateReportResponse {
    Accepted {
        message: String,
        topic: String,
        cache_key: String,
    },
    Ready {
        pdf_base64: String,
        cache_key: String,
    },
}

#[derive(Debug, Serialize)]
pub struct ProgressBody {
    #[serde(flatten)]
    pub flags: ProgressFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub progress: ProgressBody,
    pub status: JobStatus,
    pub is_complete: bool,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub pdf_base64: String,
    pub report_text: String,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReportRequest {
    #[serde(default)]
    pub cache_key: String,
    pub report_text: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RewriteRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Serialize)]
pub struct RewriteResponse {
    pub rewritten_text: String,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ChatInitRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub pdf_base64: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub jobs: usize,
    pub sessions: usize,
    pub translation_cache: CachePerformanceReport,
}
