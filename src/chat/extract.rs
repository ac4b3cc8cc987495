use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::io::Write;

use crate::error::{ServiceError, ServiceResult};

/// 解码 Base64 文档，兼容 `data:application/pdf;base64,` 前缀
pub fn decode_document(encoded: &str) -> ServiceResult<Vec<u8>> {
    let payload = encoded
        .trim()
        .split_once(";base64,")
        .map(|(_, payload)| payload)
        .unwrap_or_else(|| encoded.trim());

    STANDARD
        .decode(payload)
        .map_err(|e| ServiceError::validation(format!("Invalid base64 document: {}", e)))
}

/// 在阻塞线程中提取 PDF 文本。临时文件在任何退出路径上都会被删除，
/// 解析器 panic 会转换为错误。
pub async fn extract_pdf_text(document: Vec<u8>) -> Result<String> {
    tokio::task::spawn_blocking(move || -> Result<String> {
        let mut file = tempfile::Builder::new()
            .prefix("reportsmith-")
            .suffix(".pdf")
            .tempfile()
            .context("Failed to create temporary file")?;
        file.write_all(&document)?;
        file.flush()?;

        pdf_extract::extract_text(file.path())
            .map_err(|e| anyhow!("Failed to extract PDF text: {}", e))
    })
    .await
    .map_err(|e| anyhow!("PDF extraction task failed: {}", e))?
}
