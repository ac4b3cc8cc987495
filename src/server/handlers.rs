use axum::Json;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::StreamExt;
use std::convert::Infallible;

use super::error::{ApiError, ApiResult};
use super::protocol::*;
use crate::app::AppServices;
use crate::error::ServiceError;
use crate::i18n::Language;
use crate::jobs::{JobKey, JobStatus, SubmitOutcome};

/// 请求体无法解析时统一返回 400 和错误结构
fn payload<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn parse_language(raw: &str) -> ApiResult<Language> {
    raw.parse()
        .map_err(|message: String| ApiError::bad_request(message))
}

fn parse_key(raw: &str) -> ApiResult<JobKey> {
    JobKey::parse(raw)
        .ok_or_else(|| ServiceError::not_found(format!("Report not found: {}", raw)).into())
}

/// 响应头中的文件名只保留可打印 ASCII
fn attachment_name(topic: &str) -> String {
    topic
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub async fn generate_report(
    State(services): State<AppServices>,
    request: Result<Json<GenerateReportRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<GenerateReportResponse>)> {
    let request = payload(request)?;
    let outcome = services
        .jobs
        .submit(&request.topic, &request.language, request.pages)?;

    let cache_key = outcome.key().to_string();
    let topic = outcome.key().topic.clone();

    let response = match outcome {
        SubmitOutcome::Started(_) => (
            StatusCode::ACCEPTED,
            GenerateReportResponse::Accepted {
                message: String::from("Report generation started"),
                topic,
                cache_key,
            },
        ),
        SubmitOutcome::AlreadyInProgress(_) => (
            StatusCode::OK,
            GenerateReportResponse::Accepted {
                message: String::from("Report generation already in progress"),
                topic,
                cache_key,
            },
        ),
        SubmitOutcome::AlreadyCompleted(_, artifact) => (
            StatusCode::OK,
            GenerateReportResponse::Ready {
                pdf_base64: STANDARD.encode(&artifact.document),
                cache_key,
            },
        ),
    };

    Ok((response.0, Json(response.1)))
}

pub async fn progress(
    State(services): State<AppServices>,
    Path(raw_key): Path<String>,
) -> Json<ProgressResponse> {
    let report = JobKey::parse(&raw_key)
        .map(|key| services.jobs.progress(&key))
        .unwrap_or_default();

    Json(ProgressResponse {
        is_complete: report.status == JobStatus::Completed,
        status: report.status,
        progress: ProgressBody {
            flags: report.flags,
            error: report.error,
        },
    })
}

pub async fn report(
    State(services): State<AppServices>,
    Path(raw_key): Path<String>,
) -> ApiResult<Json<ReportResponse>> {
    let key = parse_key(&raw_key)?;
    let artifact = services.jobs.artifact(&key)?;

    Ok(Json(ReportResponse {
        pdf_base64: STANDARD.encode(&artifact.document),
        report_text: artifact.plain_text,
        status: "success",
    }))
}

pub async fn view_report(
    State(services): State<AppServices>,
    Path(raw_key): Path<String>,
) -> ApiResult<Response> {
    let key = parse_key(&raw_key)?;
    let artifact = services.jobs.artifact(&key)?;

    let headers = [
        (header::CONTENT_TYPE, String::from("application/pdf")),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}.pdf\"", attachment_name(&key.topic)),
        ),
    ];
    Ok((headers, artifact.document).into_response())
}

pub async fn update_report(
    State(services): State<AppServices>,
    request: Result<Json<UpdateReportRequest>, JsonRejection>,
) -> ApiResult<Json<ReportResponse>> {
    let request = payload(request)?;
    let report_text = match request.report_text {
        Some(text) if !request.cache_key.trim().is_empty() && !text.trim().is_empty() => text,
        _ => return Err(ApiError::bad_request("Missing cache_key or report_text")),
    };
    let language = request
        .language
        .as_deref()
        .map(parse_language)
        .transpose()?;

    let key = parse_key(&request.cache_key)?;
    let artifact = services
        .jobs
        .update_artifact(&key, &report_text, language)
        .await?;

    Ok(Json(ReportResponse {
        pdf_base64: STANDARD.encode(&artifact.document),
        report_text: artifact.plain_text,
        status: "success",
    }))
}

pub async fn rewrite(
    State(services): State<AppServices>,
    request: Result<Json<RewriteRequest>, JsonRejection>,
) -> ApiResult<Json<RewriteResponse>> {
    let request = payload(request)?;
    let language = parse_language(&request.language)?;
    let rewritten_text = services.jobs.rewrite(&request.text, language).await?;

    Ok(Json(RewriteResponse {
        rewritten_text,
        status: "success",
    }))
}

pub async fn chat_init(
    State(services): State<AppServices>,
    request: Result<Json<ChatInitRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let request = payload(request)?;
    if request.session_id.trim().is_empty() || request.pdf_base64.trim().is_empty() {
        return Err(ApiError::bad_request("Missing session_id or pdf_base64"));
    }

    let chunks = services
        .chat
        .initialize(&request.session_id, &request.pdf_base64)
        .await?;
    tracing::info!(session_id = %request.session_id, chunks, "问答会话已就绪");

    Ok(Json(MessageResponse {
        message: format!(
            "Chat session '{}' initialized successfully.",
            request.session_id
        ),
    }))
}

pub async fn chat_message(
    State(services): State<AppServices>,
    request: Result<Json<ChatMessageRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = payload(request)?;
    if request.session_id.trim().is_empty() || request.message.trim().is_empty() {
        return Err(ApiError::bad_request("Missing session_id or message"));
    }

    if request.stream {
        let stream = services
            .chat
            .ask_stream(&request.session_id, &request.message)
            .await?;
        let body = Body::from_stream(
            stream.map(|fragment| Ok::<_, Infallible>(fragment.into_text())),
        );
        return Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response());
    }

    let response = services
        .chat
        .ask(&request.session_id, &request.message)
        .await?;
    Ok(Json(ChatResponse { response }).into_response())
}

pub async fn health(State(services): State<AppServices>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        jobs: services.store.job_count(),
        sessions: services.store.session_count(),
        translation_cache: services.translation.cache_report(),
    })
}
