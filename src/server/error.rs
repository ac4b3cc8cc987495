use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::ServiceError;

/// 所有错误响应的统一结构
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// HTTP 层错误，按 [`ServiceError`] 映射状态码
#[derive(Debug)]
pub struct ApiError(ServiceError);

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(ServiceError::validation(message))
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            ServiceError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: message.clone(),
                    trace: None,
                },
            ),
            ServiceError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: message.clone(),
                    trace: None,
                },
            ),
            ServiceError::Internal(err) => {
                tracing::error!(error = ?err, "内部错误");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: err.to_string(),
                        trace: Some(format!("{:?}", err)),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
