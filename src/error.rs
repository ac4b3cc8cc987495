//! 服务边界上的错误分类

use thiserror::Error;

/// 对外暴露的错误类型。
///
/// 适配器内部的失败统一使用 `anyhow::Error`，并在调用点通过
/// [`crate::utils::fallback::with_fallback`] 就地降级，不会以这个类型出现。
/// 流水线失败记录在作业上，只通过进度查询暴露。
#[derive(Debug, Error)]
pub enum ServiceError {
    /// 请求参数不合法，作业不会被创建
    #[error("{0}")]
    Validation(String),

    /// 未知的作业键或会话 ID
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
