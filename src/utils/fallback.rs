use anyhow::Result;
use std::future::Future;

/// 执行一次可降级的适配器调用，失败时记录告警并返回声明好的兜底值
pub async fn with_fallback<T, Fut>(label: &str, operation: Fut, fallback: T) -> T
where
    Fut: Future<Output = Result<T>>,
{
    match operation.await {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(operation = label, error = %err, "调用失败，使用兜底结果");
            fallback
        }
    }
}

/// 与 [`with_fallback`] 相同，但兜底值依赖错误本身或需要延迟构造
pub async fn with_fallback_else<T, Fut, F>(label: &str, operation: Fut, fallback: F) -> T
where
    Fut: Future<Output = Result<T>>,
    F: FnOnce() -> T,
{
    match operation.await {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(operation = label, error = %err, "调用失败，使用兜底结果");
            fallback()
        }
    }
}
