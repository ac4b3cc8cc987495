use anyhow::Result;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// 后台作业执行器，限制同时运行的作业数。
///
/// 超出上限的作业在信号量上排队；作业返回错误或 panic 时都会回调 `on_failure`，
/// 因此作业不会永远停留在进行中。
#[derive(Clone)]
pub struct JobExecutor {
    permits: Arc<Semaphore>,
}

impl JobExecutor {
    pub fn new(max_concurrent_jobs: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    pub fn spawn<Fut, F>(&self, job: Fut, on_failure: F)
    where
        Fut: Future<Output = Result<()>> + Send + 'static,
        F: FnOnce(String) + Send + 'static,
    {
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let handle = tokio::spawn(async move {
                let _permit = permits.acquire_owned().await?;
                job.await
            });

            let failure = match handle.await {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(format!("{:#}", err)),
                Err(join_error) if join_error.is_panic() => Some(format!(
                    "job panicked: {}",
                    panic_message(join_error.into_panic())
                )),
                Err(join_error) => Some(format!("job aborted: {}", join_error)),
            };

            if let Some(message) = failure {
                on_failure(message);
            }
        });
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("unknown panic")
    }
}
