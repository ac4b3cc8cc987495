//! 进程级的作业与会话存储

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::chat::ChatSession;
use crate::config::StoreConfig;
use crate::jobs::{JobKey, JobRecord, JobStatus, ProgressReport};
use crate::render::ReportArtifact;

/// 作业表与会话表。进程重启后全部丢失。
#[derive(Default)]
pub struct Store {
    jobs: DashMap<JobKey, JobRecord>,
    sessions: DashMap<String, Arc<ChatSession>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// 作业表，登记作业时需要按键加锁
    pub fn jobs(&self) -> &DashMap<JobKey, JobRecord> {
        &self.jobs
    }

    pub fn job_progress(&self, key: &JobKey) -> Option<ProgressReport> {
        self.jobs.get(key).map(|record| record.progress())
    }

    pub fn job_artifact(&self, key: &JobKey) -> Option<ReportArtifact> {
        self.jobs
            .get(key)
            .filter(|record| record.status == JobStatus::Completed)
            .and_then(|record| record.artifact.clone())
    }

    /// 仅当记录仍属于 `run_id` 这次执行时才修改
    pub fn update_job<F>(&self, key: &JobKey, run_id: uuid::Uuid, update: F) -> bool
    where
        F: FnOnce(&mut JobRecord),
    {
        match self.jobs.get_mut(key) {
            Some(mut record) if record.run_id == run_id => {
                update(record.value_mut());
                true
            }
            _ => false,
        }
    }

    /// 主题相同的最近一次完成作业的工作语言文档
    pub fn canonical_document_for_topic(&self, topic: &str) -> Option<Bytes> {
        self.jobs
            .iter()
            .filter(|record| record.key.topic == topic && record.status == JobStatus::Completed)
            .filter_map(|record| {
                let artifact = record.artifact.as_ref()?;
                Some((record.completed_at, artifact.canonical_document.clone()))
            })
            .max_by_key(|(completed_at, _)| *completed_at)
            .map(|(_, document)| document)
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// 删除结束时间早于 `now - ttl` 的已结束作业，进行中的作业不受影响
    pub fn sweep_expired_jobs(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, record| {
            let finished_at = record.completed_at.unwrap_or(record.created_at);
            !(record.status.is_finished() && now - finished_at > ttl)
        });
        before.saturating_sub(self.jobs.len())
    }

    /// 保存会话，替换同名旧会话及其历史
    pub fn insert_session(&self, session: Arc<ChatSession>) {
        self.sessions.insert(session.id.clone(), session);
    }

    pub fn session(&self, session_id: &str) -> Option<Arc<ChatSession>> {
        self.sessions
            .get(session_id)
            .map(|session| session.value().clone())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// 配置了作业保留时长时，启动后台清理任务
pub fn spawn_sweeper(store: Arc<Store>, config: &StoreConfig) -> Option<JoinHandle<()>> {
    let ttl = config.job_ttl()?;
    let interval = Duration::from_secs(config.sweep_interval_seconds.max(1));

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = store.sweep_expired_jobs(ttl, Utc::now());
            if removed > 0 {
                tracing::info!(removed, remaining = store.job_count(), "清理过期作业");
            }
        }
    }))
}
