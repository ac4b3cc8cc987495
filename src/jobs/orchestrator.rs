use anyhow::{Result, anyhow};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use uuid::Uuid;

use super::executor::JobExecutor;
use super::types::{JobKey, JobRecord, JobStatus, ProgressReport, SubmitOutcome};
use crate::error::{ServiceError, ServiceResult};
use crate::generator::{GeneratorContext, ReportPipeline, ReportState, rewrite_segment};
use crate::i18n::Language;
use crate::render::ReportArtifact;
use crate::store::Store;

/// 报告作业的提交、查询与修订入口
pub struct JobOrchestrator {
    store: Arc<Store>,
    context: GeneratorContext,
    pipeline: Arc<ReportPipeline>,
    executor: JobExecutor,
}

impl JobOrchestrator {
    pub fn new(store: Arc<Store>, context: GeneratorContext, pipeline: ReportPipeline) -> Self {
        let executor = JobExecutor::new(context.config.max_concurrent_jobs);
        Self {
            store,
            context,
            pipeline: Arc::new(pipeline),
            executor,
        }
    }

    /// 校验提交参数并生成作业键
    pub fn validate(&self, topic: &str, language: &str, pages: i64) -> ServiceResult<JobKey> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ServiceError::validation("Topic is required"));
        }

        let language: Language = language.parse().map_err(ServiceError::Validation)?;

        let (min_pages, max_pages) = (self.context.config.min_pages, self.context.config.max_pages);
        let pages = u32::try_from(pages)
            .ok()
            .filter(|pages| (min_pages..=max_pages).contains(pages))
            .ok_or_else(|| {
                ServiceError::validation(format!(
                    "Number of pages must be between {} and {}",
                    min_pages, max_pages
                ))
            })?;

        Ok(JobKey::new(topic, language, pages))
    }

    /// 提交报告作业。同一键同时只会有一次执行，失败过的键会重新执行。
    pub fn submit(&self, topic: &str, language: &str, pages: i64) -> ServiceResult<SubmitOutcome> {
        let key = self.validate(topic, language, pages)?;

        // 检查与登记在同一个分片锁内完成
        let run_id = match self.store.jobs().entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let (status, artifact) = (entry.get().status, entry.get().artifact.clone());
                match (status, artifact) {
                    (JobStatus::InProgress, _) => {
                        tracing::debug!(key = %key, "作业已在执行中");
                        return Ok(SubmitOutcome::AlreadyInProgress(key));
                    }
                    (JobStatus::Completed, Some(artifact)) => {
                        tracing::debug!(key = %key, "命中已完成的作业");
                        return Ok(SubmitOutcome::AlreadyCompleted(key, artifact));
                    }
                    _ => {
                        let record = JobRecord::in_progress(key.clone());
                        let run_id = record.run_id;
                        entry.insert(record);
                        run_id
                    }
                }
            }
            Entry::Vacant(entry) => {
                let record = JobRecord::in_progress(key.clone());
                let run_id = record.run_id;
                entry.insert(record);
                run_id
            }
        };

        tracing::info!(key = %key, run_id = %run_id, "作业已登记");
        self.dispatch(key.clone(), run_id);
        Ok(SubmitOutcome::Started(key))
    }

    fn dispatch(&self, key: JobKey, run_id: Uuid) {
        let store = self.store.clone();
        let failure_store = self.store.clone();
        let failure_key = key.clone();
        let context = self.context.clone();
        let pipeline = self.pipeline.clone();

        self.executor.spawn(
            async move { run_job(store, context, pipeline, key, run_id).await },
            move |message| {
                tracing::error!(key = %failure_key, run_id = %run_id, error = %message, "作业失败");
                failure_store.update_job(&failure_key, run_id, |record| {
                    record.status = JobStatus::Failed;
                    record.error = Some(message);
                    record.completed_at = Some(Utc::now());
                });
            },
        );
    }

    /// 作业进度，未知的键返回未开始
    pub fn progress(&self, key: &JobKey) -> ProgressReport {
        self.store.job_progress(key).unwrap_or_default()
    }

    pub fn artifact(&self, key: &JobKey) -> ServiceResult<ReportArtifact> {
        self.store
            .job_artifact(key)
            .ok_or_else(|| ServiceError::not_found(format!("Report not found: {}", key)))
    }

    /// 用编辑后的纯文本重新渲染文档，工作语言文档保持不变
    pub async fn update_artifact(
        &self,
        key: &JobKey,
        plain_text: &str,
        language: Option<Language>,
    ) -> ServiceResult<ReportArtifact> {
        if plain_text.trim().is_empty() {
            return Err(ServiceError::validation("Report text is required"));
        }
        let current = self.artifact(key)?;
        let language = language.unwrap_or(key.language);

        let document = self
            .context
            .assembler
            .render_from_plain_text(plain_text, language)
            .await?;

        let updated = ReportArtifact {
            language,
            document,
            plain_text: plain_text.to_string(),
            canonical_document: current.canonical_document,
        };

        let mut record = self
            .store
            .jobs()
            .get_mut(key)
            .ok_or_else(|| ServiceError::not_found(format!("Report not found: {}", key)))?;
        record.artifact = Some(updated.clone());
        tracing::info!(key = %key, language = %language, "报告已按编辑内容更新");

        Ok(updated)
    }

    /// 改写报告中的一段文字
    pub async fn rewrite(&self, text: &str, language: Language) -> ServiceResult<String> {
        if text.trim().is_empty() {
            return Err(ServiceError::validation("Text is required"));
        }
        Ok(rewrite_segment(self.context.completion.as_ref(), text, language).await)
    }
}

async fn run_job(
    store: Arc<Store>,
    context: GeneratorContext,
    pipeline: Arc<ReportPipeline>,
    key: JobKey,
    run_id: Uuid,
) -> Result<()> {
    tracing::info!(key = %key, run_id = %run_id, "作业开始执行");
    let state = ReportState::new(key.topic.clone(), key.language, key.pages);

    let final_state = pipeline
        .run(&context, state, |kind, state| {
            store.update_job(&key, run_id, |record| {
                record.state = state.clone();
                record.flags.set(kind.progress_flag());
            });
        })
        .await?;

    let artifact = final_state
        .artifact
        .ok_or_else(|| anyhow!("assembly produced no document"))?;

    store.update_job(&key, run_id, |record| {
        record.status = JobStatus::Completed;
        record.artifact = Some(artifact);
        record.completed_at = Some(Utc::now());
    });
    tracing::info!(key = %key, run_id = %run_id, "作业完成");

    Ok(())
}
