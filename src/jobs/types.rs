use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Display;
use uuid::Uuid;

use crate::generator::{ProgressFlag, ReportState};
use crate::i18n::Language;
use crate::render::ReportArtifact;

/// 作业的唯一标识：主题、语言、页数
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub topic: String,
    pub language: Language,
    pub pages: u32,
}

impl JobKey {
    pub fn new(topic: impl Into<String>, language: Language, pages: u32) -> Self {
        Self {
            topic: topic.into(),
            language,
            pages,
        }
    }

    /// 解析 `topic||language||pages` 形式的键
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.rsplitn(3, "||");
        let pages = parts.next()?.trim().parse().ok()?;
        let language = parts.next()?.parse().ok()?;
        let topic = parts.next()?;
        Some(Self::new(topic, language, pages))
    }
}

impl Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}||{}||{}", self.topic, self.language, self.pages)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// 四个只增不减的进度标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProgressFlags {
    pub topic_analysis: bool,
    pub data_gathering: bool,
    pub drafting_report: bool,
    pub finalizing: bool,
}

impl ProgressFlags {
    pub fn set(&mut self, flag: ProgressFlag) {
        match flag {
            ProgressFlag::TopicAnalysis => self.topic_analysis = true,
            ProgressFlag::DataGathering => self.data_gathering = true,
            ProgressFlag::DraftingReport => self.drafting_report = true,
            ProgressFlag::Finalizing => self.finalizing = true,
        }
    }

    pub fn all_set(&self) -> bool {
        self.topic_analysis && self.data_gathering && self.drafting_report && self.finalizing
    }
}

/// 进程内保存的作业记录
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub key: JobKey,
    pub run_id: Uuid,
    pub status: JobStatus,
    pub flags: ProgressFlags,
    pub state: ReportState,
    pub error: Option<String>,
    pub artifact: Option<ReportArtifact>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// 新登记的作业，排队期间即视为进行中
    pub fn in_progress(key: JobKey) -> Self {
        let state = ReportState::new(key.topic.clone(), key.language, key.pages);
        Self {
            key,
            run_id: Uuid::new_v4(),
            status: JobStatus::InProgress,
            flags: ProgressFlags::default(),
            state,
            error: None,
            artifact: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn progress(&self) -> ProgressReport {
        ProgressReport {
            status: self.status,
            flags: self.flags,
            error: self.error.clone(),
        }
    }
}

/// 作业进度的只读快照
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressReport {
    pub status: JobStatus,
    pub flags: ProgressFlags,
    pub error: Option<String>,
}

/// 提交作业的结果
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Started(JobKey),
    AlreadyInProgress(JobKey),
    AlreadyCompleted(JobKey, ReportArtifact),
}

impl SubmitOutcome {
    pub fn key(&self) -> &JobKey {
        match self {
            SubmitOutcome::Started(key)
            | SubmitOutcome::AlreadyInProgress(key)
            | SubmitOutcome::AlreadyCompleted(key, _) => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trips_through_display() {
        let key = JobKey::new("AI || ethics", Language::Hindi, 4);
        assert_eq!(key.to_string(), "AI || ethics||Hindi||4");
        assert_eq!(JobKey::parse(&key.to_string()), Some(key));
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        assert_eq!(JobKey::parse("solar||Klingon||3"), None);
        assert_eq!(JobKey::parse("solar||English||many"), None);
        assert_eq!(JobKey::parse("solar"), None);
    }

    #[test]
    fn test_flags_are_monotonic() {
        let mut flags = ProgressFlags::default();
        flags.set(ProgressFlag::DataGathering);
        flags.set(ProgressFlag::TopicAnalysis);
        flags.set(ProgressFlag::DataGathering);

        assert!(flags.topic_analysis && flags.data_gathering);
        assert!(!flags.drafting_report && !flags.all_set());
    }

    #[test]
    fn test_flags_wire_names() {
        let json = serde_json::to_value(ProgressFlags::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "topicAnalysis": false,
                "dataGathering": false,
                "draftingReport": false,
                "finalizing": false
            })
        );
    }
}
