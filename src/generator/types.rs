use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Display;

use crate::generator::context::GeneratorContext;
use crate::generator::state::{ReportState, StageUpdate};

/// 流水线中的一个阶段，只读取当前状态并返回部分更新
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn execute(&self, context: &GeneratorContext, state: &ReportState)
    -> Result<StageUpdate>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Introduction,
    Planning,
    Retrieval,
    Summarization,
    Analysis,
    Conclusion,
    Assembly,
}

/// 对外暴露的四个进度标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressFlag {
    TopicAnalysis,
    DataGathering,
    DraftingReport,
    Finalizing,
}

impl StageKind {
    pub const ORDER: [StageKind; 7] = [
        StageKind::Introduction,
        StageKind::Planning,
        StageKind::Retrieval,
        StageKind::Summarization,
        StageKind::Analysis,
        StageKind::Conclusion,
        StageKind::Assembly,
    ];

    /// 阶段完成后点亮的进度标记
    pub fn progress_flag(&self) -> ProgressFlag {
        match self {
            StageKind::Introduction | StageKind::Planning => ProgressFlag::TopicAnalysis,
            StageKind::Retrieval => ProgressFlag::DataGathering,
            StageKind::Summarization | StageKind::Analysis | StageKind::Conclusion => {
                ProgressFlag::DraftingReport
            }
            StageKind::Assembly => ProgressFlag::Finalizing,
        }
    }
}

impl Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StageKind::Introduction => "introduction",
            StageKind::Planning => "planning",
            StageKind::Retrieval => "retrieval",
            StageKind::Summarization => "summarization",
            StageKind::Analysis => "analysis",
            StageKind::Conclusion => "conclusion",
            StageKind::Assembly => "assembly",
        };
        write!(f, "{}", name)
    }
}
