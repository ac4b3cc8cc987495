use anyhow::{Context, Result};
use std::time::Instant;

use crate::generator::context::GeneratorContext;
use crate::generator::stages::{
    AnalysisStage, AssemblyStage, ConclusionStage, IntroductionStage, PlanningStage,
    RetrievalStage, SummarizationStage,
};
use crate::generator::state::ReportState;
use crate::generator::types::{Stage, StageKind};

/// 按固定顺序串行执行的阶段链
pub struct ReportPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Default for ReportPipeline {
    fn default() -> Self {
        Self::new(vec![
            Box::new(IntroductionStage),
            Box::new(PlanningStage),
            Box::new(RetrievalStage),
            Box::new(SummarizationStage),
            Box::new(AnalysisStage),
            Box::new(ConclusionStage),
            Box::new(AssemblyStage),
        ])
    }
}

impl ReportPipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|stage| stage.kind()).collect()
    }

    /// 依次执行所有阶段，每个阶段完成后把最新状态交给 `on_stage_complete`。
    ///
    /// 任一阶段出错即停止，错误信息带上阶段名。
    pub async fn run<F>(
        &self,
        context: &GeneratorContext,
        mut state: ReportState,
        mut on_stage_complete: F,
    ) -> Result<ReportState>
    where
        F: FnMut(StageKind, &ReportState) + Send,
    {
        let started = Instant::now();

        for stage in &self.stages {
            let kind = stage.kind();
            let stage_started = Instant::now();
            tracing::info!(stage = %kind, topic = %state.topic, "阶段开始");

            let update = stage
                .execute(context, &state)
                .await
                .with_context(|| format!("{} stage failed", kind))?;
            state.apply(update);

            tracing::info!(
                stage = %kind,
                elapsed_ms = stage_started.elapsed().as_millis() as u64,
                "阶段完成"
            );
            on_stage_complete(kind, &state);
        }

        tracing::info!(
            topic = %state.topic,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "报告流水线执行完成"
        );
        Ok(state)
    }
}
