use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::generator::context::GeneratorContext;
use crate::generator::state::{ReportState, StageUpdate};
use crate::generator::types::{Stage, StageKind};
use crate::utils::text::truncate_chars;

/// 基于全部摘要写结论
#[derive(Default, Clone)]
pub struct ConclusionStage;

#[async_trait]
impl Stage for ConclusionStage {
    fn kind(&self) -> StageKind {
        StageKind::Conclusion
    }

    async fn execute(
        &self,
        context: &GeneratorContext,
        state: &ReportState,
    ) -> Result<StageUpdate> {
        let combined = state.summaries.join(" ");
        let prompt = format!(
            include_str!("prompts/conclusion.tpl"),
            topic = state.topic,
            context = truncate_chars(&combined, context.config.conclusion_context_chars)
        );

        let conclusion = context
            .complete(&prompt)
            .await
            .context("Failed to generate conclusion")?;

        Ok(StageUpdate::Conclusion(conclusion))
    }
}
