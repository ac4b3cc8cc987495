use anyhow::Result;
use async_trait::async_trait;

use crate::generator::context::GeneratorContext;
use crate::generator::state::{ReportState, StageUpdate};
use crate::generator::types::{Stage, StageKind};
use crate::utils::fallback::with_fallback_else;
use crate::utils::text::truncate_chars;
use crate::utils::threads::do_parallel_with_limit;

/// 把每个子主题的素材压缩为一段摘要
#[derive(Default, Clone)]
pub struct SummarizationStage;

#[async_trait]
impl Stage for SummarizationStage {
    fn kind(&self) -> StageKind {
        StageKind::Summarization
    }

    async fn execute(
        &self,
        context: &GeneratorContext,
        state: &ReportState,
    ) -> Result<StageUpdate> {
        let summary_futures: Vec<_> = state
            .subtopic_contents()
            .map(|(subtopic, content)| {
                let prompt = format!(
                    include_str!("prompts/summarization.tpl"),
                    subtopic = subtopic,
                    content = truncate_chars(content, context.config.summary_input_chars)
                );
                let fallback_chars = context.config.summary_fallback_chars;
                Box::pin(async move {
                    with_fallback_else("summarization", context.complete(&prompt), || {
                        format!("{}...", truncate_chars(content, fallback_chars))
                    })
                    .await
                })
            })
            .collect();
        let summaries = do_parallel_with_limit(summary_futures, context.config.max_parallels).await;

        Ok(StageUpdate::Summaries(summaries))
    }
}
