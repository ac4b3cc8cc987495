use anyhow::Result;
use async_trait::async_trait;

use crate::generator::context::GeneratorContext;
use crate::generator::state::{ReportState, StageUpdate};
use crate::generator::types::{Stage, StageKind};
use crate::utils::fallback::with_fallback;
use crate::utils::text::normalize_insights;
use crate::utils::threads::do_parallel_with_limit;

const FALLBACK_INSIGHTS: &str = "- Insight 1\n- Insight 2\n- Insight 3";

/// 从每段摘要中提炼三条洞察
#[derive(Default, Clone)]
pub struct AnalysisStage;

#[async_trait]
impl Stage for AnalysisStage {
    fn kind(&self) -> StageKind {
        StageKind::Analysis
    }

    async fn execute(
        &self,
        context: &GeneratorContext,
        state: &ReportState,
    ) -> Result<StageUpdate> {
        let insight_futures: Vec<_> = state
            .subtopic_summaries()
            .map(|(_, summary)| {
                let prompt = format!(include_str!("prompts/analysis.tpl"), summary = summary);
                Box::pin(async move {
                    let raw = with_fallback(
                        "analysis",
                        context.complete(&prompt),
                        FALLBACK_INSIGHTS.to_string(),
                    )
                    .await;

                    match normalize_insights(&raw) {
                        normalized if normalized.is_empty() => FALLBACK_INSIGHTS.to_string(),
                        normalized => normalized,
                    }
                })
            })
            .collect();
        let insights = do_parallel_with_limit(insight_futures, context.config.max_parallels).await;

        Ok(StageUpdate::Insights(insights))
    }
}
