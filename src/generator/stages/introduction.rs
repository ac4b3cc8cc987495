use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::generator::context::GeneratorContext;
use crate::generator::state::{ReportState, StageUpdate};
use crate::generator::types::{Stage, StageKind};
use crate::utils::text::clean_heading;

/// 生成报告标题与引言
#[derive(Default, Clone)]
pub struct IntroductionStage;

#[async_trait]
impl Stage for IntroductionStage {
    fn kind(&self) -> StageKind {
        StageKind::Introduction
    }

    async fn execute(
        &self,
        context: &GeneratorContext,
        state: &ReportState,
    ) -> Result<StageUpdate> {
        let heading = derive_heading(context, &state.topic).await?;

        let introduction = context
            .complete(&format!(
                include_str!("prompts/introduction.tpl"),
                heading = heading
            ))
            .await
            .context("Failed to generate introduction")?;

        Ok(StageUpdate::Introduction {
            heading,
            introduction,
        })
    }
}

/// 为主题生成 2-3 个词的短标题，模型返回空内容时使用主题本身
pub(crate) async fn derive_heading(context: &GeneratorContext, topic: &str) -> Result<String> {
    let raw = context
        .complete(&format!(include_str!("prompts/heading.tpl"), topic = topic))
        .await
        .context("Failed to generate heading")?;

    let heading = clean_heading(raw.lines().next().unwrap_or_default());
    if heading.is_empty() {
        Ok(topic.trim().to_string())
    } else {
        Ok(heading)
    }
}
