use anyhow::Result;
use async_trait::async_trait;

use super::introduction::derive_heading;
use crate::generator::context::GeneratorContext;
use crate::generator::state::{ReportState, StageUpdate};
use crate::generator::types::{Stage, StageKind};
use crate::utils::fallback::with_fallback;
use crate::utils::text::parse_bullet_lines;

/// 模型给出的子主题不足时依次补充的通用子主题
const GENERIC_SUBTOPICS: [&str; 10] = [
    "Overview of {topic}",
    "Key Aspects",
    "Future Outlook",
    "Current Challenges",
    "Recent Developments",
    "Practical Applications",
    "Economic Impact",
    "Social Impact",
    "Case Studies",
    "Further Perspectives",
];

/// 把主题拆分为与页数相同数量的子主题
#[derive(Default, Clone)]
pub struct PlanningStage;

#[async_trait]
impl Stage for PlanningStage {
    fn kind(&self) -> StageKind {
        StageKind::Planning
    }

    async fn execute(
        &self,
        context: &GeneratorContext,
        state: &ReportState,
    ) -> Result<StageUpdate> {
        let heading = derive_heading(context, &state.topic).await?;
        let pages = state.pages as usize;

        let raw = with_fallback(
            "planning",
            context.complete(&format!(
                include_str!("prompts/planning.tpl"),
                heading = heading,
                pages = pages
            )),
            String::new(),
        )
        .await;

        let subtopics = plan_subtopics(&raw, &state.topic, pages);
        tracing::debug!(topic = %state.topic, subtopics = ?subtopics, "子主题规划完成");

        Ok(StageUpdate::Plan { heading, subtopics })
    }
}

/// 规整模型返回的列表：去编号、去重、截断，并补足到 `pages` 个
pub fn plan_subtopics(raw: &str, topic: &str, pages: usize) -> Vec<String> {
    let mut subtopics: Vec<String> = Vec::with_capacity(pages);

    let candidates = parse_bullet_lines(raw).into_iter().chain(
        GENERIC_SUBTOPICS
            .iter()
            .map(|generic| generic.replace("{topic}", topic.trim())),
    );

    for candidate in candidates {
        if subtopics.len() >= pages {
            break;
        }
        if !subtopics
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(&candidate))
        {
            subtopics.push(candidate);
        }
    }

    subtopics
}
