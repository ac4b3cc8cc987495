use anyhow::Result;
use async_trait::async_trait;
use chrono::Datelike;

use crate::generator::context::GeneratorContext;
use crate::generator::state::{ReportState, StageUpdate};
use crate::generator::types::{Stage, StageKind};
use crate::utils::fallback::with_fallback_else;
use crate::utils::text::truncate_chars;
use crate::utils::threads::do_parallel_with_limit;

/// 为每个子主题检索素材并写成段落
#[derive(Default, Clone)]
pub struct RetrievalStage;

/// 写作素材的来源
enum SourceContext {
    Web(String),
    Encyclopedia(String),
    None,
}

#[async_trait]
impl Stage for RetrievalStage {
    fn kind(&self) -> StageKind {
        StageKind::Retrieval
    }

    async fn execute(
        &self,
        context: &GeneratorContext,
        state: &ReportState,
    ) -> Result<StageUpdate> {
        let topic = state.topic.as_str();
        let year = chrono::Utc::now().year();

        let content_futures: Vec<_> = state
            .subtopics
            .iter()
            .map(|subtopic| Box::pin(research_subtopic(context, subtopic, topic, year)))
            .collect();
        let contents = do_parallel_with_limit(content_futures, context.config.max_parallels).await;

        Ok(StageUpdate::Contents(contents))
    }
}

async fn research_subtopic(
    context: &GeneratorContext,
    subtopic: &str,
    topic: &str,
    year: i32,
) -> String {
    let source = gather_source(context, subtopic, topic, year).await;

    let prompt = match &source {
        SourceContext::Web(web) => format!(
            include_str!("prompts/retrieval_web.tpl"),
            context = web,
            subtopic = subtopic,
            topic = topic
        ),
        SourceContext::Encyclopedia(encyclopedia) => format!(
            include_str!("prompts/retrieval_encyclopedia.tpl"),
            context = encyclopedia,
            subtopic = subtopic,
            topic = topic
        ),
        SourceContext::None => format!(
            include_str!("prompts/retrieval_plain.tpl"),
            subtopic = subtopic,
            topic = topic
        ),
    };

    with_fallback_else("retrieval", context.complete(&prompt), || {
        format!("Information about {} in the context of {}.", subtopic, topic)
    })
    .await
}

/// 优先使用实时 Web 结果，其次百科，都失败时不带素材
async fn gather_source(
    context: &GeneratorContext,
    subtopic: &str,
    topic: &str,
    year: i32,
) -> SourceContext {
    let web_query = format!("{} {} latest {}", subtopic, topic, year);
    match context.web_search(&web_query).await {
        Ok(results) => {
            return SourceContext::Web(
                truncate_chars(&results, context.config.web_context_chars).to_string(),
            );
        }
        Err(err) => {
            tracing::debug!(subtopic, error = %err, "Web 检索无结果，改用百科");
        }
    }

    let encyclopedia_query = format!("{} {}", subtopic, topic);
    match context.encyclopedia(&encyclopedia_query).await {
        Ok(results) => SourceContext::Encyclopedia(
            truncate_chars(&results, context.config.encyclopedia_context_chars).to_string(),
        ),
        Err(err) => {
            tracing::debug!(subtopic, error = %err, "百科检索无结果，直接写作");
            SourceContext::None
        }
    }
}
