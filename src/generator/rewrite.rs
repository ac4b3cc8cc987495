use crate::i18n::Language;
use crate::llm::CompletionAdapter;
use crate::utils::text::{strip_rewrite_prefix, word_count};

/// 单词数不一致时的最大尝试次数
const MAX_ATTEMPTS: usize = 2;

/// 改写一段报告文本，尽量保持单词数不变。
///
/// 单词数仍不一致时返回最后一次结果；模型调用失败时返回原文。
pub async fn rewrite_segment(
    completion: &dyn CompletionAdapter,
    text: &str,
    language: Language,
) -> String {
    let expected = word_count(text);
    let prompt = format!(
        include_str!("stages/prompts/rewrite.tpl"),
        language = language,
        word_count = expected,
        text = text
    );

    let mut last_attempt = None;
    for attempt in 1..=MAX_ATTEMPTS {
        let rewritten = match completion.complete(&prompt).await {
            Ok(raw) => strip_rewrite_prefix(&raw),
            Err(err) => {
                tracing::warn!(attempt, error = %err, "改写失败");
                break;
            }
        };
        if rewritten.is_empty() {
            continue;
        }

        let actual = word_count(&rewritten);
        if actual == expected {
            return rewritten;
        }
        tracing::debug!(attempt, expected, actual, "改写结果单词数不一致");
        last_attempt = Some(rewritten);
    }

    last_attempt.unwrap_or_else(|| text.to_string())
}
