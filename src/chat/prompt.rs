use super::session::Exchange;
use crate::utils::text::truncate_chars;

/// 文档中找不到答案时模型应当给出的回复
pub const REFUSAL: &str = "Sorry, I cannot answer this question based on the provided context.";

pub const NO_CONTEXT: &str = "No context found.";

/// 模型返回空内容时的回答
pub const EMPTY_ANSWER: &str = "No relevant information found.";

/// 一次性回答与流式回答共用的收尾规则：去掉首尾空白，空回答替换为 [`EMPTY_ANSWER`]
pub fn normalize_answer(raw: &str) -> String {
    match raw.trim() {
        "" => EMPTY_ANSWER.to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// 检索到的片段拼成上下文
pub fn format_context(passages: &[String]) -> String {
    if passages.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        passages.join("\n\n")
    }
}

/// 最近几轮对话，回答截断到 `answer_chars` 个字符
pub fn format_history(history: &[Exchange], answer_chars: usize) -> String {
    if history.is_empty() {
        return String::new();
    }

    let exchanges = history
        .iter()
        .map(|exchange| {
            format!(
                "User: {}\nAssistant: {}",
                exchange.question,
                truncate_chars(&exchange.answer, answer_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("\nPrevious conversation:\n{}\n", exchanges)
}

pub fn build_answer_prompt(context: &str, history: &str, question: &str) -> String {
    format!(
        include_str!("prompts/answer.tpl"),
        refusal = REFUSAL,
        context = context,
        history = history,
        question = question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("  The answer.\n"), "The answer.");
        assert_eq!(normalize_answer(" \n "), EMPTY_ANSWER);
    }

    #[test]
    fn test_format_context() {
        assert_eq!(format_context(&[]), NO_CONTEXT);
        assert_eq!(
            format_context(&["a".to_string(), "b".to_string()]),
            "a\n\nb"
        );
    }

    #[test]
    fn test_format_history_truncates_answers() {
        let history = vec![
            Exchange::new("What is it?", "x".repeat(200)),
            Exchange::new("Why?", "Because."),
        ];

        let block = format_history(&history, 150);
        assert!(block.starts_with("\nPrevious conversation:\nUser: What is it?\nAssistant: "));
        assert!(block.contains(&format!("Assistant: {}\nUser: Why?", "x".repeat(150))));
        assert!(block.ends_with("Assistant: Because.\n"));
        assert_eq!(format_history(&[], 150), "");
    }

    #[test]
    fn test_prompt_contains_all_parts() {
        let prompt = build_answer_prompt("CTX", "HIST", "QUESTION");
        assert!(prompt.contains(REFUSAL));
        assert!(prompt.contains("### Context:\nCTX"));
        assert!(prompt.contains("### Conversation History:\nHIST"));
        assert!(prompt.contains("### User Question:\nQUESTION"));
        assert!(prompt.ends_with("### Answer (in English):"));
    }
}
