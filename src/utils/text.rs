//! 模型输出的文本规整函数
//!
//! 模型返回的列表、前言、标题经常带有 Markdown 标记或编号，
//! 这里集中维护各类清洗规则，流水线阶段与渲染层都只调用这些函数。

use regex::Regex;
use std::sync::LazyLock;

/// 行首的列表符号、编号与空白，如 `- `、`• `、`3. `、`**`
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-•*\d.\s]+").expect("valid list marker pattern"));

/// "Here are 3 key insights ..." 之类的前言
static INSIGHT_PREAMBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)here\s+are.*insights.*").expect("valid preamble pattern"));

/// Markdown 强调、代码、引用与标题符号，以及不在单词内部的连字符
static MARKDOWN_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[*_`#>]+|(?:^|\s)-+|-+(?:\s|$)").expect("valid markdown pattern")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// 标题中的引号、星号、冒号、项目符号与连字符
static HEADING_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["“”'*:•#\-]+"#).expect("valid heading pattern"));

/// 改写结果常见的标签前缀
static REWRITE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(rewritten|output|result|here is your text)\s*:\s*")
        .expect("valid rewrite prefix pattern")
});

/// 去掉行首的列表符号与编号
pub fn strip_list_marker(line: &str) -> String {
    LIST_MARKER.replace(line, "").trim().to_string()
}

/// 将模型返回的多行列表拆成条目：去掉列表符号，丢弃空行
pub fn parse_bullet_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .collect()
}

/// 规整洞察列表：删除前言行，每条统一为 `- ` 开头
pub fn normalize_insights(text: &str) -> String {
    text.lines()
        .map(|line| INSIGHT_PREAMBLE.replace(line, ""))
        .filter(|line| !line.trim().is_empty())
        .map(|line| strip_list_marker(&line))
        .filter(|line| !line.is_empty())
        .map(|line| format!("- {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 将规整后的洞察文本拆成不带符号的纯文本条目
pub fn insight_items(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| INSIGHT_PREAMBLE.replace(line, ""))
        .map(|line| clean_text(&line))
        .filter(|line| !line.is_empty())
        .collect()
}

/// 移除 Markdown 标记并把连续空白压缩为单个空格
pub fn clean_text(text: &str) -> String {
    let without_markup = MARKDOWN_NOISE.replace_all(text, " ");
    WHITESPACE
        .replace_all(&without_markup, " ")
        .trim()
        .to_string()
}

/// 清洗标题或子主题名
pub fn clean_heading(text: &str) -> String {
    let stripped = HEADING_NOISE.replace_all(text, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// 去掉改写结果的标签前缀与包裹的引号
pub fn strip_rewrite_prefix(text: &str) -> String {
    let trimmed = text.trim();
    let without_prefix = REWRITE_PREFIX.replace(trimmed, "");
    without_prefix
        .trim_matches(|c: char| c == ' ' || c == '"')
        .to_string()
}

/// 以空白分隔统计单词数
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// 按字符数截断，避免切在 UTF-8 字符中间
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
