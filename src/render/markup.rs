//! 可编辑的纯文本报告格式
//!
//! ```text
//! # 标题
//!
//! ## Introduction
//! 正文
//!
//! ## 1. 子主题
//! 摘要
//!
//! ### Insights
//! - 洞察
//! ```

/// 排版块
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Heading(String),
    Subheading(String),
    Bullet(String),
    Paragraph(String),
    Spacer,
}

/// 将纯文本标记解析为排版块，连续空行只保留一个间隔
pub fn parse_markup(markup: &str) -> Vec<Block> {
    let mut blocks = Vec::new();

    for raw_line in markup.lines() {
        let line = raw_line.trim();
        let block = if line.is_empty() {
            if matches!(blocks.last(), None | Some(Block::Spacer)) {
                continue;
            }
            Block::Spacer
        } else if let Some(text) = line.strip_prefix("### ") {
            Block::Subheading(text.trim().to_string())
        } else if let Some(text) = line.strip_prefix("## ") {
            Block::Heading(text.trim().to_string())
        } else if let Some(text) = line.strip_prefix("# ") {
            Block::Title(text.trim().to_string())
        } else if let Some(text) = line
            .strip_prefix("- ")
            .or_else(|| line.strip_prefix("• "))
        {
            Block::Bullet(text.trim().to_string())
        } else {
            Block::Paragraph(line.to_string())
        };
        blocks.push(block);
    }

    if matches!(blocks.last(), Some(Block::Spacer)) {
        blocks.pop();
    }
    blocks
}

/// 第一个标题块的文本，作为 PDF 文档标题
pub fn document_title(blocks: &[Block]) -> String {
    blocks
        .iter()
        .find_map(|block| match block {
            Block::Title(text) => Some(text.clone()),
            _ => None,
        })
        .unwrap_or_else(|| String::from("Report"))
}
