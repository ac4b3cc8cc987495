//! 文档检索适配层
//!
//! 会话只通过 [`RetrievalIndex`] 与 [`IndexBuilder`] 两个接口使用检索能力。
//! 默认使用模型服务的嵌入接口做向量检索；provider 不提供嵌入或未配置嵌入模型时，
//! 退回不依赖外部服务的 TF-IDF 词法索引。

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{ChatConfig, LLMConfig};
use crate::llm::LLMClient;

pub mod chunker;
pub mod embedding;
pub mod lexical;

pub use chunker::RecursiveCharacterSplitter;
pub use embedding::{Embedder, EmbeddingIndex, EmbeddingIndexBuilder, RigEmbedder};
pub use lexical::{LexicalIndex, LexicalIndexBuilder};

/// 构建完成后不可变的检索索引
#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    /// 返回与查询最相关的至多 `k` 个片段，按相关度降序
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>>;

    /// 索引中的片段数
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 由文档片段构建检索索引
#[async_trait]
pub trait IndexBuilder: Send + Sync {
    async fn build(&self, chunks: Vec<String>) -> Result<Arc<dyn RetrievalIndex>>;
}

/// 按配置选择索引实现
pub fn index_builder_from_config(
    llm: &LLMConfig,
    chat: &ChatConfig,
) -> Result<Arc<dyn IndexBuilder>> {
    if chat.embedding_model.trim().is_empty() {
        tracing::info!("未配置嵌入模型，文档检索使用词法索引");
        return Ok(Arc::new(LexicalIndexBuilder));
    }

    match LLMClient::embedder(llm, &chat.embedding_model, chat.embedding_batch_size)? {
        Some(embedder) => {
            tracing::info!(model = %chat.embedding_model, "文档检索使用向量索引");
            Ok(Arc::new(EmbeddingIndexBuilder::new(embedder)))
        }
        None => {
            tracing::warn!(provider = %llm.provider, "当前 provider 不提供嵌入接口，文档检索使用词法索引");
            Ok(Arc::new(LexicalIndexBuilder))
        }
    }
}
