//! 向量相似度检索
//!
//! 片段在建索引时一次性向量化，查询时只需要嵌入问题本身，再按余弦相似度取前 `k` 个。

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use rig::embeddings::EmbeddingModel;
use std::sync::Arc;

use super::{IndexBuilder, RetrievalIndex};

/// 文本向量化能力
#[async_trait]
pub trait Embedder: Send + Sync {
    /// 返回与输入一一对应的向量
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f64>>>;
}

/// 基于 rig 嵌入模型的 [`Embedder`]，按批次请求
pub struct RigEmbedder<M> {
    model: M,
    batch_size: usize,
}

impl<M: EmbeddingModel> RigEmbedder<M> {
    pub fn new(model: M, batch_size: usize) -> Self {
        Self {
            model,
            batch_size: batch_size.clamp(1, M::MAX_DOCUMENTS.max(1)),
        }
    }
}

#[async_trait]
impl<M: EmbeddingModel + 'static> Embedder for RigEmbedder<M> {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f64>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embeddings = self
                .model
                .embed_texts(batch.to_vec())
                .await
                .context("Failed to embed document chunks")?;
            vectors.extend(embeddings.into_iter().map(|embedding| embedding.vec));
        }
        Ok(vectors)
    }
}

/// 进程内向量索引，构建后不可变
pub struct EmbeddingIndex {
    chunks: Vec<String>,
    vectors: Vec<Vec<f64>>,
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingIndex {
    fn ranked(&self, query_vector: &[f64], k: usize) -> Vec<String> {
        let mut scored: Vec<(usize, f64)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| (index, cosine_similarity(query_vector, vector)))
            .collect();

        // 分数相同时保持文档顺序
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        scored
            .into_iter()
            .take(k)
            .map(|(index, _)| self.chunks[index].clone())
            .collect()
    }
}

#[async_trait]
impl RetrievalIndex for EmbeddingIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .context("Embedding service returned no vector for the query")?;

        Ok(self.ranked(&query_vector, k))
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }
}

/// 构建 [`EmbeddingIndex`]
#[derive(Clone)]
pub struct EmbeddingIndexBuilder {
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingIndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl IndexBuilder for EmbeddingIndexBuilder {
    async fn build(&self, chunks: Vec<String>) -> Result<Arc<dyn RetrievalIndex>> {
        let vectors = if chunks.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed(chunks.clone()).await?
        };
        if vectors.len() != chunks.len() {
            bail!(
                "Embedding count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }

        tracing::debug!(chunks = chunks.len(), "向量索引构建完成");
        Ok(Arc::new(EmbeddingIndex {
            chunks,
            vectors,
            embedder: self.embedder.clone(),
        }))
    }
}

/// 维度不一致或存在零向量时为 0
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
