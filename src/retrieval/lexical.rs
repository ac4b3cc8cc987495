use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::{IndexBuilder, RetrievalIndex};

/// 进程内 TF-IDF 词法索引
pub struct LexicalIndex {
    chunks: Vec<String>,
    term_frequencies: Vec<HashMap<String, usize>>,
    document_frequencies: HashMap<String, usize>,
}

impl LexicalIndex {
    pub fn new(chunks: Vec<String>) -> Self {
        let term_frequencies: Vec<HashMap<String, usize>> = chunks
            .iter()
            .map(|chunk| {
                let mut frequencies = HashMap::new();
                for token in tokenize(chunk) {
                    *frequencies.entry(token).or_insert(0) += 1;
                }
                frequencies
            })
            .collect();

        let mut document_frequencies: HashMap<String, usize> = HashMap::new();
        for frequencies in &term_frequencies {
            for term in frequencies.keys() {
                *document_frequencies.entry(term.clone()).or_insert(0) += 1;
            }
        }

        Self {
            chunks,
            term_frequencies,
            document_frequencies,
        }
    }

    fn idf(&self, term: &str) -> f64 {
        let total = self.chunks.len() as f64;
        let df = self.document_frequencies.get(term).copied().unwrap_or(0) as f64;
        ((total + 1.0) / (df + 1.0)).ln() + 1.0
    }

    fn score(&self, chunk_index: usize, query_terms: &[String]) -> f64 {
        let frequencies = &self.term_frequencies[chunk_index];
        let length = frequencies.values().sum::<usize>().max(1) as f64;

        query_terms
            .iter()
            .filter_map(|term| {
                frequencies
                    .get(term)
                    .map(|&tf| (tf as f64 / length.sqrt()) * self.idf(term))
            })
            .sum()
    }

    /// 打分并返回前 `k` 个片段。与向量检索一致，片段数足够时总是返回 `k` 个。
    pub fn top_k(&self, query: &str, k: usize) -> Vec<String> {
        let query_terms = tokenize(query);

        let mut scored: Vec<(usize, f64)> = (0..self.chunks.len())
            .map(|index| (index, self.score(index, &query_terms)))
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
impl RetrievalIndex for LexicalIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self.top_k(query, k))
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }
}

/// 构建 [`LexicalIndex`]
#[derive(Debug, Clone, Default)]
pub struct LexicalIndexBuilder;

#[async_trait]
impl IndexBuilder for LexicalIndexBuilder {
    async fn build(&self, chunks: Vec<String>) -> Result<Arc<dyn RetrievalIndex>> {
        Ok(Arc::new(LexicalIndex::new(chunks)))
    }
}

/// 小写化后按非字母数字切词，保留各种文字的字母
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() > 1)
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> LexicalIndex {
        LexicalIndex::new(vec![
            "Solar panels convert sunlight into electricity.".to_string(),
            "Wind turbines generate power from moving air.".to_string(),
            "Battery storage smooths solar output during the night.".to_string(),
            "Hydroelectric dams use falling water.".to_string(),
        ])
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Solar-Power, in 2025: A boom!"),
            vec!["solar", "power", "in", "2025", "boom"]
        );
    }

    #[tokio::test]
    async fn test_most_relevant_chunk_first() {
        let index = sample_index();
        let results = index.search("How do wind turbines work?", 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].starts_with("Wind turbines"));
    }

    #[tokio::test]
    async fn test_returns_k_results_even_without_matches() {
        let index = sample_index();
        let results = index.search("quantum chromodynamics", 3).await.unwrap();

        assert_eq!(results.len(), 3);
        // 无匹配时按文档顺序返回
        assert!(results[0].starts_with("Solar panels"));
    }

    #[tokio::test]
    async fn test_k_larger_than_index() {
        let index = sample_index();
        assert_eq!(index.search("solar", 10).await.unwrap().len(), 4);
        assert_eq!(index.len(), 4);
    }

    #[tokio::test]
    async fn test_builder_creates_index() {
        let index = LexicalIndexBuilder
            .build(vec!["only chunk".to_string()])
            .await
            .unwrap();
        assert_eq!(index.len(), 1);
        assert!(!index.is_empty());
    }
}
