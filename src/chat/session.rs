use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::retrieval::RetrievalIndex;

/// 一问一答
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

impl Exchange {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// 单个文档的问答会话。索引建立后不再变化，历史只追加。
pub struct ChatSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    index: Arc<dyn RetrievalIndex>,
    history: RwLock<Vec<Exchange>>,
}

impl ChatSession {
    pub fn new(id: impl Into<String>, index: Arc<dyn RetrievalIndex>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            index,
            history: RwLock::new(Vec::new()),
        }
    }

    pub fn index(&self) -> &Arc<dyn RetrievalIndex> {
        &self.index
    }

    /// 最近 `window` 轮对话，按时间顺序
    pub async fn recent_history(&self, window: usize) -> Vec<Exchange> {
        let history = self.history.read().await;
        let start = history.len().saturating_sub(window);
        history[start..].to_vec()
    }

    pub async fn append(&self, exchange: Exchange) {
        self.history.write().await.push(exchange);
    }

    pub async fn history(&self) -> Vec<Exchange> {
        self.history.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::LexicalIndex;

    #[tokio::test]
    async fn test_recent_history_window() {
        let session = ChatSession::new("s1", Arc::new(LexicalIndex::new(vec![])));
        for i in 0..7 {
            session
                .append(Exchange::new(format!("q{}", i), format!("a{}", i)))
                .await;
        }

        let recent = session.recent_history(5).await;
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].question, "q2");
        assert_eq!(recent[4].answer, "a6");
        assert_eq!(session.history().await.len(), 7);
    }
}
