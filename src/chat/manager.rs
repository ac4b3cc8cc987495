use anyhow::{Context, Result};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::extract::{decode_document, extract_pdf_text};
use super::prompt::{
    EMPTY_ANSWER, build_answer_prompt, format_context, format_history, normalize_answer,
};
use super::session::{ChatSession, Exchange};
use crate::config::ChatConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::llm::{CompletionAdapter, FragmentTrimmer};
use crate::retrieval::{IndexBuilder, RecursiveCharacterSplitter};
use crate::store::Store;
use crate::translation::TranslationService;
use crate::utils::fallback::with_fallback;
use crate::utils::threads::do_parallel_with_limit;

/// 生产者与消费者之间最多缓存的片段数
const FRAGMENT_BUFFER: usize = 64;

/// 流式回答中的一个片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatFragment {
    Text(String),
    /// 生成失败，之后不会再有片段
    Error(String),
}

impl ChatFragment {
    pub fn into_text(self) -> String {
        match self {
            ChatFragment::Text(text) => text,
            ChatFragment::Error(message) => format!("Error: {}", message),
        }
    }
}

pub type ChatStream = ReceiverStream<ChatFragment>;

/// 基于检索的文档问答
#[derive(Clone)]
pub struct ChatManager {
    store: Arc<Store>,
    completion: Arc<dyn CompletionAdapter>,
    translation: Arc<TranslationService>,
    index_builder: Arc<dyn IndexBuilder>,
    splitter: RecursiveCharacterSplitter,
    config: ChatConfig,
}

impl ChatManager {
    pub fn new(
        store: Arc<Store>,
        completion: Arc<dyn CompletionAdapter>,
        translation: Arc<TranslationService>,
        index_builder: Arc<dyn IndexBuilder>,
        config: ChatConfig,
    ) -> Self {
        let splitter = RecursiveCharacterSplitter::new(config.chunk_size, config.chunk_overlap);
        Self {
            store,
            completion,
            translation,
            index_builder,
            splitter,
            config,
        }
    }

    /// 为文档建立会话，返回片段数。
    ///
    /// 存在同名主题的已完成报告时，改用服务端保存的工作语言文档。
    pub async fn initialize(&self, session_id: &str, document_base64: &str) -> ServiceResult<usize> {
        if session_id.trim().is_empty() {
            return Err(ServiceError::validation("Session id is required"));
        }

        let document = match self.store.canonical_document_for_topic(session_id) {
            Some(document) => {
                tracing::info!(session_id, "使用服务端生成的工作语言文档");
                document.to_vec()
            }
            None => decode_document(document_base64)?,
        };

        let text = extract_pdf_text(document)
            .await
            .map_err(|e| ServiceError::Validation(format!("{:#}", e)))?;
        if text.trim().is_empty() {
            return Err(ServiceError::validation(
                "No readable text found in the uploaded PDF",
            ));
        }

        let chunks = self.splitter.split_text(&text);
        if chunks.is_empty() {
            return Err(ServiceError::validation(
                "No readable text found in the uploaded PDF",
            ));
        }

        let chunk_count = chunks.len();
        let index = self
            .index_builder
            .build(chunks)
            .await
            .context("Failed to build document index")?;
        self.store
            .insert_session(Arc::new(ChatSession::new(session_id, index)));

        tracing::info!(session_id, chunk_count, "会话初始化完成");
        Ok(chunk_count)
    }

    fn session(&self, session_id: &str) -> ServiceResult<Arc<ChatSession>> {
        self.store.session(session_id).ok_or_else(|| {
            ServiceError::not_found(format!("No chat session found for '{}'", session_id))
        })
    }

    /// 一次性回答
    pub async fn ask(&self, session_id: &str, message: &str) -> ServiceResult<String> {
        let session = self.session(session_id)?;
        let prompt = self.prepare_prompt(&session, message).await?;

        let answer = self
            .completion
            .complete(&prompt)
            .await
            .context("Failed to generate answer")?;
        let answer = normalize_answer(&answer);

        session.append(Exchange::new(message, answer.clone())).await;
        tracing::info!(session_id, answer_chars = answer.chars().count(), "问答完成");
        Ok(answer)
    }

    /// 流式回答。会话不存在时立即返回错误；之后的失败以 [`ChatFragment::Error`] 结束流。
    pub async fn ask_stream(&self, session_id: &str, message: &str) -> ServiceResult<ChatStream> {
        let session = self.session(session_id)?;
        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);

        let manager = self.clone();
        let message = message.to_string();
        tokio::spawn(async move {
            manager.produce_answer(session, message, tx).await;
        });

        Ok(ReceiverStream::new(rx))
    }

    async fn produce_answer(
        &self,
        session: Arc<ChatSession>,
        message: String,
        tx: mpsc::Sender<ChatFragment>,
    ) {
        let session_id = session.id.as_str();

        let mut fragments = match self.open_answer_stream(&session, &message).await {
            Ok(fragments) => fragments,
            Err(err) => {
                tracing::warn!(session_id, error = %err, "流式问答启动失败");
                let _ = tx.send(ChatFragment::Error(format!("{:#}", err))).await;
                return;
            }
        };

        // 片段按与 ask 相同的规则去掉首尾空白
        let mut trimmer = FragmentTrimmer::default();
        let mut answer = String::new();
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(fragment) => {
                    let Some(fragment) = trimmer.push(&fragment) else {
                        continue;
                    };
                    answer.push_str(&fragment);
                    if tx.send(ChatFragment::Text(fragment)).await.is_err() {
                        tracing::info!(session_id, "客户端已断开，停止输出");
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(session_id, error = %err, "流式问答中断");
                    let _ = tx.send(ChatFragment::Error(format!("{:#}", err))).await;
                    return;
                }
            }
        }

        // 断开时 answer 必然非空，走到这里说明模型没有输出任何内容
        if answer.is_empty() {
            answer = EMPTY_ANSWER.to_string();
            let _ = tx.send(ChatFragment::Text(answer.clone())).await;
        }

        tracing::info!(session_id, answer_chars = answer.chars().count(), "流式问答完成");
        session.append(Exchange::new(message, answer)).await;
    }

    async fn open_answer_stream(
        &self,
        session: &ChatSession,
        message: &str,
    ) -> Result<crate::llm::FragmentStream> {
        let prompt = self.prepare_prompt(session, message).await?;
        self.completion.complete_stream(&prompt).await
    }

    /// 规整问题、检索片段、拼接历史，生成完整提示词
    async fn prepare_prompt(&self, session: &ChatSession, message: &str) -> Result<String> {
        let question = with_fallback(
            "chat.normalize_question",
            self.translation.to_canonical(message),
            message.to_string(),
        )
        .await;

        let passages = session
            .index()
            .search(&question, self.config.top_k)
            .await
            .context("Failed to search document")?;

        let normalized_futures: Vec<_> = passages
            .iter()
            .map(|passage| {
                with_fallback(
                    "chat.normalize_passage",
                    self.translation.to_canonical(passage),
                    passage.clone(),
                )
            })
            .collect();
        let passages = do_parallel_with_limit(normalized_futures, self.config.top_k).await;

        let history = session.recent_history(self.config.history_window).await;

        Ok(build_answer_prompt(
            &format_context(&passages),
            &format_history(&history, self.config.history_answer_chars),
            &question,
        ))
    }
}
