use std::future::Future;
use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::config::PipelineConfig;
use crate::llm::{CompletionAdapter, SearchAdapter};
use crate::render::Assembler;
use crate::translation::TranslationService;

#[derive(Clone)]
pub struct GeneratorContext {
    /// 文本补全，用于与AI通信。
    pub completion: Arc<dyn CompletionAdapter>,
    /// 联网检索
    pub search: Arc<dyn SearchAdapter>,
    /// 翻译服务
    pub translation: Arc<TranslationService>,
    /// 文档组装
    pub assembler: Arc<Assembler>,
    /// 流水线配置
    pub config: PipelineConfig,
}

impl GeneratorContext {
    /// 创建新的生成器上下文
    pub fn new(
        completion: Arc<dyn CompletionAdapter>,
        search: Arc<dyn SearchAdapter>,
        translation: Arc<TranslationService>,
        assembler: Arc<Assembler>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            completion,
            search,
            translation,
            assembler,
            config,
        }
    }

    /// 带超时的文本补全
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        self.with_timeout("completion", self.completion.complete(prompt))
            .await
    }

    pub async fn web_search(&self, query: &str) -> Result<String> {
        self.with_timeout("web search", self.search.web_search(query))
            .await
    }

    pub async fn encyclopedia(&self, query: &str) -> Result<String> {
        self.with_timeout("encyclopedia", self.search.encyclopedia(query))
            .await
    }

    /// 所有外部调用都有上限，避免作业永远停留在进行中
    async fn with_timeout<T>(
        &self,
        operation: &str,
        future: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let timeout = self.config.adapter_timeout();
        match tokio::time::timeout(timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "{} timed out after {}s",
                operation,
                timeout.as_secs()
            )),
        }
    }
}
