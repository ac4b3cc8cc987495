//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LLMConfig;
use crate::llm::{CompletionAdapter, FragmentStream};
use crate::retrieval::Embedder;

mod providers;
mod streaming;

use providers::ProviderClient;

/// 一次补全调用的用途参数：报告写作与文档问答使用不同的温度与长度
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionProfile {
    pub preamble: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl CompletionProfile {
    pub fn generation(config: &LLMConfig) -> Self {
        Self {
            preamble: String::from(
                "You are a professional research writer. Follow the instructions exactly and return only the requested content.",
            ),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub fn chat(config: &LLMConfig) -> Self {
        Self {
            preamble: String::from(
                "You are a careful assistant that answers questions strictly from the supplied document context.",
            ),
            temperature: config.chat_temperature,
            max_tokens: config.chat_max_tokens,
        }
    }
}

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    profile: CompletionProfile,
    client: ProviderClient,
    http: reqwest::Client,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: LLMConfig, profile: CompletionProfile) -> Result<Self> {
        let client = ProviderClient::new(&config)?;
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_seconds.min(30)))
            .build()?;
        Ok(Self {
            config,
            profile,
            client,
            http,
        })
    }

    /// 报告生成使用的客户端
    pub fn for_generation(config: &LLMConfig) -> Result<Self> {
        Self::new(config.clone(), CompletionProfile::generation(config))
    }

    /// 文档问答使用的客户端
    pub fn for_chat(config: &LLMConfig) -> Result<Self> {
        Self::new(config.clone(), CompletionProfile::chat(config))
    }

    /// 同一 provider 的嵌入模型，provider 不支持嵌入时为 `None`
    pub fn embedder(
        config: &LLMConfig,
        model: &str,
        batch_size: usize,
    ) -> Result<Option<Arc<dyn Embedder>>> {
        Ok(ProviderClient::new(config)?.embedder(model, batch_size))
    }

    pub fn profile(&self) -> &CompletionProfile {
        &self.profile
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    /// 通用重试逻辑，用于处理异步操作的重试机制
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let max_retries = self.config.retry_attempts.max(1);
        let retry_delay_ms = self.config.retry_delay_ms;
        let mut retries = 0;

        loop {
            let attempt = tokio::time::timeout(self.timeout(), operation()).await;
            let err = match attempt {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(err)) => err,
                Err(_) => anyhow!(
                    "model call timed out after {}s",
                    self.config.timeout_seconds
                ),
            };

            retries += 1;
            tracing::warn!(
                attempt = retries,
                max_attempts = max_retries,
                error = %err,
                "调用模型服务出错"
            );
            if retries >= max_retries {
                return Err(err);
            }
            tokio::time::sleep(Duration::from_millis(retry_delay_ms * retries as u64)).await;
        }
    }

    /// 单轮补全
    pub async fn prompt(&self, user_prompt: &str) -> Result<String> {
        let agent = self
            .client
            .create_agent(&self.config.model, &self.profile);

        let response = self
            .retry_with_backoff(|| async { agent.prompt(user_prompt).await })
            .await?;
        Ok(response.trim().to_string())
    }

    /// 流式补全，片段拼接后与 [`LLMClient::prompt`] 一样去掉首尾空白。
    /// 只有建立连接阶段会重试，开始输出之后的错误原样交给调用方。
    pub async fn prompt_stream(&self, user_prompt: &str) -> Result<FragmentStream> {
        if !self.client.supports_openai_streaming() {
            // 不支持 OpenAI 协议流式输出的 provider 以整段结果作为唯一片段
            let answer = self.prompt(user_prompt).await?;
            return Ok(Box::pin(futures::stream::once(async move { Ok(answer) })));
        }

        let stream = self
            .retry_with_backoff(|| async {
                streaming::open_chat_stream(&self.http, &self.config, &self.profile, user_prompt)
                    .await
            })
            .await?;

        Ok(super::trim_fragments(stream.boxed()))
    }
}

#[async_trait]
impl CompletionAdapter for LLMClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompt(prompt).await
    }

    async fn complete_stream(&self, prompt: &str) -> Result<FragmentStream> {
        self.prompt_stream(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LLMProvider;

    #[test]
    fn test_profiles_follow_config() {
        let config = LLMConfig {
            temperature: 0.9,
            max_tokens: 1000,
            chat_temperature: 0.2,
            chat_max_tokens: 300,
            ..LLMConfig::default()
        };

        let generation = CompletionProfile::generation(&config);
        assert_eq!(generation.temperature, 0.9);
        assert_eq!(generation.max_tokens, 1000);

        let chat = CompletionProfile::chat(&config);
        assert_eq!(chat.temperature, 0.2);
        assert_eq!(chat.max_tokens, 300);
        assert_ne!(generation.preamble, chat.preamble);
    }

    #[test]
    fn test_client_creation_for_openai_compatible_provider() {
        let config = LLMConfig {
            provider: LLMProvider::OpenAI,
            api_key: "test-key".to_string(),
            ..LLMConfig::default()
        };

        let client = LLMClient::for_chat(&config).unwrap();
        assert_eq!(client.profile().max_tokens, 400);
    }
}
