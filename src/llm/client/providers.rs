//! LLM Provider支持模块

use anyhow::Result;
use rig::{
    agent::Agent,
    client::{CompletionClient, EmbeddingsClient},
    completion::Prompt,
};
use std::sync::Arc;

use crate::config::{LLMConfig, LLMProvider};
use crate::retrieval::{Embedder, RigEmbedder};

use super::CompletionProfile;

/// 统一的Provider客户端枚举
#[derive(Clone)]
pub enum ProviderClient {
    OpenAI(rig::providers::openai::Client),
    DeepSeek(rig::providers::deepseek::Client),
    OpenRouter(rig::providers::openrouter::Client),
    Anthropic(rig::providers::anthropic::Client),
    Ollama(rig::providers::ollama::Client),
}

impl ProviderClient {
    /// 根据配置创建相应的provider客户端
    pub fn new(config: &LLMConfig) -> Result<Self> {
        match config.provider {
            LLMProvider::OpenAI => {
                let client = rig::providers::openai::Client::builder(&config.api_key)
                    .base_url(&config.api_base_url)
                    .build();
                Ok(ProviderClient::OpenAI(client))
            }
            LLMProvider::DeepSeek => {
                let client = rig::providers::deepseek::Client::builder(&config.api_key)
                    .base_url(&config.api_base_url)
                    .build();
                Ok(ProviderClient::DeepSeek(client))
            }
            LLMProvider::OpenRouter => {
                let client = rig::providers::openrouter::Client::builder(&config.api_key).build();
                Ok(ProviderClient::OpenRouter(client))
            }
            LLMProvider::Anthropic => {
                let client =
                    rig::providers::anthropic::ClientBuilder::new(&config.api_key).build()?;
                Ok(ProviderClient::Anthropic(client))
            }
            LLMProvider::Ollama => {
                let client = rig::providers::ollama::Client::builder().build();
                Ok(ProviderClient::Ollama(client))
            }
        }
    }

    /// 是否可以走 OpenAI 兼容的 `/chat/completions` 流式接口
    pub fn supports_openai_streaming(&self) -> bool {
        !matches!(self, ProviderClient::Anthropic(_))
    }

    /// 嵌入模型，provider 不提供嵌入接口时为 `None`
    pub fn embedder(&self, model: &str, batch_size: usize) -> Option<Arc<dyn Embedder>> {
        match self {
            ProviderClient::OpenAI(client) => Some(Arc::new(RigEmbedder::new(
                client.embedding_model(model),
                batch_size,
            ))),
            ProviderClient::Ollama(client) => Some(Arc::new(RigEmbedder::new(
                client.embedding_model(model),
                batch_size,
            ))),
            ProviderClient::DeepSeek(_)
            | ProviderClient::OpenRouter(_)
            | ProviderClient::Anthropic(_) => None,
        }
    }

    /// 按用途参数创建Agent
    pub fn create_agent(&self, model: &str, profile: &CompletionProfile) -> ProviderAgent {
        match self {
            ProviderClient::OpenAI(client) => {
                let agent = client
                    .completion_model(model)
                    .completions_api()
                    .into_agent_builder()
                    .preamble(&profile.preamble)
                    .max_tokens(profile.max_tokens.into())
                    .temperature(profile.temperature)
                    .build();
                ProviderAgent::OpenAI(agent)
            }
            ProviderClient::DeepSeek(client) => {
                let agent = client
                    .agent(model)
                    .preamble(&profile.preamble)
                    .max_tokens(profile.max_tokens.into())
                    .temperature(profile.temperature)
                    .build();
                ProviderAgent::DeepSeek(agent)
            }
            ProviderClient::OpenRouter(client) => {
                let agent = client
                    .agent(model)
                    .preamble(&profile.preamble)
                    .max_tokens(profile.max_tokens.into())
                    .temperature(profile.temperature)
                    .build();
                ProviderAgent::OpenRouter(agent)
            }
            ProviderClient::Anthropic(client) => {
                let agent = client
                    .agent(model)
                    .preamble(&profile.preamble)
                    .max_tokens(profile.max_tokens.into())
                    .temperature(profile.temperature)
                    .build();
                ProviderAgent::Anthropic(agent)
            }
            ProviderClient::Ollama(client) => {
                let agent = client
                    .agent(model)
                    .preamble(&profile.preamble)
                    .max_tokens(profile.max_tokens.into())
                    .temperature(profile.temperature)
                    .build();
                ProviderAgent::Ollama(agent)
            }
        }
    }
}

/// 统一的Agent枚举
pub enum ProviderAgent {
    OpenAI(Agent<rig::providers::openai::CompletionModel>),
    DeepSeek(Agent<rig::providers::deepseek::CompletionModel>),
    OpenRouter(Agent<rig::providers::openrouter::CompletionModel>),
    Anthropic(Agent<rig::providers::anthropic::completion::CompletionModel>),
    Ollama(Agent<rig::providers::ollama::CompletionModel<reqwest::Client>>),
}

impl ProviderAgent {
    /// 执行prompt
    pub async fn prompt(&self, prompt: &str) -> Result<String> {
        match self {
            ProviderAgent::OpenAI(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
            ProviderAgent::DeepSeek(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
            ProviderAgent::OpenRouter(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
            ProviderAgent::Anthropic(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
            ProviderAgent::Ollama(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
        }
    }
}
