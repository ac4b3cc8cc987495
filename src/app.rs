use anyhow::Result;
use std::sync::Arc;

use crate::chat::ChatManager;
use crate::config::Config;
use crate::generator::{GeneratorContext, ReportPipeline};
use crate::jobs::JobOrchestrator;
use crate::llm::{CompletionAdapter, LLMClient, SearchAdapter, WebSearchClient};
use crate::render::Assembler;
use crate::retrieval::{IndexBuilder, index_builder_from_config};
use crate::store::Store;
use crate::translation::TranslationService;

/// 服务依赖的外部能力，测试中可整体替换
pub struct Adapters {
    /// 报告生成使用的模型
    pub generation: Arc<dyn CompletionAdapter>,
    /// 问答使用的模型
    pub chat: Arc<dyn CompletionAdapter>,
    pub search: Arc<dyn SearchAdapter>,
    pub translation: Arc<TranslationService>,
    pub index_builder: Arc<dyn IndexBuilder>,
}

impl Adapters {
    /// 按配置创建真实的外部服务客户端
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            generation: Arc::new(LLMClient::for_generation(&config.llm)?),
            chat: Arc::new(LLMClient::for_chat(&config.llm)?),
            search: Arc::new(WebSearchClient::new(config.search.clone())?),
            translation: Arc::new(TranslationService::from_config(&config.translation)?),
            index_builder: index_builder_from_config(&config.llm, &config.chat)?,
        })
    }
}

/// 进程内共享的全部服务
#[derive(Clone)]
pub struct AppServices {
    pub config: Arc<Config>,
    pub store: Arc<Store>,
    pub translation: Arc<TranslationService>,
    pub jobs: Arc<JobOrchestrator>,
    pub chat: Arc<ChatManager>,
}

impl AppServices {
    pub fn from_config(config: Config) -> Result<Self> {
        let adapters = Adapters::from_config(&config)?;
        Self::with_adapters(config, adapters)
    }

    pub fn with_adapters(config: Config, adapters: Adapters) -> Result<Self> {
        let store = Arc::new(Store::new());
        let assembler = Arc::new(Assembler::from_config(
            &config,
            adapters.translation.clone(),
        )?);

        let context = GeneratorContext::new(
            adapters.generation,
            adapters.search,
            adapters.translation.clone(),
            assembler,
            config.pipeline.clone(),
        );
        let jobs = Arc::new(JobOrchestrator::new(
            store.clone(),
            context,
            ReportPipeline::default(),
        ));

        let chat = Arc::new(ChatManager::new(
            store.clone(),
            adapters.chat,
            adapters.translation.clone(),
            adapters.index_builder,
            config.chat.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            store,
            translation: adapters.translation,
            jobs,
            chat,
        })
    }
}
