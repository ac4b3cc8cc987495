use crate::config::{Config, LLMProvider};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// reportsmith - 由LLM驱动的多语言报告生成与文档问答服务
#[derive(Parser, Debug)]
#[command(name = "reportsmith")]
#[command(
    about = "Asynchronous multi-language report generation service with retrieval-augmented document chat."
)]
#[command(version)]
pub struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 监听地址
    #[arg(short, long)]
    pub bind: Option<String>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// LLM Provider (openai, deepseek, openrouter, anthropic, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 模型名称
    #[arg(long)]
    pub model: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 子主题级并发数
    #[arg(long)]
    pub max_parallels: Option<usize>,

    /// 同时执行的作业数
    #[arg(long)]
    pub max_concurrent_jobs: Option<usize>,

    /// 禁用翻译
    #[arg(long)]
    pub no_translation: bool,

    /// 禁用联网检索
    #[arg(long)]
    pub no_search: bool,

    /// 字体目录
    #[arg(long)]
    pub fonts_dir: Option<PathBuf>,

    /// 禁止自动下载字体
    #[arg(long)]
    pub no_font_download: bool,

    /// 已结束作业的保留时长（小时）
    #[arg(long)]
    pub job_ttl_hours: Option<u64>,
}

impl Args {
    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Result<Config> {
        let mut config = if let Some(config_path) = &self.config {
            // 显式指定的配置文件必须可读
            Config::from_file(config_path)?
        } else {
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("reportsmith.toml");

            if default_config_path.exists() {
                Config::from_file(&default_config_path)?
            } else {
                Config::default()
            }
        };

        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            match provider_str.parse::<LLMProvider>() {
                Ok(provider) => config.llm.provider = provider,
                Err(_) => tracing::warn!(
                    provider = %provider_str,
                    "未知的provider，使用默认provider {}",
                    config.llm.provider
                ),
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }

        // 并发配置
        if let Some(max_parallels) = self.max_parallels {
            config.pipeline.max_parallels = max_parallels.max(1);
        }
        if let Some(max_concurrent_jobs) = self.max_concurrent_jobs {
            config.pipeline.max_concurrent_jobs = max_concurrent_jobs.max(1);
        }

        if self.no_translation {
            config.translation.enabled = false;
        }
        if self.no_search {
            config.search.enabled = false;
        }

        // 渲染配置
        if let Some(fonts_dir) = self.fonts_dir {
            config.render.fonts_dir = fonts_dir;
        }
        if self.no_font_download {
            config.render.download_fonts = false;
        }

        if let Some(hours) = self.job_ttl_hours {
            config.store.job_ttl_hours = Some(hours);
        }

        config.verbose = config.verbose || self.verbose;

        Ok(config)
    }
}
