use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP 服务配置
    pub server: ServerConfig,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 翻译配置
    pub translation: TranslationConfig,

    /// 联网检索配置
    pub search: SearchConfig,

    /// 报告生成流水线配置
    pub pipeline: PipelineConfig,

    /// 文档问答配置
    pub chat: ChatConfig,

    /// PDF 渲染配置
    pub render: RenderConfig,

    /// 作业存储配置
    pub store: StoreConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub bind: String,

    /// 是否允许跨域访问
    pub enable_cors: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址，需兼容 OpenAI chat completions 协议以支持流式输出
    pub api_base_url: String,

    /// 模型名称
    pub model: String,

    /// 报告生成使用的最大tokens
    pub max_tokens: u32,

    /// 报告生成使用的温度
    pub temperature: f64,

    /// 问答使用的最大tokens
    pub chat_max_tokens: u32,

    /// 问答使用的温度
    pub chat_temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 单次请求超时时间（秒）
    pub timeout_seconds: u64,
}

/// 翻译配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TranslationConfig {
    /// 是否启用翻译，关闭后所有翻译均为原文
    pub enabled: bool,

    /// 翻译服务地址
    pub endpoint: String,

    /// 超过该字符数的文本按段落拆分翻译
    pub paragraph_threshold: usize,

    /// 段落翻译的并发数
    pub max_parallels: usize,

    /// 单次请求超时时间（秒）
    pub timeout_seconds: u64,
}

/// 联网检索配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub enabled: bool,

    /// Web 搜索接口
    pub web_endpoint: String,

    /// 百科检索接口
    pub encyclopedia_endpoint: String,

    pub timeout_seconds: u64,
}

/// 报告生成流水线配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// 允许的最小页数（子主题数）
    pub min_pages: u32,

    /// 允许的最大页数（子主题数）
    pub max_pages: u32,

    /// 子主题级并发数
    pub max_parallels: usize,

    /// 同时执行的作业数
    pub max_concurrent_jobs: usize,

    /// 单次适配器调用的超时时间（秒）
    pub adapter_timeout_seconds: u64,

    /// Web 检索结果截断长度
    pub web_context_chars: usize,

    /// 百科检索结果截断长度
    pub encyclopedia_context_chars: usize,

    /// 摘要阶段输入截断长度
    pub summary_input_chars: usize,

    /// 摘要失败时的兜底截断长度
    pub summary_fallback_chars: usize,

    /// 结论阶段输入截断长度
    pub conclusion_context_chars: usize,
}

/// 文档问答配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,

    /// 每次检索返回的片段数
    pub top_k: usize,

    /// 提示词中保留的历史轮数
    pub history_window: usize,

    /// 历史回答截断长度
    pub history_answer_chars: usize,

    /// 向量检索使用的嵌入模型，留空时使用词法检索
    pub embedding_model: String,

    /// 单次嵌入请求的最大片段数
    pub embedding_batch_size: usize,
}

/// PDF 渲染配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RenderConfig {
    /// 字体目录
    pub fonts_dir: PathBuf,

    /// 缺失字体时是否自动下载
    pub download_fonts: bool,

    /// 字体下载地址模板，`{family}` 与 `{style}` 会被替换
    pub font_url_template: String,
}

/// 作业存储配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// 已结束作业的保留时长（小时），为空表示进程生命周期内一直保留
    pub job_ttl_hours: Option<u64>,

    /// 过期清理间隔（秒）
    pub sweep_interval_seconds: u64,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl PipelineConfig {
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_seconds)
    }
}

impl StoreConfig {
    pub fn job_ttl(&self) -> Option<chrono::Duration> {
        self.job_ttl_hours
            .map(|hours| chrono::Duration::hours(hours as i64))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: String::from("127.0.0.1:5000"),
            enable_cors: true,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("REPORTSMITH_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api.groq.com/openai/v1"),
            model: String::from("llama-3.1-8b-instant"),
            max_tokens: 2048,
            temperature: 0.7,
            chat_max_tokens: 400,
            chat_temperature: 0.3,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            timeout_seconds: 120,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: String::from("https://translate.googleapis.com/translate_a/single"),
            paragraph_threshold: 500,
            max_parallels: 5,
            timeout_seconds: 30,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            web_endpoint: String::from("https://api.duckduckgo.com/"),
            encyclopedia_endpoint: String::from("https://en.wikipedia.org/w/api.php"),
            timeout_seconds: 20,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_pages: 2,
            max_pages: 10,
            max_parallels: 3,
            max_concurrent_jobs: 4,
            adapter_timeout_seconds: 120,
            web_context_chars: 2000,
            encyclopedia_context_chars: 1500,
            summary_input_chars: 1500,
            summary_fallback_chars: 300,
            conclusion_context_chars: 2000,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            top_k: 4,
            history_window: 5,
            history_answer_chars: 150,
            embedding_model: String::from("text-embedding-3-small"),
            embedding_batch_size: 64,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fonts_dir: PathBuf::from("./fonts"),
            download_fonts: true,
            font_url_template: String::from(
                "https://github.com/googlefonts/noto-fonts/raw/main/hinted/ttf/{family}/{family}-{style}.ttf",
            ),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            job_ttl_hours: None,
            sweep_interval_seconds: 600,
        }
    }
}
