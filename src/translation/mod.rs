//! 翻译适配层
//!
//! [`Translator`] 封装单次外部翻译调用；[`TranslationService`] 在其上叠加
//! 记忆化缓存、长文本分段并发翻译与失败回退原文的策略，对调用方永不失败。

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CachePerformanceMonitor, CachePerformanceReport, MemoCache};
use crate::config::TranslationConfig;
use crate::i18n::Language;
use crate::utils::threads::do_parallel_with_limit;

/// 单语言对的外部翻译能力
#[async_trait]
pub trait Translator: Send + Sync {
    /// `source` 为空表示自动识别源语言
    async fn translate(
        &self,
        text: &str,
        source: Option<Language>,
        target: Language,
    ) -> Result<String>;
}

/// Google Translate 公共接口
#[derive(Clone)]
pub struct GoogleTranslator {
    endpoint: String,
    http: reqwest::Client,
}

impl GoogleTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            http,
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        source: Option<Language>,
        target: Language,
    ) -> Result<String> {
        let source_code = source.map(|l| l.code()).unwrap_or("auto");
        let body: Value = self
            .http
            .post(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source_code),
                ("tl", target.code()),
                ("dt", "t"),
            ])
            .form(&[("q", text)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to decode translation response")?;

        let translated = parse_gtx_response(&body)?;
        if translated.trim().is_empty() {
            return Err(anyhow!("translator returned empty text"));
        }
        Ok(translated)
    }
}

/// 响应形如 `[[["译文","原文",...],...],...]`，逐句拼接
fn parse_gtx_response(body: &Value) -> Result<String> {
    let sentences = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("unexpected translation response shape"))?;

    Ok(sentences
        .iter()
        .filter_map(|s| s.get(0).and_then(Value::as_str))
        .collect::<String>())
}

/// 缓存键中的翻译方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslationDirection {
    /// 从工作语言翻译到目标语言
    To(Language),
    /// 自动识别源语言，翻译到工作语言
    ToCanonical,
}

/// 带缓存的翻译服务
pub struct TranslationService {
    translator: Option<Arc<dyn Translator>>,
    cache: MemoCache<(String, TranslationDirection), String>,
    performance_monitor: CachePerformanceMonitor,
    paragraph_threshold: usize,
    max_parallels: usize,
}

impl TranslationService {
    pub fn new(translator: Arc<dyn Translator>, config: &TranslationConfig) -> Self {
        let performance_monitor = CachePerformanceMonitor::new();
        Self {
            translator: config.enabled.then_some(translator),
            cache: MemoCache::new("translation", performance_monitor.clone()),
            performance_monitor,
            paragraph_threshold: config.paragraph_threshold,
            max_parallels: config.max_parallels.max(1),
        }
    }

    /// 按配置创建使用 Google Translate 的服务
    pub fn from_config(config: &TranslationConfig) -> Result<Self> {
        let translator: Arc<dyn Translator> = Arc::new(GoogleTranslator::new(config)?);
        Ok(Self::new(translator, config))
    }

    /// 不做任何翻译的服务
    pub fn disabled() -> Self {
        let performance_monitor = CachePerformanceMonitor::new();
        Self {
            translator: None,
            cache: MemoCache::new("translation", performance_monitor.clone()),
            performance_monitor,
            paragraph_threshold: usize::MAX,
            max_parallels: 1,
        }
    }

    pub fn cache_report(&self) -> CachePerformanceReport {
        self.performance_monitor.generate_report()
    }

    /// 将工作语言文本翻译为 `target`，源语言固定为工作语言。失败时返回原文，从不报错。
    pub async fn translate(&self, text: &str, target: Language) -> String {
        let Some(translator) = &self.translator else {
            return text.to_string();
        };
        if target.is_canonical() || text.trim().is_empty() {
            return text.to_string();
        }

        let key = (text.to_string(), TranslationDirection::To(target));
        if text.chars().count() <= self.paragraph_threshold {
            return self
                .cache
                .get_or_try_insert_with(key, || {
                    self.call(translator.as_ref(), text, Some(Language::CANONICAL), target)
                })
                .await
                .unwrap_or_else(|_| text.to_string());
        }

        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        // 长文本按行拆段，逐段独立翻译，单段失败保留该段原文
        let paragraphs: Vec<&str> = text
            .split('\n')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let paragraph_futures: Vec<_> = paragraphs
            .iter()
            .map(|paragraph| self.translate_paragraph(translator.as_ref(), paragraph, target))
            .collect();
        let results = do_parallel_with_limit(paragraph_futures, self.max_parallels).await;

        let all_translated = results.iter().all(|(_, ok)| *ok);
        let joined = results
            .into_iter()
            .map(|(paragraph, _)| paragraph)
            .collect::<Vec<_>>()
            .join("\n\n");

        if all_translated {
            self.cache.set(key, joined.clone());
        }
        joined
    }

    /// 自动识别源语言并翻译为工作语言，失败时把错误交给调用方决定兜底
    pub async fn to_canonical(&self, text: &str) -> Result<String> {
        let Some(translator) = &self.translator else {
            return Ok(text.to_string());
        };
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let key = (text.to_string(), TranslationDirection::ToCanonical);
        self.cache
            .get_or_try_insert_with(key, || {
                self.call(translator.as_ref(), text, None, Language::CANONICAL)
            })
            .await
    }

    async fn translate_paragraph(
        &self,
        translator: &dyn Translator,
        paragraph: &str,
        target: Language,
    ) -> (String, bool) {
        let key = (paragraph.to_string(), TranslationDirection::To(target));
        match self
            .cache
            .get_or_try_insert_with(key, || {
                self.call(translator, paragraph, Some(Language::CANONICAL), target)
            })
            .await
        {
            Ok(translated) => (translated, true),
            Err(_) => (paragraph.to_string(), false),
        }
    }

    /// 单次外部调用，空结果视为失败并计入缓存错误统计
    async fn call(
        &self,
        translator: &dyn Translator,
        text: &str,
        source: Option<Language>,
        target: Language,
    ) -> Result<String> {
        match translator.translate(text, source, target).await {
            Ok(translated) if !translated.trim().is_empty() => Ok(translated),
            Ok(_) => {
                self.cache.record_error("empty translation");
                tracing::warn!(target_language = %target, "翻译结果为空");
                Err(anyhow!("translator returned empty text"))
            }
            Err(err) => {
                self.cache.record_error(&err.to_string());
                tracing::warn!(target_language = %target, error = %err, "翻译失败");
                Err(err)
            }
        }
    }
}
