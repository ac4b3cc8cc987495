//! 集成测试共用的确定性替身
#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use reportsmith::config::{Config, TranslationConfig};
use reportsmith::i18n::Language;
use reportsmith::jobs::{JobKey, JobStatus, ProgressReport};
use reportsmith::llm::{CompletionAdapter, FragmentStream, SearchAdapter};
use reportsmith::retrieval::{Embedder, IndexBuilder, LexicalIndexBuilder};
use reportsmith::translation::{TranslationService, Translator};
use reportsmith::{Adapters, AppServices};

pub const CHAT_ANSWER: &str = "Battery storage smooths solar output during the evening peak.";

/// 按提示词中的关键字返回固定回复的模型替身
#[derive(Default)]
pub struct ScriptedCompletion {
    calls: AtomicUsize,
    hang_on: Option<&'static str>,
    fail_on: Vec<&'static str>,
    stream_fails_after: Option<usize>,
    delay: Duration,
    padded: bool,
    blank: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// 提示词包含关键字时永不返回
    pub fn hanging_on(mut self, keyword: &'static str) -> Self {
        self.hang_on = Some(keyword);
        self
    }

    pub fn failing_on(mut self, keyword: &'static str) -> Self {
        self.fail_on.push(keyword);
        self
    }

    /// 流式输出若干片段后报错
    pub fn stream_fails_after(mut self, fragments: usize) -> Self {
        self.stream_fails_after = Some(fragments);
        self
    }

    /// 每次调用与每个流式片段之前的等待时间
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 回复前后加上空白，模拟模型输出的多余换行与空格
    pub fn with_padding(mut self) -> Self {
        self.padded = true;
        self
    }

    /// 所有回复都只有空白
    pub fn blank_answers(mut self) -> Self {
        self.blank = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 按调用顺序记录的提示词
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// 问答提示词，按调用顺序
    pub fn chat_prompts(&self) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|prompt| prompt.contains("ONLY speaks English"))
            .collect()
    }

    async fn reply(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(keyword) = self.hang_on
            && prompt.contains(keyword)
        {
            std::future::pending::<()>().await;
        }
        if self.fail_on.iter().any(|keyword| prompt.contains(keyword)) {
            return Err(anyhow!("model rejected the request"));
        }
        if self.blank {
            return Ok(String::from(" \n  "));
        }
        let reply = scripted_reply(prompt);
        if self.padded {
            Ok(format!(" \n {}  \n", reply))
        } else {
            Ok(reply.to_string())
        }
    }
}

fn scripted_reply(prompt: &str) -> &'static str {
    if prompt.contains("heading title") {
        "Solar Energy"
    } else if prompt.contains("comprehensive introduction") {
        "Solar energy has moved from a niche technology to a mainstream power source."
    } else if prompt.contains("major subtopics") {
        "- Photovoltaics\n- Battery Storage\n- Energy Policy\n- Grid Integration\n- Market Outlook"
    } else if prompt.contains("informative paragraph") {
        "Solar panels convert sunlight into electricity with steadily rising efficiency."
    } else if prompt.contains("Summarize this content") {
        "Solar adoption is accelerating worldwide as costs fall."
    } else if prompt.contains("key insights") {
        "1. Costs are falling\n2. Storage matters\n3. Policy drives adoption"
    } else if prompt.contains("concluding paragraph") {
        "Solar energy will keep growing as storage matures."
    } else if prompt.contains("text editor") {
        "Rewritten: Refined wording appears here"
    } else if prompt.contains("ONLY speaks English") {
        CHAT_ANSWER
    } else {
        "ok"
    }
}

#[async_trait]
impl CompletionAdapter for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.reply(prompt).await
    }

    async fn complete_stream(&self, prompt: &str) -> Result<FragmentStream> {
        let answer = self.reply(prompt).await?;
        let delay = self.delay;
        let fails_after = self.stream_fails_after;

        let words: Vec<String> = answer
            .split_inclusive(' ')
            .map(|word| word.to_string())
            .collect();
        let stream = futures::stream::unfold(0usize, move |position| {
            let words = words.clone();
            async move {
                if fails_after == Some(position) {
                    return Some((Err(anyhow!("connection reset")), usize::MAX));
                }
                let word = words.get(position)?.clone();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Some((Ok(word), position + 1))
            }
        });
        Ok(Box::pin(stream))
    }
}

/// 返回固定检索结果
pub struct StubSearch;

#[async_trait]
impl SearchAdapter for StubSearch {
    async fn web_search(&self, _query: &str) -> Result<String> {
        Ok(String::from("Recent statistics show record solar installations."))
    }

    async fn encyclopedia(&self, _query: &str) -> Result<String> {
        Ok(String::from("Solar power is the conversion of sunlight into electricity."))
    }
}

pub struct FailingSearch;

#[async_trait]
impl SearchAdapter for FailingSearch {
    async fn web_search(&self, _query: &str) -> Result<String> {
        Err(anyhow!("search offline"))
    }

    async fn encyclopedia(&self, _query: &str) -> Result<String> {
        Err(anyhow!("encyclopedia offline"))
    }
}

/// 以字母频次作为向量的确定性嵌入
#[derive(Default)]
pub struct LetterEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Embedder for LetterEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f64>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0; 26];
                for c in text.to_ascii_lowercase().bytes() {
                    if c.is_ascii_lowercase() {
                        vector[(c - b'a') as usize] += 1.0;
                    }
                }
                vector
            })
            .collect())
    }
}

/// 在文本前加上目标语言代码，便于断言翻译发生过
#[derive(Default)]
pub struct TaggingTranslator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Translator for TaggingTranslator {
    async fn translate(
        &self,
        text: &str,
        _source: Option<Language>,
        target: Language,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("[{}] {}", target.code(), text))
    }
}

pub fn test_config(fonts_dir: &Path) -> Config {
    let mut config = Config::default();
    config.render.fonts_dir = fonts_dir.to_path_buf();
    config.render.download_fonts = false;
    config.pipeline.adapter_timeout_seconds = 1;
    config.pipeline.max_parallels = 2;
    config.translation.enabled = false;
    config.search.enabled = false;
    config.store.job_ttl_hours = None;
    config
}

/// 测试服务及其字体临时目录，目录随返回值一起释放
pub struct TestApp {
    pub services: AppServices,
    _fonts: TempDir,
}

pub struct TestAppBuilder {
    completion: Arc<dyn CompletionAdapter>,
    search: Arc<dyn SearchAdapter>,
    translator: Option<Arc<dyn Translator>>,
    index_builder: Arc<dyn IndexBuilder>,
}

impl TestAppBuilder {
    pub fn new(completion: Arc<dyn CompletionAdapter>) -> Self {
        Self {
            completion,
            search: Arc::new(StubSearch),
            translator: None,
            index_builder: Arc::new(LexicalIndexBuilder),
        }
    }

    pub fn index_builder(mut self, index_builder: Arc<dyn IndexBuilder>) -> Self {
        self.index_builder = index_builder;
        self
    }

    pub fn search(mut self, search: Arc<dyn SearchAdapter>) -> Self {
        self.search = search;
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn build(self) -> TestApp {
        let fonts = TempDir::new().unwrap();
        let config = test_config(fonts.path());

        let translation = match self.translator {
            Some(translator) => Arc::new(TranslationService::new(
                translator,
                &TranslationConfig::default(),
            )),
            None => Arc::new(TranslationService::disabled()),
        };

        let adapters = Adapters {
            generation: self.completion.clone(),
            chat: self.completion,
            search: self.search,
            translation,
            index_builder: self.index_builder,
        };

        TestApp {
            services: AppServices::with_adapters(config, adapters).unwrap(),
            _fonts: fonts,
        }
    }
}

/// 轮询直到作业结束
pub async fn wait_until_finished(services: &AppServices, key: &JobKey) -> ProgressReport {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    loop {
        let progress = services.jobs.progress(key);
        if progress.status.is_finished() {
            return progress;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {} did not finish, last status {:?}",
            key,
            progress.status
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

pub fn assert_completed(progress: &ProgressReport) {
    assert_eq!(
        progress.status,
        JobStatus::Completed,
        "job failed: {:?}",
        progress.error
    );
}

/// 生成只含一段文字的单页 PDF
pub fn make_test_pdf(text: &str) -> Vec<u8> {
    use lopdf::dictionary;
    use lopdf::{Document, Object, Stream};

    let mut doc = Document::with_version("1.4");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let content = format!("BT /F1 12 Tf 72 700 Td ({}) Tj ET", text);
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        },
    });

    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    });

    if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
        page.set("Parent", pages_id);
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

pub const SAMPLE_DOCUMENT: &str = "Battery storage smooths solar output during the evening peak. \
     Grid operators schedule storage dispatch around demand.";
