//! 外部生成模型与联网检索的适配层

use anyhow::Result;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;

pub mod client;
pub mod search;

pub use client::LLMClient;
pub use search::{SearchAdapter, WebSearchClient};

/// 模型流式输出的文本片段序列
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// 文本补全能力。流水线与问答只依赖这个接口，测试中可替换为确定性的替身。
#[async_trait]
pub trait CompletionAdapter: Send + Sync {
    /// 一次性返回完整结果
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// 逐片段返回结果，拼接后与 [`CompletionAdapter::complete`] 语义一致
    async fn complete_stream(&self, prompt: &str) -> Result<FragmentStream>;
}

/// 跨片段去掉整段输出首尾的空白，使片段拼接结果等于 `complete` 返回值的 `trim()`。
///
/// 开头的空白直接丢弃；结尾可能出现的空白先暂存，等到后续出现非空白内容时再输出。
#[derive(Debug, Default)]
pub struct FragmentTrimmer {
    started: bool,
    held: String,
}

impl FragmentTrimmer {
    /// 返回本片段中可以立即输出的部分
    pub fn push(&mut self, fragment: &str) -> Option<String> {
        let fragment = if self.started {
            fragment
        } else {
            fragment.trim_start()
        };
        if fragment.is_empty() {
            return None;
        }
        self.started = true;

        self.held.push_str(fragment);
        let ready_len = self.held.trim_end().len();
        if ready_len == 0 {
            return None;
        }
        let tail = self.held.split_off(ready_len);
        Some(std::mem::replace(&mut self.held, tail))
    }
}

/// 包装片段流，错误原样透传
pub fn trim_fragments(stream: FragmentStream) -> FragmentStream {
    stream
        .scan(FragmentTrimmer::default(), |trimmer, item| {
            let item = match item {
                Ok(fragment) => trimmer.push(&fragment).map(Ok),
                Err(err) => Some(Err(err)),
            };
            futures::future::ready(Some(item))
        })
        .filter_map(futures::future::ready)
        .boxed()
}
