//! 联网检索：Web 即时答案与百科摘要

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::SearchConfig;

/// 为子主题补充上下文的检索能力，返回的文本会作为写作素材
#[async_trait]
pub trait SearchAdapter: Send + Sync {
    /// 实时 Web 检索，无结果时返回错误
    async fn web_search(&self, query: &str) -> Result<String>;

    /// 百科检索，无结果时返回错误
    async fn encyclopedia(&self, query: &str) -> Result<String>;
}

/// 基于 DuckDuckGo 即时答案接口与 Wikipedia API 的实现
#[derive(Clone)]
pub struct WebSearchClient {
    config: SearchConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default)]
    answer: Value,
    #[serde(default)]
    related_topics: Vec<Value>,
}

impl WebSearchClient {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("reportsmith/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, http })
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.config.enabled {
            Ok(())
        } else {
            Err(anyhow!("search is disabled"))
        }
    }
}

#[async_trait]
impl SearchAdapter for WebSearchClient {
    async fn web_search(&self, query: &str) -> Result<String> {
        self.ensure_enabled()?;

        let answer: InstantAnswer = self
            .http
            .get(&self.config.web_endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to decode web search response")?;

        let text = collect_instant_answer(&answer);
        if text.trim().is_empty() {
            return Err(anyhow!("web search returned no results for '{}'", query));
        }
        Ok(text)
    }

    async fn encyclopedia(&self, query: &str) -> Result<String> {
        self.ensure_enabled()?;

        let body: Value = self
            .http
            .get(&self.config.encyclopedia_endpoint)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("generator", "search"),
                ("gsrsearch", query),
                ("gsrlimit", "3"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to decode encyclopedia response")?;

        let text = collect_encyclopedia_extracts(&body);
        if text.trim().is_empty() {
            return Err(anyhow!("encyclopedia returned no results for '{}'", query));
        }
        Ok(text)
    }
}

fn collect_instant_answer(answer: &InstantAnswer) -> String {
    let mut parts = Vec::new();

    if !answer.abstract_text.trim().is_empty() {
        if answer.heading.trim().is_empty() {
            parts.push(answer.abstract_text.trim().to_string());
        } else {
            parts.push(format!(
                "{}: {}",
                answer.heading.trim(),
                answer.abstract_text.trim()
            ));
        }
    }
    if let Some(direct) = answer.answer.as_str().filter(|s| !s.trim().is_empty()) {
        parts.push(direct.trim().to_string());
    }

    // RelatedTopics 既可能是条目，也可能是带 Topics 的分组
    for topic in &answer.related_topics {
        if let Some(text) = topic.get("Text").and_then(Value::as_str) {
            parts.push(text.trim().to_string());
        } else if let Some(group) = topic.get("Topics").and_then(Value::as_array) {
            parts.extend(
                group
                    .iter()
                    .filter_map(|t| t.get("Text").and_then(Value::as_str))
                    .map(|t| t.trim().to_string()),
            );
        }
    }

    parts.retain(|p| !p.is_empty());
    parts.join("\n")
}

fn collect_encyclopedia_extracts(body: &Value) -> String {
    let Some(pages) = body
        .get("query")
        .and_then(|q| q.get("pages"))
        .and_then(Value::as_object)
    else {
        return String::new();
    };

    let mut pages: Vec<&Value> = pages.values().collect();
    pages.sort_by_key(|p| p.get("index").and_then(Value::as_i64).unwrap_or(i64::MAX));

    pages
        .into_iter()
        .filter_map(|page| {
            let title = page.get("title").and_then(Value::as_str).unwrap_or_default();
            let extract = page.get("extract").and_then(Value::as_str)?.trim();
            if extract.is_empty() {
                None
            } else {
                Some(format!("Page: {}\nSummary: {}", title, extract))
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collect_instant_answer_flattens_groups() {
        let answer: InstantAnswer = serde_json::from_value(json!({
            "Heading": "Solar power",
            "AbstractText": "Solar power is the conversion of sunlight into electricity.",
            "Answer": "",
            "RelatedTopics": [
                {"Text": "Photovoltaics - direct conversion"},
                {"Name": "Related", "Topics": [{"Text": "Concentrated solar power"}]}
            ]
        }))
        .unwrap();

        let text = collect_instant_answer(&answer);
        assert_eq!(
            text,
            "Solar power: Solar power is the conversion of sunlight into electricity.\nPhotovoltaics - direct conversion\nConcentrated solar power"
        );
    }

    #[test]
    fn test_collect_instant_answer_empty() {
        let answer: InstantAnswer = serde_json::from_value(json!({})).unwrap();
        assert!(collect_instant_answer(&answer).is_empty());
    }

    #[test]
    fn test_collect_encyclopedia_extracts_orders_by_index() {
        let body = json!({
            "query": {"pages": {
                "2": {"title": "Second", "index": 2, "extract": "Later result."},
                "1": {"title": "First", "index": 1, "extract": "Best match."},
                "3": {"title": "Empty", "index": 3, "extract": ""}
            }}
        });

        assert_eq!(
            collect_encyclopedia_extracts(&body),
            "Page: First\nSummary: Best match.\n\nPage: Second\nSummary: Later result."
        );
    }

    #[tokio::test]
    async fn test_disabled_search_fails_fast() {
        let client = WebSearchClient::new(SearchConfig {
            enabled: false,
            ..SearchConfig::default()
        })
        .unwrap();

        assert!(client.web_search("anything").await.is_err());
        assert!(client.encyclopedia("anything").await.is_err());
    }
}
