use serde::Serialize;

use super::markup::{Block, parse_markup};
use crate::generator::state::ReportState;
use crate::i18n::Language;
use crate::translation::TranslationService;
use crate::utils::text::{clean_heading, clean_text, insight_items};
use crate::utils::threads::do_parallel_with_limit;

/// 报告中的一个子主题章节
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtopicSection {
    pub heading: String,
    pub summary: String,
    pub insights_label: String,
    pub insights: Vec<String>,
}

/// 已翻译、已清洗的报告结构，可渲染为 PDF 或导出为可编辑文本
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSections {
    pub language: Language,
    pub title: String,
    pub introduction_label: String,
    pub introduction: String,
    pub subtopics: Vec<SubtopicSection>,
    pub conclusion_label: String,
    pub conclusion: String,
}

impl ReportSections {
    /// 由流水线状态构建指定语言的章节，标签与正文都经过翻译服务
    pub async fn build(
        state: &ReportState,
        language: Language,
        translation: &TranslationService,
        max_parallels: usize,
    ) -> Self {
        let title_source = state.heading.as_deref().unwrap_or(&state.topic);
        let title = match clean_heading(&translation.translate(title_source, language).await) {
            translated if translated.is_empty() => clean_heading(title_source),
            translated => translated,
        };

        let introduction_label = translation.translate("Introduction", language).await;
        let introduction = clean_text(
            &translation
                .translate(state.introduction.as_deref().unwrap_or_default(), language)
                .await,
        );
        let insights_label = translation.translate("Insights", language).await;

        let section_futures: Vec<_> = state
            .subtopics
            .iter()
            .enumerate()
            .map(|(index, subtopic)| {
                let insights_label = insights_label.clone();
                async move {
                    let summary = state.summaries.get(index).map(String::as_str);
                    let insights = state.insights.get(index).map(String::as_str);

                    let heading = clean_heading(&translation.translate(subtopic, language).await);
                    let summary = clean_text(
                        &translation
                            .translate(summary.unwrap_or_default(), language)
                            .await,
                    );
                    let insights = insight_items(
                        &translation
                            .translate(insights.unwrap_or_default(), language)
                            .await,
                    );

                    SubtopicSection {
                        heading,
                        summary,
                        insights_label,
                        insights,
                    }
                }
            })
            .collect();
        let subtopics = do_parallel_with_limit(section_futures, max_parallels).await;

        let conclusion_label = translation.translate("Conclusion", language).await;
        let conclusion = clean_text(
            &translation
                .translate(state.conclusion.as_deref().unwrap_or_default(), language)
                .await,
        );

        Self {
            language,
            title,
            introduction_label,
            introduction,
            subtopics,
            conclusion_label,
            conclusion,
        }
    }

    /// 导出为可编辑的纯文本标记
    pub fn to_plain_text(&self) -> String {
        let mut lines = vec![
            format!("# {}", self.title),
            String::new(),
            format!("## {}", self.introduction_label),
            self.introduction.clone(),
            String::new(),
        ];

        for (index, section) in self.subtopics.iter().enumerate() {
            lines.push(format!("## {}. {}", index + 1, section.heading));
            lines.push(section.summary.clone());
            lines.push(String::new());
            lines.push(format!("### {}", section.insights_label));
            lines.extend(section.insights.iter().map(|line| format!("- {}", line)));
            lines.push(String::new());
        }

        lines.push(format!("## {}", self.conclusion_label));
        lines.push(self.conclusion.clone());

        lines.join("\n")
    }

    pub fn to_blocks(&self) -> Vec<Block> {
        parse_markup(&self.to_plain_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> ReportState {
        ReportState {
            heading: Some("\"Solar Energy\"".to_string()),
            introduction: Some("Solar **energy** is growing.".to_string()),
            subtopics: vec!["Costs".to_string(), "Storage".to_string()],
            summaries: vec!["Prices fell.".to_string(), "Batteries improved.".to_string()],
            insights: vec![
                "- Cheaper panels\n- More installs".to_string(),
                "- Longer life".to_string(),
            ],
            conclusion: Some("The outlook is bright.".to_string()),
            ..ReportState::new("solar energy", Language::English, 2)
        }
    }

    #[tokio::test]
    async fn test_build_canonical_sections() {
        let translation = TranslationService::disabled();
        let sections =
            ReportSections::build(&sample_state(), Language::English, &translation, 2).await;

        assert_eq!(sections.title, "Solar Energy");
        assert_eq!(sections.introduction, "Solar energy is growing.");
        assert_eq!(sections.subtopics.len(), 2);
        assert_eq!(
            sections.subtopics[0].insights,
            vec!["Cheaper panels", "More installs"]
        );
        assert_eq!(sections.subtopics[1].summary, "Batteries improved.");
    }

    #[tokio::test]
    async fn test_plain_text_layout() {
        let translation = TranslationService::disabled();
        let sections =
            ReportSections::build(&sample_state(), Language::English, &translation, 2).await;

        let text = sections.to_plain_text();
        assert!(text.starts_with("# Solar Energy\n\n## Introduction\nSolar energy is growing."));
        assert!(text.contains("## 1. Costs\nPrices fell.\n\n### Insights\n- Cheaper panels\n- More installs"));
        assert!(text.contains("## 2. Storage"));
        assert!(text.ends_with("## Conclusion\nThe outlook is bright."));
    }

    #[tokio::test]
    async fn test_missing_heading_uses_topic() {
        let translation = TranslationService::disabled();
        let state = ReportState::new("wind power", Language::English, 2);
        let sections = ReportSections::build(&state, Language::English, &translation, 1).await;

        assert_eq!(sections.title, "wind power");
        assert!(sections.subtopics.is_empty());
    }
}
