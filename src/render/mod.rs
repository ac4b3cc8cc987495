//! 报告组装与 PDF 渲染

use anyhow::{Context, Result};
use bytes::Bytes;
use std::sync::Arc;

use crate::config::Config;
use crate::generator::state::ReportState;
use crate::i18n::Language;
use crate::translation::TranslationService;

pub mod fonts;
pub mod markup;
pub mod pdf;
pub mod sections;

pub use fonts::{FontChoice, FontResolver};
pub use pdf::{DocumentRenderer, PdfRenderer};
pub use sections::{ReportSections, SubtopicSection};

/// 一次报告生成的最终产物
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub language: Language,
    /// 用户语言的文档
    pub document: Bytes,
    /// 用户语言的可编辑纯文本
    pub plain_text: String,
    /// 工作语言的文档，供问答使用
    pub canonical_document: Bytes,
}

/// 把流水线状态组装成多语言文档
pub struct Assembler {
    renderer: Arc<dyn DocumentRenderer>,
    fonts: FontResolver,
    translation: Arc<TranslationService>,
    max_parallels: usize,
}

impl Assembler {
    pub fn new(
        renderer: Arc<dyn DocumentRenderer>,
        fonts: FontResolver,
        translation: Arc<TranslationService>,
        max_parallels: usize,
    ) -> Self {
        Self {
            renderer,
            fonts,
            translation,
            max_parallels: max_parallels.max(1),
        }
    }

    pub fn from_config(config: &Config, translation: Arc<TranslationService>) -> Result<Self> {
        Ok(Self::new(
            Arc::new(PdfRenderer),
            FontResolver::new(config.render.clone())?,
            translation,
            config.pipeline.max_parallels,
        ))
    }

    pub async fn sections(&self, state: &ReportState, language: Language) -> ReportSections {
        ReportSections::build(state, language, &self.translation, self.max_parallels).await
    }

    /// 在阻塞线程中渲染章节
    pub async fn render(&self, sections: ReportSections) -> Result<Bytes> {
        let fonts = self.fonts.resolve(sections.language).await;
        let renderer = self.renderer.clone();

        let document = tokio::task::spawn_blocking(move || renderer.render(&sections, &fonts))
            .await
            .context("PDF rendering task failed")??;
        Ok(Bytes::from(document))
    }

    /// 从用户编辑过的纯文本重新渲染
    pub async fn render_from_plain_text(&self, markup: &str, language: Language) -> Result<Bytes> {
        let fonts = self.fonts.resolve(language).await;
        let renderer = self.renderer.clone();
        let markup = markup.to_string();

        let document = tokio::task::spawn_blocking(move || renderer.render_markup(&markup, &fonts))
            .await
            .context("PDF rendering task failed")??;
        Ok(Bytes::from(document))
    }

    /// 生成工作语言文档；请求语言不同时再生成译文文档与纯文本
    pub async fn assemble(&self, state: &ReportState, language: Language) -> Result<ReportArtifact> {
        let canonical_sections = self.sections(state, Language::CANONICAL).await;
        let canonical_text = canonical_sections.to_plain_text();
        let canonical_document = self
            .render(canonical_sections)
            .await
            .context("Failed to render canonical document")?;

        if language.is_canonical() {
            return Ok(ReportArtifact {
                language,
                document: canonical_document.clone(),
                plain_text: canonical_text,
                canonical_document,
            });
        }

        let localized_sections = self.sections(state, language).await;
        let plain_text = localized_sections.to_plain_text();
        let document = self
            .render(localized_sections)
            .await
            .with_context(|| format!("Failed to render {} document", language))?;

        Ok(ReportArtifact {
            language,
            document,
            plain_text,
            canonical_document,
        })
    }
}
