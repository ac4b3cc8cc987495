use anyhow::{Result, anyhow};
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use std::fs::File;
use std::io::BufWriter;

use super::fonts::FontChoice;
use super::markup::{Block, document_title, parse_markup};
use super::sections::ReportSections;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const PAGE_NUMBER_Y_MM: f32 = 10.0;
const BULLET_INDENT_MM: f32 = 5.0;
const SPACER_MM: f32 = 3.0;
const PT_TO_MM: f32 = 0.3528;

/// 把报告排版为文档字节
pub trait DocumentRenderer: Send + Sync {
    fn render_blocks(&self, title: &str, blocks: &[Block], fonts: &FontChoice) -> Result<Vec<u8>>;

    fn render(&self, sections: &ReportSections, fonts: &FontChoice) -> Result<Vec<u8>> {
        self.render_blocks(&sections.title, &sections.to_blocks(), fonts)
    }

    /// 渲染用户编辑过的纯文本标记
    fn render_markup(&self, markup: &str, fonts: &FontChoice) -> Result<Vec<u8>> {
        let blocks = parse_markup(markup);
        self.render_blocks(&document_title(&blocks), &blocks, fonts)
    }
}

/// 基于 printpdf 的 A4 渲染器
#[derive(Debug, Clone, Default)]
pub struct PdfRenderer;

struct TextStyle {
    size: f32,
    bold: bool,
    indent: f32,
    space_before: f32,
    prefix: &'static str,
}

impl TextStyle {
    fn for_block(block: &Block) -> Option<(Self, &str)> {
        let (style, text) = match block {
            Block::Title(text) => (Self::new(16.0, true, 0.0, 0.0), text),
            Block::Heading(text) => (Self::new(13.0, true, 0.0, 4.0), text),
            Block::Subheading(text) => (Self::new(11.0, true, 0.0, 2.0), text),
            Block::Bullet(text) => (
                TextStyle {
                    prefix: "• ",
                    ..Self::new(10.0, false, BULLET_INDENT_MM, 0.0)
                },
                text,
            ),
            Block::Paragraph(text) => (Self::new(10.0, false, 0.0, 0.0), text),
            Block::Spacer => return None,
        };
        Some((style, text.as_str()))
    }

    fn new(size: f32, bold: bool, indent: f32, space_before: f32) -> Self {
        Self {
            size,
            bold,
            indent,
            space_before,
            prefix: "",
        }
    }

    fn line_height(&self) -> f32 {
        self.size * PT_TO_MM * 1.45
    }

    /// 按平均字宽估算一行可容纳的字符数
    fn max_chars(&self) -> usize {
        let usable = PAGE_WIDTH_MM - 2.0 * MARGIN_MM - self.indent;
        let average_char_width = self.size * PT_TO_MM * 0.5;
        ((usable / average_char_width) as usize).max(10)
    }
}

struct LoadedFonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl LoadedFonts {
    fn load(doc: &PdfDocumentReference, choice: &FontChoice) -> Result<Self> {
        if let FontChoice::External { regular, bold } = choice {
            match Self::load_external(doc, regular, bold) {
                Ok(fonts) => return Ok(fonts),
                Err(err) => {
                    tracing::warn!(error = %err, "外部字体加载失败，使用内置字体");
                }
            }
        }

        Ok(Self {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| anyhow!("PDF font error: {e}"))?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(|e| anyhow!("PDF font error: {e}"))?,
        })
    }

    fn load_external(
        doc: &PdfDocumentReference,
        regular: &std::path::Path,
        bold: &std::path::Path,
    ) -> Result<Self> {
        let regular = doc
            .add_external_font(File::open(regular)?)
            .map_err(|e| anyhow!("PDF font error: {e}"))?;
        let bold = doc
            .add_external_font(File::open(bold)?)
            .map_err(|e| anyhow!("PDF font error: {e}"))?;
        Ok(Self { regular, bold })
    }
}

/// 逐行写入并在页底自动换页
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    fonts: &'a LoadedFonts,
    layer: PdfLayerReference,
    page_number: usize,
    y: f32,
}

impl<'a> PageWriter<'a> {
    fn new(doc: &'a PdfDocumentReference, fonts: &'a LoadedFonts, layer: PdfLayerReference) -> Self {
        let writer = Self {
            doc,
            fonts,
            layer,
            page_number: 1,
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        };
        writer.stamp_page_number();
        writer
    }

    fn stamp_page_number(&self) {
        self.layer.use_text(
            self.page_number.to_string(),
            9.0,
            Mm(PAGE_WIDTH_MM - MARGIN_MM),
            Mm(PAGE_NUMBER_Y_MM),
            &self.fonts.regular,
        );
    }

    fn new_page(&mut self) {
        self.page_number += 1;
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            format!("Page {}", self.page_number),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT_MM - MARGIN_MM;
        self.stamp_page_number();
    }

    fn advance(&mut self, height: f32) {
        if self.y - height < MARGIN_MM {
            self.new_page();
        } else {
            self.y -= height;
        }
    }

    fn write_block(&mut self, style: &TextStyle, text: &str) {
        if style.space_before > 0.0 {
            self.advance(style.space_before);
        }

        let font = if style.bold {
            &self.fonts.bold
        } else {
            &self.fonts.regular
        };
        let text = format!("{}{}", style.prefix, text);
        for line in wrap_text(&text, style.max_chars()) {
            self.advance(style.line_height());
            self.layer.use_text(
                line,
                style.size,
                Mm(MARGIN_MM + style.indent),
                Mm(self.y),
                font,
            );
        }
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render_blocks(&self, title: &str, blocks: &[Block], fonts: &FontChoice) -> Result<Vec<u8>> {
        let (doc, page1, layer1) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let loaded = LoadedFonts::load(&doc, fonts)?;
        let layer = doc.get_page(page1).get_layer(layer1);

        {
            let mut writer = PageWriter::new(&doc, &loaded, layer);
            for block in blocks {
                match TextStyle::for_block(block) {
                    Some((style, text)) => writer.write_block(&style, text),
                    None => writer.advance(SPACER_MM),
                }
            }
        }

        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf)
            .map_err(|e| anyhow!("PDF save error: {e}"))?;
        buf.into_inner()
            .map_err(|e| anyhow!("PDF buffer error: {e}"))
    }
}

/// 按单词折行，字符数按 Unicode 标量计算
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();
        if current_chars + word_chars + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(word);
        current_chars += word_chars;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("one two three four five", 9);
        assert_eq!(lines, vec!["one two", "three", "four five"]);
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn test_wrap_text_counts_characters_not_bytes() {
        let lines = wrap_text("ऊर्जा ऊर्जा", 11);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_render_markup_produces_pdf() {
        let markup = "# Solar Energy\n\n## Introduction\nSunlight is abundant.\n\n### Insights\n- Cheaper panels";
        let bytes = PdfRenderer
            .render_markup(markup, &FontChoice::Builtin)
            .unwrap();

        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_long_document_spans_pages() {
        let paragraph = "Renewable energy adoption keeps accelerating worldwide. ".repeat(40);
        let markup = format!("# Long\n\n{}", vec![paragraph; 12].join("\n\n"));

        let short = PdfRenderer
            .render_markup("# Long\n\nshort", &FontChoice::Builtin)
            .unwrap();
        let long = PdfRenderer
            .render_markup(&markup, &FontChoice::Builtin)
            .unwrap();

        assert!(long.len() > short.len());
    }

    #[test]
    fn test_unreadable_external_font_falls_back() {
        let fonts = FontChoice::External {
            regular: "/nonexistent/Regular.ttf".into(),
            bold: "/nonexistent/Bold.ttf".into(),
        };
        let bytes = PdfRenderer.render_markup("# Title", &fonts).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
