use anyhow::{Result, bail};
use dashmap::DashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::RenderConfig;
use crate::i18n::Language;

/// 渲染使用的字体
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontChoice {
    /// PDF 内置的 Helvetica，只覆盖拉丁字符
    Builtin,
    /// 外部 TrueType 字体
    External { regular: PathBuf, bold: PathBuf },
}

/// 按语言查找字体，缺失时按配置下载，都不可用时回退到内置字体
pub struct FontResolver {
    config: RenderConfig,
    http: reqwest::Client,
    resolved: DashMap<Language, FontChoice>,
}

impl FontResolver {
    pub fn new(config: RenderConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            config,
            http,
            resolved: DashMap::new(),
        })
    }

    /// 解析语言对应的字体，结果按语言缓存
    pub async fn resolve(&self, language: Language) -> FontChoice {
        if let Some(choice) = self.resolved.get(&language) {
            return choice.clone();
        }

        let family = language.font_family();
        let choice = match self.locate(family).await {
            Ok(choice) => choice,
            Err(err) => {
                tracing::warn!(
                    language = %language,
                    family,
                    error = %err,
                    "字体不可用，回退到内置字体"
                );
                FontChoice::Builtin
            }
        };

        self.resolved.insert(language, choice.clone());
        choice
    }

    async fn locate(&self, family: &str) -> Result<FontChoice> {
        let regular = self.ensure_font(family, "Regular").await?;
        // 粗体缺失时使用常规字重
        let bold = match self.ensure_font(family, "Bold").await {
            Ok(path) => path,
            Err(err) => {
                tracing::debug!(family, error = %err, "粗体字体不可用");
                regular.clone()
            }
        };
        Ok(FontChoice::External { regular, bold })
    }

    fn font_path(&self, family: &str, style: &str) -> PathBuf {
        self.config
            .fonts_dir
            .join(format!("{}-{}.ttf", family, style))
    }

    async fn ensure_font(&self, family: &str, style: &str) -> Result<PathBuf> {
        let path = self.font_path(family, style);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(path);
        }
        if !self.config.download_fonts {
            bail!("font file {} not found", path.display());
        }

        let url = self
            .config
            .font_url_template
            .replace("{family}", family)
            .replace("{style}", style);
        tracing::info!(family, style, url = %url, "下载字体");

        let bytes = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        tokio::fs::create_dir_all(&self.config.fonts_dir).await?;
        tokio::fs::write(&path, &bytes).await?;

        Ok(path)
    }
}
