use crate::i18n::Language;
use crate::render::ReportArtifact;

/// 流水线逐阶段累积的报告状态。子主题相关的列表按下标与 `subtopics` 对齐。
#[derive(Debug, Clone, Default)]
pub struct ReportState {
    pub topic: String,
    pub language: Language,
    pub pages: u32,
    pub heading: Option<String>,
    pub introduction: Option<String>,
    pub subtopics: Vec<String>,
    /// 每个子主题的原始素材
    pub contents: Vec<String>,
    pub summaries: Vec<String>,
    /// 每个子主题的洞察，`- ` 开头的多行文本
    pub insights: Vec<String>,
    pub conclusion: Option<String>,
    pub artifact: Option<ReportArtifact>,
}

/// 单个阶段产出的部分更新
#[derive(Debug, Clone)]
pub enum StageUpdate {
    Introduction {
        heading: String,
        introduction: String,
    },
    Plan {
        heading: String,
        subtopics: Vec<String>,
    },
    Contents(Vec<String>),
    Summaries(Vec<String>),
    Insights(Vec<String>),
    Conclusion(String),
    Assembled(ReportArtifact),
}

impl ReportState {
    pub fn new(topic: impl Into<String>, language: Language, pages: u32) -> Self {
        Self {
            topic: topic.into(),
            language,
            pages,
            ..Self::default()
        }
    }

    /// 合并阶段结果，同名字段直接替换
    pub fn apply(&mut self, update: StageUpdate) {
        match update {
            StageUpdate::Introduction {
                heading,
                introduction,
            } => {
                self.heading = Some(heading);
                self.introduction = Some(introduction);
            }
            StageUpdate::Plan { heading, subtopics } => {
                self.heading = Some(heading);
                self.subtopics = subtopics;
            }
            StageUpdate::Contents(contents) => self.contents = contents,
            StageUpdate::Summaries(summaries) => self.summaries = summaries,
            StageUpdate::Insights(insights) => self.insights = insights,
            StageUpdate::Conclusion(conclusion) => self.conclusion = Some(conclusion),
            StageUpdate::Assembled(artifact) => self.artifact = Some(artifact),
        }
    }

    /// 子主题与其原始素材
    pub fn subtopic_contents(&self) -> impl Iterator<Item = (&str, &str)> {
        self.subtopics.iter().enumerate().map(|(index, subtopic)| {
            (
                subtopic.as_str(),
                self.contents.get(index).map(String::as_str).unwrap_or_default(),
            )
        })
    }

    /// 子主题与其摘要
    pub fn subtopic_summaries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.subtopics.iter().enumerate().map(|(index, subtopic)| {
            (
                subtopic.as_str(),
                self.summaries.get(index).map(String::as_str).unwrap_or_default(),
            )
        })
    }
}
