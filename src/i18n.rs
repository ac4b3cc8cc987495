use serde::{Deserialize, Serialize};

/// 报告支持的语言
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[serde(rename = "English")]
    #[default]
    English,
    #[serde(rename = "Hindi")]
    Hindi,
    #[serde(rename = "Tamil")]
    Tamil,
    #[serde(rename = "Telugu")]
    Telugu,
    #[serde(rename = "Bengali")]
    Bengali,
    #[serde(rename = "Marathi")]
    Marathi,
    #[serde(rename = "Spanish")]
    Spanish,
    #[serde(rename = "French")]
    French,
    #[serde(rename = "German")]
    German,
    #[serde(rename = "Italian")]
    Italian,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "hindi" | "hi" => Ok(Language::Hindi),
            "tamil" | "ta" => Ok(Language::Tamil),
            "telugu" | "te" => Ok(Language::Telugu),
            "bengali" | "bn" => Ok(Language::Bengali),
            "marathi" | "mr" => Ok(Language::Marathi),
            "spanish" | "es" => Ok(Language::Spanish),
            "french" | "fr" => Ok(Language::French),
            "german" | "de" => Ok(Language::German),
            "italian" | "it" => Ok(Language::Italian),
            _ => Err(format!("Unsupported language: {}", s)),
        }
    }
}

impl Language {
    pub const ALL: [Language; 10] = [
        Language::English,
        Language::Hindi,
        Language::Tamil,
        Language::Telugu,
        Language::Bengali,
        Language::Marathi,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
    ];

    /// 内部推理、检索与提示词使用的工作语言
    pub const CANONICAL: Language = Language::English;

    /// 语言名称，同时也是缓存键中使用的形式
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Tamil => "Tamil",
            Language::Telugu => "Telugu",
            Language::Bengali => "Bengali",
            Language::Marathi => "Marathi",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Italian => "Italian",
        }
    }

    /// ISO 639-1 代码，翻译服务使用
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Tamil => "ta",
            Language::Telugu => "te",
            Language::Bengali => "bn",
            Language::Marathi => "mr",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::German => "de",
            Language::Italian => "it",
        }
    }

    pub fn is_canonical(&self) -> bool {
        *self == Self::CANONICAL
    }

    /// 渲染该语言所需的 Noto 字体族
    pub fn font_family(&self) -> &'static str {
        match self {
            Language::Hindi | Language::Marathi => "NotoSansDevanagari",
            Language::Tamil => "NotoSansTamil",
            Language::Telugu => "NotoSansTelugu",
            Language::Bengali => "NotoSansBengali",
            _ => "NotoSans",
        }
    }

    /// 是否需要非拉丁字形才能正确显示
    pub fn needs_script_font(&self) -> bool {
        self.font_family() != "NotoSans"
    }
}
