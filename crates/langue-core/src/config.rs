use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Language codes following ISO 639-1 with regional variants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable English name, used in prompts.
    pub fn display_name(&self) -> &'static str {
        language_name(self.as_str())
    }
}

fn default_source_lang() -> Lang {
    Lang::new(DEFAULT_SOURCE_LANG)
}

fn default_target_lang() -> Lang {
    Lang::new(DEFAULT_TARGET_LANG)
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// OpenAI-compatible chat backend (Groq, OpenAI, llama.cpp, Ollama, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Model used for image description
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl LlmConfig {
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key,
            model: model.into(),
            ..Default::default()
        }
    }
}

fn default_api_base() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama3-8b-8192".to_string()
}

fn default_vision_model() -> String {
    "meta-llama/llama-4-scout-17b-16e-instruct".to_string()
}

const fn default_temperature() -> f32 {
    0.3
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_retry_count() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            model: default_model(),
            vision_model: default_vision_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Text-to-speech backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_model")]
    pub model: String,
    #[serde(default = "default_voice")]
    pub default_voice: String,
    /// Voice per language code; languages not listed use `default_voice`
    #[serde(default = "default_voices")]
    pub voices: BTreeMap<String, String>,
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Characters sent per synthesis call
    #[serde(default = "default_speech_chunk_len")]
    pub max_chunk_len: usize,
}

impl SpeechConfig {
    pub fn voice_for(&self, lang: &Lang) -> &str {
        self.voices
            .get(lang.as_str())
            .map_or(self.default_voice.as_str(), String::as_str)
    }
}

fn default_speech_model() -> String {
    "tts-1".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_voices() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("fr".to_string(), "alloy".to_string()),
        ("en".to_string(), "nova".to_string()),
    ])
}

const fn default_speed() -> f32 {
    1.0
}

const fn default_speech_chunk_len() -> usize {
    4000
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            model: default_speech_model(),
            default_voice: default_voice(),
            voices: default_voices(),
            speed: default_speed(),
            max_chunk_len: default_speech_chunk_len(),
        }
    }
}

/// Document translation and rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Maximum characters per translation call
    #[serde(default = "default_max_chunk_len")]
    pub max_chunk_len: usize,
    /// Maximum extracted characters accepted for translation
    #[serde(default = "default_size_limit")]
    pub size_limit: usize,
    /// TrueType font with the target scripts
    #[serde(default = "default_font_path")]
    pub font_path: PathBuf,
    /// Font size in points
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// Row height in millimetres
    #[serde(default = "default_line_height")]
    pub line_height: f32,
    /// Page margin in millimetres, applied on all sides
    #[serde(default = "default_margin")]
    pub margin: f32,
    /// Chunk translations in flight at once (1 = sequential)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-chunk timeout in seconds (0 = no timeout)
    #[serde(default = "default_chunk_timeout_secs")]
    pub chunk_timeout_secs: u64,
}

/// Characters per chunk, below the ~5000 limit of common translation APIs
pub const DEFAULT_MAX_CHUNK_LEN: usize = 4500;
/// Default extracted-text limit for document translation
pub const DEFAULT_SIZE_LIMIT: usize = 5000;

const fn default_max_chunk_len() -> usize {
    DEFAULT_MAX_CHUNK_LEN
}

const fn default_size_limit() -> usize {
    DEFAULT_SIZE_LIMIT
}

fn default_font_path() -> PathBuf {
    PathBuf::from("DejaVuSans.ttf")
}

const fn default_font_size() -> f32 {
    12.0
}

const fn default_line_height() -> f32 {
    10.0
}

const fn default_margin() -> f32 {
    15.0
}

const fn default_concurrency() -> usize {
    1
}

const fn default_chunk_timeout_secs() -> u64 {
    60
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_chunk_len: default_max_chunk_len(),
            size_limit: default_size_limit(),
            font_path: default_font_path(),
            font_size: default_font_size(),
            line_height: default_line_height(),
            margin: default_margin(),
            concurrency: default_concurrency(),
            chunk_timeout_secs: default_chunk_timeout_secs(),
        }
    }
}

/// Chat assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Non-system messages kept per conversation
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Sessions idle longer than this are dropped
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
}

fn default_system_prompt() -> String {
    "You are a helpful, friendly and precise AI assistant.".to_string()
}

const fn default_max_history() -> usize {
    40
}

const fn default_session_idle_secs() -> u64 {
    3600
}

const fn default_max_sessions() -> u64 {
    10_000
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_history: default_max_history(),
            session_idle_secs: default_session_idle_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source language
    #[serde(default = "default_source_lang")]
    pub source_lang: Lang,

    /// Target language
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub document: DocumentConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            llm: LlmConfig::default(),
            speech: SpeechConfig::default(),
            document: DocumentConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

/// Prefix for environment overrides, e.g. `LANGUE__DOCUMENT__SIZE_LIMIT=8000`
pub const ENV_PREFIX: &str = "LANGUE";

impl AppConfig {
    /// Load configuration from a single TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the user config, `./config.toml` and `LANGUE__*` environment
    /// variables, later sources overriding earlier ones.
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("langue").join("config.toml");
            tracing::debug!("Looking for config at {}", user_config.display());
            builder = builder.add_source(
                config::File::new(&user_config.to_string_lossy(), config::FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder
            .add_source(config::File::new("config.toml", config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| Error::ConfigLoad(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the pipeline or the layout unusable.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| {
            Err(Error::ConfigInvalid {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        };

        let doc = &self.document;
        if doc.max_chunk_len == 0 {
            return invalid("document.max_chunk_len", "must be greater than 0");
        }
        if doc.concurrency == 0 {
            return invalid("document.concurrency", "must be at least 1");
        }
        if doc.font_size <= 0.0 {
            return invalid("document.font_size", "must be positive");
        }
        if doc.line_height <= 0.0 {
            return invalid("document.line_height", "must be positive");
        }
        let area = crate::pdf::RenderOptions::from_config(doc);
        if doc.margin < 0.0 || area.text_width() <= 0.0 {
            return invalid("document.margin", "leaves no usable page area");
        }
        if doc.line_height > area.text_height() {
            return invalid("document.line_height", "is taller than the usable page height");
        }
        if self.speech.max_chunk_len == 0 {
            return invalid("speech.max_chunk_len", "must be greater than 0");
        }
        if self.llm.retry_count == 0 {
            return invalid("llm.retry_count", "must be at least 1");
        }
        Ok(())
    }
}

/// A language option for UI dropdowns
#[derive(Debug, Clone, Serialize)]
pub struct LanguageOption {
    /// ISO language code (e.g., "en", "fr", "zh-CN")
    pub code: &'static str,
    /// Display name (e.g., "English", "French")
    pub name: &'static str,
    /// Flag emoji
    pub flag: &'static str,
}

pub fn source_languages() -> Vec<LanguageOption> {
    ["fr", "en", "es", "zh-CN", "ar", "de", "it", "pt"]
        .into_iter()
        .map(language_option)
        .collect()
}

/// Languages available as translation target.
/// Rendering support depends on the configured font's coverage.
pub fn target_languages() -> Vec<LanguageOption> {
    ["fr", "en", "es", "de", "it", "pt", "zh-CN", "ar"]
        .into_iter()
        .map(language_option)
        .collect()
}

fn language_option(code: &'static str) -> LanguageOption {
    LanguageOption {
        code,
        name: language_name(code),
        flag: flag_for_lang(code),
    }
}

/// Default source language code
pub const DEFAULT_SOURCE_LANG: &str = "fr";
/// Default target language code
pub const DEFAULT_TARGET_LANG: &str = "en";

/// Convert language code to human-readable name for prompts
pub fn language_name(code: &str) -> &'static str {
    match code {
        "en" => "English",
        "fr" => "French",
        "es" => "Spanish",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ar" => "Arabic",
        "zh-CN" => "Simplified Chinese",
        "zh-TW" => "Traditional Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "ru" => "Russian",
        "auto" => "Auto",
        // The LLM still understands most ISO codes
        _ => "the specified language",
    }
}

/// Get flag emoji for a language code.
///
/// Returns a globe emoji for unknown language codes.
pub fn flag_for_lang(code: &str) -> &'static str {
    match code {
        "fr" => "🇫🇷",
        "en" => "🇬🇧",
        "de" => "🇩🇪",
        "es" => "🇪🇸",
        "it" => "🇮🇹",
        "pt" => "🇵🇹",
        "zh-CN" => "🇨🇳",
        "ar" => "🇸🇦",
        "auto" => "🔍",
        _ => "🌐",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.document.max_chunk_len, 4500);
        assert_eq!(config.document.size_limit, 5000);
        assert!((config.document.margin - 15.0).abs() < f32::EPSILON);
        assert_eq!(config.document.concurrency, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            target_lang = "de"

            [document]
            size_limit = 8000
            "#,
        )
        .unwrap();
        assert_eq!(config.target_lang.as_str(), "de");
        assert_eq!(config.source_lang.as_str(), "fr");
        assert_eq!(config.document.size_limit, 8000);
        assert_eq!(config.document.max_chunk_len, 4500);
        assert_eq!(config.llm.model, "llama3-8b-8192");
    }

    #[test]
    fn test_validate_rejects_zero_chunk_len() {
        let mut config = AppConfig::default();
        config.document.max_chunk_len = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { ref field, .. } if field == "document.max_chunk_len"));
    }

    #[test]
    fn test_validate_rejects_huge_margin() {
        let mut config = AppConfig::default();
        config.document.margin = 120.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_counts_cell_padding_in_margin() {
        let mut config = AppConfig::default();
        config.document.margin = 104.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { ref field, .. } if field == "document.margin"));

        config.document.margin = 103.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_line_taller_than_page() {
        let mut config = AppConfig::default();
        config.document.line_height = 270.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { ref field, .. } if field == "document.line_height"));

        config.document.line_height = 267.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_voice_lookup() {
        let speech = SpeechConfig::default();
        assert_eq!(speech.voice_for(&Lang::new("en")), "nova");
        assert_eq!(speech.voice_for(&Lang::new("de")), "alloy");
    }

    #[test]
    fn test_language_lists() {
        assert_eq!(source_languages().len(), 8);
        assert!(target_languages().iter().any(|l| l.code == "ar"));
        assert_eq!(language_name("zh-CN"), "Simplified Chinese");
        assert_eq!(language_name("xx"), "the specified language");
        assert_eq!(flag_for_lang("xx"), "🌐");
    }
}
