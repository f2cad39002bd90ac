//! Data models and structures
//!
//! Defines the enumerated request dimensions (action, media, model,
//! language), trigger signals, task input payloads, and user settings.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Slot index for the two user-configurable custom actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomSlot {
    One,
    Two,
}

/// What the model is asked to do with the captured content.
///
/// Determines both the system prompt and the per-model character budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Summarize,
    Translate,
    /// Custom action applied when no text is selected (whole page input).
    NoTextCustom(CustomSlot),
    /// Custom action applied to the current text selection.
    TextCustom(CustomSlot),
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Summarize => "summarize",
            ActionType::Translate => "translate",
            ActionType::NoTextCustom(CustomSlot::One) => "noTextCustom1",
            ActionType::NoTextCustom(CustomSlot::Two) => "noTextCustom2",
            ActionType::TextCustom(CustomSlot::One) => "textCustom1",
            ActionType::TextCustom(CustomSlot::Two) => "textCustom2",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "summarize" => Ok(ActionType::Summarize),
            "translate" => Ok(ActionType::Translate),
            "noTextCustom1" => Ok(ActionType::NoTextCustom(CustomSlot::One)),
            "noTextCustom2" => Ok(ActionType::NoTextCustom(CustomSlot::Two)),
            "textCustom1" => Ok(ActionType::TextCustom(CustomSlot::One)),
            "textCustom2" => Ok(ActionType::TextCustom(CustomSlot::Two)),
            other => Err(Error::Generic(format!("Unknown action type: {}", other))),
        }
    }
}

impl Serialize for ActionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Kind of content the pipeline acquired from the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Text,
    Captions,
    Image,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Text => "text",
            MediaType::Captions => "captions",
            MediaType::Image => "image",
        }
    }
}

/// Payload produced by the content source resolver.
///
/// Text and captions flow through the chunker; images are passed through
/// untouched as a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskInput {
    Text(String),
    /// Base64 data URI for the captured viewport.
    Image(String),
}

impl TaskInput {
    pub fn is_empty(&self) -> bool {
        match self {
            TaskInput::Text(text) => text.is_empty(),
            TaskInput::Image(data) => data.is_empty(),
        }
    }
}

/// What started the pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trigger {
    /// Plain invocation (popup opened, run pressed).
    #[default]
    Open,
    /// Dedicated screenshot command.
    Screenshot,
    /// One of the two custom-action commands.
    Custom(CustomSlot),
}

impl FromStr for Trigger {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "open" => Ok(Trigger::Open),
            "screenshot" => Ok(Trigger::Screenshot),
            "custom-action-1" => Ok(Trigger::Custom(CustomSlot::One)),
            "custom-action-2" => Ok(Trigger::Custom(CustomSlot::Two)),
            other => Err(Error::Generic(format!("Unknown trigger: {}", other))),
        }
    }
}

/// Known generation model identifiers.
///
/// The character-budget table in [`crate::limits`] is keyed on this enum;
/// unknown identifiers are rejected at parse time so no lookup can miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelId {
    Gemini20Flash,
    Gemini15Pro,
    Gemini15Flash,
    Gemini15Flash8b,
    Gemini20FlashLite,
    Gemini20ProExp,
    Gemini20FlashExp,
}

impl ModelId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Gemini20Flash => "gemini-2.0-flash",
            ModelId::Gemini15Pro => "gemini-1.5-pro",
            ModelId::Gemini15Flash => "gemini-1.5-flash",
            ModelId::Gemini15Flash8b => "gemini-1.5-flash-8b",
            ModelId::Gemini20FlashLite => "gemini-2.0-flash-lite-preview-02-05",
            ModelId::Gemini20ProExp => "gemini-2.0-pro-exp-02-05",
            ModelId::Gemini20FlashExp => "gemini-2.0-flash-exp",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix("models/").unwrap_or(s);
        match s {
            "gemini-2.0-flash" => Ok(ModelId::Gemini20Flash),
            "gemini-1.5-pro" => Ok(ModelId::Gemini15Pro),
            "gemini-1.5-flash" => Ok(ModelId::Gemini15Flash),
            "gemini-1.5-flash-8b" => Ok(ModelId::Gemini15Flash8b),
            "gemini-2.0-flash-lite-preview-02-05" => Ok(ModelId::Gemini20FlashLite),
            "gemini-2.0-pro-exp-02-05" => Ok(ModelId::Gemini20ProExp),
            "gemini-2.0-flash-exp" => Ok(ModelId::Gemini20FlashExp),
            other => Err(Error::UnknownModel(other.to_string())),
        }
    }
}

impl Serialize for ModelId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ModelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Target language for translation/summarization output.
///
/// `Custom` is the user-named language slot ("zz").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCode {
    En,
    De,
    Es,
    Fr,
    It,
    PtBr,
    Vi,
    Ru,
    Ar,
    Hi,
    Bn,
    ZhCn,
    ZhTw,
    Ja,
    Ko,
    Custom,
}

impl LanguageCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::En => "en",
            LanguageCode::De => "de",
            LanguageCode::Es => "es",
            LanguageCode::Fr => "fr",
            LanguageCode::It => "it",
            LanguageCode::PtBr => "pt_br",
            LanguageCode::Vi => "vi",
            LanguageCode::Ru => "ru",
            LanguageCode::Ar => "ar",
            LanguageCode::Hi => "hi",
            LanguageCode::Bn => "bn",
            LanguageCode::ZhCn => "zh_cn",
            LanguageCode::ZhTw => "zh_tw",
            LanguageCode::Ja => "ja",
            LanguageCode::Ko => "ko",
            LanguageCode::Custom => "zz",
        }
    }

    /// Human-readable name used inside system prompts.
    ///
    /// The custom slot resolves to the user-configured language name.
    pub fn display_name(&self, user_language: &str) -> String {
        match self {
            LanguageCode::En => "English".to_string(),
            LanguageCode::De => "German".to_string(),
            LanguageCode::Es => "Spanish".to_string(),
            LanguageCode::Fr => "French".to_string(),
            LanguageCode::It => "Italian".to_string(),
            LanguageCode::PtBr => "Brazilian Portuguese".to_string(),
            LanguageCode::Vi => "Vietnamese".to_string(),
            LanguageCode::Ru => "Russian".to_string(),
            LanguageCode::Ar => "Arabic".to_string(),
            LanguageCode::Hi => "Hindi".to_string(),
            LanguageCode::Bn => "Bengali".to_string(),
            LanguageCode::ZhCn => "Simplified Chinese".to_string(),
            LanguageCode::ZhTw => "Traditional Chinese".to_string(),
            LanguageCode::Ja => "Japanese".to_string(),
            LanguageCode::Ko => "Korean".to_string(),
            LanguageCode::Custom => user_language.to_string(),
        }
    }

    /// Caption-track language tag for this code.
    ///
    /// The custom slot falls back to English captions.
    pub fn caption_tag(&self) -> &'static str {
        match self {
            LanguageCode::PtBr => "pt-BR",
            LanguageCode::ZhCn => "zh-CN",
            LanguageCode::ZhTw => "zh-TW",
            LanguageCode::Custom => "en",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "en" => Ok(LanguageCode::En),
            "de" => Ok(LanguageCode::De),
            "es" => Ok(LanguageCode::Es),
            "fr" => Ok(LanguageCode::Fr),
            "it" => Ok(LanguageCode::It),
            "pt_br" => Ok(LanguageCode::PtBr),
            "vi" => Ok(LanguageCode::Vi),
            "ru" => Ok(LanguageCode::Ru),
            "ar" => Ok(LanguageCode::Ar),
            "hi" => Ok(LanguageCode::Hi),
            "bn" => Ok(LanguageCode::Bn),
            "zh_cn" => Ok(LanguageCode::ZhCn),
            "zh_tw" => Ok(LanguageCode::ZhTw),
            "ja" => Ok(LanguageCode::Ja),
            "ko" => Ok(LanguageCode::Ko),
            "zz" => Ok(LanguageCode::Custom),
            other => Err(Error::Generic(format!("Unknown language code: {}", other))),
        }
    }
}

impl Serialize for LanguageCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LanguageCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// User prompts for the two custom-action slots.
#[derive(Debug, Clone, Default)]
pub struct CustomPrompts {
    pub text_one: String,
    pub text_two: String,
    pub no_text_one: String,
    pub no_text_two: String,
}

impl CustomPrompts {
    pub fn text(&self, slot: CustomSlot) -> &str {
        match slot {
            CustomSlot::One => &self.text_one,
            CustomSlot::Two => &self.text_two,
        }
    }

    pub fn no_text(&self, slot: CustomSlot) -> &str {
        match slot {
            CustomSlot::One => &self.no_text_one,
            CustomSlot::Two => &self.no_text_two,
        }
    }
}

/// Display theme carried with the settings surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

/// Content font size carried with the settings surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// User configuration, read-only from the pipeline's perspective.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Generation API key. May be empty; the pipeline surfaces a hint
    /// alongside the provider error instead of failing construction.
    pub api_key: String,
    pub language_model: ModelId,
    pub language_code: LanguageCode,
    pub streaming: bool,
    /// Default action when a text selection is present.
    pub text_action: ActionType,
    /// Default action when nothing is selected.
    pub no_text_action: ActionType,
    /// Name of the user-defined target language (the "zz" code).
    pub user_language: String,
    pub custom_prompts: CustomPrompts,
    pub theme: Theme,
    pub font_size: FontSize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language_model: ModelId::Gemini20Flash,
            language_code: LanguageCode::En,
            streaming: false,
            text_action: ActionType::Translate,
            no_text_action: ActionType::Summarize,
            user_language: "English".to_string(),
            custom_prompts: CustomPrompts::default(),
            theme: Theme::default(),
            font_size: FontSize::default(),
        }
    }
}

impl Settings {
    /// Load settings from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut settings = Settings {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            ..Settings::default()
        };

        if let Ok(model) = std::env::var("PAGEGIST_MODEL") {
            settings.language_model = model.parse()?;
        }

        if let Ok(language) = std::env::var("PAGEGIST_LANGUAGE") {
            settings.language_code = language.parse()?;
        }

        if let Ok(streaming) = std::env::var("PAGEGIST_STREAMING") {
            settings.streaming = streaming == "1" || streaming.eq_ignore_ascii_case("true");
        }

        if let Ok(user_language) = std::env::var("PAGEGIST_USER_LANGUAGE") {
            settings.user_language = user_language;
        }

        settings.custom_prompts = CustomPrompts {
            text_one: std::env::var("PAGEGIST_TEXT_CUSTOM_PROMPT_1").unwrap_or_default(),
            text_two: std::env::var("PAGEGIST_TEXT_CUSTOM_PROMPT_2").unwrap_or_default(),
            no_text_one: std::env::var("PAGEGIST_NO_TEXT_CUSTOM_PROMPT_1").unwrap_or_default(),
            no_text_two: std::env::var("PAGEGIST_NO_TEXT_CUSTOM_PROMPT_2").unwrap_or_default(),
        };

        Ok(settings)
    }
}
