use thiserror::Error;
use url::Url;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_LANGUAGE: &str = "English";
pub const SUPPORTED_LANGUAGES: [&str; 2] = ["English", "Finnish"];
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are an AI tutor. Use ONLY the provided documents to generate questions, \
provide hints, and evaluate answers for a student studying the material. \
Be concise and focus on the document content. When evaluating, start your response \
EXACTLY with 'Status: Correct', 'Status: Partially Correct', or 'Status: Incorrect'. \
When referring to a specific part of a document in your hints or explanations, \
include a reference tag at the end of your response in the format \
'Reference: [Document Index]:[Page Number]' where [Document Index] is the \
zero-based index of the document provided in the prompt and [Page Number] is the relevant page number.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppSettings {
    api_key: Option<String>,
    model: String,
    system_instruction: String,
    language: String,
    api_base_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct AppSettingsDraft {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub system_instruction: Option<String>,
    pub language: Option<String>,
    pub api_base_url: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AppSettingsError {
    #[error("invalid base URL")]
    InvalidBaseUrl,
    #[error("unsupported quiz language: {0}")]
    UnsupportedLanguage(String),
}

impl AppSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a draft from existing settings, for partial edits.
    #[must_use]
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            model: Some(settings.model.clone()),
            system_instruction: Some(settings.system_instruction.clone()),
            language: Some(settings.language.clone()),
            api_base_url: settings.api_base_url.clone(),
        }
    }

    /// Validate and normalize the draft into persisted settings.
    ///
    /// Blank model, instruction and language fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppSettingsError` if the base URL is present but invalid, or
    /// the language is not one the prompts support.
    pub fn validate(mut self) -> Result<AppSettings, AppSettingsError> {
        let language = normalize_optional(self.language.take());
        if let Some(language) = language.as_ref() {
            if !SUPPORTED_LANGUAGES.contains(&language.as_str()) {
                return Err(AppSettingsError::UnsupportedLanguage(language.clone()));
            }
        }
        self.build(language)
    }

    fn build(self, language: Option<String>) -> Result<AppSettings, AppSettingsError> {
        let api_base_url = normalize_optional(self.api_base_url);
        if let Some(url) = api_base_url.as_ref() {
            if Url::parse(url).is_err() {
                return Err(AppSettingsError::InvalidBaseUrl);
            }
        }

        Ok(AppSettings {
            api_key: normalize_optional(self.api_key),
            model: normalize_optional(self.model).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            system_instruction: normalize_optional(self.system_instruction)
                .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string()),
            language: language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            api_base_url,
        })
    }
}

impl AppSettings {
    /// Rehydrate settings read from disk.
    ///
    /// An unknown language falls back to the default rather than failing the
    /// whole load.
    ///
    /// # Errors
    ///
    /// Returns `AppSettingsError::InvalidBaseUrl` if a stored base URL is invalid.
    pub fn from_persisted(mut draft: AppSettingsDraft) -> Result<Self, AppSettingsError> {
        let language = normalize_optional(draft.language.take())
            .filter(|lang| SUPPORTED_LANGUAGES.contains(&lang.as_str()));
        draft.build(language)
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn api_base_url(&self) -> Option<&str> {
        self.api_base_url.as_deref()
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            api_base_url: None,
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
