use std::fmt::Write as _;

use tutor_core::model::{AppSettings, AppSettingsDraft, COMBINED_REVIEW_NAME, SkillProgress};

use super::document::{IniDocument, IniSection};
use crate::repository::{ProgressMap, StorageError};

pub(crate) const CREDENTIALS_SECTION: &str = "Credentials";
pub(crate) const SETTINGS_SECTION: &str = "Settings";
pub(crate) const PROGRESS_SECTION: &str = "Progress";

const KEY_API_KEY: &str = "APIKey";
const KEY_MODEL: &str = "Model";
const KEY_SYSTEM_INSTRUCTION: &str = "SystemInstruction";
const KEY_LANGUAGE: &str = "Language";
const KEY_BASE_URL: &str = "BaseUrl";

/// Read settings from the credentials and settings sections. Returns `None`
/// when neither section exists.
pub(crate) fn decode_settings(doc: &IniDocument) -> Result<Option<AppSettings>, StorageError> {
    let credentials = doc.section(CREDENTIALS_SECTION);
    let settings = doc.section(SETTINGS_SECTION);
    if credentials.is_none() && settings.is_none() {
        return Ok(None);
    }

    let lookup = |section: Option<&IniSection>, key: &str| {
        section.and_then(|s| s.get(key)).map(str::to_string)
    };
    let draft = AppSettingsDraft {
        api_key: lookup(credentials, KEY_API_KEY),
        model: lookup(settings, KEY_MODEL),
        system_instruction: lookup(settings, KEY_SYSTEM_INSTRUCTION),
        language: lookup(settings, KEY_LANGUAGE),
        api_base_url: lookup(settings, KEY_BASE_URL),
    };

    AppSettings::from_persisted(draft)
        .map(Some)
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Write settings into `doc`, replacing both sections.
pub(crate) fn encode_settings(doc: &mut IniDocument, settings: &AppSettings) {
    doc.set_section(IniSection::new(
        CREDENTIALS_SECTION,
        vec![(
            KEY_API_KEY.to_string(),
            settings.api_key().unwrap_or_default().to_string(),
        )],
    ));

    let mut entries = vec![
        (KEY_MODEL.to_string(), settings.model().to_string()),
        (
            KEY_SYSTEM_INSTRUCTION.to_string(),
            settings.system_instruction().to_string(),
        ),
        (KEY_LANGUAGE.to_string(), settings.language().to_string()),
    ];
    if let Some(url) = settings.api_base_url() {
        entries.push((KEY_BASE_URL.to_string(), url.to_string()));
    }
    doc.set_section(IniSection::new(SETTINGS_SECTION, entries));
}

/// Read every progress line that parses. Bad lines are logged and skipped.
pub(crate) fn decode_progress_section(doc: &IniDocument) -> ProgressMap {
    let mut map = ProgressMap::new();
    let Some(section) = doc.section(PROGRESS_SECTION) else {
        return map;
    };
    for (key, value) in section.entries() {
        let skill = decode_skill_key(key);
        if skill == COMBINED_REVIEW_NAME {
            continue;
        }
        match decode_progress(value) {
            Ok(progress) => {
                map.insert(skill, progress);
            }
            Err(err) => {
                tracing::warn!(skill = %skill, error = %err, "skipping unreadable progress entry");
            }
        }
    }
    map
}

/// Write the progress section. The combined review never persists.
pub(crate) fn encode_progress_section(doc: &mut IniDocument, progress: &ProgressMap) {
    let entries = progress
        .iter()
        .filter(|(skill, _)| skill.as_str() != COMBINED_REVIEW_NAME)
        .map(|(skill, p)| (encode_skill_key(skill), encode_progress(p)))
        .collect();
    doc.set_section(IniSection::new(PROGRESS_SECTION, entries));
}

/// Escape a skill name so it survives as an INI key.
///
/// `%`, `=` and line breaks are percent-encoded anywhere; comment and section
/// markers only at the start, and blanks only at either end.
pub(crate) fn encode_skill_key(skill: &str) -> String {
    let last = skill.chars().count().saturating_sub(1);
    let mut out = String::with_capacity(skill.len());
    for (i, c) in skill.chars().enumerate() {
        let escape = match c {
            '%' | '=' | '\n' | '\r' => true,
            '#' | ';' | '[' => i == 0,
            ' ' | '\t' => i == 0 || i == last,
            _ => false,
        };
        if escape {
            let _ = write!(out, "%{:02X}", u32::from(c));
        } else {
            out.push(c);
        }
    }
    out
}

/// Undo `encode_skill_key`. Stray `%` sequences are kept as written.
pub(crate) fn decode_skill_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut rest = key;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escaped = rest
            .get(pos + 1..pos + 3)
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            .filter(u8::is_ascii);
        match escaped {
            Some(byte) => {
                out.push(char::from(byte));
                rest = &rest[pos + 3..];
            }
            None => {
                out.push('%');
                rest = &rest[pos + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub(crate) fn encode_progress(progress: &SkillProgress) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "score={},streak={},level={},answered={},diff_idx={}",
        progress.score(),
        progress.streak(),
        progress.level(),
        progress.questions_answered(),
        progress.difficulty_index(),
    );
    out
}

/// Parse `score=..,streak=..,level=..,answered=..,diff_idx=..`.
///
/// Missing or unknown keys are tolerated; missing values default to zero,
/// level to one. A value that is not a non-negative integer fails the line.
pub(crate) fn decode_progress(value: &str) -> Result<SkillProgress, StorageError> {
    let mut score = 0;
    let mut streak = 0;
    let mut level = 1;
    let mut answered = 0;
    let mut diff_idx = 0;

    for pair in value.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| StorageError::Serialization(format!("expected key=value, got '{pair}'")))?;
        let slot = match key.trim() {
            "score" => &mut score,
            "streak" => &mut streak,
            "level" => &mut level,
            "answered" => &mut answered,
            "diff_idx" => &mut diff_idx,
            _ => continue,
        };
        *slot = raw
            .trim()
            .parse::<u32>()
            .map_err(|e| StorageError::Serialization(format!("{}: {e}", key.trim())))?;
    }

    Ok(SkillProgress::from_persisted(
        score, streak, level, answered, diff_idx,
    ))
}
