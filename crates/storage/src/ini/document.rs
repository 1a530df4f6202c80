//! Minimal INI reader/writer compatible with Python-style config files.
//!
//! Sections are `[Name]`, entries are `key = value`, values may continue on
//! indented lines, and `#` / `;` start full-line comments. Keys are stored
//! exactly as written and looked up case-insensitively; section names are
//! compared exactly.

use std::fmt::Write as _;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct IniDocument {
    sections: Vec<IniSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct IniSection {
    name: String,
    entries: Vec<(String, String)>,
}

impl IniSection {
    pub(crate) fn new(name: impl Into<String>, entries: Vec<(String, String)>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Case-insensitive lookup. The last matching key wins.
    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

impl IniDocument {
    /// Parse leniently: lines outside any section and lines without `=` are
    /// skipped with a warning.
    pub(crate) fn parse(text: &str) -> Self {
        let mut doc = Self::default();
        let mut pending_blank = 0_usize;
        let mut in_value = false;

        for (line_no, raw) in text.lines().enumerate() {
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                if in_value {
                    pending_blank += 1;
                }
                continue;
            }

            let indented = raw.starts_with([' ', '\t']);
            if indented && in_value {
                if let Some((_, value)) = doc.last_entry_mut() {
                    for _ in 0..pending_blank {
                        value.push('\n');
                    }
                    value.push('\n');
                    value.push_str(trimmed);
                }
                pending_blank = 0;
                continue;
            }

            pending_blank = 0;
            in_value = false;

            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if let Some(name) = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
            {
                doc.sections.push(IniSection::new(name.trim(), Vec::new()));
                continue;
            }

            let Some(section) = doc.sections.last_mut() else {
                tracing::warn!(line = line_no + 1, "ignoring config line outside any section");
                continue;
            };

            let Some((key, value)) = trimmed.split_once('=') else {
                tracing::warn!(line = line_no + 1, "ignoring config line without '='");
                continue;
            };

            let key = key.trim().to_string();
            let value = value.trim().to_string();
            match section.entries.iter_mut().find(|(k, _)| *k == key) {
                Some(existing) => existing.1 = value,
                None => section.entries.push((key, value)),
            }
            in_value = true;
        }

        doc
    }

    pub(crate) fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|section| section.name == name)
    }

    /// Replace a section's entries, appending the section if it is new.
    pub(crate) fn set_section(&mut self, section: IniSection) {
        match self.sections.iter_mut().find(|s| s.name == section.name) {
            Some(existing) => *existing = section,
            None => self.sections.push(section),
        }
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            let _ = writeln!(out, "[{}]", section.name);
            for (key, value) in &section.entries {
                let value = value.replace('\n', "\n\t");
                let _ = writeln!(out, "{key} = {value}");
            }
            out.push('\n');
        }
        out
    }

    fn last_entry_mut(&mut self) -> Option<&mut (String, String)> {
        self.sections
            .last_mut()
            .and_then(|section| section.entries.last_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_keys_and_comments() {
        let doc = IniDocument::parse(
            "# saved by the tutor\n[Credentials]\napikey = abc\n\n[Settings]\nModel=gemini-pro\n; note\nLanguage = Finnish\n",
        );
        let creds = doc.section("Credentials").unwrap();
        assert_eq!(creds.get("APIKey"), Some("abc"));
        let settings = doc.section("Settings").unwrap();
        assert_eq!(settings.get("model"), Some("gemini-pro"));
        assert_eq!(settings.get("language"), Some("Finnish"));
        assert!(doc.section("Progress").is_none());
    }

    #[test]
    fn continuation_lines_join_with_newlines() {
        let doc = IniDocument::parse(
            "[Settings]\nSystemInstruction = first line\n\tsecond line\n\n\tafter blank\nModel = m\n",
        );
        let settings = doc.section("Settings").unwrap();
        assert_eq!(
            settings.get("SystemInstruction"),
            Some("first line\nsecond line\n\nafter blank")
        );
        assert_eq!(settings.get("Model"), Some("m"));
    }

    #[test]
    fn value_keeps_everything_after_first_equals() {
        let doc = IniDocument::parse("[Progress]\nnotes.pdf = score=10,streak=1\n");
        let progress = doc.section("Progress").unwrap();
        assert_eq!(progress.entries()[0].0, "notes.pdf");
        assert_eq!(progress.get("notes.pdf"), Some("score=10,streak=1"));
    }

    #[test]
    fn keys_differing_in_case_stay_separate() {
        let doc = IniDocument::parse("[Progress]\nNotes.pdf = a\nnotes.pdf = b\nNotes.pdf = c\n");
        let progress = doc.section("Progress").unwrap();
        assert_eq!(
            progress.entries(),
            [
                ("Notes.pdf".to_string(), "c".to_string()),
                ("notes.pdf".to_string(), "b".to_string()),
            ]
        );
        assert_eq!(progress.get("NOTES.PDF"), Some("b"));
    }

    #[test]
    fn stray_lines_are_skipped() {
        let doc = IniDocument::parse("orphan = 1\n[S]\nno delimiter here\nk = v\n");
        let section = doc.section("S").unwrap();
        assert_eq!(section.entries().len(), 1);
        assert_eq!(section.get("k"), Some("v"));
    }

    #[test]
    fn render_then_parse_preserves_multiline_values() {
        let mut doc = IniDocument::default();
        doc.set_section(IniSection::new(
            "Settings",
            vec![("SystemInstruction".into(), "line one\nline two".into())],
        ));
        let text = doc.render();
        assert_eq!(text, "[Settings]\nSystemInstruction = line one\n\tline two\n\n");
        assert_eq!(IniDocument::parse(&text), doc);
    }

    #[test]
    fn set_section_replaces_in_place() {
        let mut doc = IniDocument::parse("[A]\nx = 1\n[B]\ny = 2\n");
        doc.set_section(IniSection::new("A", vec![("z".into(), "3".into())]));
        let text = doc.render();
        assert_eq!(text, "[A]\nz = 3\n\n[B]\ny = 2\n\n");
    }
}
