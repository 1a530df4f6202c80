use std::fmt;
use std::path::PathBuf;

use tutor_core::model::{AppSettingsDraft, QuizTarget};

/// A settings field the `set` command can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    ApiKey,
    Model,
    Instruction,
    Language,
    BaseUrl,
}

impl SettingKey {
    pub const ALL: [SettingKey; 5] = [
        SettingKey::ApiKey,
        SettingKey::Model,
        SettingKey::Instruction,
        SettingKey::Language,
        SettingKey::BaseUrl,
    ];

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().replace('-', "_").as_str() {
            "api_key" | "key" => Some(Self::ApiKey),
            "model" => Some(Self::Model),
            "instruction" | "system_instruction" => Some(Self::Instruction),
            "language" | "lang" => Some(Self::Language),
            "base_url" | "url" => Some(Self::BaseUrl),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SettingKey::ApiKey => "api_key",
            SettingKey::Model => "model",
            SettingKey::Instruction => "instruction",
            SettingKey::Language => "language",
            SettingKey::BaseUrl => "base_url",
        }
    }

    /// Write `value` into the draft. An empty value resets the field.
    pub fn apply(self, draft: &mut AppSettingsDraft, value: Option<String>) {
        let slot = match self {
            SettingKey::ApiKey => &mut draft.api_key,
            SettingKey::Model => &mut draft.model,
            SettingKey::Instruction => &mut draft.system_instruction,
            SettingKey::Language => &mut draft.language,
            SettingKey::BaseUrl => &mut draft.api_base_url,
        };
        *slot = value;
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Settings,
    Set { key: SettingKey, value: Option<String> },
    Add(Vec<PathBuf>),
    Remove(Vec<String>),
    Clear,
    Upload,
    Skills,
    Quiz(QuizTarget),
    Next,
    Hint(String),
    Answer(String),
    Reference,
    Cancel,
    Back,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Unknown(String),
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    UnknownSetting(String),
    UnclosedQuote,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unknown(word) => {
                write!(f, "unknown command '{word}' (type 'help' for a list)")
            }
            CommandError::MissingArgument { command, expected } => {
                write!(f, "'{command}' needs {expected}")
            }
            CommandError::UnknownSetting(key) => {
                let known: Vec<_> = SettingKey::ALL.iter().map(|k| k.name()).collect();
                write!(f, "unknown setting '{key}' (one of: {})", known.join(", "))
            }
            CommandError::UnclosedQuote => f.write_str("unclosed quote"),
        }
    }
}

impl std::error::Error for CommandError {}

/// Parse a line. Blank lines yield `Ok(None)`.
///
/// Paths and names are split on whitespace unless quoted or escaped with a
/// backslash; text for `hint`, `answer` and `set` keeps its inner spacing.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "settings" | "config" => Command::Settings,
        "set" => parse_set(rest)?,
        "add" => Command::Add(
            split_args(required(rest, "add", "one or more file paths")?)?
                .into_iter()
                .map(PathBuf::from)
                .collect(),
        ),
        "remove" | "rm" => Command::Remove(split_args(required(
            rest,
            "remove",
            "one or more document names",
        )?)?),
        "clear" => Command::Clear,
        "upload" => Command::Upload,
        "skills" | "ls" => Command::Skills,
        "quiz" => Command::Quiz(QuizTarget::from_name(required(
            rest,
            "quiz",
            "a document name or 'all'",
        )?)),
        "next" | "question" => Command::Next,
        "hint" => Command::Hint(rest.to_string()),
        "answer" | "a" => Command::Answer(required(rest, "answer", "your answer")?.to_string()),
        "ref" | "reference" => Command::Reference,
        "cancel" => Command::Cancel,
        "back" => Command::Back,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => return Err(CommandError::Unknown(word.to_string())),
    };
    Ok(Some(command))
}

fn parse_set(rest: &str) -> Result<Command, CommandError> {
    let rest = required(rest, "set", "a setting name")?;
    let (raw_key, value) = match rest.split_once(char::is_whitespace) {
        Some((key, value)) => (key, value.trim()),
        None => (rest, ""),
    };
    let key =
        SettingKey::parse(raw_key).ok_or_else(|| CommandError::UnknownSetting(raw_key.into()))?;
    let value = (!value.is_empty()).then(|| value.to_string());
    Ok(Command::Set { key, value })
}

/// Split on whitespace, honouring `"..."`, `'...'` and `\ `.
fn split_args(rest: &str) -> Result<Vec<String>, CommandError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quote = None;
    let mut chars = rest.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_arg = true;
            }
            // Only blanks, quotes and backslashes are escapable.
            (None, '\\') => {
                match chars.clone().next() {
                    Some(next) if next.is_whitespace() || matches!(next, '"' | '\'' | '\\') => {
                        current.push(next);
                        chars.next();
                    }
                    _ => current.push('\\'),
                }
                in_arg = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_arg = true;
            }
        }
    }
    if quote.is_some() {
        return Err(CommandError::UnclosedQuote);
    }
    if in_arg {
        args.push(current);
    }
    Ok(args)
}

fn required<'a>(
    rest: &'a str,
    command: &'static str,
    expected: &'static str,
) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument { command, expected })
    } else {
        Ok(rest)
    }
}

pub const HELP: &str = "\
Commands:
  settings                 show current settings
  set <key> [value]        change a setting (api_key, model, instruction, language, base_url);
                           no value resets it
  add <path>...            register PDF files (quote paths with spaces)
  remove <name>...         drop documents and their progress
  clear                    drop every document and all progress
  upload                   upload registered documents
  skills                   show the skill path
  quiz <name|all>          pick a skill, or 'all' for the combined review
  next                     ask for a new question
  hint [partial answer]    ask for a hint
  answer <text>            submit an answer for grading
  ref                      show where the last reference points
  cancel                   stop the running task
  back                     leave the current quiz
  help                     show this list
  quit                     save and exit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse("   "), Ok(None));
    }

    #[test]
    fn answer_keeps_inner_spacing() {
        assert_eq!(
            parse("answer  The  mitochondria  "),
            Ok(Some(Command::Answer("The  mitochondria".into())))
        );
    }

    #[test]
    fn hint_allows_an_empty_partial_answer() {
        assert_eq!(parse("hint"), Ok(Some(Command::Hint(String::new()))));
    }

    #[test]
    fn quiz_all_selects_combined_review() {
        assert_eq!(
            parse("quiz all"),
            Ok(Some(Command::Quiz(QuizTarget::CombinedReview)))
        );
        assert_eq!(
            parse("QUIZ notes.pdf"),
            Ok(Some(Command::Quiz(QuizTarget::Skill("notes.pdf".into()))))
        );
    }

    #[test]
    fn add_and_remove_take_several_items() {
        assert_eq!(
            parse("add a.pdf /tmp/b.pdf"),
            Ok(Some(Command::Add(vec![
                PathBuf::from("a.pdf"),
                PathBuf::from("/tmp/b.pdf")
            ])))
        );
        assert_eq!(
            parse("rm a.pdf b.pdf"),
            Ok(Some(Command::Remove(vec!["a.pdf".into(), "b.pdf".into()])))
        );
        assert!(matches!(
            parse("add"),
            Err(CommandError::MissingArgument { command: "add", .. })
        ));
    }

    #[test]
    fn quoted_paths_keep_their_spaces() {
        assert_eq!(
            parse(r#"add "/course/Lecture 1.pdf" /course/Lecture\ 2.pdf b.pdf"#),
            Ok(Some(Command::Add(vec![
                PathBuf::from("/course/Lecture 1.pdf"),
                PathBuf::from("/course/Lecture 2.pdf"),
                PathBuf::from("b.pdf"),
            ])))
        );
        assert_eq!(
            parse(r"add C:\course\a.pdf"),
            Ok(Some(Command::Add(vec![PathBuf::from(r"C:\course\a.pdf")])))
        );
        assert_eq!(
            parse("remove 'Lecture 1.pdf'"),
            Ok(Some(Command::Remove(vec!["Lecture 1.pdf".into()])))
        );
        assert_eq!(
            parse(r#"add "/course/Lecture 1.pdf"#),
            Err(CommandError::UnclosedQuote)
        );
    }

    #[test]
    fn set_parses_key_and_optional_value() {
        assert_eq!(
            parse("set language Finnish"),
            Ok(Some(Command::Set {
                key: SettingKey::Language,
                value: Some("Finnish".into()),
            }))
        );
        assert_eq!(
            parse("set base-url"),
            Ok(Some(Command::Set {
                key: SettingKey::BaseUrl,
                value: None,
            }))
        );
        assert_eq!(
            parse("set colour blue"),
            Err(CommandError::UnknownSetting("colour".into()))
        );
    }

    #[test]
    fn setting_key_resets_draft_field() {
        let mut draft = AppSettingsDraft {
            model: Some("gemini-pro".into()),
            ..AppSettingsDraft::new()
        };
        SettingKey::Model.apply(&mut draft, None);
        assert_eq!(draft.model, None);
        SettingKey::ApiKey.apply(&mut draft, Some("k".into()));
        assert_eq!(draft.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn unknown_words_are_reported() {
        assert_eq!(parse("dance"), Err(CommandError::Unknown("dance".into())));
    }
}
