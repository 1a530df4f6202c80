use std::fmt::Write as _;

use services::{GradeReport, Notice, Readiness, ReferenceView, SkillSummary};
use tutor_core::model::{AppSettings, COMBINED_REVIEW_NAME};

pub fn notice(notice: &Notice) -> String {
    match notice {
        Notice::UploadProgress {
            document,
            position,
            total,
        } => format!("Uploading {document} ({position}/{total})..."),
        Notice::FileProcessed { document } => format!("  {document} is ready."),
        Notice::UploadComplete { count } => {
            format!("Upload complete: {count} document(s) ready. Use 'skills' and 'quiz <name|all>'.")
        }
        Notice::UploadFailed { message } => format!("Upload failed: {message}"),
        Notice::Question { text, difficulty } => format!("Question ({difficulty}):\n{text}"),
        Notice::Hint { text, reference } => {
            let mut out = format!("Hint:\n{text}");
            push_reference(&mut out, reference.as_ref());
            out
        }
        Notice::Graded(report) => grade(report),
        Notice::TaskFailed { kind, message } => format!("The {kind} failed: {message}"),
        Notice::Cancelled { kind } => format!("The {kind} was cancelled."),
    }
}

fn grade(report: &GradeReport) -> String {
    let mut out = format!("{}\n\n{}\n", report.status.label(), report.feedback.trim_end());
    let _ = write!(out, "\n+{} points", report.points_earned);
    match &report.progress {
        Some(progress) => {
            let _ = write!(
                out,
                " | {}: score {}, streak {}, level {}",
                report.target,
                progress.score(),
                progress.streak(),
                progress.level()
            );
        }
        None => {
            let _ = write!(out, " ({COMBINED_REVIEW_NAME})");
        }
    }
    if report.leveled_up {
        out.push_str("\nLevel up!");
    }
    push_reference(&mut out, report.reference.as_ref());
    if let Some(error) = &report.save_error {
        let _ = write!(out, "\nWarning: progress could not be saved ({error})");
    }
    out
}

fn push_reference(out: &mut String, reference: Option<&ReferenceView>) {
    if let Some(reference) = reference {
        let _ = write!(
            out,
            "\nSee {} page {} ('ref' for the file path).",
            reference.document, reference.page
        );
    }
}

pub fn skills(rows: &[SkillSummary], total_score: u64, review_score: u64) -> String {
    if rows.is_empty() {
        return "No documents yet. Use 'add <path>'.".to_string();
    }
    let mut out = String::new();
    for row in rows {
        let _ = writeln!(
            out,
            "{marker} {name}  level {level} ({percent}% to next)  score {score}  streak {streak}  {difficulty}",
            marker = if row.uploaded { "*" } else { " " },
            name = row.name,
            level = row.progress.level(),
            percent = row.level_percent,
            score = row.progress.score(),
            streak = row.progress.streak(),
            difficulty = row.difficulty,
        );
    }
    let _ = write!(
        out,
        "Total score {total_score}. {COMBINED_REVIEW_NAME}: {review_score} this session. (* = uploaded)"
    );
    out
}

pub fn settings(settings: &AppSettings) -> String {
    let key = match settings.api_key() {
        Some(key) => mask(key),
        None => "(not set)".to_string(),
    };
    format!(
        "api_key     {key}\nmodel       {}\nlanguage    {}\nbase_url    {}\ninstruction {}",
        settings.model(),
        settings.language(),
        settings.api_base_url().unwrap_or("(default)"),
        settings.system_instruction(),
    )
}

pub fn readiness(readiness: &Readiness) -> String {
    match readiness {
        Readiness::MissingApiKey => "No API key yet. Use 'set api_key <key>'.".to_string(),
        Readiness::NoDocuments => "Add course PDFs with 'add <path>...'.".to_string(),
        Readiness::UploadNeeded => "Documents changed. Run 'upload' before quizzing.".to_string(),
        Readiness::Ready {
            uploaded,
            language,
            expires_at,
        } => {
            let mut out =
                format!("Ready: {uploaded} document(s) uploaded, quiz language {language}.");
            if let Some(at) = expires_at {
                let _ = write!(out, " Uploads expire {} UTC.", at.format("%Y-%m-%d %H:%M"));
            }
            out
        }
    }
}

fn mask(key: &str) -> String {
    let visible: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    if key.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("****{visible}")
    }
}
