use std::path::{Path, PathBuf};

use services::tasks::EventReceiver;
use services::{TutorCoordinator, TutorError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::commands::{self, Command, HELP};
use crate::render;

/// Interactive loop: reads commands line by line while task events arrive.
pub struct Repl<W> {
    coordinator: TutorCoordinator,
    events: EventReceiver,
    config_path: Option<PathBuf>,
    out: W,
}

impl<W: AsyncWrite + Unpin> Repl<W> {
    pub fn new(
        coordinator: TutorCoordinator,
        events: EventReceiver,
        config_path: Option<PathBuf>,
        out: W,
    ) -> Self {
        Self {
            coordinator,
            events,
            config_path,
            out,
        }
    }

    /// Run until `quit`, end of input or a terminal I/O error, then stop any
    /// task and save. The I/O error, if any, is returned after shutdown.
    pub async fn run<R>(mut self, input: R) -> Result<(), Box<dyn std::error::Error>>
    where
        R: AsyncBufRead + Unpin,
    {
        let session = self.interact(input).await;

        if self.coordinator.is_busy() {
            tracing::info!("stopping the running task before exit");
        }
        self.coordinator.shutdown().await?;
        tracing::info!("progress saved, exiting");
        session.map_err(Into::into)
    }

    async fn interact<R: AsyncBufRead + Unpin>(&mut self, input: R) -> std::io::Result<()> {
        let mut lines = input.lines();

        self.say("AI tutor. Type 'help' for commands.").await?;
        let status = render::readiness(&self.coordinator.readiness());
        self.say(&status).await?;
        self.prompt().await?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        return Ok(());
                    };
                    match commands::parse(&line) {
                        Ok(Some(Command::Quit)) => return Ok(()),
                        Ok(Some(command)) => {
                            let reply = match self.execute(command).await {
                                Ok(reply) => reply,
                                Err(err) => format!("Error: {err}"),
                            };
                            self.say(&reply).await?;
                        }
                        Ok(None) => {}
                        Err(err) => self.say(&err.to_string()).await?,
                    }
                    self.prompt().await?;
                }
                Some(event) = self.events.recv() => {
                    if let Some(notice) = self.coordinator.handle_event(event).await {
                        self.say(&format!("\n{}", render::notice(&notice))).await?;
                        self.prompt().await?;
                    }
                }
            }
        }
    }

    async fn execute(&mut self, command: Command) -> Result<String, TutorError> {
        let tutor = &mut self.coordinator;
        let reply = match command {
            Command::Settings => {
                let mut text = render::settings(tutor.settings());
                if let Some(path) = &self.config_path {
                    text.push_str(&format!("\nconfig file {}", path.display()));
                }
                text
            }
            Command::Set { key, value } => {
                let mut draft = tutor.settings_draft();
                key.apply(&mut draft, value);
                tutor.apply_settings(draft).await?;
                format!("Saved {key}.")
            }
            Command::Add(paths) => {
                let (existing, missing) = partition_existing(rejoin_spaced_path(paths).await).await;
                let report = tutor.add_documents(existing)?;
                let mut lines = Vec::new();
                if !report.added.is_empty() {
                    lines.push(format!("Added {}.", report.added.join(", ")));
                }
                for path in &report.skipped {
                    lines.push(format!("Already added: {}", path.display()));
                }
                for err in &report.rejected {
                    lines.push(format!("Skipped: {err}"));
                }
                for path in &missing {
                    lines.push(format!("Not found: {}", path.display()));
                }
                if !report.added.is_empty() {
                    lines.push(render::readiness(&tutor.readiness()));
                }
                lines.join("\n")
            }
            Command::Remove(names) => {
                let removed = tutor.remove_documents(names.as_slice()).await?;
                if removed.is_empty() {
                    "No matching documents.".to_string()
                } else {
                    format!("Removed {} and its progress.", removed.join(", "))
                }
            }
            Command::Clear => {
                let count = tutor.clear_documents().await?;
                format!("Removed {count} document(s) and all progress.")
            }
            Command::Upload => {
                let task = tutor.start_upload()?;
                format!(
                    "Upload {task} started for {} document(s). 'cancel' stops it.",
                    tutor.documents().len()
                )
            }
            Command::Skills => render::skills(
                &tutor.skills(),
                tutor.total_score(),
                tutor.review_score(),
            ),
            Command::Quiz(target) => {
                let name = target.to_string();
                tutor.start_quiz(target)?;
                format!("Quiz: {name}. Type 'next' for a question.")
            }
            Command::Next => {
                tutor.request_question()?;
                "Asking for a question...".to_string()
            }
            Command::Hint(partial) => {
                tutor.request_hint(&partial)?;
                "Asking for a hint...".to_string()
            }
            Command::Answer(answer) => {
                tutor.submit_answer(&answer)?;
                "Grading your answer...".to_string()
            }
            Command::Reference => {
                let reference = tutor.view_reference().await?;
                format!(
                    "{} page {}: {}",
                    reference.document,
                    reference.page,
                    reference.path.display()
                )
            }
            Command::Cancel => {
                let task = tutor.cancel_active()?;
                format!("Cancelling task {task}...")
            }
            Command::Back => {
                tutor.leave_quiz()?;
                render::readiness(&tutor.readiness())
            }
            Command::Help => HELP.to_string(),
            Command::Quit => String::new(),
        };
        Ok(reply)
    }

    async fn say(&mut self, text: &str) -> std::io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }

    async fn prompt(&mut self) -> std::io::Result<()> {
        self.out.write_all(b"> ").await?;
        self.out.flush().await
    }
}

/// `add /course/Lecture 1.pdf` without quotes splits into pieces that do not
/// exist on their own; take the whole line as one path when that names a file.
async fn rejoin_spaced_path(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    if paths.len() < 2 {
        return paths;
    }
    for path in &paths {
        if is_file(path).await {
            return paths;
        }
    }
    let joined = PathBuf::from(
        paths
            .iter()
            .map(|p| p.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" "),
    );
    if is_file(&joined).await {
        vec![joined]
    } else {
        paths
    }
}

async fn partition_existing(paths: Vec<PathBuf>) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut existing = Vec::with_capacity(paths.len());
    let mut missing = Vec::new();
    for path in paths {
        if is_file(&path).await {
            existing.push(path);
        } else {
            missing.push(path);
        }
    }
    (existing, missing)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use services::{AppServices, EnvOverrides};
    use storage::repository::{InMemoryRepository, ProgressRepository, Storage};

    use super::*;

    /// A terminal whose output is gone.
    struct ClosedTerminal;

    impl AsyncWrite for ClosedTerminal {
        fn poll_write(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
            _: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "terminal closed",
            )))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    async fn tutor_over(repo: &InMemoryRepository) -> (TutorCoordinator, EventReceiver) {
        let storage = Storage {
            app_settings: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
        };
        let (mut tutor, events) = AppServices::new(storage, EnvOverrides::default())
            .coordinator()
            .await
            .unwrap();
        tutor.add_documents(["/course/a.pdf"]).unwrap();
        (tutor, events)
    }

    #[tokio::test]
    async fn output_failure_still_saves_progress() {
        let repo = InMemoryRepository::new();
        let (tutor, events) = tutor_over(&repo).await;
        assert!(repo.load_progress().await.unwrap().is_empty());

        let result = Repl::new(tutor, events, None, ClosedTerminal)
            .run(&b"skills\n"[..])
            .await;

        assert!(result.is_err());
        assert!(repo.load_progress().await.unwrap().contains_key("a.pdf"));
    }

    #[tokio::test]
    async fn end_of_input_quits_and_saves() {
        let repo = InMemoryRepository::new();
        let (tutor, events) = tutor_over(&repo).await;
        let mut out = Vec::new();

        Repl::new(tutor, events, None, &mut out)
            .run(&b"skills\nbogus\n"[..])
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("  a.pdf  level 1"));
        assert!(text.contains("unknown command 'bogus'"));
        assert!(repo.load_progress().await.unwrap().contains_key("a.pdf"));
    }
}
