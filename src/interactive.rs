//! Line-oriented front end for a [`Session`].
//!
//! Each input line is one named event. Submissions run on a background task
//! so the user can keep editing (or reset) while a request is outstanding.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::controller::SubmitOutcome;
use crate::error::{Result, SubtransError};
use crate::intake::{FileCandidate, SUPPORTED_EXTENSIONS};
use crate::session::Session;

const HELP: &str = "\
Commands:
  file <path>       select a subtitle file (.srt, .vtt, .ass)
  key <token>       set the translation API key
  submit            start translating the selected file
  wait              wait for the running translation to finish
  status            show the current session state
  download [dir]    save the translated file
  reset             clear the file and any result (the key is kept)
  help              show this help
  quit              leave the session
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    File(PathBuf),
    Key(String),
    Submit,
    Wait,
    Status,
    Download(Option<PathBuf>),
    Reset,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line; blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match trimmed.split_once(' ') {
            Some((word, rest)) => (word, rest),
            None => (trimmed, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "file" | "open" => {
                let path = rest.trim();
                if path.is_empty() {
                    return Err(SubtransError::Command("file needs a path".to_string()));
                }
                Command::File(PathBuf::from(path))
            }
            // The token is kept verbatim, surrounding spaces included.
            "key" => Command::Key(rest.to_string()),
            "submit" | "translate" => Command::Submit,
            "wait" => Command::Wait,
            "status" => Command::Status,
            "download" | "save" => {
                let dir = rest.trim();
                Command::Download((!dir.is_empty()).then(|| PathBuf::from(dir)))
            }
            "reset" => Command::Reset,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => {
                return Err(SubtransError::Command(format!(
                    "unknown command '{}', type 'help' for a list",
                    other
                )));
            }
        };
        Ok(Some(command))
    }
}

async fn say<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

fn describe(outcome: &SubmitOutcome) -> String {
    match outcome {
        SubmitOutcome::Succeeded { filename } => format!("Translation complete: {}", filename),
        SubmitOutcome::Failed(error) => format!("Error: {}", error.message),
        SubmitOutcome::Superseded => "Translation discarded".to_string(),
    }
}

/// Drive `session` from `input` until `quit` or end of input.
pub async fn run<R, W>(session: Arc<Session>, default_dir: &Path, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut pending: Option<JoinHandle<SubmitOutcome>> = None;

    say(output, &format!("Subtitle translator. Supports: {}. Type 'help' for commands.",
        SUPPORTED_EXTENSIONS.map(|e| e.to_uppercase()).join(", "))).await?;

    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                say(output, &e.to_string()).await?;
                continue;
            }
        };
        debug!("Interactive command: {:?}", command);

        match command {
            Command::File(path) => {
                let candidate = match FileCandidate::from_path(&path).await {
                    Ok(candidate) => candidate,
                    Err(e) => {
                        say(output, &format!("Error: {}", e)).await?;
                        continue;
                    }
                };
                match session.select_file(vec![candidate]) {
                    Ok(Some(file)) => {
                        say(output, &format!("Selected {} ({})", file.name, file.display_size())).await?
                    }
                    Ok(None) => {}
                    Err(e) => say(output, &format!("Error: {}", e)).await?,
                }
            }
            Command::Key(token) => {
                session.set_credential(token);
                let preview = session.snapshot().credential_preview.unwrap_or_else(|| "(empty)".to_string());
                say(output, &format!("API key set: {}", preview)).await?;
            }
            Command::Submit => match session.start() {
                Ok(ticket) => {
                    say(output, &format!("Translating {}...", ticket.request.file_name)).await?;
                    let worker = Arc::clone(&session);
                    pending = Some(tokio::spawn(async move { worker.run(ticket).await }));
                }
                Err(e) => say(output, &format!("Error: {}", e)).await?,
            },
            Command::Wait => match pending.take() {
                Some(handle) => match handle.await {
                    Ok(outcome) => say(output, &describe(&outcome)).await?,
                    Err(e) => {
                        warn!("Submission task failed: {}", e);
                        say(output, &format!("Error: {}", e)).await?;
                    }
                },
                None => say(output, "Nothing is running").await?,
            },
            Command::Status => {
                let snapshot = session.snapshot();
                let mut report = vec![format!("State: {}", snapshot.state.label())];
                report.push(match (&snapshot.file_name, &snapshot.file_size) {
                    (Some(name), Some(size)) => format!("File: {} ({})", name, size),
                    _ => "File: (none)".to_string(),
                });
                report.push(format!(
                    "API key: {}",
                    snapshot.credential_preview.as_deref().unwrap_or("(not set)")
                ));
                if let (Some(filename), Some(at)) = (&snapshot.result_filename, snapshot.completed_at) {
                    report.push(format!("Result: {} (completed {})", filename, at.format("%H:%M:%S UTC")));
                }
                if let Some(error) = &snapshot.error {
                    report.push(format!("Error: {}", error.message));
                }
                report.push(format!("Ready to submit: {}", if snapshot.can_submit { "yes" } else { "no" }));
                say(output, &report.join("\n")).await?;
            }
            Command::Download(dir) => match session.download() {
                Some(download) => {
                    let dir = dir.unwrap_or_else(|| default_dir.to_path_buf());
                    match download.save_to(&dir).await {
                        Ok(path) => say(output, &format!("Saved {}", path.display())).await?,
                        Err(e) => say(output, &format!("Error: {}", e)).await?,
                    }
                }
                None => say(output, "No translated file available").await?,
            },
            Command::Reset => {
                session.reset();
                say(output, "Session reset").await?;
            }
            Command::Help => say(output, HELP.trim_end()).await?,
            Command::Quit => break,
        }
    }

    if let Some(handle) = pending.take() {
        if !handle.is_finished() {
            session.reset();
        }
        if let Err(e) = handle.await {
            warn!("Submission task failed: {}", e);
        }
    }
    Ok(())
}
