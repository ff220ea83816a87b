//! File and credential intake.
//!
//! The [`IntakeManager`] owns the single [`SelectedFile`] of a session and the
//! user's [`Credential`]. It only validates; resetting request state on a new
//! selection is the session's job.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info};

use crate::error::{IntakeError, Result, SubtransError};

/// Extensions accepted at intake, lowercase and without the dot.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["srt", "vtt", "ass"];

/// Secret token authorizing use of the translation service.
///
/// Held in memory only. It is deliberately not serializable and its
/// `Debug`/`Display` output never contains the token.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw token, for the outbound request only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Masked preview showing at most the last four characters.
    pub fn masked(&self) -> String {
        let count = self.0.chars().count();
        if count <= 4 {
            return "*".repeat(count);
        }
        let tail: String = self.0.chars().skip(count - 4).collect();
        format!("{}{}", "*".repeat(count - 4), tail)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Format class derived from a file name's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatClass {
    Srt,
    Vtt,
    Ass,
    Rejected,
}

impl FormatClass {
    /// Classify a file name by its last extension, case-insensitively.
    pub fn classify(name: &str) -> Self {
        let extension = match name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return Self::Rejected,
        };
        match extension.as_str() {
            "srt" => Self::Srt,
            "vtt" => Self::Vtt,
            "ass" => Self::Ass,
            _ => Self::Rejected,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Rejected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Srt => "SubRip (.srt)",
            Self::Vtt => "WebVTT (.vtt)",
            Self::Ass => "Advanced SubStation Alpha (.ass)",
            Self::Rejected => "unsupported",
        }
    }
}

/// A file-like input produced by whatever captures files (picker, drop, path).
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a candidate from disk; the candidate name is the path's file name.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SubtransError::FileNotFound(path.display().to_string()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| SubtransError::FileNotFound(path.display().to_string()))?;
        let bytes = fs::read(path).await?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());

        Ok(Self { name, bytes })
    }
}

/// The user-chosen subtitle file pending translation.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub size_bytes: u64,
    pub format: FormatClass,
    /// Shared so an in-flight request can borrow it without copying.
    pub raw_bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn display_size(&self) -> String {
        format_bytes(self.size_bytes, 2)
    }
}

#[derive(Debug, Default)]
pub struct IntakeManager {
    file: Option<SelectedFile>,
    credential: Credential,
}

impl IntakeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take in the first candidate, ignoring the rest.
    ///
    /// Returns `Ok(None)` when there are no candidates. A rejected candidate
    /// leaves the currently selected file in place.
    pub fn select_file(&mut self, candidates: Vec<FileCandidate>) -> std::result::Result<Option<&SelectedFile>, IntakeError> {
        let ignored = candidates.len().saturating_sub(1);
        let Some(candidate) = candidates.into_iter().next() else {
            debug!("File selection cancelled");
            return Ok(None);
        };
        if ignored > 0 {
            debug!("Ignoring {} additional file(s); only one file is accepted", ignored);
        }

        let format = FormatClass::classify(&candidate.name);
        if !format.is_supported() {
            info!("Rejected file with unsupported format: {}", candidate.name);
            return Err(IntakeError::UnsupportedFormat(candidate.name));
        }

        let selected = SelectedFile {
            size_bytes: candidate.bytes.len() as u64,
            name: candidate.name,
            format,
            raw_bytes: Arc::from(candidate.bytes),
        };
        info!("Selected {} ({}, {})", selected.name, selected.format.label(), selected.display_size());

        let selected = self.file.insert(selected);
        Ok(Some(&*selected))
    }

    /// Store the token verbatim. Emptiness is checked when submitting.
    pub fn set_credential(&mut self, token: impl Into<String>) {
        self.credential = Credential::new(token);
    }

    pub fn clear_file(&mut self) {
        self.file = None;
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

/// Format a byte count with base-1024 units, e.g. `1.5 KB`.
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{:.*}", decimals, value);
    let trimmed = if rendered.contains('.') {
        rendered.trim_end_matches('0').trim_end_matches('.')
    } else {
        rendered.as_str()
    };
    format!("{} {}", trimmed, UNITS[unit])
}
