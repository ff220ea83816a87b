//! Translated result handoff.
//!
//! A [`ResultHandle`] owns the [`ResultArtifact`] of a successful submission
//! together with the transient resource an [`ArtifactStore`] created for it.
//! The resource is released exactly once, by an explicit [`ResultHandle::dispose`]
//! or when the handle is dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{Result, SubtransError};

/// Inserted between the base name and the extension of a translated file.
pub const TRANSLATED_SUFFIX: &str = "_translated";

/// Suggested download name: `<base>_translated.<ext>`, split on the last `.`.
///
/// A name without a `.` has an empty extension and gets no trailing dot.
pub fn translated_filename(original: &str) -> String {
    match original.rsplit_once('.') {
        Some((base, extension)) => format!("{}{}.{}", base, TRANSLATED_SUFFIX, extension),
        None => format!("{}{}", original, TRANSLATED_SUFFIX),
    }
}

/// Where an artifact's backing resource lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation(pub PathBuf);

/// Provider of the transient resource backing a downloadable artifact.
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactStore: Send + Sync {
    /// Create the backing resource for a payload.
    fn register(&self, filename: &str, payload: &[u8]) -> Result<ArtifactLocation>;

    /// Release a resource returned by `register`.
    fn release(&self, location: &ArtifactLocation);
}

/// Spools each payload into a private temporary directory.
///
/// The directory and anything left in it are removed when the store is dropped.
pub struct SpoolStore {
    dir: tempfile::TempDir,
}

impl SpoolStore {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("subtrans-").tempdir()?;
        debug!("Artifact spool directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl ArtifactStore for SpoolStore {
    fn register(&self, filename: &str, payload: &[u8]) -> Result<ArtifactLocation> {
        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut file = tempfile::Builder::new()
            .prefix("artifact-")
            .suffix(&format!("-{}", name))
            .tempfile_in(self.dir.path())?;
        std::io::Write::write_all(&mut file, payload)?;
        let (_, path) = file.keep().map_err(|e| SubtransError::Io(e.error))?;
        debug!("Spooled {} bytes to {}", payload.len(), path.display());
        Ok(ArtifactLocation(path))
    }

    fn release(&self, location: &ArtifactLocation) {
        match std::fs::remove_file(&location.0) {
            Ok(()) => debug!("Released {}", location.0.display()),
            Err(e) => warn!("Failed to release {}: {}", location.0.display(), e),
        }
    }
}

/// The translated file payload plus its suggested download name.
#[derive(Debug, Clone)]
pub struct ResultArtifact {
    pub payload: Vec<u8>,
    pub suggested_filename: String,
    pub completed_at: DateTime<Utc>,
}

impl ResultArtifact {
    pub fn new(payload: Vec<u8>, original_name: &str) -> Self {
        Self {
            payload,
            suggested_filename: translated_filename(original_name),
            completed_at: Utc::now(),
        }
    }
}

/// An owned copy of a result, as handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub payload: Vec<u8>,
    pub location: Option<PathBuf>,
}

impl Download {
    /// Write the download into `dir` under its suggested filename.
    ///
    /// Only the final component of the filename is used, so the file always lands inside `dir`.
    pub async fn save_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let Some(name) = Path::new(&self.filename).file_name() else {
            return Err(SubtransError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid download filename '{}'", self.filename),
            )));
        };
        fs::create_dir_all(dir).await?;

        let final_path = dir.join(name);
        let temp_path = dir.join(format!(".{}.tmp", name.to_string_lossy()));
        fs::write(&temp_path, &self.payload).await?;
        fs::rename(&temp_path, &final_path).await?;

        info!("Saved translated file to {}", final_path.display());
        Ok(final_path)
    }
}

pub struct ResultHandle {
    artifact: ResultArtifact,
    store: Arc<dyn ArtifactStore>,
    location: Option<ArtifactLocation>,
}

impl ResultHandle {
    /// Wrap an artifact, registering its backing resource with `store`.
    ///
    /// A registration failure is logged and the handle keeps the payload without backing.
    pub fn new(artifact: ResultArtifact, store: Arc<dyn ArtifactStore>) -> Self {
        let location = match store.register(&artifact.suggested_filename, &artifact.payload) {
            Ok(location) => Some(location),
            Err(e) => {
                warn!("Could not register artifact {}: {}", artifact.suggested_filename, e);
                None
            }
        };
        Self { artifact, store, location }
    }

    /// Payload and suggested filename. Non-destructive.
    pub fn download(&self) -> (&[u8], &str) {
        (&self.artifact.payload, &self.artifact.suggested_filename)
    }

    pub fn to_download(&self) -> Download {
        Download {
            filename: self.artifact.suggested_filename.clone(),
            payload: self.artifact.payload.clone(),
            location: self.location.as_ref().map(|l| l.0.clone()),
        }
    }

    pub fn artifact(&self) -> &ResultArtifact {
        &self.artifact
    }

    pub fn location(&self) -> Option<&ArtifactLocation> {
        self.location.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.location.is_none()
    }

    /// Release the backing resource. Calling this again is a no-op.
    pub fn dispose(&mut self) {
        if let Some(location) = self.location.take() {
            self.store.release(&location);
        }
    }
}

impl Drop for ResultHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ResultHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle")
            .field("filename", &self.artifact.suggested_filename)
            .field("size", &self.artifact.payload.len())
            .field("location", &self.location)
            .finish()
    }
}
