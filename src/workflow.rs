use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{info, warn};

use crate::config::Config;
use crate::controller::{RequestState, SubmitOutcome};
use crate::error::{Result, SubtransError};
use crate::intake::FileCandidate;
use crate::interactive;
use crate::result::{ArtifactStore, SpoolStore};
use crate::service::{HttpTranslationService, TranslationService};
use crate::session::Session;

pub struct Workflow {
    config: Config,
    session: Arc<Session>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let service: Arc<dyn TranslationService> = Arc::new(HttpTranslationService::new(&config.service)?);
        let store: Arc<dyn ArtifactStore> = Arc::new(SpoolStore::new()?);
        info!("Translation endpoint: {}", config.service.translate_url());
        Ok(Self::with_parts(config, service, store))
    }

    /// Build a workflow around a given service and artifact store
    pub fn with_parts(config: Config, service: Arc<dyn TranslationService>, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            config,
            session: Arc::new(Session::new(service, store)),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Translate one subtitle file and save the result
    ///
    /// The output directory falls back to the configured one, then to the input's directory.
    pub async fn translate_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        credential: &str,
        output_dir: Option<Q>,
    ) -> Result<PathBuf> {
        let input_path = input_path.as_ref();
        info!("Processing subtitle file: {}", input_path.display());

        let output_dir = match output_dir {
            Some(dir) => dir.as_ref().to_path_buf(),
            None => match &self.config.output.directory {
                Some(dir) => dir.clone(),
                None => input_path.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")),
            },
        };

        let candidate = FileCandidate::from_path(input_path).await?;
        let Some(file) = self.session.select_file(vec![candidate])? else {
            return Err(SubtransError::FileNotFound(input_path.display().to_string()));
        };
        self.session.set_credential(credential);

        let ticket = self.session.start()?;

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("{} {} ({})", RequestState::Submitting.label(), file.name, file.display_size()));
        spinner.enable_steady_tick(Duration::from_millis(120));

        let outcome = self.session.run(ticket).await;
        spinner.finish_and_clear();

        match outcome {
            SubmitOutcome::Succeeded { filename } => {
                let download = self.session.download()
                    .ok_or_else(|| SubtransError::Translation(format!("Result for {} is no longer available", filename)))?;
                let saved = download.save_to(&output_dir).await?;
                info!("{} -> {}", file.name, saved.display());
                Ok(saved)
            }
            SubmitOutcome::Failed(error) => {
                warn!("Translation of {} failed", file.name);
                Err(SubtransError::Translation(error.message))
            }
            SubmitOutcome::Superseded => Err(SubtransError::Translation(
                "The request was discarded before it completed".to_string(),
            )),
        }
    }

    /// Run an interactive session reading commands from `input`
    pub async fn run_interactive<R, W>(&self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let default_dir = self.config.output.directory.clone().unwrap_or_else(|| PathBuf::from("."));
        interactive::run(Arc::clone(&self.session), &default_dir, input, output).await
    }
}
