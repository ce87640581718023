//! Sequential batch driver.
//!
//! Jobs run strictly one after another in list order. A job that fails is
//! counted and logged, never retried, and never stops the jobs after it.
//! Between two jobs the runner sleeps for a fixed delay to stay below the
//! provider's rate limits.

use std::{
    fs::{self, File},
    io::{self, Write as _},
    path::{Path, PathBuf},
    time::Duration,
};

use color_eyre::{Result, eyre::WrapErr as _};
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::time::sleep;

use crate::{
    IMAGE_EXT,
    image_model::{GenerationClient, GenerationOutcome, GenerationRequest},
};

const PROMPT_PREVIEW_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub request: GenerationRequest,
    pub description: String,
}

impl From<GenerationRequest> for Job {
    fn from(request: GenerationRequest) -> Self {
        Self {
            description: request.output_name.clone(),
            request,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    Running(usize),
    Completed(BatchResult),
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0:?} is not a plain file name")]
    InvalidName(String),

    #[error("no image was returned for {0}")]
    Empty(String),

    #[error("generating {name} failed: {reason}")]
    Generation { name: String, reason: String },

    #[error("couldn't write {}: {source}", path.display())]
    Persist { path: PathBuf, source: io::Error },
}

pub struct BatchRunner {
    client: GenerationClient,
    output_dir: PathBuf,
}

impl BatchRunner {
    /// Creates the output directory if needed.
    pub fn try_new(client: GenerationClient, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).wrap_err_with(|| {
            format!("Couldn't create output directory {}", output_dir.display())
        })?;
        Ok(Self { client, output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn output_path(&self, request: &GenerationRequest) -> PathBuf {
        self.output_dir
            .join(format!("{}.{IMAGE_EXT}", request.output_name))
    }

    /// Generates one image and writes it. Nothing is written unless the
    /// provider returned image bytes.
    pub async fn run_single(&self, request: &GenerationRequest) -> Result<PathBuf, JobError> {
        if !is_plain_file_name(&request.output_name) {
            let err = JobError::InvalidName(request.output_name.clone());
            error!("{err}");
            return Err(err);
        }

        info!("Generating image: {}", request.output_name);
        info!("Prompt: {}...", prompt_preview(&request.prompt));

        let result = match self.client.generate(request).await {
            GenerationOutcome::Success { bytes } => {
                let path = self.output_path(request);
                match write_image(&path, &bytes) {
                    Ok(()) => Ok(path),
                    Err(source) => Err(JobError::Persist { path, source }),
                }
            }
            GenerationOutcome::Empty => Err(JobError::Empty(request.output_name.clone())),
            GenerationOutcome::Failure { reason } => Err(JobError::Generation {
                name: request.output_name.clone(),
                reason,
            }),
        };

        match &result {
            Ok(path) => info!("Image saved: {}", path.display()),
            Err(e @ JobError::Empty(_)) => warn!("{e}"),
            Err(e) => error!("{e}"),
        }
        result
    }

    /// Runs every job in order and pauses `delay` between two jobs.
    /// `succeeded + failed` always equals `jobs.len()`.
    pub async fn run_batch(&self, jobs: &[Job], delay: Duration) -> BatchResult {
        let mut state = BatchState::Pending;
        let mut result = BatchResult::default();
        debug!("Batch state: {state:?}");

        info!("Starting generation of {} images", jobs.len());
        info!("Output directory: {}", self.output_dir.display());

        for (i, job) in jobs.iter().enumerate() {
            state = BatchState::Running(i);
            debug!("Batch state: {state:?}");
            info!("[{}/{}] {}", i + 1, jobs.len(), job.description);

            match self.run_single(&job.request).await {
                Ok(_) => result.succeeded += 1,
                Err(_) => result.failed += 1,
            }

            if i + 1 < jobs.len() {
                info!("Waiting {delay:?}...");
                sleep(delay).await;
            }
        }

        state = BatchState::Completed(result);
        debug!("Batch state: {state:?}");
        info!(
            "Generation complete: {} successful, {} failed",
            result.succeeded, result.failed
        );
        result
    }
}

/// True for names that stay inside the output directory when used as file stem.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(['/', '\\', '\0']) && name != "." && name != ".."
}

/// Create or truncate `path` and write all of `bytes`. The file is closed on every path out.
fn write_image(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.flush()
}

fn prompt_preview(prompt: &str) -> &str {
    match prompt.char_indices().nth(PROMPT_PREVIEW_LEN) {
        Some((idx, _)) => &prompt[..idx],
        None => prompt,
    }
}
