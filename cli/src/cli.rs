use std::path::PathBuf;

use canvas_engine::{config::Config, image_model::Model};

/// Generates the workshop images with Amazon Bedrock.
///
/// Without a subcommand an interactive menu asks what to do.
#[derive(Debug, clap::Parser)]
#[command(version)]
pub struct Cli {
    /// Config file, defaults to canvas_batch.ron in the user config dir
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub region: Option<String>,

    #[arg(short, long, value_enum)]
    pub model: Option<Model>,

    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Seconds to wait between two batch jobs
    #[arg(short, long)]
    pub delay: Option<f64>,

    /// RON job file replacing the built-in job list
    #[arg(short, long)]
    pub jobs: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::Subcommand)]
pub enum Command {
    /// Generate one test image
    Test,
    /// Generate every image of the job list
    Batch,
    /// Generate the test image, then the whole list
    Both {
        /// Don't wait for Enter between the test and the batch
        #[arg(short, long)]
        yes: bool,
    },
}

impl Cli {
    /// Command line values win over the config file.
    pub fn apply(&self, cfg: &mut Config) {
        if let Some(region) = &self.region {
            cfg.region = Some(region.clone());
        }
        if let Some(model) = self.model {
            cfg.model = model;
        }
        if let Some(dir) = &self.output_dir {
            cfg.output_dir = dir.clone();
        }
        if let Some(delay) = self.delay {
            cfg.delay_secs = delay;
        }
        if let Some(jobs) = &self.jobs {
            cfg.jobs_file = Some(jobs.clone());
        }
    }
}
