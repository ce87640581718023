use std::{
    io::{BufRead, Write},
    time::Duration,
};

use canvas_engine::{
    batch::{BatchResult, BatchRunner, Job},
    config::Config,
    image_model::{GenerationClient, GenerationRequest, bedrock::BedrockRuntime},
    jobs::{self, JobList},
};
use color_eyre::{
    Result,
    eyre::{WrapErr as _, ensure, eyre},
};
use log::info;

use crate::cli::Command;

pub mod cli;
pub mod menu;

pub const APP_NAME: &str = "Bedrock Canvas Workshop Image Generator";

/// Everything a run needs, resolved up front so that nothing can fail
/// fatally once the first job has started.
pub struct App {
    runner: BatchRunner,
    jobs: Vec<Job>,
    test_request: GenerationRequest,
    delay: Duration,
}

impl App {
    pub fn try_new(config: &Config) -> Result<Self> {
        let region = config.region();
        let invoker = BedrockRuntime::from_env(&region)
            .wrap_err_with(|| format!("Couldn't set up the Bedrock client for {region}"))?;
        let client = GenerationClient::new(Box::new(invoker), config.model).with_quality(config.quality);
        info!("{} client initialized ({region})", config.model);
        Self::with_client(client, config)
    }

    pub fn with_client(client: GenerationClient, config: &Config) -> Result<Self> {
        let job_list = match &config.jobs_file {
            Some(path) => JobList::load(path)?,
            None => jobs::workshop_jobs(),
        };

        Ok(Self {
            runner: BatchRunner::try_new(client, &config.output_dir)?,
            jobs: job_list.jobs(&config.image, config.batch_seeds),
            test_request: jobs::test_job().to_request(&config.image, config.test_seed),
            delay: config.delay()?,
        })
    }

    pub async fn run_single_test(&self) -> bool {
        println!("Generating test image...");
        match self.runner.run_single(&self.test_request).await {
            Ok(_) => {
                println!("Test successful! The image model is working correctly.");
                true
            }
            Err(_) => {
                println!("Test failed. Please check your AWS credentials and permissions.");
                false
            }
        }
    }

    pub async fn run_batch(&self) -> BatchResult {
        let result = self.runner.run_batch(&self.jobs, self.delay).await;
        println!("{}", "=".repeat(60));
        println!("Generation complete!");
        println!("Successful: {}", result.succeeded);
        println!("Failed: {}", result.failed);
        println!("Images saved in: {}/", self.runner.output_dir().display());
        result
    }

    /// Runs `command`. A failed test image is an error. For [`Command::Both`]
    /// the batch only starts after a successful test and, unless `yes` is
    /// set, an Enter press on `input`.
    pub async fn run(
        &self,
        command: Command,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<Option<BatchResult>> {
        match command {
            Command::Test => {
                ensure!(self.run_single_test().await, "Test image generation failed");
                Ok(None)
            }
            Command::Batch => Ok(Some(self.run_batch().await)),
            Command::Both { yes } => {
                ensure!(
                    self.run_single_test().await,
                    "Test image generation failed, skipping the batch"
                );
                if !yes {
                    writeln!(output, "\n{}", "=".repeat(50))?;
                    menu::wait_for_enter(input, output)?;
                }
                Ok(Some(self.run_batch().await))
            }
        }
    }
}

pub fn init_logging() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

/// Picks the subcommand or, without one, asks through the menu.
pub fn resolve_command(
    command: Option<Command>,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Command> {
    match command {
        Some(command) => Ok(command),
        None => menu::ask_command(input, output)?
            .ok_or(eyre!("Invalid choice. Please run the program again.")),
    }
}
