use std::path::PathBuf;

use canvas_engine::{
    batch::BatchRunner,
    image_model::{GenerationClient, GenerationRequest, Model, bedrock::BedrockRuntime},
};
use clap::Parser;
use color_eyre::Result;

/// Generates a single image, bypassing config files and job tables.
#[derive(clap::Parser)]
struct Arg {
    prompt: String,

    #[arg(short, long, default_value = "output")]
    name: String,

    #[arg(short, long, value_enum, default_value_t = Model::NovaCanvas)]
    model: Model,

    #[arg(short, long)]
    seed: Option<u64>,

    #[arg(long, default_value = "us-east-1")]
    region: String,

    #[arg(short, long, default_value = ".")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    pretty_env_logger::init();
    let Arg {
        prompt,
        name,
        model,
        seed,
        region,
        out,
    } = Arg::parse();

    let client = GenerationClient::new(Box::new(BedrockRuntime::from_env(&region)?), model);
    let runner = BatchRunner::try_new(client, out)?;
    let path = runner
        .run_single(&GenerationRequest::new(prompt, name).with_seed(seed))
        .await?;
    println!("Saved image to {}", path.display());

    Ok(())
}
