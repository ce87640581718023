use std::io;

use canvas_batch::{App, cli::Cli, init_logging, resolve_command};
use canvas_engine::config::load_config;
use clap::Parser;
use color_eyre::{Result, Section as _};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    cli.apply(&mut config);

    println!("{}", canvas_batch::APP_NAME);
    println!("{}", "=".repeat(50));

    let app = App::try_new(&config)
        .suggestion("Please check your AWS credentials and region settings.")?;

    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout();
    let command = resolve_command(cli.command, &mut stdin, &mut stdout)?;
    app.run(command, &mut stdin, &mut stdout).await?;

    Ok(())
}
