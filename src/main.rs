mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = cli.load_config()?;
    bucket_migrate::prepare_output_dir(&config)?;
    bucket_migrate::logging::init_logging(&config, cli.verbose)?;

    let state = bucket_migrate::run(&config, !cli.quiet)?;
    println!("{state}");
    Ok(())
}
