use bucket_migrate::{ConfigError, RunConfig};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bucket-migrate",
    version,
    about = "Copies documents out of a bucketed archive layout, driven by a delimited index file."
)]
pub struct Cli {
    #[arg(
        short,
        long,
        default_value = "config.json",
        value_name = "FILE",
        help = "JSON configuration file for the run"
    )]
    pub config: PathBuf,

    #[arg(
        long,
        help = "Audit the archive for missing objects instead of copying"
    )]
    pub missing: bool,

    #[arg(short, long, help = "Log per-record diagnostics")]
    pub verbose: bool,

    #[arg(
        long = "quiet",
        help = "Suppress progress messages",
        action = clap::ArgAction::SetTrue
    )]
    pub quiet: bool,
}

impl Cli {
    pub fn load_config(&self) -> Result<RunConfig, ConfigError> {
        let mut config = RunConfig::read(&self.config)?;
        if self.missing {
            config.missing = true;
        }
        config.normalized()
    }
}
