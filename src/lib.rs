pub mod archive;
pub mod audit;
pub mod codec;
pub mod config;
pub mod copy;
pub mod error;
pub mod guard;
mod lines;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod record;
mod sinks;
pub mod source;
pub mod state;

pub use config::RunConfig;
pub use error::{ConfigError, RecordError};
pub use progress::{ProgressReporter, ProgressSink};
pub use state::RunState;

use anyhow::{Context, Result};
use std::fs;
use tracing::{info, warn};

pub fn run(config: &RunConfig, show_progress: bool) -> Result<RunState> {
    let mut progress = ProgressReporter::new(show_progress);
    run_with_progress(config, &mut progress)
}

pub fn run_with_progress(config: &RunConfig, progress: &mut dyn ProgressSink) -> Result<RunState> {
    prepare_output_dir(config)?;
    info!(?config, "Started process");
    if config.compute_checksum {
        warn!("ComputeChecksum is set but checksums are not computed; ignoring");
    }

    let state = if config.missing {
        audit::audit_missing(config, progress)?
    } else {
        pipeline::migrate(config, progress)?
    };
    info!(
        lines = state.lines,
        skipped = state.skipped,
        successful = state.successful,
        duplicates = state.duplicates,
        failed = state.failed,
        missing = state.missing,
        "Process stopped"
    );

    if config.out_zipped {
        archive::zip_output(&config.out_dir, config.out_zipped_delete_source)?;
    }
    Ok(state)
}

pub fn prepare_output_dir(config: &RunConfig) -> Result<()> {
    fs::create_dir_all(&config.out_dir).with_context(|| {
        format!(
            "Unable to create output directory {}. Stopping execution",
            config.out_dir.display()
        )
    })
}
