use crate::config::RunConfig;
use crate::lines::read_next_line;
use crate::progress::ProgressSink;
use crate::record::Record;
use crate::sinks::{open_append, write_line};
use crate::source::SourceLayout;
use crate::state::RunState;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info, warn};

const ID_COLUMN: usize = 0;
const ROOT_COLUMN: usize = 1;
const BUCKET_COLUMN: usize = 2;

struct BucketReport {
    label: String,
    writer: BufWriter<File>,
}

/// Input is expected grouped by bucket label.
pub struct MissingAuditor<'c> {
    config: &'c RunConfig,
    layout: SourceLayout,
    current: Option<BucketReport>,
    state: RunState,
}

impl<'c> MissingAuditor<'c> {
    pub fn new(config: &'c RunConfig) -> Self {
        Self {
            config,
            layout: SourceLayout::from_config(config),
            current: None,
            state: RunState::for_audit(),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn run<R: BufRead>(
        &mut self,
        reader: &mut R,
        progress: &mut dyn ProgressSink,
    ) -> Result<()> {
        while let Some(line) = read_next_line(reader).context("Error reading audit input line")? {
            self.audit_line(&line)?;
            progress.on_line(&self.state);
        }
        Ok(())
    }

    pub fn audit_line(&mut self, line: &str) -> Result<()> {
        self.state.lines += 1;
        let record = Record::parse(line, &self.config.delimiter);
        if record.is_empty() {
            return Ok(());
        }
        if record.columns.len() <= BUCKET_COLUMN {
            warn!(line = self.state.lines, columns = record.columns.len(), "Line is not 3 columns");
            self.state.failed += 1;
            return Ok(());
        }

        let id = match record.object_id(ID_COLUMN) {
            Ok(id) => id,
            Err(err) => {
                warn!(line = self.state.lines, error = %err, "Skipping audit line");
                self.state.failed += 1;
                return Ok(());
            }
        };
        let root = Path::new(record.columns[ROOT_COLUMN]);
        self.switch_bucket(record.columns[BUCKET_COLUMN])?;

        let path = match self.layout.resolve_under(root, &record, id) {
            Ok(path) => path,
            Err(err) => {
                warn!(line = self.state.lines, error = %err, "Skipping audit line");
                self.state.failed += 1;
                return Ok(());
            }
        };

        if is_missing(&path) {
            debug!(line = self.state.lines, path = %path.display(), "File does not exist");
            if let Some(report) = self.current.as_mut() {
                write_line(&mut report.writer, &path.display().to_string())?;
            }
            self.state.missing += 1;
        }
        Ok(())
    }

    fn switch_bucket(&mut self, label: &str) -> Result<()> {
        if self.current.as_ref().is_some_and(|report| report.label == label) {
            return Ok(());
        }
        self.close_current()?;
        let path = self.config.missing_report_path(label);
        info!(bucket = label, report = %path.display(), "Opening missing report");
        self.current = Some(BucketReport {
            label: label.to_string(),
            writer: open_append(&path)?,
        });
        Ok(())
    }

    fn close_current(&mut self) -> Result<()> {
        if let Some(mut report) = self.current.take() {
            report
                .writer
                .flush()
                .with_context(|| format!("Unable to flush missing report for {}", report.label))?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<RunState> {
        self.close_current()?;
        info!(missing = self.state.missing, "Audit complete");
        Ok(self.state)
    }
}

/// Only a definite "not found" counts; other stat errors are not reported.
fn is_missing(path: &Path) -> bool {
    matches!(fs::metadata(path), Err(err) if err.kind() == io::ErrorKind::NotFound)
}

pub fn audit_missing(config: &RunConfig, progress: &mut dyn ProgressSink) -> Result<RunState> {
    let file = File::open(&config.missing_in).with_context(|| {
        format!("Unable to open audit input {}", config.missing_in.display())
    })?;
    let mut reader = BufReader::new(file);
    let mut auditor = MissingAuditor::new(config);

    progress.start_input(&config.missing_in);
    if let Err(err) = auditor.run(&mut reader, progress) {
        if let Err(flush_err) = auditor.close_current() {
            warn!(error = %flush_err, "Unable to flush missing report after fatal error");
        }
        return Err(err);
    }

    let state = auditor.finish()?;
    progress.finish(&state);
    Ok(state)
}
