use crate::config::RunConfig;
use crate::copy::{CopyExecutor, CopyOutcome};
use crate::error::RecordError;
use crate::guard::DuplicateGuard;
use crate::lines::read_next_line;
use crate::output::OutputPathStrategy;
use crate::progress::ProgressSink;
use crate::record::Record;
use crate::sinks::Sinks;
use crate::source::SourceLayout;
use crate::state::RunState;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Indexed,
    Duplicate,
    Errored,
    Empty,
}

pub struct LineProcessor<'c> {
    config: &'c RunConfig,
    source: SourceLayout,
    output: OutputPathStrategy,
    projection: Option<Vec<usize>>,
    guard: DuplicateGuard,
    copier: CopyExecutor,
    sinks: Sinks<'c>,
    state: RunState,
    last_sequence: Option<u64>,
}

impl<'c> LineProcessor<'c> {
    pub fn new(config: &'c RunConfig) -> Result<Self> {
        Ok(Self {
            config,
            source: SourceLayout::from_config(config),
            output: OutputPathStrategy::from_config(config),
            projection: config.output_columns()?,
            guard: DuplicateGuard::new(),
            copier: CopyExecutor::new(),
            sinks: Sinks::open(config)?,
            state: RunState::new(),
            last_sequence: None,
        })
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn run<R: BufRead>(
        &mut self,
        reader: &mut R,
        progress: &mut dyn ProgressSink,
    ) -> Result<()> {
        let mut offset = self.config.out_lines_row_offset;
        while let Some(line) = read_next_line(reader).context("Error reading input line")? {
            if offset > 0 {
                offset -= 1;
                self.skip_offset_row(&line)?;
            } else {
                self.process_line(&line)?;
            }
            progress.on_line(&self.state);
        }
        Ok(())
    }

    pub fn skip_offset_row(&mut self, line: &str) -> Result<()> {
        self.state.lines += 1;
        self.state.skipped += 1;
        if self.config.out_lines_copy_offset_rows {
            self.sinks.index(None, line)?;
        }
        Ok(())
    }

    pub fn process_line(&mut self, line: &str) -> Result<Disposition> {
        self.state.lines += 1;
        let config = self.config;
        let delimiter = config.delimiter.as_str();

        let record = Record::parse(line, delimiter);
        if record.is_empty() {
            debug!(line = self.state.lines, "Skipping empty line");
            return Ok(Disposition::Empty);
        }

        let id = match record.object_id(config.col_object_id) {
            Ok(id) => id,
            Err(err) => return self.reject(line, err),
        };

        if self.guard.is_duplicate(id) {
            self.state.duplicates += 1;
            info!(line = self.state.lines, object_id = id, "Skipping duplicate");
            self.sinks.duplicate(line)?;
            return Ok(Disposition::Duplicate);
        }

        let src = match self.source.resolve(&record, id) {
            Ok(path) => path,
            Err(err) => return self.reject(line, err),
        };

        let resolved = match self.output.resolve(&record, id, self.state.successful) {
            Ok(resolved) => resolved,
            Err(err) => return self.reject(line, err),
        };
        resolved.ensure_dir()?;
        if resolved.path.is_dir() {
            let value = resolved.path.display().to_string();
            return self.reject(line, RecordError::InvalidFileName { value });
        }

        match self.copier.copy(&src, &resolved.path, &mut self.state)? {
            CopyOutcome::SourceMissing(err) => return self.reject(line, err),
            CopyOutcome::Copied { bytes } => debug!(
                line = self.state.lines,
                object_id = id,
                src = %src.display(),
                dst = %resolved.path.display(),
                bytes,
                "Copied"
            ),
        }
        self.last_sequence = Some(resolved.sequence);

        let projected = self
            .projection
            .as_ref()
            .map(|columns| record.project(columns, delimiter));
        let row = match projected {
            Some(Ok(row)) => row,
            Some(Err(err)) => return self.reject(line, err),
            None => line.to_string(),
        };
        let row = format!("{row}{delimiter}{}", resolved.path.display());
        self.sinks.index(resolved.batch.as_deref(), &row)?;
        Ok(Disposition::Indexed)
    }

    fn reject(&mut self, line: &str, err: RecordError) -> Result<Disposition> {
        warn!(line = self.state.lines, error = %err, "Record sent to error lines");
        self.sinks.error(line)?;
        Ok(Disposition::Errored)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sinks.flush()
    }

    pub fn finish(mut self) -> Result<RunState> {
        self.flush()?;
        info!(
            last_object_id_in = ?self.guard.last(),
            last_sequence_out = ?self.last_sequence,
            index_files = self.sinks.index_paths().len(),
            "Migration pass complete"
        );
        Ok(self.state)
    }
}

pub fn migrate(config: &RunConfig, progress: &mut dyn ProgressSink) -> Result<RunState> {
    let file = File::open(&config.in_flat_file).with_context(|| {
        format!(
            "Unable to open input file {}",
            config.in_flat_file.display()
        )
    })?;
    let mut reader = BufReader::new(file);
    let mut processor = LineProcessor::new(config)?;

    progress.start_input(&config.in_flat_file);
    if let Err(err) = processor.run(&mut reader, progress) {
        if let Err(flush_err) = processor.flush() {
            warn!(error = %flush_err, "Unable to flush output files after fatal error");
        }
        return Err(err);
    }

    let state = processor.finish()?;
    progress.finish(&state);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::progress::ProgressSink;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    struct NoopProgress;
    impl ProgressSink for NoopProgress {}

    struct Fixture {
        dir: TempDir,
        config: RunConfig,
    }

    impl Fixture {
        fn new(input: &str) -> Self {
            let dir = tempdir().unwrap();
            let input_path = dir.path().join("dump.txt");
            fs::write(&input_path, input).unwrap();
            let mut config = test_config(&input_path, &dir.path().join("out"));
            config.in_dir = dir.path().join("src");
            config.in_file_ext = ".txt".into();
            fs::create_dir_all(&config.out_dir).unwrap();
            Self { dir, config }
        }

        fn archive(&self, id: u64, contents: &str) {
            let path = self
                .config
                .in_dir
                .join(crate::codec::bucket_path(id, 2, 1024))
                .join(format!("{id}.txt"));
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }

        fn out(&self, name: &str) -> String {
            fs::read_to_string(self.config.out_dir.join(name)).unwrap_or_default()
        }

        fn run(&self) -> RunState {
            migrate(&self.config, &mut NoopProgress).unwrap()
        }
    }

    #[test]
    fn routes_duplicates_and_copies_the_rest() {
        let fx = Fixture::new("1|a.txt\n1|b.txt\n2|c.txt");
        fx.archive(1, "one");
        fx.archive(2, "two");

        let state = fx.run();
        assert_eq!(state.lines, 3);
        assert_eq!(state.successful, 2);
        assert_eq!(state.duplicates, 1);
        assert_eq!(state.failed, 0);

        let out = &fx.config.out_dir;
        assert_eq!(fx.out("duplicates.txt"), "1|b.txt\n");
        assert_eq!(fx.out("errors.txt"), "");
        assert_eq!(
            fx.out("index.txt"),
            format!(
                "1|a.txt|{}\n2|c.txt|{}\n",
                out.join("a.txt").display(),
                out.join("c.txt").display()
            )
        );
        assert_eq!(fx.out("a.txt"), "one");
        assert_eq!(fx.out("c.txt"), "two");
    }

    #[test]
    fn missing_source_goes_to_errors_and_counts_once() {
        let fx = Fixture::new("1|a.txt\n2|b.txt\n");
        fx.archive(1, "one");

        let state = fx.run();
        assert_eq!(state.successful, 1);
        assert_eq!(state.failed, 1);
        assert_eq!(fx.out("errors.txt"), "2|b.txt\n");
        assert_eq!(fx.out("index.txt").lines().count(), 1);
        assert!(!fx.config.out_dir.join("b.txt").exists());
    }

    #[test]
    fn malformed_ids_are_errors_but_not_failures() {
        let fx = Fixture::new("abc|a.txt\n\n3\n");
        let state = fx.run();
        assert_eq!(state.lines, 3);
        assert_eq!(state.failed, 0);
        assert_eq!(state.successful, 0);
        // "3" has no file-name column for the output name.
        assert_eq!(fx.out("errors.txt"), "abc|a.txt\n3\n");
    }

    #[test]
    fn non_adjacent_repeats_are_copied_again() {
        let fx = Fixture::new("5|a\n5|b\n7|c\n5|d\n");
        fx.archive(5, "five");
        fx.archive(7, "seven");

        let state = fx.run();
        assert_eq!(state.duplicates, 1);
        assert_eq!(state.successful, 3);
        assert_eq!(fx.out("duplicates.txt"), "5|b\n");
        assert_eq!(fx.out("d"), "five");
    }

    #[test]
    fn renames_in_success_order_skipping_failures() {
        let mut fx = Fixture::new("1|a\n2|b\n3|c\n");
        fx.config.out_file_rename_int = true;
        fx.config.out_file_rename_int_offset = 10;
        fx.config.out_file_ext = ".dat".into();
        fx.archive(1, "one");
        fx.archive(3, "three");

        let state = fx.run();
        assert_eq!(state.successful, 2);
        assert_eq!(fx.out("10.dat"), "one");
        assert_eq!(fx.out("11.dat"), "three");
        assert!(!fx.config.out_dir.join("12.dat").exists());
    }

    #[test]
    fn skips_offset_rows_and_can_copy_them_through() {
        let mut fx = Fixture::new("id|name\n1|a\n");
        fx.config.out_lines_row_offset = 1;
        fx.config.out_lines_copy_offset_rows = true;
        fx.archive(1, "one");

        let state = fx.run();
        assert_eq!(state.lines, 2);
        assert_eq!(state.skipped, 1);
        assert_eq!(state.successful, 1);
        let index = fx.out("index.txt");
        assert!(index.starts_with("id|name\n1|a|"));
        assert_eq!(fx.out("errors.txt"), "");
    }

    #[test]
    fn projects_columns_into_index_rows() {
        let mut fx = Fixture::new("1|a|secret|x\n");
        fx.config.out_lines_columns = "3,1".into();
        fx.archive(1, "one");

        fx.run();
        assert_eq!(
            fx.out("index.txt"),
            format!("x|a|{}\n", fx.config.out_dir.join("a").display())
        );
    }

    #[test]
    fn out_of_range_projection_is_an_error_row() {
        let mut fx = Fixture::new("1|a\n");
        fx.config.out_lines_columns = "0,5".into();
        fx.archive(1, "one");

        let state = fx.run();
        assert_eq!(state.successful, 1);
        assert_eq!(fx.out("errors.txt"), "1|a\n");
        assert_eq!(fx.out("index.txt"), "");
    }

    #[test]
    fn batches_get_their_own_directories_and_index_files() {
        let mut fx = Fixture::new("1|a\n2|b\n3|c\n");
        fx.config.out_file_rename_int = true;
        fx.config.out_auto_batch = true;
        fx.config.out_auto_batch_count = 2;
        fx.config.out_auto_batch_name = "batch".into();
        fx.config.out_auto_batch_zero_pad = 3;
        fx.config.out_xtender_structure = true;
        for id in 1..=3 {
            fx.archive(id, "x");
        }

        let state = fx.run();
        assert_eq!(state.successful, 3);
        let out = &fx.config.out_dir;
        assert!(out.join("batch000/0/0/0").is_file());
        assert!(out.join("batch000/0/0/1").is_file());
        assert!(out.join("batch001/0/0/2").is_file());
        assert_eq!(fx.out("batch000_index.txt").lines().count(), 2);
        assert_eq!(fx.out("batch001_index.txt").lines().count(), 1);
    }

    #[test]
    fn unwritable_destination_aborts_the_run() {
        let fx = Fixture::new("1|blocker/a\n");
        fx.archive(1, "one");
        fs::write(fx.config.out_dir.join("blocker"), "not a dir").unwrap();

        let err = migrate(&fx.config, &mut NoopProgress).unwrap_err();
        assert!(format!("{err:#}").contains("Unable to create output directory"));
    }

    #[test]
    fn hostile_file_names_are_error_rows() {
        let dir = tempdir().unwrap();
        let elsewhere = dir.path().join("elsewhere/stolen.txt");
        let input = format!("1|{}\n2|../up.txt\n3|\n4|d\n", elsewhere.display());
        let fx = Fixture::new(&input);
        for id in 1..=4 {
            fx.archive(id, "x");
        }

        let state = fx.run();
        assert_eq!(state.lines, 4);
        assert_eq!(state.successful, 1);
        assert_eq!(state.failed, 0);
        assert!(!elsewhere.exists());
        assert!(!fx.dir.path().join("up.txt").exists());
        assert_eq!(fx.out("errors.txt").lines().count(), 3);
        assert_eq!(fx.out("d"), "x");
    }

    #[test]
    fn name_of_an_existing_directory_is_an_error_row() {
        let fx = Fixture::new("1|sub/a\n2|sub\n3|c\n");
        for id in 1..=3 {
            fx.archive(id, "x");
        }

        let state = fx.run();
        assert_eq!(state.successful, 2);
        assert_eq!(fx.out("errors.txt"), "2|sub\n");
        assert_eq!(fx.out("c"), "x");
    }

    #[test]
    fn invalid_utf8_is_read_lossily() {
        let fx = Fixture::new("");
        fs::write(&fx.config.in_flat_file, b"1|caf\xe9\n2|b\n").unwrap();
        fx.archive(1, "one");
        fx.archive(2, "two");

        let state = fx.run();
        assert_eq!(state.lines, 2);
        assert_eq!(state.successful, 2);
        assert_eq!(fx.out("caf\u{FFFD}"), "one");
        assert!(fx.out("index.txt").starts_with("1|caf\u{FFFD}|"));
    }

    #[test]
    fn processor_reports_dispositions() {
        let fx = Fixture::new("");
        fx.archive(4, "four");
        let mut processor = LineProcessor::new(&fx.config).unwrap();
        assert_eq!(processor.process_line("4|x").unwrap(), Disposition::Indexed);
        assert_eq!(processor.process_line("4|y").unwrap(), Disposition::Duplicate);
        assert_eq!(processor.process_line("").unwrap(), Disposition::Empty);
        assert_eq!(processor.process_line("q|z").unwrap(), Disposition::Errored);
        let state = processor.finish().unwrap();
        assert_eq!(state.lines, 4);
        assert!(Path::new(&fx.dir.path().join("out/x")).is_file());
    }
}
