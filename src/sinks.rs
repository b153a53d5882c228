use crate::config::RunConfig;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub fn open_append(path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Unable to open output file {}", path.display()))?;
    Ok(BufWriter::new(file))
}

pub fn write_line<W: Write>(writer: &mut W, line: &str) -> Result<()> {
    writer
        .write_all(line.as_bytes())
        .and_then(|_| writer.write_all(b"\n"))
        .context("Unable to write output line")
}

struct IndexFile {
    batch: Option<String>,
    writer: BufWriter<File>,
}

/// Only the current batch's index file is held open; input is expected in
/// batch order, and a batch seen again is reopened for append.
pub struct Sinks<'c> {
    config: &'c RunConfig,
    index: Option<IndexFile>,
    batches: BTreeSet<Option<String>>,
    duplicates: BufWriter<File>,
    errors: BufWriter<File>,
}

impl<'c> Sinks<'c> {
    pub fn open(config: &'c RunConfig) -> Result<Self> {
        Ok(Self {
            config,
            index: None,
            batches: BTreeSet::new(),
            duplicates: open_append(&config.duplicates_path())?,
            errors: open_append(&config.errors_path())?,
        })
    }

    pub fn index(&mut self, batch: Option<&str>, line: &str) -> Result<()> {
        let writer = self.index_writer(batch)?;
        write_line(writer, line)
    }

    fn index_writer(&mut self, batch: Option<&str>) -> Result<&mut BufWriter<File>> {
        let index = match self.index.take() {
            Some(index) if index.batch.as_deref() == batch => index,
            previous => {
                if let Some(previous) = previous {
                    self.close_index(previous)?;
                }
                let batch = batch.map(str::to_string);
                let writer = open_append(&self.config.index_path(batch.as_deref()))?;
                self.batches.insert(batch.clone());
                IndexFile { batch, writer }
            }
        };
        Ok(&mut self.index.insert(index).writer)
    }

    fn close_index(&self, mut index: IndexFile) -> Result<()> {
        index.writer.flush().with_context(|| {
            format!(
                "Unable to flush index file {}",
                self.config.index_path(index.batch.as_deref()).display()
            )
        })
    }

    pub fn duplicate(&mut self, line: &str) -> Result<()> {
        write_line(&mut self.duplicates, line)
    }

    pub fn error(&mut self, line: &str) -> Result<()> {
        write_line(&mut self.errors, line)
    }

    pub fn index_paths(&self) -> Vec<PathBuf> {
        self.batches
            .iter()
            .map(|batch| self.config.index_path(batch.as_deref()))
            .collect()
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(index) = self.index.as_mut() {
            index.writer.flush().context("Unable to flush index file")?;
        }
        self.duplicates
            .flush()
            .context("Unable to flush duplicates file")?;
        self.errors.flush().context("Unable to flush error lines file")?;
        Ok(())
    }
}
