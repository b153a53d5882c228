use crate::error::RecordError;
use crate::state::RunState;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

const TEMP_PREFIX: &str = ".bucket_migrate_copy";

#[derive(Debug)]
pub enum CopyOutcome {
    Copied { bytes: u64 },
    /// Recoverable: the record goes to the error sink.
    SourceMissing(RecordError),
}

#[derive(Debug, Default)]
pub struct CopyExecutor;

impl CopyExecutor {
    pub fn new() -> Self {
        Self
    }

    pub fn copy(&self, src: &Path, dst: &Path, state: &mut RunState) -> Result<CopyOutcome> {
        let input = match open_source(src) {
            Ok(file) => file,
            Err(source) => {
                state.failed += 1;
                return Ok(CopyOutcome::SourceMissing(RecordError::SourceMissing {
                    path: src.to_path_buf(),
                    source,
                }));
            }
        };

        let staged = self.stage(input, dst)?;
        let bytes = staged.bytes;
        staged
            .file
            .persist(dst)
            .map_err(|err| err.error)
            .with_context(|| {
                format!("Cannot create file out {}. Stopping execution", dst.display())
            })?;

        state.successful += 1;
        Ok(CopyOutcome::Copied { bytes })
    }

    fn stage(&self, mut input: File, dst: &Path) -> Result<Staged> {
        let dir = dst.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(dir)
            .with_context(|| {
                format!("Cannot create file out {}. Stopping execution", dst.display())
            })?;

        let bytes = {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            let bytes = io::copy(&mut input, &mut writer).with_context(|| {
                format!("Copying failed for {}. Stopping execution", dst.display())
            })?;
            writer.flush().with_context(|| {
                format!("Copying failed for {}. Stopping execution", dst.display())
            })?;
            bytes
        };

        if let Ok(metadata) = input.metadata() {
            fs::set_permissions(tmp.path(), metadata.permissions()).with_context(|| {
                format!("Cannot set permissions on {}. Stopping execution", dst.display())
            })?;
        }

        Ok(Staged { file: tmp, bytes })
    }
}

struct Staged {
    file: NamedTempFile,
    bytes: u64,
}

fn open_source(src: &Path) -> io::Result<File> {
    let file = File::open(src)?;
    if !file.metadata()?.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "source is not a regular file",
        ));
    }
    Ok(file)
}
