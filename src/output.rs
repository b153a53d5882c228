use crate::codec;
use crate::config::RunConfig;
use crate::error::RecordError;
use crate::record::{ExtensionPolicy, Record};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Naming {
    FromColumn(usize),
    RenameInt { offset: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPolicy {
    pub count: u64,
    pub prefix: String,
    pub zero_pad: usize,
}

impl BatchPolicy {
    pub fn label(&self, sequence: u64) -> String {
        format!(
            "{}{:0width$}",
            self.prefix,
            sequence / self.count,
            width = self.zero_pad
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketLayout {
    pub depth: u32,
    pub folder_size: u64,
}

#[derive(Debug, Clone)]
pub struct OutputPathStrategy {
    out_dir: PathBuf,
    naming: Naming,
    extension: ExtensionPolicy,
    batch: Option<BatchPolicy>,
    bucket: Option<BucketLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutput {
    pub sequence: u64,
    pub batch: Option<String>,
    pub dir: PathBuf,
    pub path: PathBuf,
}

impl ResolvedOutput {
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!(
                "Unable to create output directory {}. Stopping execution",
                self.dir.display()
            )
        })
    }
}

impl OutputPathStrategy {
    pub fn from_config(config: &RunConfig) -> Self {
        let naming = if config.out_file_rename_int {
            Naming::RenameInt {
                offset: config.out_file_rename_int_offset,
            }
        } else {
            Naming::FromColumn(config.col_file_name)
        };
        let batch = config.out_auto_batch.then(|| BatchPolicy {
            count: config.out_auto_batch_count,
            prefix: config.out_auto_batch_name.clone(),
            zero_pad: config.out_auto_batch_zero_pad,
        });
        let bucket = config.out_xtender_structure.then_some(BucketLayout {
            depth: config.dir_depth,
            folder_size: config.folder_size,
        });

        Self {
            out_dir: config.out_dir.clone(),
            naming,
            extension: ExtensionPolicy::new(&config.out_file_ext, config.col_file_ext_out),
            batch,
            bucket,
        }
    }

    pub fn sequence(&self, object_id: u64, successful: u64) -> u64 {
        match self.naming {
            Naming::RenameInt { offset } => successful + offset,
            Naming::FromColumn(_) => object_id,
        }
    }

    pub fn resolve(
        &self,
        record: &Record<'_>,
        object_id: u64,
        successful: u64,
    ) -> Result<ResolvedOutput, RecordError> {
        let sequence = self.sequence(object_id, successful);

        let mut file_name = match self.naming {
            Naming::RenameInt { .. } => sequence.to_string(),
            Naming::FromColumn(index) => record.column(index)?.to_string(),
        };
        if file_name.is_empty() {
            return Err(RecordError::InvalidFileName { value: file_name });
        }
        file_name.push_str(self.extension.extension(record)?);
        let file_name = relative_name(&file_name)?;

        let batch = self.batch.as_ref().map(|policy| policy.label(sequence));

        let mut dir = self.out_dir.clone();
        if let Some(label) = &batch {
            dir.push(label);
        }
        if let Some(layout) = self.bucket {
            dir.push(codec::bucket_path(sequence, layout.depth, layout.folder_size));
        }
        let path = dir.join(file_name);
        if let Some(parent) = path.parent() {
            dir = parent.to_path_buf();
        }

        Ok(ResolvedOutput {
            sequence,
            batch,
            dir,
            path,
        })
    }
}

/// Keeps `name` under the output directory: plain components only.
fn relative_name(name: &str) -> Result<PathBuf, RecordError> {
    let mut relative = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            _ => {
                return Err(RecordError::InvalidFileName {
                    value: name.to_string(),
                })
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(RecordError::InvalidFileName {
            value: name.to_string(),
        });
    }
    Ok(relative)
}
