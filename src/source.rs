use crate::codec;
use crate::config::RunConfig;
use crate::error::RecordError;
use crate::record::{ExtensionPolicy, Record};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
enum SourceRoot {
    Static(PathBuf),
    Column(usize),
}

#[derive(Debug, Clone)]
pub struct SourceLayout {
    root: SourceRoot,
    extension: ExtensionPolicy,
    depth: u32,
    folder_size: u64,
}

impl SourceLayout {
    pub fn from_config(config: &RunConfig) -> Self {
        let root = if config.in_dir.as_os_str().is_empty() {
            SourceRoot::Column(config.col_file_name)
        } else {
            SourceRoot::Static(config.in_dir.clone())
        };
        Self {
            root,
            extension: ExtensionPolicy::new(&config.in_file_ext, config.col_file_ext_in),
            depth: config.dir_depth,
            folder_size: config.folder_size,
        }
    }

    pub fn resolve(&self, record: &Record<'_>, id: u64) -> Result<PathBuf, RecordError> {
        match &self.root {
            SourceRoot::Static(dir) => self.resolve_under(dir, record, id),
            SourceRoot::Column(index) => {
                let dir = record.column(*index)?;
                self.resolve_under(Path::new(dir), record, id)
            }
        }
    }

    pub fn resolve_under(
        &self,
        root: &Path,
        record: &Record<'_>,
        id: u64,
    ) -> Result<PathBuf, RecordError> {
        let extension = self.extension.extension(record)?;
        let name = format!("{}{extension}", codec::source_file_name(id));
        Ok(root
            .join(codec::bucket_path(id, self.depth, self.folder_size))
            .join(name))
    }
}
