use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct RunConfig {
    // Input
    #[serde(default)]
    pub in_flat_file: PathBuf,
    #[serde(default)]
    pub in_dir: PathBuf,
    #[serde(default)]
    pub in_file_ext: String,

    // Output
    pub out_dir: PathBuf,
    #[serde(default = "default_log_name")]
    pub out_log: String,
    #[serde(default = "default_index_name")]
    pub out_lines_name: String,
    #[serde(default = "default_error_name")]
    pub out_lines_error_name: String,
    #[serde(default = "default_duplicate_name")]
    pub out_lines_duplicate_name: String,
    #[serde(default)]
    pub out_lines_columns: String,
    #[serde(default)]
    pub out_lines_row_offset: u64,
    #[serde(default)]
    pub out_lines_copy_offset_rows: bool,
    #[serde(default)]
    pub out_file_ext: String,
    #[serde(default)]
    pub out_file_rename_int: bool,
    #[serde(default)]
    pub out_file_rename_int_offset: u64,
    #[serde(default)]
    pub out_xtender_structure: bool,
    #[serde(default)]
    pub out_zipped: bool,
    #[serde(default)]
    pub out_zipped_delete_source: bool,

    // Batching
    #[serde(default)]
    pub out_auto_batch: bool,
    #[serde(default = "default_batch_count")]
    pub out_auto_batch_count: u64,
    #[serde(default)]
    pub out_auto_batch_name: String,
    #[serde(default)]
    pub out_auto_batch_zero_pad: usize,

    // Missing-object audit
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub missing_in: PathBuf,

    // Shared by source and destination layouts
    #[serde(default = "default_dir_depth")]
    pub dir_depth: u32,
    #[serde(default = "default_folder_size")]
    pub folder_size: u64,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub compute_checksum: bool,

    // Column map
    #[serde(rename = "ColObjectID", default)]
    pub col_object_id: usize,
    #[serde(default = "default_file_name_column")]
    pub col_file_name: usize,
    #[serde(default)]
    pub col_file_ext_in: Option<usize>,
    #[serde(default)]
    pub col_file_ext_out: Option<usize>,
}

fn default_log_name() -> String {
    "migrate.log".into()
}

fn default_index_name() -> String {
    "index.txt".into()
}

fn default_error_name() -> String {
    "errors.txt".into()
}

fn default_duplicate_name() -> String {
    "duplicates.txt".into()
}

fn default_batch_count() -> u64 {
    1000
}

fn default_dir_depth() -> u32 {
    2
}

fn default_folder_size() -> u64 {
    1024
}

fn default_delimiter() -> String {
    "|".into()
}

fn default_file_name_column() -> usize {
    1
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::read(path)?.normalized()
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        self.validate()?;
        self.out_dir = std::path::absolute(&self.out_dir)
            .map_err(|err| ConfigError::invalid("OutDir", err.to_string()))?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.out_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("OutDir", "must not be empty"));
        }
        if self.folder_size < 2 {
            return Err(ConfigError::invalid(
                "FolderSize",
                format!("must be greater than 1, got {}", self.folder_size),
            ));
        }
        if self.delimiter.is_empty() {
            return Err(ConfigError::invalid("Delimiter", "must not be empty"));
        }
        if self.out_auto_batch && self.out_auto_batch_count == 0 {
            return Err(ConfigError::invalid(
                "OutAutoBatchCount",
                "must be greater than 0 when OutAutoBatch is enabled",
            ));
        }
        if self.missing {
            if self.missing_in.as_os_str().is_empty() {
                return Err(ConfigError::invalid(
                    "MissingIn",
                    "required when Missing is enabled",
                ));
            }
        } else if self.in_flat_file.as_os_str().is_empty() {
            return Err(ConfigError::invalid("InFlatFile", "must not be empty"));
        }
        self.output_columns()?;
        Ok(())
    }

    pub fn output_columns(&self) -> Result<Option<Vec<usize>>, ConfigError> {
        let list = self.out_lines_columns.trim();
        if list.is_empty() {
            return Ok(None);
        }
        list.split(',')
            .map(|part| {
                part.trim().parse::<usize>().map_err(|_| {
                    ConfigError::invalid(
                        "OutLinesColumns",
                        format!("{part:?} is not a column index"),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    pub fn log_path(&self) -> PathBuf {
        self.out_dir.join(&self.out_log)
    }

    pub fn duplicates_path(&self) -> PathBuf {
        self.out_dir.join(&self.out_lines_duplicate_name)
    }

    pub fn errors_path(&self) -> PathBuf {
        self.out_dir.join(&self.out_lines_error_name)
    }

    pub fn index_path(&self, batch: Option<&str>) -> PathBuf {
        match batch {
            Some(label) => self
                .out_dir
                .join(format!("{label}_{}", self.out_lines_name)),
            None => self.out_dir.join(&self.out_lines_name),
        }
    }

    pub fn missing_report_path(&self, bucket: &str) -> PathBuf {
        self.out_dir.join(format!("{bucket}_missing.txt"))
    }
}

#[cfg(test)]
pub(crate) fn test_config(in_flat_file: &Path, out_dir: &Path) -> RunConfig {
    serde_json::from_value(serde_json::json!({
        "InFlatFile": in_flat_file,
        "OutDir": out_dir,
    }))
    .unwrap()
}
