use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub fn archive_path(dir: &Path) -> PathBuf {
    let mut name = OsString::from(dir.as_os_str());
    name.push(".zip");
    PathBuf::from(name)
}

pub fn zip_output(dir: &Path, delete_source: bool) -> Result<PathBuf> {
    let target = archive_path(dir);
    info!(source = %dir.display(), archive = %target.display(), "Zipping output directory");

    let file = File::create(&target)
        .with_context(|| format!("Unable to create archive {}", target.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0usize;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk directory {}", dir.display()))?;
        let path = entry.path();
        let relative = path
            .strip_prefix(dir)
            .with_context(|| format!("{} is outside {}", path.display(), dir.display()))?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let name = zip_entry_name(relative);

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)
                .with_context(|| format!("Unable to add {} to archive", path.display()))?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options)
                .with_context(|| format!("Unable to add {} to archive", path.display()))?;
            let mut input = File::open(path)
                .with_context(|| format!("Unable to read {}", path.display()))?;
            io::copy(&mut input, &mut zip)
                .with_context(|| format!("Unable to compress {}", path.display()))?;
            entries += 1;
        }
    }

    let mut writer = zip.finish().context("Unable to finish archive")?;
    writer.flush().context("Unable to finish archive")?;
    info!(archive = %target.display(), files = entries, "Zipped output directory");

    if delete_source {
        match fs::remove_dir_all(dir) {
            Ok(()) => info!(source = %dir.display(), "Removed zipped output directory"),
            Err(err) => warn!(source = %dir.display(), error = %err, "Unable to remove directory"),
        }
    }
    Ok(target)
}

/// Zip entries always use forward slashes.
fn zip_entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn build_tree(root: &Path) {
        fs::create_dir_all(root.join("batch000/0/0")).unwrap();
        fs::write(root.join("index.txt"), b"1|a|x\n").unwrap();
        fs::write(root.join("batch000/0/0/1.pdf"), b"pdf bytes").unwrap();
    }

    #[test]
    fn archives_tree_with_relative_names() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        build_tree(&out);

        let target = zip_output(&out, false).unwrap();
        assert_eq!(target, dir.path().join("out.zip"));
        assert!(out.exists());

        let mut archive = zip::ZipArchive::new(File::open(&target).unwrap()).unwrap();
        let mut contents = String::new();
        archive
            .by_name("batch000/0/0/1.pdf")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "pdf bytes");
        assert!(archive.by_name("index.txt").is_ok());
    }

    #[test]
    fn can_remove_the_source_tree() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        build_tree(&out);

        let target = zip_output(&out, true).unwrap();
        assert!(target.is_file());
        assert!(!out.exists());
    }
}
