//! ZIP archives
//!
//! Entries are stored sorted by name with a fixed timestamp, so archiving the
//! same files twice yields identical bytes.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::JobError;

/// In-memory file system collecting archive entries before export.
#[derive(Debug, Clone, Default)]
pub struct ArchiveStaging {
    files: BTreeMap<String, Vec<u8>>,
}

impl ArchiveStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the entry `path`. Leading slashes and empty path
    /// segments are dropped.
    pub fn write(&mut self, path: &str, content: Vec<u8>) {
        let normalized = path
            .split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .collect::<Vec<_>>()
            .join("/");
        self.files.insert(normalized, content);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn export_to_zip(&self, path: &Path) -> crate::Result<()> {
        let file = File::create(path).map_err(|e| JobError::io(path, e))?;
        let mut zip = ZipWriter::new(file);
        for (name, content) in &self.files {
            zip.start_file(name.as_str(), entry_options())?;
            zip.write_all(content).map_err(|e| JobError::io(path, e))?;
        }
        zip.finish()?;
        Ok(())
    }
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
}

/// Zips all files below `directory` for which `filter` returns true. The
/// filter receives the `/` separated path relative to `directory`; hidden
/// files and directories are never included.
pub fn zip_directory(
    directory: &Path,
    destination: &Path,
    filter: impl Fn(&str) -> bool,
) -> crate::Result<usize> {
    let mut staging = ArchiveStaging::new();
    let walker = WalkDir::new(directory)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry.map_err(|e| JobError::io(directory, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(directory) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        // The destination may be located inside the zipped directory.
        if entry.path() == destination || !filter(&relative) {
            continue;
        }
        let content = std::fs::read(entry.path()).map_err(|e| JobError::io(entry.path(), e))?;
        staging.write(&relative, content);
    }
    staging.export_to_zip(destination)?;
    Ok(staging.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn entry_names(path: &Path) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_staging_export_is_sorted_and_deterministic() {
        let dir = TempDir::new().unwrap();
        let mut staging = ArchiveStaging::new();
        staging.write("gerber//b.gbr", b"b".to_vec());
        staging.write("/a.txt", b"a".to_vec());

        let first = dir.path().join("first.zip");
        let second = dir.path().join("second.zip");
        staging.export_to_zip(&first).unwrap();
        staging.export_to_zip(&second).unwrap();

        assert_eq!(entry_names(&first), vec!["a.txt", "gerber/b.gbr"]);
        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());

        let mut archive = zip::ZipArchive::new(File::open(&first).unwrap()).unwrap();
        let mut content = String::new();
        archive
            .by_name("gerber/b.gbr")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "b");
    }

    #[test]
    fn test_zip_directory_applies_filter() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir_all(project.join("output/v1")).unwrap();
        std::fs::create_dir_all(project.join("boards")).unwrap();
        std::fs::write(project.join("demo.lpp"), "x").unwrap();
        std::fs::write(project.join("boards/board.lp"), "x").unwrap();
        std::fs::write(project.join("output/v1/big.zip"), "x").unwrap();
        std::fs::write(project.join(".hidden"), "x").unwrap();

        let destination = dir.path().join("project.lppz");
        let count = zip_directory(&project, &destination, |path| !path.starts_with("output/"))
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(entry_names(&destination), vec!["boards/board.lp", "demo.lpp"]);
    }
}
