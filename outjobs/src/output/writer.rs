//! Output directory writer
//!
//! Tracks which job writes which file of an output directory. Jobs claim a
//! path with [`OutputDirectoryWriter::begin_writing_file`] before writing it,
//! afterwards [`OutputDirectoryWriter::remove_obsolete_files`] deletes files
//! the job wrote in earlier runs but not in this one.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tokio::sync::broadcast;
use tracing::{debug, error, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::core::JobError;
use crate::runner::RunnerEvent;

use super::index::{OutputIndex, FIELD_SEPARATOR, INDEX_FILE_NAME};

pub struct OutputDirectoryWriter {
    directory: PathBuf,
    /// `None` until [`OutputDirectoryWriter::load_index`] was called.
    index: Option<OutputIndex>,
    /// Files written in this run per job, in write order.
    written_files: BTreeMap<Uuid, Vec<PathBuf>>,
    claimed: HashSet<String>,
    dirty: bool,
    events: broadcast::Sender<RunnerEvent>,
}

impl OutputDirectoryWriter {
    pub fn new(directory: impl Into<PathBuf>, events: broadcast::Sender<RunnerEvent>) -> Self {
        Self {
            directory: directory.into(),
            index: None,
            written_files: BTreeMap::new(),
            claimed: HashSet::new(),
            dirty: false,
            events,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn index_path(&self) -> PathBuf {
        self.directory.join(INDEX_FILE_NAME)
    }

    pub fn index(&self) -> Option<&OutputIndex> {
        self.index.as_ref()
    }

    pub fn is_index_loaded(&self) -> bool {
        self.index.is_some()
    }

    /// Relative paths written in the current run, per job.
    pub fn written_files(&self) -> &BTreeMap<Uuid, Vec<PathBuf>> {
        &self.written_files
    }

    pub fn written_count(&self, job: &Uuid) -> usize {
        self.written_files.get(job).map_or(0, Vec::len)
    }

    /// Loads the index and starts a new run.
    ///
    /// A missing index is an empty index. An unreadable or malformed index is
    /// discarded with a warning and `false` is returned; the writer is usable
    /// either way.
    pub fn load_index(&mut self) -> crate::Result<bool> {
        if self.directory.exists() && !self.directory.is_dir() {
            return Err(JobError::invalid_path(
                self.directory.display().to_string(),
                "the output directory is not a directory",
            ));
        }
        self.written_files.clear();
        self.claimed.clear();
        self.dirty = false;

        let path = self.index_path();
        let (index, clean) = match std::fs::read_to_string(&path) {
            Ok(content) => match OutputIndex::parse(&content) {
                Ok(index) => (index, true),
                Err(e) => {
                    warn!("Discarding malformed output index {}: {}", path.display(), e);
                    (OutputIndex::new(), false)
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => (OutputIndex::new(), true),
            Err(e) => {
                warn!("Failed to read output index {}: {}", path.display(), e);
                (OutputIndex::new(), false)
            }
        };
        debug!("Loaded output index with {} entries", index.len());
        self.index = Some(index);
        Ok(clean)
    }

    /// Claims `relative_path` for `job` and returns the absolute path to
    /// write to. Parent directories are created.
    pub fn begin_writing_file(&mut self, job: Uuid, relative_path: &str) -> crate::Result<PathBuf> {
        if self.index.is_none() {
            debug_assert!(false, "output index used before load_index()");
            return Err(JobError::IndexNotLoaded);
        }
        let relative = normalize_relative_path(relative_path)?;
        let absolute = self.directory.join(&relative);
        if !self.claimed.insert(relative.clone()) {
            return Err(JobError::DuplicateOutputFile(absolute));
        }
        let _ = self.events.send(RunnerEvent::AboutToWriteFile(absolute.clone()));
        if let Some(index) = self.index.as_mut() {
            index.insert(relative.clone(), job);
        }
        self.dirty = true;
        self.written_files
            .entry(job)
            .or_default()
            .push(PathBuf::from(&relative));
        debug!("Job {} writes {}", job, relative);

        if let Some(parent) = absolute.parent() {
            std::fs::create_dir_all(parent).map_err(|e| JobError::io(parent, e))?;
        }
        Ok(absolute)
    }

    /// Like [`OutputDirectoryWriter::begin_writing_file`] for a path which
    /// is already absolute, e.g. one reported by an export backend.
    pub fn begin_writing_absolute(&mut self, job: Uuid, path: &Path) -> crate::Result<PathBuf> {
        let relative = path.strip_prefix(&self.directory).map_err(|_| {
            JobError::invalid_path(
                path.display().to_string(),
                "not located in the output directory",
            )
        })?;
        let relative = path_to_index_key(relative);
        self.begin_writing_file(job, &relative)
    }

    /// Removes files owned by `job` in the index which were not written in
    /// the current run.
    pub fn remove_obsolete_files(&mut self, job: &Uuid) -> crate::Result<()> {
        let Some(index) = self.index.as_ref() else {
            return Err(JobError::IndexNotLoaded);
        };
        let written: BTreeSet<String> = self
            .written_files
            .get(job)
            .map(|files| files.iter().map(|p| path_to_index_key(p)).collect())
            .unwrap_or_default();
        let obsolete: Vec<String> = index
            .files_of(job)
            .into_iter()
            .filter(|path| !written.contains(path))
            .collect();

        for relative in obsolete {
            let absolute = self.directory.join(&relative);
            let _ = self.events.send(RunnerEvent::AboutToRemoveFile(absolute.clone()));
            remove_file_if_exists(&absolute)?;
            debug!("Removed obsolete file {}", relative);
            if let Some(index) = self.index.as_mut() {
                index.remove(&relative);
            }
            self.dirty = true;
            self.prune_empty_dirs(&absolute);
        }
        Ok(())
    }

    /// Files in the output directory which are not owned by any of
    /// `known_jobs`. Hidden files and the index itself are never reported.
    pub fn find_unknown_files(&self, known_jobs: &BTreeSet<Uuid>) -> crate::Result<Vec<PathBuf>> {
        let index = self.index.as_ref().ok_or(JobError::IndexNotLoaded)?;
        if !self.directory.is_dir() {
            return Ok(Vec::new());
        }
        let mut unknown = Vec::new();
        let walker = WalkDir::new(&self.directory)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e.file_name()));
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.directory).to_path_buf();
                JobError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.directory) else {
                continue;
            };
            let key = path_to_index_key(relative);
            let known = index.get(&key).is_some_and(|owner| known_jobs.contains(&owner));
            if !known {
                unknown.push(entry.path().to_path_buf());
            }
        }
        unknown.sort();
        Ok(unknown)
    }

    /// Deletes `files` (absolute paths) and drops them from the index.
    pub fn remove_unknown_files(&mut self, files: &[PathBuf]) -> crate::Result<()> {
        for file in files {
            let _ = self.events.send(RunnerEvent::AboutToRemoveFile(file.clone()));
            remove_file_if_exists(file)?;
            if let Ok(relative) = file.strip_prefix(&self.directory) {
                let key = path_to_index_key(relative);
                if let Some(index) = self.index.as_mut() {
                    if index.remove(&key).is_some() {
                        self.dirty = true;
                    }
                }
            }
            debug!("Removed unknown file {}", file.display());
            self.prune_empty_dirs(file);
        }
        Ok(())
    }

    /// Writes the index, sorted by path.
    pub fn store_index(&mut self) -> crate::Result<()> {
        let index = self.index.as_ref().ok_or(JobError::IndexNotLoaded)?;
        let path = self.index_path();
        std::fs::create_dir_all(&self.directory).map_err(|e| JobError::io(&self.directory, e))?;
        std::fs::write(&path, index.serialize()).map_err(|e| JobError::io(&path, e))?;
        self.dirty = false;
        debug!("Stored output index with {} entries", index.len());
        Ok(())
    }

    /// Removes empty directories from the parent of `file` up to (but not
    /// including) the output directory.
    fn prune_empty_dirs(&self, file: &Path) {
        let mut current = file.parent();
        while let Some(dir) = current {
            if dir == self.directory || !dir.starts_with(&self.directory) {
                break;
            }
            // Fails for non-empty directories, which ends the walk.
            if std::fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

impl Drop for OutputDirectoryWriter {
    fn drop(&mut self) {
        if self.dirty && self.index.is_some() {
            if let Err(e) = self.store_index() {
                error!("Failed to store output index on drop: {}", e);
            }
        }
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

fn remove_file_if_exists(path: &Path) -> crate::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(JobError::io(path, e)),
    }
}

/// Index keys always use `/`, whatever the platform separator is.
fn path_to_index_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Validates a relative output path and normalizes it to an index key.
fn normalize_relative_path(path: &str) -> crate::Result<String> {
    if path.contains(FIELD_SEPARATOR) {
        return Err(JobError::invalid_path(
            path,
            format!("the character '{}' is not allowed", FIELD_SEPARATOR),
        ));
    }
    if path.contains('\n') || path.contains('\r') {
        return Err(JobError::invalid_path(path, "line breaks are not allowed"));
    }
    let unified = path.replace('\\', "/");
    if unified.starts_with('/') || Path::new(path).is_absolute() || has_drive_prefix(&unified) {
        return Err(JobError::invalid_path(path, "must be a relative path"));
    }
    let mut parts = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                return Err(JobError::invalid_path(
                    path,
                    "must not leave the output directory",
                ))
            }
            part if part.trim() != part => {
                return Err(JobError::invalid_path(
                    path,
                    "file and directory names must not start or end with whitespace",
                ))
            }
            part => parts.push(part),
        }
    }
    if parts.is_empty() {
        return Err(JobError::invalid_path(path, "empty file path"));
    }
    let normalized = parts.join("/");
    if normalized == INDEX_FILE_NAME {
        return Err(JobError::invalid_path(path, "reserved for the output index"));
    }
    Ok(normalized)
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn writer(dir: &TempDir) -> (OutputDirectoryWriter, broadcast::Receiver<RunnerEvent>) {
        let (tx, rx) = broadcast::channel(256);
        (OutputDirectoryWriter::new(dir.path().join("out"), tx), rx)
    }

    fn write(writer: &mut OutputDirectoryWriter, job: Uuid, path: &str) -> PathBuf {
        let fp = writer.begin_writing_file(job, path).unwrap();
        std::fs::write(&fp, path).unwrap();
        fp
    }

    #[test]
    fn test_requires_loaded_index() {
        let dir = TempDir::new().unwrap();
        let (mut writer, _rx) = writer(&dir);
        assert!(matches!(writer.store_index(), Err(JobError::IndexNotLoaded)));
        assert!(matches!(
            writer.remove_obsolete_files(&Uuid::new_v4()),
            Err(JobError::IndexNotLoaded)
        ));
    }

    #[test]
    fn test_missing_index_loads_cleanly() {
        let dir = TempDir::new().unwrap();
        let (mut writer, _rx) = writer(&dir);
        assert!(writer.load_index().unwrap());
        assert_eq!(writer.index().map(OutputIndex::len), Some(0));
    }

    #[test]
    fn test_malformed_index_is_discarded() {
        let dir = TempDir::new().unwrap();
        let (mut writer, _rx) = writer(&dir);
        std::fs::create_dir_all(writer.directory()).unwrap();
        std::fs::write(writer.index_path(), "garbage without separator\n").unwrap();
        assert!(!writer.load_index().unwrap());
        assert_eq!(writer.index().map(OutputIndex::len), Some(0));
    }

    #[test]
    fn test_begin_writing_claims_and_creates_dirs() {
        let dir = TempDir::new().unwrap();
        let (mut writer, mut rx) = writer(&dir);
        writer.load_index().unwrap();
        let job = Uuid::new_v4();
        let fp = writer.begin_writing_file(job, "gerber/./board.gbr").unwrap();
        assert_eq!(fp, writer.directory().join("gerber/board.gbr"));
        assert!(fp.parent().unwrap().is_dir());
        assert_eq!(writer.index().unwrap().get("gerber/board.gbr"), Some(job));
        assert_eq!(writer.written_count(&job), 1);
        assert_eq!(rx.try_recv().unwrap(), RunnerEvent::AboutToWriteFile(fp));
    }

    #[test]
    fn test_duplicate_claim_in_same_run_fails() {
        let dir = TempDir::new().unwrap();
        let (mut writer, _rx) = writer(&dir);
        writer.load_index().unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        writer.begin_writing_file(a, "out.csv").unwrap();
        assert!(matches!(
            writer.begin_writing_file(b, "out.csv"),
            Err(JobError::DuplicateOutputFile(_))
        ));
        assert!(matches!(
            writer.begin_writing_file(a, "./out.csv"),
            Err(JobError::DuplicateOutputFile(_))
        ));
    }

    #[test]
    fn test_rejected_claim_is_not_announced() {
        let dir = TempDir::new().unwrap();
        let (mut writer, mut rx) = writer(&dir);
        writer.load_index().unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let fp = writer.begin_writing_file(a, "out.csv").unwrap();
        assert!(writer.begin_writing_file(b, "out.csv").is_err());
        assert_eq!(rx.try_recv().unwrap(), RunnerEvent::AboutToWriteFile(fp));
        assert!(rx.try_recv().is_err());
        assert_eq!(writer.written_count(&b), 0);
    }

    #[test]
    fn test_similar_paths_keep_their_owners_after_reload() {
        let dir = TempDir::new().unwrap();
        let (mut writer, _rx) = writer(&dir);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        writer.load_index().unwrap();
        write(&mut writer, a, "bom lite.csv");
        write(&mut writer, b, "bom.csv");
        writer.store_index().unwrap();

        writer.load_index().unwrap();
        assert_eq!(writer.index().unwrap().get("bom lite.csv"), Some(a));
        assert_eq!(writer.index().unwrap().get("bom.csv"), Some(b));
        assert!(writer.find_unknown_files(&BTreeSet::from([a, b])).unwrap().is_empty());

        write(&mut writer, a, "bom lite.csv");
        writer.remove_obsolete_files(&a).unwrap();
        assert!(writer.directory().join("bom.csv").exists());
    }

    #[test]
    fn test_claim_from_previous_run_is_overwrite() {
        let dir = TempDir::new().unwrap();
        let (mut writer, _rx) = writer(&dir);
        let job = Uuid::new_v4();
        writer.load_index().unwrap();
        write(&mut writer, job, "a.txt");
        writer.store_index().unwrap();

        writer.load_index().unwrap();
        assert!(writer.begin_writing_file(job, "a.txt").is_ok());
    }

    #[test]
    fn test_invalid_paths_rejected() {
        let dir = TempDir::new().unwrap();
        let (mut writer, _rx) = writer(&dir);
        writer.load_index().unwrap();
        let job = Uuid::new_v4();
        for path in [
            "a|b.txt",
            "/etc/passwd",
            "../escape.txt",
            "a/../../b",
            "",
            INDEX_FILE_NAME,
            "C:/x",
            "bom.csv ",
            " bom.csv",
            "assembly /pnp.csv",
            "bom.csv\t",
        ] {
            assert!(
                matches!(
                    writer.begin_writing_file(job, path),
                    Err(JobError::InvalidOutputPath { .. })
                ),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_obsolete_files_removed() {
        let dir = TempDir::new().unwrap();
        let (mut writer, _rx) = writer(&dir);
        let job = Uuid::new_v4();

        writer.load_index().unwrap();
        let a = write(&mut writer, job, "a.txt");
        let b = write(&mut writer, job, "sub/b.txt");
        writer.remove_obsolete_files(&job).unwrap();
        writer.store_index().unwrap();

        writer.load_index().unwrap();
        write(&mut writer, job, "a.txt");
        let c = write(&mut writer, job, "c.txt");
        writer.remove_obsolete_files(&job).unwrap();
        writer.store_index().unwrap();

        assert!(a.exists());
        assert!(!b.exists());
        assert!(!b.parent().unwrap().exists());
        assert!(c.exists());
        let index = writer.index().unwrap();
        assert_eq!(index.files_of(&job), vec!["a.txt".to_string(), "c.txt".to_string()]);
    }

    #[test]
    fn test_obsolete_cleanup_tolerates_missing_files() {
        let dir = TempDir::new().unwrap();
        let (mut writer, _rx) = writer(&dir);
        let job = Uuid::new_v4();
        writer.load_index().unwrap();
        let a = write(&mut writer, job, "a.txt");
        writer.store_index().unwrap();
        std::fs::remove_file(&a).unwrap();

        writer.load_index().unwrap();
        writer.remove_obsolete_files(&job).unwrap();
        assert!(writer.index().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_files() {
        let dir = TempDir::new().unwrap();
        let (mut writer, _rx) = writer(&dir);
        let (known, deleted) = (Uuid::new_v4(), Uuid::new_v4());
        writer.load_index().unwrap();
        write(&mut writer, known, "known.txt");
        write(&mut writer, deleted, "orphan/old.txt");
        writer.store_index().unwrap();
        std::fs::write(writer.directory().join("stray.txt"), "x").unwrap();
        std::fs::write(writer.directory().join(".hidden"), "x").unwrap();

        let unknown = writer
            .find_unknown_files(&BTreeSet::from([known]))
            .unwrap();
        let out = writer.directory().to_path_buf();
        assert_eq!(unknown, vec![out.join("orphan/old.txt"), out.join("stray.txt")]);

        writer.remove_unknown_files(&unknown).unwrap();
        assert!(!out.join("orphan").exists());
        assert!(!out.join("stray.txt").exists());
        assert!(out.join("known.txt").exists());
        assert!(out.join(INDEX_FILE_NAME).exists());
        assert_eq!(writer.index().unwrap().len(), 1);
    }

    #[test]
    fn test_drop_flushes_dirty_index() {
        let dir = TempDir::new().unwrap();
        let job = Uuid::new_v4();
        let index_path = {
            let (mut writer, _rx) = writer(&dir);
            writer.load_index().unwrap();
            write(&mut writer, job, "a.txt");
            writer.index_path()
        };
        let content = std::fs::read_to_string(index_path).unwrap();
        assert_eq!(content, format!("a.txt | {}\n", job));
    }

    #[test]
    fn test_begin_writing_absolute() {
        let dir = TempDir::new().unwrap();
        let (mut writer, _rx) = writer(&dir);
        writer.load_index().unwrap();
        let job = Uuid::new_v4();
        let inside = writer.directory().join("gerber").join("x.gbr");
        assert_eq!(writer.begin_writing_absolute(job, &inside).unwrap(), inside);
        assert!(writer
            .begin_writing_absolute(job, &dir.path().join("elsewhere.gbr"))
            .is_err());
    }
}
