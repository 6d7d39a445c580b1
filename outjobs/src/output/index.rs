//! Output directory index
//!
//! Maps every file written into an output directory (relative path, always
//! with `/` separators) to the UUID of the job which wrote it. The index is
//! stored as a plain text file with one `path | uuid` line per file, sorted
//! by path.

use std::collections::BTreeMap;

use thiserror::Error;
use uuid::Uuid;

use crate::parser::parse_uuid;

/// Name of the index file in the root of the output directory.
pub const INDEX_FILE_NAME: &str = ".outjobs-index";

/// Separates path and UUID on an index line; never allowed in paths.
pub const FIELD_SEPARATOR: char = '|';

/// Exact separator written between path and UUID. Paths are kept verbatim,
/// so surrounding whitespace belongs to the separator, not the path.
const LINE_SEPARATOR: &str = " | ";

#[derive(Debug, Error)]
pub enum IndexParseError {
    #[error("Invalid index line {line}: {reason}")]
    InvalidLine { line: usize, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputIndex {
    entries: BTreeMap<String, Uuid>,
}

impl OutputIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(content: &str) -> Result<Self, IndexParseError> {
        let mut entries = BTreeMap::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let invalid = |reason: &str| IndexParseError::InvalidLine {
                line: i + 1,
                reason: reason.to_string(),
            };
            let (path, uuid) = line
                .rsplit_once(LINE_SEPARATOR)
                .ok_or_else(|| invalid("missing separator"))?;
            if path.is_empty() {
                return Err(invalid("empty path"));
            }
            let uuid = parse_uuid(uuid.trim()).ok_or_else(|| invalid("invalid UUID"))?;
            entries.insert(path.to_string(), uuid);
        }
        Ok(Self { entries })
    }

    /// One `path | uuid` line per entry, sorted by path.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (path, uuid) in &self.entries {
            out.push_str(path);
            out.push_str(LINE_SEPARATOR);
            out.push_str(&uuid.to_string());
            out.push('\n');
        }
        out
    }

    pub fn insert(&mut self, path: impl Into<String>, job: Uuid) -> Option<Uuid> {
        self.entries.insert(path.into(), job)
    }

    pub fn remove(&mut self, path: &str) -> Option<Uuid> {
        self.entries.remove(path)
    }

    pub fn get(&self, path: &str) -> Option<Uuid> {
        self.entries.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Uuid)> {
        self.entries.iter().map(|(path, uuid)| (path.as_str(), *uuid))
    }

    /// Paths owned by `job`, sorted.
    pub fn files_of(&self, job: &Uuid) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, owner)| *owner == job)
            .map(|(path, _)| path.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_sorted_and_parse_back() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut index = OutputIndex::new();
        index.insert("c.gbr", b);
        index.insert("a/b.txt", a);

        let text = index.serialize();
        assert_eq!(text, format!("a/b.txt | {}\nc.gbr | {}\n", a, b));
        assert_eq!(OutputIndex::parse(&text).unwrap(), index);
    }

    #[test]
    fn test_parse_tolerates_blank_lines() {
        let uuid = Uuid::new_v4();
        let text = format!("\n\ngerber/x y.gbr | {}  \r\n\n", uuid);
        let index = OutputIndex::parse(&text).unwrap();
        assert_eq!(index.get("gerber/x y.gbr"), Some(uuid));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_paths_with_surrounding_spaces_round_trip() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut index = OutputIndex::new();
        index.insert("bom.csv ", a);
        index.insert("bom.csv", b);
        index.insert(" lead.txt", a);

        let parsed = OutputIndex::parse(&index.serialize()).unwrap();
        assert_eq!(parsed, index);
        assert_eq!(parsed.get("bom.csv "), Some(a));
        assert_eq!(parsed.get("bom.csv"), Some(b));
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(OutputIndex::parse("no separator here").is_err());
        assert!(OutputIndex::parse(&format!("file.txt|{}", Uuid::nil())).is_err());
        assert!(OutputIndex::parse("file.txt | not-a-uuid").is_err());
        let err = OutputIndex::parse(&format!(" | {}", Uuid::nil())).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_files_of() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut index = OutputIndex::new();
        index.insert("z", a);
        index.insert("y", b);
        index.insert("x", a);
        assert_eq!(index.files_of(&a), vec!["x".to_string(), "z".to_string()]);
    }
}
