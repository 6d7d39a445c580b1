//! Project-level job configurations: project JSON, project archive (lppz),
//! file copy and ZIP archives of other jobs' outputs.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::parser::SExp;

use super::object_set::ObjectSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectJsonJob {
    pub output_path: String,
}

impl Default for ProjectJsonJob {
    fn default() -> Self {
        Self {
            output_path: "{{PROJECT}}_{{VERSION}}.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LppzJob {
    pub output_path: String,
}

impl Default for LppzJob {
    fn default() -> Self {
        Self {
            output_path: "{{PROJECT}}_{{VERSION}}.lppz".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub boards: ObjectSet<Option<Uuid>>,
    pub variants: ObjectSet<Option<Uuid>>,
    /// Replace `{{...}}` placeholders in the copied file content.
    pub substitute_variables: bool,
    /// Project-relative path of the source file.
    pub input_path: String,
    pub output_path: String,
}

impl Default for CopyJob {
    fn default() -> Self {
        Self {
            boards: ObjectSet::Default,
            variants: ObjectSet::Default,
            substitute_variables: false,
            input_path: String::new(),
            output_path: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveJob {
    /// Source job to destination directory inside the archive.
    pub input_jobs: BTreeMap<Uuid, String>,
    pub output_path: String,
}

impl Default for ArchiveJob {
    fn default() -> Self {
        Self {
            input_jobs: BTreeMap::new(),
            output_path: "{{PROJECT}}_{{VERSION}}.zip".to_string(),
        }
    }
}

/// A job of a type this version does not know. The raw node is kept and
/// written back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownJob {
    pub type_name: String,
    pub node: SExp,
}
