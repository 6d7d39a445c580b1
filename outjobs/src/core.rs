//! Error types and options shared by the library and the CLI.

use std::path::PathBuf;

use serde::Deserialize;
use uuid::Uuid;

use crate::export::ExportError;
use crate::job::serialize::JobParseError;
use crate::parser::sexp::ParseError;
use crate::project::loader::ProjectParseError;

pub type Result<T> = std::result::Result<T, JobError>;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The output directory index was used before `load_index()`.
    #[error("Output directory index has not been loaded yet")]
    IndexNotLoaded,

    #[error("Unknown output job type '{0}'. You may need a more recent version to run this job.")]
    UnknownJobType(String),

    #[error("Board does not exist: {0}")]
    BoardNotFound(Uuid),

    #[error("Assembly variant does not exist: {0}")]
    AssemblyVariantNotFound(Uuid),

    #[error("The output file '{0}' is written by more than one job (or more than once by the same job), check the output paths of your jobs")]
    DuplicateOutputFile(PathBuf),

    #[error("Invalid output file path '{path}': {reason}")]
    InvalidOutputPath { path: String, reason: String },

    #[error("Unsupported {what} format: '{suffix}'")]
    UnsupportedFormat { what: &'static str, suffix: String },

    #[error("Unsupported page size: '{0}'")]
    UnsupportedPageSize(String),

    #[error("{0}")]
    NotSupported(String),

    #[error("The archive job depends on files from another job which was not run yet. Note that archive jobs can only depend on jobs further ahead in the list so you might need to reorder them.")]
    DependencyNotRun(Uuid),

    #[error("The input file must be located within the project directory, specified by a relative file path: '{0}'")]
    InputOutsideProject(String),

    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Failed to create archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to write CSV file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("S-expression parse error: {0}")]
    SExpParse(#[from] ParseError),

    #[error("Invalid job definition: {0}")]
    JobParse(#[from] JobParseError),

    #[error("Invalid project file: {0}")]
    ProjectParse(#[from] ProjectParseError),

    #[error("Output job '{name}' failed: {source}")]
    JobFailed {
        name: String,
        uuid: Uuid,
        #[source]
        source: Box<JobError>,
    },
}

impl JobError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        JobError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        JobError::InvalidOutputPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// For a [`JobError::JobFailed`], the UUID of the failed job.
    pub fn failed_job(&self) -> Option<Uuid> {
        match self {
            JobError::JobFailed { uuid, .. } => Some(*uuid),
            _ => None,
        }
    }
}

/// Options for a runner (CLI or embedding application).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RunnerOptions {
    /// Store the index after every successful job, not only at the end of
    /// the batch.
    pub persist_index_after_each_job: bool,
    /// Rebuild outdated plane fragments before exporting board geometry.
    pub rebuild_planes: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            persist_index_after_each_job: false,
            rebuild_planes: true,
        }
    }
}
