//! outjobs - Output job pipeline for PCB design projects
//!
//! This library runs a project's list of output jobs (Gerber/Excellon,
//! pick&place, BOM, graphics, STEP, archives, ...) and keeps track of every
//! file they write, so that files which are no longer produced get removed
//! on the next run.
//!
//! # Quick Start
//!
//! ```no_run
//! use outjobs::{JobList, OutputJobRunner, Project, ProjectDataBackend};
//! use std::path::Path;
//!
//! let mut project = Project::load(Path::new("demo/demo.lpp")).unwrap();
//! let jobs = JobList::load(&JobList::default_path(project.directory())).unwrap();
//!
//! let mut backend = ProjectDataBackend::new();
//! let mut runner = OutputJobRunner::new(&mut project, &mut backend);
//! runner.run(jobs.jobs()).unwrap();
//!
//! for (job, files) in runner.written_files() {
//!     println!("{}: {} file(s)", job, files.len());
//! }
//! ```
//!
//! # Features
//!
//! - **Job model**: typed job kinds with forward compatible serialization
//! - **Object sets**: `all` / `default` / explicit board and variant selection
//! - **Output index**: obsolete and unknown file detection across runs
//! - **Backends**: geometry exports plug in through [`ExportBackend`]

pub mod attribute;
pub mod core;
pub mod export;
pub mod job;
pub mod output;
pub mod parser;
pub mod project;
pub mod runner;

// Re-export main types
pub use crate::core::{JobError, Result, RunnerOptions};
pub use attribute::{clean_file_name, substitute, substitute_path, AttributeLookup};
pub use export::{ExportBackend, ExportError, ProjectDataBackend};
pub use job::list::DependencyIssue;
pub use job::{JobEvent, JobKind, JobList, ObjectSet, OutputJob};
pub use output::{OutputDirectoryWriter, OutputIndex};
pub use project::{AssemblyVariant, Board, Project, ProjectAttributeLookup};
pub use runner::{OutputJobRunner, RunnerEvent};

/// Load a project together with its jobs file (convenience wrapper).
pub fn load_project(path: &std::path::Path) -> Result<(Project, JobList)> {
    let project = Project::load(path)?;
    let jobs_path = JobList::default_path(project.directory());
    let jobs = if jobs_path.exists() {
        JobList::load(&jobs_path)?
    } else {
        JobList::new()
    };
    Ok((project, jobs))
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        ExportBackend, JobError, JobKind, JobList, ObjectSet, OutputJob, OutputJobRunner, Project,
        ProjectDataBackend, RunnerEvent, RunnerOptions,
    };
}
