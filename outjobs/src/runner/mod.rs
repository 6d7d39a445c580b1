//! Output job runner
//!
//! Runs a list of output jobs strictly in list order against a project and
//! keeps the output directory index up to date:
//!
//! 1. the index is loaded once,
//! 2. every job claims its files, lets the backend write them, and removes
//!    the files it wrote in earlier runs but not in this one,
//! 3. the index is stored.
//!
//! The first failing job aborts the batch. Jobs are never reordered; an
//! archive job listed before one of its inputs fails.

mod pages;
mod strategies;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::{JobError, RunnerOptions};
use crate::export::ExportBackend;
use crate::job::{JobKind, OutputJob};
use crate::output::OutputDirectoryWriter;
use crate::project::Project;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Progress notifications of a runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    JobStarted { uuid: Uuid, name: String },
    AboutToWriteFile(PathBuf),
    AboutToRemoveFile(PathBuf),
    Warning(String),
}

pub struct OutputJobRunner<'a> {
    project: &'a mut Project,
    backend: &'a mut dyn ExportBackend,
    writer: OutputDirectoryWriter,
    events: broadcast::Sender<RunnerEvent>,
    options: RunnerOptions,
}

impl<'a> OutputJobRunner<'a> {
    /// Creates a runner writing into the project's current output directory.
    pub fn new(project: &'a mut Project, backend: &'a mut dyn ExportBackend) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let writer = OutputDirectoryWriter::new(project.current_output_dir(), events.clone());
        Self {
            project,
            backend,
            writer,
            events,
            options: RunnerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    pub fn project(&self) -> &Project {
        &*self.project
    }

    pub fn output_directory(&self) -> &Path {
        self.writer.directory()
    }

    /// Switches to another output directory. Pending index changes of the
    /// previous directory are flushed.
    pub fn set_output_directory(&mut self, directory: impl Into<PathBuf>) {
        self.writer = OutputDirectoryWriter::new(directory, self.events.clone());
    }

    /// Files written by the last (or current) run, relative to the output
    /// directory.
    pub fn written_files(&self) -> &BTreeMap<Uuid, Vec<PathBuf>> {
        self.writer.written_files()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunnerEvent> {
        self.events.subscribe()
    }

    /// Runs `jobs` in the given order.
    ///
    /// On error, files written so far stay on disk and the index is not
    /// stored (unless `persist_index_after_each_job` is set, or the runner
    /// is dropped with pending changes).
    pub fn run(&mut self, jobs: &[OutputJob]) -> crate::Result<()> {
        self.writer.load_index()?;
        for job in jobs {
            info!("Running output job '{}' ({})", job.name(), job.type_name());
            let _ = self.events.send(RunnerEvent::JobStarted {
                uuid: job.uuid(),
                name: job.name().to_string(),
            });
            self.run_job(job).map_err(|source| JobError::JobFailed {
                name: job.name().to_string(),
                uuid: job.uuid(),
                source: Box::new(source),
            })?;
            if self.options.persist_index_after_each_job {
                self.writer.store_index()?;
            }
            std::thread::yield_now();
        }
        self.writer.store_index()
    }

    /// Files in the output directory not owned by any of `known_jobs`.
    pub fn find_unknown_files(&mut self, known_jobs: &BTreeSet<Uuid>) -> crate::Result<Vec<PathBuf>> {
        if !self.writer.is_index_loaded() {
            self.writer.load_index()?;
        }
        self.writer.find_unknown_files(known_jobs)
    }

    pub fn remove_unknown_files(&mut self, files: &[PathBuf]) -> crate::Result<()> {
        if !self.writer.is_index_loaded() {
            self.writer.load_index()?;
        }
        self.writer.remove_unknown_files(files)?;
        self.writer.store_index()
    }

    fn run_job(&mut self, job: &OutputJob) -> crate::Result<()> {
        let uuid = job.uuid();
        let count_before = self.writer.written_count(&uuid);
        match job.kind() {
            JobKind::Graphics(config) => self.run_graphics(uuid, config)?,
            JobKind::GerberExcellon(config) => self.run_gerber_excellon(uuid, config)?,
            JobKind::PickPlace(config) => self.run_pick_place(uuid, config)?,
            JobKind::GerberX3(config) => self.run_gerber_x3(uuid, config)?,
            JobKind::Netlist(config) => self.run_netlist(uuid, config)?,
            JobKind::Bom(config) => self.run_bom(uuid, config)?,
            JobKind::InteractiveBom(config) => self.run_interactive_bom(uuid, config)?,
            JobKind::Board3D(config) => self.run_board_3d(uuid, config)?,
            JobKind::ProjectJson(config) => self.run_project_json(uuid, config)?,
            JobKind::ProjectArchive(config) => self.run_lppz(uuid, config)?,
            JobKind::Copy(config) => self.run_copy(uuid, config)?,
            JobKind::Archive(config) => self.run_archive(uuid, config)?,
            JobKind::Unknown(unknown) => {
                return Err(JobError::UnknownJobType(unknown.type_name.clone()))
            }
        }
        let count_after = self.writer.written_count(&uuid);
        self.writer.remove_obsolete_files(&uuid)?;
        if count_after <= count_before {
            self.warn("No output files were generated, check the job configuration.");
        }
        Ok(())
    }

    fn warn(&self, message: &str) {
        warn!("{}", message);
        let _ = self.events.send(RunnerEvent::Warning(message.to_string()));
    }

    /// Refills outdated planes of the given boards through the backend.
    fn rebuild_planes(&mut self, boards: &[Uuid]) -> crate::Result<()> {
        if !self.options.rebuild_planes {
            return Ok(());
        }
        for uuid in boards {
            let board = self
                .project
                .board_mut(uuid)
                .ok_or(JobError::BoardNotFound(*uuid))?;
            if board.planes_outdated {
                self.backend.rebuild_outdated_planes(board)?;
                board.planes_outdated = false;
            }
        }
        Ok(())
    }
}
