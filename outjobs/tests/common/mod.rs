//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use outjobs::export::builtin::{bom_from_project, pick_place_from_project};
use outjobs::export::{
    BeforeWrite, Bom, ExportBackend, ExportError, FabricationSettings, GraphicsExportResult,
    GraphicsRequest, PickPlaceData,
};
use outjobs::job::InteractiveBomJob;
use outjobs::project::{AssemblyVariant, Board, BoardSide, Project, ProjectAttributeLookup};
use outjobs::{substitute_path, JobList, RunnerEvent};
use tempfile::TempDir;
use tokio::sync::broadcast;
use walkdir::WalkDir;

pub const PNP_JOB: &str = "4b5a6c7d-8e9f-4a0b-9c1d-2e3f4a5b6c01";
pub const BOM_JOB: &str = "4b5a6c7d-8e9f-4a0b-9c1d-2e3f4a5b6c02";
pub const ARCHIVE_JOB: &str = "4b5a6c7d-8e9f-4a0b-9c1d-2e3f4a5b6c05";
pub const UNKNOWN_JOB: &str = "4b5a6c7d-8e9f-4a0b-9c1d-2e3f4a5b6c06";

pub fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/demo")
}

/// Copies the demo project into a fresh temporary directory.
pub fn demo_project() -> (TempDir, Project, JobList) {
    let dir = TempDir::new().unwrap();
    let source = fixture_dir();
    for entry in WalkDir::new(&source).into_iter().map(Result::unwrap) {
        let relative = entry.path().strip_prefix(&source).unwrap();
        let target = dir.path().join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).unwrap();
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
    let project = Project::load(&dir.path().join("demo.lpp")).unwrap();
    let jobs = JobList::load(&JobList::default_path(dir.path())).unwrap();
    (dir, project, jobs)
}

/// Relative paths of all files below `dir`, sorted.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

/// Events received so far.
pub fn drain(events: &mut broadcast::Receiver<RunnerEvent>) -> Vec<RunnerEvent> {
    let mut result = Vec::new();
    while let Ok(event) = events.try_recv() {
        result.push(event);
    }
    result
}

pub fn warnings(events: &[RunnerEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            RunnerEvent::Warning(message) => Some(message.clone()),
            _ => None,
        })
        .collect()
}

pub fn removed_files(events: &[RunnerEvent]) -> Vec<PathBuf> {
    events
        .iter()
        .filter_map(|e| match e {
            RunnerEvent::AboutToRemoveFile(path) => Some(path.clone()),
            _ => None,
        })
        .collect()
}

/// Backend writing small placeholder files and recording every call.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<String>,
    pub planes_rebuilt: Vec<String>,
    /// Additional page files reported by graphics exports.
    pub graphics_extra_pages: usize,
    /// Error reported by graphics exports after writing.
    pub graphics_error: Option<String>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn write(path: &Path, content: &str) -> outjobs::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
    Ok(())
}

impl ExportBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn rebuild_outdated_planes(&mut self, board: &mut Board) -> outjobs::Result<()> {
        self.planes_rebuilt.push(board.name.clone());
        Ok(())
    }

    fn export_gerber_excellon(
        &mut self,
        project: &Project,
        board: &Board,
        settings: &FabricationSettings,
        before_write: &mut BeforeWrite<'_>,
    ) -> outjobs::Result<()> {
        self.calls.push(format!("gerber:{}", board.name));
        let lookup = ProjectAttributeLookup::new(project, Some(board), None);
        let suffixes = &settings.suffixes;
        let mut files = vec![&suffixes.outlines, &suffixes.copper_top, &suffixes.copper_bot];
        if settings.merge_drill_files {
            files.push(&suffixes.drills);
        } else {
            files.push(&suffixes.drills_pth);
            files.push(&suffixes.drills_npth);
        }
        for suffix in files {
            let path = PathBuf::from(substitute_path(
                &format!("{}{}", settings.output_base_path, suffix),
                &lookup,
            ));
            before_write(&path)?;
            write(&path, &format!("G04 {}*", board.name))?;
        }
        Ok(())
    }

    fn export_graphics(
        &mut self,
        _project: &Project,
        request: &GraphicsRequest,
        path: &Path,
    ) -> outjobs::Result<GraphicsExportResult> {
        self.calls.push(format!(
            "graphics:{}:{}",
            request.document_title,
            request.pages.len()
        ));
        write(path, &request.document_title)?;
        let mut written_files = vec![path.to_path_buf()];
        for page in 0..self.graphics_extra_pages {
            let extra = path.with_file_name(format!("page{}.png", page + 2));
            write(&extra, "png")?;
            written_files.push(extra);
        }
        Ok(GraphicsExportResult {
            written_files,
            error: self.graphics_error.clone(),
        })
    }

    fn export_component_layer(
        &mut self,
        board: &Board,
        side: BoardSide,
        variant: &AssemblyVariant,
        path: &Path,
    ) -> outjobs::Result<()> {
        self.calls
            .push(format!("x3:{}:{}:{}", board.name, side.as_str(), variant.name));
        write(path, "G04 X3*")
    }

    fn generate_pick_place(
        &mut self,
        project: &Project,
        board: &Board,
        variant: &AssemblyVariant,
    ) -> outjobs::Result<PickPlaceData> {
        self.calls.push(format!("pnp:{}:{}", board.name, variant.name));
        Ok(pick_place_from_project(project, board, variant))
    }

    fn generate_bom(
        &mut self,
        project: &Project,
        board: Option<&Board>,
        variant: &AssemblyVariant,
        custom_attributes: &[String],
    ) -> outjobs::Result<Bom> {
        let board_name = board.map_or("-", |b| b.name.as_str());
        self.calls.push(format!("bom:{}:{}", board_name, variant.name));
        Ok(bom_from_project(project, board, variant, custom_attributes))
    }

    fn generate_d356_netlist(&mut self, _project: &Project, board: &Board) -> outjobs::Result<Vec<u8>> {
        self.calls.push(format!("d356:{}", board.name));
        Ok(format!("C  IPC-D-356A netlist of {}\n", board.name).into_bytes())
    }

    fn generate_interactive_bom(
        &mut self,
        _project: &Project,
        board: &Board,
        variant: &AssemblyVariant,
        config: &InteractiveBomJob,
        _timestamp: DateTime<Local>,
    ) -> outjobs::Result<String> {
        self.calls.push(format!("ibom:{}:{}", board.name, variant.name));
        Ok(format!(
            "<html><body data-dark=\"{}\">{}</body></html>",
            config.dark_mode, board.name
        ))
    }

    fn export_step(
        &mut self,
        _project: &Project,
        board: &Board,
        variant: Option<&AssemblyVariant>,
        path: &Path,
    ) -> outjobs::Result<()> {
        let variant = variant.map_or("-", |v| v.name.as_str());
        self.calls.push(format!("step:{}:{}", board.name, variant));
        if board.name == "broken" {
            return Err(ExportError::Failed("STEP export failed".to_string()).into());
        }
        write(path, "ISO-10303-21;")
    }
}
