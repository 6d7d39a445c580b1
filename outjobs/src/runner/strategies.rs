//! Execution of the individual job kinds.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use chrono::Local;
use uuid::Uuid;

use crate::attribute::{substitute, substitute_path, AttributeLookup};
use crate::core::JobError;
use crate::export::json::project_to_json;
use crate::export::{
    zip_directory, ArchiveStaging, ExportError, FabricationSettings, GraphicsRequest,
    PickPlaceSide,
};
use crate::job::{
    ArchiveJob, Board3DJob, BomJob, CopyJob, GerberExcellonJob, GerberX3Job, GraphicsJob,
    InteractiveBomJob, LppzJob, NetlistJob, PickPlaceJob, ProjectJsonJob,
};
use crate::output::OutputDirectoryWriter;
use crate::project::{BoardSide, ProjectAttributeLookup};

use super::OutputJobRunner;

const DEFAULT_DOCUMENT_TITLE: &str = "{{PROJECT}} {{VERSION}}";

impl OutputJobRunner<'_> {
    pub(super) fn run_graphics(&mut self, uuid: Uuid, job: &GraphicsJob) -> crate::Result<()> {
        let pages = self.build_pages(job, true)?;

        // Board and variant are only known to the output path if all
        // contents agree on a single one.
        let mut boards = BTreeSet::new();
        let mut variants = BTreeSet::new();
        for content in &job.content {
            for board in content
                .boards
                .resolve_optional(&self.project.boards, false, JobError::BoardNotFound)?
            {
                boards.insert(board.map(|b| b.uuid));
            }
            for variant in content.variants.resolve_optional(
                &self.project.assembly_variants,
                false,
                JobError::AssemblyVariantNotFound,
            )? {
                variants.insert(variant.map(|v| v.uuid));
            }
        }
        let single = |set: &BTreeSet<Option<Uuid>>| match set.len() {
            1 => set.first().copied().flatten(),
            _ => None,
        };
        let board = single(&boards).and_then(|uuid| self.project.board(&uuid));
        let variant = single(&variants).and_then(|uuid| self.project.assembly_variant(&uuid));
        let lookup = ProjectAttributeLookup::new(self.project, board, variant);

        let path = claim(&mut self.writer, uuid, &job.output_path, &lookup)?;

        let title = if job.document_title.is_empty() {
            DEFAULT_DOCUMENT_TITLE
        } else {
            job.document_title.as_str()
        };
        let request = GraphicsRequest {
            document_title: simplified(&substitute(title, &lookup)),
            pages,
        };

        let result = self.backend.export_graphics(self.project, &request, &path)?;
        for written in &result.written_files {
            if *written != path {
                self.writer.begin_writing_absolute(uuid, written)?;
            }
        }
        match result.error {
            Some(error) if !error.is_empty() => Err(ExportError::Failed(error).into()),
            _ => Ok(()),
        }
    }

    pub(super) fn run_gerber_excellon(
        &mut self,
        uuid: Uuid,
        job: &GerberExcellonJob,
    ) -> crate::Result<()> {
        let base_path = format!("{}/{}", self.writer.directory().display(), job.output_path);
        let settings = FabricationSettings::from_job(job, base_path);
        let boards = board_uuids(job.boards.resolve(&self.project.boards, JobError::BoardNotFound)?);

        // Exported planes must not be outdated.
        self.rebuild_planes(&boards)?;

        for board_uuid in boards {
            let board = self
                .project
                .board(&board_uuid)
                .ok_or(JobError::BoardNotFound(board_uuid))?;
            let writer = &mut self.writer;
            self.backend
                .export_gerber_excellon(self.project, board, &settings, &mut |path: &Path| {
                    writer.begin_writing_absolute(uuid, path).map(|_| ())
                })?;
        }
        Ok(())
    }

    pub(super) fn run_pick_place(&mut self, uuid: Uuid, job: &PickPlaceJob) -> crate::Result<()> {
        let mut sides = Vec::new();
        if job.create_top {
            sides.push((PickPlaceSide::Top, &job.output_path_top));
        }
        if job.create_bottom {
            sides.push((PickPlaceSide::Bottom, &job.output_path_bottom));
        }
        if job.create_both {
            sides.push((PickPlaceSide::Both, &job.output_path_both));
        }
        if !sides.is_empty() && job.technologies.is_empty() {
            self.warn("No technologies selected, thus the output files won't contain any entries.");
        }

        let project = &*self.project;
        let boards = job.boards.resolve(&project.boards, JobError::BoardNotFound)?;
        let variants = job
            .variants
            .resolve(&project.assembly_variants, JobError::AssemblyVariantNotFound)?;
        for board in boards {
            for variant in &variants {
                let data = self.backend.generate_pick_place(project, board, variant)?;
                let lookup = ProjectAttributeLookup::new(project, Some(board), Some(*variant));
                for (side, template) in &sides {
                    let path = claim(&mut self.writer, uuid, template, &lookup)?;
                    check_suffix(&path, "pick&place", &["csv"])?;
                    data.write_csv(&path, *side, &job.technologies, job.include_comment)?;
                }
            }
        }
        Ok(())
    }

    pub(super) fn run_gerber_x3(&mut self, uuid: Uuid, job: &GerberX3Job) -> crate::Result<()> {
        let mut sides = Vec::new();
        if job.create_top {
            sides.push((BoardSide::Top, &job.output_path_top));
        }
        if job.create_bottom {
            sides.push((BoardSide::Bottom, &job.output_path_bottom));
        }

        let project = &*self.project;
        let boards = job.boards.resolve(&project.boards, JobError::BoardNotFound)?;
        let variants = job
            .variants
            .resolve(&project.assembly_variants, JobError::AssemblyVariantNotFound)?;
        for board in boards {
            for variant in &variants {
                let lookup = ProjectAttributeLookup::new(project, Some(board), Some(*variant));
                for (side, template) in &sides {
                    let path = claim(&mut self.writer, uuid, template, &lookup)?;
                    self.backend
                        .export_component_layer(board, *side, variant, &path)?;
                }
            }
        }
        Ok(())
    }

    pub(super) fn run_netlist(&mut self, uuid: Uuid, job: &NetlistJob) -> crate::Result<()> {
        let project = &*self.project;
        for board in job.boards.resolve(&project.boards, JobError::BoardNotFound)? {
            let lookup = ProjectAttributeLookup::new(project, Some(board), None);
            let path = claim(&mut self.writer, uuid, &job.output_path, &lookup)?;
            check_suffix(&path, "netlist", &["d356"])?;
            let content = self.backend.generate_d356_netlist(project, board)?;
            write_file(&path, &content)?;
        }
        Ok(())
    }

    pub(super) fn run_bom(&mut self, uuid: Uuid, job: &BomJob) -> crate::Result<()> {
        let project = &*self.project;
        let boards = job
            .boards
            .resolve_optional(&project.boards, false, JobError::BoardNotFound)?;
        let variants = job
            .variants
            .resolve(&project.assembly_variants, JobError::AssemblyVariantNotFound)?;
        for board in boards {
            for variant in &variants {
                let lookup = ProjectAttributeLookup::new(project, board, Some(*variant));
                let path = claim(&mut self.writer, uuid, &job.output_path, &lookup)?;
                let bom = self
                    .backend
                    .generate_bom(project, board, variant, &job.custom_attributes)?;
                check_suffix(&path, "BOM", &["csv"])?;
                bom.write_csv(&path)?;
            }
        }
        Ok(())
    }

    pub(super) fn run_interactive_bom(
        &mut self,
        uuid: Uuid,
        job: &InteractiveBomJob,
    ) -> crate::Result<()> {
        let boards = board_uuids(job.boards.resolve(&self.project.boards, JobError::BoardNotFound)?);
        self.rebuild_planes(&boards)?;

        let project = &*self.project;
        let variants = job
            .variants
            .resolve(&project.assembly_variants, JobError::AssemblyVariantNotFound)?;
        for board_uuid in boards {
            let board = project
                .board(&board_uuid)
                .ok_or(JobError::BoardNotFound(board_uuid))?;
            for variant in &variants {
                let lookup = ProjectAttributeLookup::new(project, Some(board), Some(*variant));
                let path = claim(&mut self.writer, uuid, &job.output_path, &lookup)?;
                check_suffix(&path, "interactive BOM", &["html", "htm", "xhtml"])?;
                let html = self
                    .backend
                    .generate_interactive_bom(project, board, variant, job, Local::now())?;
                write_file(&path, html.as_bytes())?;
            }
        }
        Ok(())
    }

    pub(super) fn run_board_3d(&mut self, uuid: Uuid, job: &Board3DJob) -> crate::Result<()> {
        let boards = board_uuids(job.boards.resolve(&self.project.boards, JobError::BoardNotFound)?);
        self.rebuild_planes(&boards)?;

        let project = &*self.project;
        let variants = job.variants.resolve_optional(
            &project.assembly_variants,
            false,
            JobError::AssemblyVariantNotFound,
        )?;
        for board_uuid in boards {
            let board = project
                .board(&board_uuid)
                .ok_or(JobError::BoardNotFound(board_uuid))?;
            for variant in &variants {
                let lookup = ProjectAttributeLookup::new(project, Some(board), *variant);
                let path = claim(&mut self.writer, uuid, &job.output_path, &lookup)?;
                check_suffix(&path, "3D model", &["step", "stp"])?;
                self.backend.export_step(project, board, *variant, &path)?;
            }
        }
        Ok(())
    }

    pub(super) fn run_project_json(&mut self, uuid: Uuid, job: &ProjectJsonJob) -> crate::Result<()> {
        let lookup = ProjectAttributeLookup::project(self.project);
        let path = claim(&mut self.writer, uuid, &job.output_path, &lookup)?;
        write_file(&path, &project_to_json(self.project)?)
    }

    pub(super) fn run_lppz(&mut self, uuid: Uuid, job: &LppzJob) -> crate::Result<()> {
        let lookup = ProjectAttributeLookup::project(self.project);
        let path = claim(&mut self.writer, uuid, &job.output_path, &lookup)?;
        check_suffix(&path, "project archive", &["lppz"])?;
        // The output directory can be large and may contain earlier archives.
        zip_directory(self.project.directory(), &path, |file| {
            !file.starts_with("output/")
        })?;
        Ok(())
    }

    pub(super) fn run_copy(&mut self, uuid: Uuid, job: &CopyJob) -> crate::Result<()> {
        let project = &*self.project;
        let boards = job
            .boards
            .resolve_optional(&project.boards, false, JobError::BoardNotFound)?;
        let variants = job.variants.resolve_optional(
            &project.assembly_variants,
            false,
            JobError::AssemblyVariantNotFound,
        )?;
        for board in &boards {
            for variant in &variants {
                let lookup = ProjectAttributeLookup::new(project, *board, *variant);
                let input = substitute_path(&job.input_path, &lookup);
                let output = claim(&mut self.writer, uuid, &job.output_path, &lookup)?;

                let input = project_relative_path(&input)?;
                let input_path = project.directory().join(&input);
                let mut content =
                    std::fs::read(&input_path).map_err(|e| JobError::io(&input_path, e))?;
                if job.substitute_variables {
                    content = substitute(&String::from_utf8_lossy(&content), &lookup).into_bytes();
                }
                write_file(&output, &content)?;
            }
        }
        Ok(())
    }

    pub(super) fn run_archive(&mut self, uuid: Uuid, job: &ArchiveJob) -> crate::Result<()> {
        let lookup = ProjectAttributeLookup::project(self.project);
        let path = claim(&mut self.writer, uuid, &job.output_path, &lookup)?;

        let mut staging = ArchiveStaging::new();
        for (input_job, destination) in &job.input_jobs {
            let files = self
                .writer
                .written_files()
                .get(input_job)
                .ok_or(JobError::DependencyNotRun(*input_job))?;
            for relative in files {
                let absolute = self.writer.directory().join(relative);
                let file_name = relative
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let content = std::fs::read(&absolute).map_err(|e| JobError::io(&absolute, e))?;
                staging.write(&format!("{}/{}", destination, file_name), content);
            }
        }
        if job.input_jobs.is_empty() {
            self.warn("No input jobs selected, thus the resulting archive will be empty.");
        }

        check_suffix(&path, "archive", &["zip"])?;
        staging.export_to_zip(&path)
    }
}

/// Substitutes `template` and claims the resulting path for `job`.
fn claim(
    writer: &mut OutputDirectoryWriter,
    job: Uuid,
    template: &str,
    lookup: &dyn AttributeLookup,
) -> crate::Result<PathBuf> {
    writer.begin_writing_file(job, &substitute_path(template, lookup))
}

fn board_uuids(boards: Vec<&crate::project::Board>) -> Vec<Uuid> {
    boards.into_iter().map(|board| board.uuid).collect()
}

fn check_suffix(path: &Path, what: &'static str, allowed: &[&str]) -> crate::Result<()> {
    let suffix = path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();
    if allowed.contains(&suffix.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(JobError::UnsupportedFormat { what, suffix })
    }
}

fn write_file(path: &Path, content: &[u8]) -> crate::Result<()> {
    std::fs::write(path, content).map_err(|e| JobError::io(path, e))
}

/// Collapses whitespace runs into single spaces and trims.
fn simplified(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes a relative input path and makes sure it stays within the
/// project directory.
fn project_relative_path(path: &str) -> crate::Result<PathBuf> {
    let unified = path.replace('\\', "/");
    let outside = || JobError::InputOutsideProject(path.to_string());
    if unified.starts_with('/') || Path::new(path).is_absolute() {
        return Err(outside());
    }
    let mut normalized = PathBuf::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(outside());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(outside()),
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(outside());
    }
    Ok(normalized)
}
