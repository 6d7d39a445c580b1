//! Export backends
//!
//! The runner decides *which* files are written and *where*; an
//! [`ExportBackend`] produces their content. Geometry exports (Gerber,
//! graphics, STEP, ...) are supplied by the embedding application, the
//! built-in [`ProjectDataBackend`] covers everything derivable from the
//! project model alone.

pub mod archive;
pub mod builtin;
pub mod json;
pub mod tables;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;
use uuid::Uuid;

use crate::job::{GerberExcellonJob, GerberSuffixes, GraphicsContent, InteractiveBomJob};
use crate::project::{AssemblyVariant, Board, BoardSide, Project};

pub use archive::{zip_directory, ArchiveStaging};
pub use builtin::ProjectDataBackend;
pub use tables::{Bom, BomItem, PickPlaceData, PickPlaceItem, PickPlaceSide};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{0} export is not available in this build, an export backend providing it is required")]
    Unavailable(&'static str),

    #[error("{0}")]
    Failed(String),
}

/// Settings handed to the Gerber/Excellon exporter.
#[derive(Debug, Clone, PartialEq)]
pub struct FabricationSettings {
    /// Absolute path prefix; each file appends its suffix to it.
    pub output_base_path: String,
    pub suffixes: GerberSuffixes,
    pub merge_drill_files: bool,
    pub use_g85_slot_command: bool,
    pub enable_solder_paste_top: bool,
    pub enable_solder_paste_bot: bool,
}

impl FabricationSettings {
    pub fn from_job(job: &GerberExcellonJob, output_base_path: impl Into<String>) -> Self {
        Self {
            output_base_path: output_base_path.into(),
            suffixes: job.suffixes.clone(),
            merge_drill_files: job.merge_drill_files,
            use_g85_slot_command: job.use_g85_slot_command,
            enable_solder_paste_top: job.enable_solder_paste_top,
            enable_solder_paste_bot: job.enable_solder_paste_bot,
        }
    }
}

/// What a single graphics page shows.
#[derive(Debug, Clone, PartialEq)]
pub enum PageSource {
    /// Index into the project's schematic pages.
    Schematic(usize),
    Board(Uuid),
    BoardRendering(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsPage {
    pub source: PageSource,
    pub assembly_variant: Option<Uuid>,
    /// Page layout and colors, shared by all pages of a content entry.
    pub settings: GraphicsContent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsRequest {
    pub document_title: String,
    pub pages: Vec<GraphicsPage>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphicsExportResult {
    /// Every file written, including the requested one. Pixmap exports of
    /// multi-page documents write one file per page.
    pub written_files: Vec<PathBuf>,
    /// Non-empty if the export finished with an error.
    pub error: Option<String>,
}

/// Called with the absolute path of each file right before it is written.
pub type BeforeWrite<'a> = dyn FnMut(&Path) -> crate::Result<()> + 'a;

/// Producer of output file content. All methods block until the export has
/// finished.
pub trait ExportBackend {
    fn name(&self) -> &str;

    /// Refills outdated copper planes of `board` before its geometry gets
    /// exported.
    fn rebuild_outdated_planes(&mut self, board: &mut Board) -> crate::Result<()>;

    /// Writes all Gerber and Excellon files of `board`. Placeholders in the
    /// base path and suffixes are resolved by the backend. `before_write`
    /// must be called for every file and its error returned unchanged.
    fn export_gerber_excellon(
        &mut self,
        project: &Project,
        board: &Board,
        settings: &FabricationSettings,
        before_write: &mut BeforeWrite<'_>,
    ) -> crate::Result<()>;

    fn export_graphics(
        &mut self,
        project: &Project,
        request: &GraphicsRequest,
        path: &Path,
    ) -> crate::Result<GraphicsExportResult>;

    /// Gerber X3 component layer of one board side.
    fn export_component_layer(
        &mut self,
        board: &Board,
        side: BoardSide,
        variant: &AssemblyVariant,
        path: &Path,
    ) -> crate::Result<()>;

    fn generate_pick_place(
        &mut self,
        project: &Project,
        board: &Board,
        variant: &AssemblyVariant,
    ) -> crate::Result<PickPlaceData>;

    /// Without a board, the BOM covers every component of the project.
    fn generate_bom(
        &mut self,
        project: &Project,
        board: Option<&Board>,
        variant: &AssemblyVariant,
        custom_attributes: &[String],
    ) -> crate::Result<Bom>;

    fn generate_d356_netlist(&mut self, project: &Project, board: &Board) -> crate::Result<Vec<u8>>;

    fn generate_interactive_bom(
        &mut self,
        project: &Project,
        board: &Board,
        variant: &AssemblyVariant,
        config: &InteractiveBomJob,
        timestamp: DateTime<Local>,
    ) -> crate::Result<String>;

    fn export_step(
        &mut self,
        project: &Project,
        board: &Board,
        variant: Option<&AssemblyVariant>,
        path: &Path,
    ) -> crate::Result<()>;
}
