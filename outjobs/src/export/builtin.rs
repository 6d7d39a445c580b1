//! Built-in backend
//!
//! Generates pick&place and BOM data straight from the project model. All
//! geometry exports report [`ExportError::Unavailable`].

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Local};
use tracing::debug;

use crate::job::InteractiveBomJob;
use crate::project::{AssemblyVariant, Board, BoardSide, Project};

use super::tables::{Bom, BomItem, PickPlaceData, PickPlaceItem};
use super::{
    BeforeWrite, ExportBackend, ExportError, FabricationSettings, GraphicsExportResult,
    GraphicsRequest,
};

/// Pick&place data of all components placed on `board` and assembled in
/// `variant`.
pub fn pick_place_from_project(
    project: &Project,
    board: &Board,
    variant: &AssemblyVariant,
) -> PickPlaceData {
    let items = board
        .devices
        .iter()
        .filter_map(|device| {
            let component = project.component(&device.component)?;
            component
                .is_assembled_in(&variant.uuid)
                .then(|| PickPlaceItem {
                    designator: component.name.clone(),
                    value: component.value.clone(),
                    device: component.device.clone(),
                    package: component.package.clone(),
                    x: device.x,
                    y: device.y,
                    rotation: device.rotation,
                    side: device.side,
                    mount_type: component.mount_type,
                })
        })
        .collect();
    PickPlaceData {
        project_name: project.name.clone(),
        project_version: project.version.clone(),
        board_name: board.name.clone(),
        items,
    }
}

/// Groups the components assembled in `variant` by value, device, package
/// and `custom_attributes`. With a board, only components placed on it are
/// included.
pub fn bom_from_project(
    project: &Project,
    board: Option<&Board>,
    variant: &AssemblyVariant,
    custom_attributes: &[String],
) -> Bom {
    let mut columns = vec![
        "Value".to_string(),
        "Device".to_string(),
        "Package".to_string(),
    ];
    columns.extend(custom_attributes.iter().cloned());

    let mut groups: BTreeMap<Vec<String>, Vec<String>> = BTreeMap::new();
    for component in &project.components {
        if !component.is_assembled_in(&variant.uuid) {
            continue;
        }
        if let Some(board) = board {
            if !board.devices.iter().any(|d| d.component == component.uuid) {
                continue;
            }
        }
        let mut key = vec![
            component.value.clone(),
            component.device.clone(),
            component.package.clone(),
        ];
        key.extend(
            custom_attributes
                .iter()
                .map(|attr| component.attribute(attr).unwrap_or_default().to_string()),
        );
        groups.entry(key).or_default().push(component.name.clone());
    }

    let mut items: Vec<BomItem> = groups
        .into_iter()
        .map(|(attributes, mut designators)| {
            designators.sort();
            BomItem {
                designators,
                attributes,
            }
        })
        .collect();
    items.sort_by(|a, b| a.designators.first().cmp(&b.designators.first()));
    Bom { columns, items }
}

/// Backend without any geometry support.
#[derive(Debug, Default)]
pub struct ProjectDataBackend;

impl ProjectDataBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ExportBackend for ProjectDataBackend {
    fn name(&self) -> &str {
        "project-data"
    }

    fn rebuild_outdated_planes(&mut self, board: &mut Board) -> crate::Result<()> {
        // Without geometry there is nothing to refill.
        if board.planes_outdated {
            debug!("Skipping plane rebuild of board '{}'", board.name);
        }
        Ok(())
    }

    fn export_gerber_excellon(
        &mut self,
        _project: &Project,
        _board: &Board,
        _settings: &FabricationSettings,
        _before_write: &mut BeforeWrite<'_>,
    ) -> crate::Result<()> {
        Err(ExportError::Unavailable("Gerber/Excellon").into())
    }

    fn export_graphics(
        &mut self,
        _project: &Project,
        _request: &GraphicsRequest,
        _path: &Path,
    ) -> crate::Result<GraphicsExportResult> {
        Err(ExportError::Unavailable("Graphics").into())
    }

    fn export_component_layer(
        &mut self,
        _board: &Board,
        _side: BoardSide,
        _variant: &AssemblyVariant,
        _path: &Path,
    ) -> crate::Result<()> {
        Err(ExportError::Unavailable("Gerber X3").into())
    }

    fn generate_pick_place(
        &mut self,
        project: &Project,
        board: &Board,
        variant: &AssemblyVariant,
    ) -> crate::Result<PickPlaceData> {
        Ok(pick_place_from_project(project, board, variant))
    }

    fn generate_bom(
        &mut self,
        project: &Project,
        board: Option<&Board>,
        variant: &AssemblyVariant,
        custom_attributes: &[String],
    ) -> crate::Result<Bom> {
        Ok(bom_from_project(project, board, variant, custom_attributes))
    }

    fn generate_d356_netlist(&mut self, _project: &Project, _board: &Board) -> crate::Result<Vec<u8>> {
        Err(ExportError::Unavailable("IPC-D-356A netlist").into())
    }

    fn generate_interactive_bom(
        &mut self,
        _project: &Project,
        _board: &Board,
        _variant: &AssemblyVariant,
        _config: &InteractiveBomJob,
        _timestamp: DateTime<Local>,
    ) -> crate::Result<String> {
        Err(ExportError::Unavailable("Interactive BOM").into())
    }

    fn export_step(
        &mut self,
        _project: &Project,
        _board: &Board,
        _variant: Option<&AssemblyVariant>,
        _path: &Path,
    ) -> crate::Result<()> {
        Err(ExportError::Unavailable("STEP").into())
    }
}
