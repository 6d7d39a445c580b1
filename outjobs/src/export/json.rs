//! Project JSON export
//!
//! A machine readable summary of the project for scripts and manufacturing
//! portals.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::project::{BoardSide, MountType, Project};

pub const FORMAT_REVISION: u32 = 1;

#[derive(Debug, Serialize)]
struct ProjectJson<'a> {
    format: Format,
    project: ProjectInfo<'a>,
    boards: Vec<BoardInfo<'a>>,
    assembly_variants: Vec<VariantInfo<'a>>,
}

#[derive(Debug, Serialize)]
struct Format {
    #[serde(rename = "type")]
    kind: &'static str,
    revision: u32,
}

#[derive(Debug, Serialize)]
struct ProjectInfo<'a> {
    name: &'a str,
    version: &'a str,
    author: &'a str,
    attributes: BTreeMap<&'a str, &'a str>,
    schematics: &'a [String],
}

#[derive(Debug, Serialize)]
struct BoardInfo<'a> {
    uuid: Uuid,
    name: &'a str,
    components_top: usize,
    components_bottom: usize,
}

#[derive(Debug, Serialize)]
struct VariantInfo<'a> {
    uuid: Uuid,
    name: &'a str,
    description: &'a str,
    /// Number of assembled components per technology.
    technologies: BTreeMap<MountType, usize>,
}

/// Serializes the project summary as pretty printed UTF-8 JSON.
pub fn project_to_json(project: &Project) -> crate::Result<Vec<u8>> {
    let boards = project
        .boards
        .iter()
        .map(|board| {
            let count = |side| board.devices.iter().filter(|d| d.side == side).count();
            BoardInfo {
                uuid: board.uuid,
                name: &board.name,
                components_top: count(BoardSide::Top),
                components_bottom: count(BoardSide::Bottom),
            }
        })
        .collect();

    let assembly_variants = project
        .assembly_variants
        .iter()
        .map(|variant| {
            let mut technologies = BTreeMap::new();
            for component in project
                .components
                .iter()
                .filter(|c| c.is_assembled_in(&variant.uuid))
            {
                *technologies.entry(component.mount_type).or_insert(0) += 1;
            }
            VariantInfo {
                uuid: variant.uuid,
                name: &variant.name,
                description: &variant.description,
                technologies,
            }
        })
        .collect();

    let json = ProjectJson {
        format: Format {
            kind: "outjobs-project",
            revision: FORMAT_REVISION,
        },
        project: ProjectInfo {
            name: &project.name,
            version: &project.version,
            author: &project.author,
            attributes: project
                .attributes
                .iter()
                .map(|a| (a.key.as_str(), a.value.as_str()))
                .collect(),
            schematics: &project.schematics,
        },
        boards,
        assembly_variants,
    };
    let mut bytes = serde_json::to_vec_pretty(&json)?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{AssemblyVariant, Attribute, Board, Component, Device};

    #[test]
    fn test_project_json_summary() {
        let mut project = Project::new("/tmp/demo", "Demo");
        project.version = "v2".to_string();
        project.attributes.push(Attribute::new("ORDER", "42"));
        let variant = AssemblyVariant::new(Uuid::new_v4(), "Default");
        let component = Component {
            uuid: Uuid::new_v4(),
            name: "R1".to_string(),
            value: "10k".to_string(),
            device: "Resistor".to_string(),
            package: "R0805".to_string(),
            mount_type: MountType::Smt,
            attributes: Vec::new(),
            assembled_in: Vec::new(),
        };
        let mut board = Board::new(Uuid::new_v4(), "main");
        board.devices.push(Device {
            component: component.uuid,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            side: BoardSide::Bottom,
        });
        project.boards.push(board);
        project.assembly_variants.push(variant);
        project.components.push(component);

        let bytes = project_to_json(&project).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["project"]["name"], "Demo");
        assert_eq!(value["project"]["attributes"]["ORDER"], "42");
        assert_eq!(value["boards"][0]["components_bottom"], 1);
        assert_eq!(value["assembly_variants"][0]["technologies"]["smt"], 1);
    }
}
