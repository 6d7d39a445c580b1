//! Project file loader
//!
//! Reads the `(outjobs_project ...)` S-expression file which describes the
//! boards, assembly variants and components of a project.

use std::path::Path;

use thiserror::Error;
use uuid::Uuid;

use crate::core::JobError;
use crate::parser::{parse_bool, parse_uuid, ParseError, SExp, SExpParser};

use super::{AssemblyVariant, Attribute, Board, BoardSide, Component, Device, MountType, Project};

#[derive(Debug, Error)]
pub enum ProjectParseError {
    #[error("S-expression parse error: {0}")]
    SExpParse(#[from] ParseError),
    #[error("Invalid project format: {0}")]
    InvalidFormat(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid value for '{field}': '{value}'")]
    InvalidValue { field: String, value: String },
}

pub struct ProjectLoader;

impl ProjectLoader {
    pub fn load(path: &Path) -> crate::Result<Project> {
        let content = std::fs::read_to_string(path).map_err(|e| JobError::io(path, e))?;
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let mut project = Self::parse_str(&content, &directory)?;
        project.directory = directory;
        Ok(project)
    }

    pub fn parse_str(content: &str, directory: &Path) -> Result<Project, ProjectParseError> {
        let mut parser = SExpParser::new(content);
        let root = parser.parse()?;

        match root.head() {
            Some("outjobs_project") => {}
            Some(other) => {
                return Err(ProjectParseError::InvalidFormat(format!(
                    "Expected outjobs_project, found {}",
                    other
                )))
            }
            None => {
                return Err(ProjectParseError::InvalidFormat(
                    "Expected outjobs_project root".to_string(),
                ))
            }
        }

        let mut project = Project::new(directory, Self::required(&root, "name")?);
        project.version = root.child_value("version").unwrap_or_default().to_string();
        project.author = root.child_value("author").unwrap_or_default().to_string();
        project.attributes = Self::parse_attributes(&root)?;
        project.schematics = root
            .children("schematic")
            .iter()
            .filter_map(|s| s.value(0))
            .map(str::to_string)
            .collect();

        for node in root.children("board") {
            project.boards.push(Self::parse_board(node)?);
        }
        for node in root.children("variant") {
            project.assembly_variants.push(Self::parse_variant(node)?);
        }
        for node in root.children("component") {
            project.components.push(Self::parse_component(node)?);
        }

        Ok(project)
    }

    fn required<'a>(node: &'a SExp, path: &str) -> Result<&'a str, ProjectParseError> {
        node.child_value(path)
            .ok_or_else(|| ProjectParseError::MissingField(path.to_string()))
    }

    fn uuid_of(node: &SExp) -> Result<Uuid, ProjectParseError> {
        let tag = node.head().unwrap_or_default();
        let value = node
            .value(0)
            .ok_or_else(|| ProjectParseError::MissingField(format!("{}/uuid", tag)))?;
        parse_uuid(value).ok_or_else(|| ProjectParseError::InvalidValue {
            field: format!("{}/uuid", tag),
            value: value.to_string(),
        })
    }

    fn float(node: &SExp, field: &str, index: usize) -> Result<f64, ProjectParseError> {
        let value = node
            .value(index)
            .ok_or_else(|| ProjectParseError::MissingField(field.to_string()))?;
        value.parse().map_err(|_| ProjectParseError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    fn parse_attributes(node: &SExp) -> Result<Vec<Attribute>, ProjectParseError> {
        node.children("attribute")
            .into_iter()
            .map(|a| match (a.value(0), a.value(1)) {
                (Some(key), Some(value)) => Ok(Attribute::new(key, value)),
                _ => Err(ProjectParseError::InvalidFormat(format!(
                    "Attribute needs a key and a value: {}",
                    a
                ))),
            })
            .collect()
    }

    fn parse_board(node: &SExp) -> Result<Board, ProjectParseError> {
        let mut board = Board::new(Self::uuid_of(node)?, Self::required(node, "name")?);
        board.attributes = Self::parse_attributes(node)?;
        if let Some(value) = node.child_value("planes_outdated") {
            board.planes_outdated = parse_bool(value).ok_or_else(|| {
                ProjectParseError::InvalidValue {
                    field: "board/planes_outdated".to_string(),
                    value: value.to_string(),
                }
            })?;
        }
        for device in node.children("device") {
            board.devices.push(Self::parse_device(device)?);
        }
        Ok(board)
    }

    fn parse_device(node: &SExp) -> Result<Device, ProjectParseError> {
        let position = node
            .child("position")
            .ok_or_else(|| ProjectParseError::MissingField("device/position".to_string()))?;
        let side = match node.child_value("side").unwrap_or("top") {
            "top" => BoardSide::Top,
            "bottom" => BoardSide::Bottom,
            other => {
                return Err(ProjectParseError::InvalidValue {
                    field: "device/side".to_string(),
                    value: other.to_string(),
                })
            }
        };
        let rotation = match node.child("rotation") {
            Some(rotation) => Self::float(rotation, "device/rotation", 0)?,
            None => 0.0,
        };
        Ok(Device {
            component: Self::uuid_of(node)?,
            x: Self::float(position, "device/position/x", 0)?,
            y: Self::float(position, "device/position/y", 1)?,
            rotation,
            side,
        })
    }

    fn parse_variant(node: &SExp) -> Result<AssemblyVariant, ProjectParseError> {
        let mut variant =
            AssemblyVariant::new(Self::uuid_of(node)?, Self::required(node, "name")?);
        variant.description = node
            .child_value("description")
            .unwrap_or_default()
            .to_string();
        Ok(variant)
    }

    fn parse_component(node: &SExp) -> Result<Component, ProjectParseError> {
        let technology = node.child_value("technology").unwrap_or("smt");
        let mount_type =
            MountType::from_name(technology).ok_or_else(|| ProjectParseError::InvalidValue {
                field: "component/technology".to_string(),
                value: technology.to_string(),
            })?;
        let mut assembled_in = Vec::new();
        for assembly in node.children("assembly") {
            assembled_in.push(Self::uuid_of(assembly)?);
        }
        Ok(Component {
            uuid: Self::uuid_of(node)?,
            name: Self::required(node, "name")?.to_string(),
            value: node.child_value("value").unwrap_or_default().to_string(),
            device: node.child_value("device").unwrap_or_default().to_string(),
            package: node.child_value("package").unwrap_or_default().to_string(),
            mount_type,
            attributes: Self::parse_attributes(node)?,
            assembled_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"
(outjobs_project
 (name "Demo Project") (version "v1") (author "Jane")
 (attribute "COMPANY" "ACME")
 (schematic "Main")
 (board 0f2b9a6e-4d33-4a6c-9a55-0d53b2d9b001 (name "default") (planes_outdated true)
  (device 7c1e8d2a-2b6f-4b7c-8d0e-1a2b3c4d5e01 (position 10.5 -3.0) (rotation 90.0) (side bottom))
 )
 (variant 5a0c2f34-8d1e-4c59-9e1f-2a3b4c5d6e01 (name "Default") (description "Full assembly"))
 (component 7c1e8d2a-2b6f-4b7c-8d0e-1a2b3c4d5e01 (name "R1") (value "10k")
  (device "Resistor") (package "R0603") (technology smt)
  (attribute "MPN" "RC0603") (assembly 5a0c2f34-8d1e-4c59-9e1f-2a3b4c5d6e01))
)
"#;

    #[test]
    fn test_parse_project() {
        let project = ProjectLoader::parse_str(PROJECT, Path::new("/tmp/demo")).unwrap();
        assert_eq!(project.name, "Demo Project");
        assert_eq!(project.version, "v1");
        assert_eq!(project.attribute("COMPANY"), Some("ACME"));
        assert_eq!(project.schematics, vec!["Main".to_string()]);
        assert_eq!(project.boards.len(), 1);
        let board = &project.boards[0];
        assert!(board.planes_outdated);
        assert_eq!(board.devices[0].side, BoardSide::Bottom);
        assert_eq!(board.devices[0].x, 10.5);
        assert_eq!(board.devices[0].rotation, 90.0);
        assert_eq!(project.assembly_variants[0].description, "Full assembly");
        let component = &project.components[0];
        assert_eq!(component.attribute("MPN"), Some("RC0603"));
        assert_eq!(component.assembled_in.len(), 1);
    }

    #[test]
    fn test_wrong_root_rejected() {
        let result = ProjectLoader::parse_str("(board_file)", Path::new("."));
        assert!(matches!(result, Err(ProjectParseError::InvalidFormat(_))));
    }

    #[test]
    fn test_invalid_board_uuid_rejected() {
        let result = ProjectLoader::parse_str(
            "(outjobs_project (name x) (board not-a-uuid (name b)))",
            Path::new("."),
        );
        assert!(matches!(
            result,
            Err(ProjectParseError::InvalidValue { .. })
        ));
    }
}
