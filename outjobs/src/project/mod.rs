//! Project model
//!
//! The subset of a PCB design project that output jobs need: project
//! metadata and attributes, boards with their placed devices, assembly
//! variants and the components of the circuit. Everything here is read-only
//! for the runner except the plane state of boards, which export backends
//! refresh before exporting geometry.

pub mod loader;
pub mod lookup;

use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use crate::attribute::clean_file_name;

pub use loader::ProjectParseError;
pub use lookup::ProjectAttributeLookup;

/// Objects which can be selected by UUID through an object set.
pub trait Identified {
    fn uuid(&self) -> Uuid;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardSide {
    Top,
    Bottom,
}

impl BoardSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardSide::Top => "top",
            BoardSide::Bottom => "bottom",
        }
    }
}

/// Mounting technology of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MountType {
    Tht,
    Smt,
    Mixed,
    Fiducial,
    Other,
}

impl MountType {
    pub const ALL: [MountType; 5] = [
        MountType::Tht,
        MountType::Smt,
        MountType::Mixed,
        MountType::Fiducial,
        MountType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MountType::Tht => "tht",
            MountType::Smt => "smt",
            MountType::Mixed => "mixed",
            MountType::Fiducial => "fiducial",
            MountType::Other => "other",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// A component placed on a board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub component: Uuid,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub side: BoardSide,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Board {
    pub uuid: Uuid,
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// Plane fragments need to be rebuilt before geometry is exported.
    pub planes_outdated: bool,
    pub devices: Vec<Device>,
}

impl Board {
    pub fn new(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            attributes: Vec::new(),
            planes_outdated: false,
            devices: Vec::new(),
        }
    }
}

impl Identified for Board {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyVariant {
    pub uuid: Uuid,
    pub name: String,
    pub description: String,
}

impl AssemblyVariant {
    pub fn new(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            description: String::new(),
        }
    }
}

impl Identified for AssemblyVariant {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    pub uuid: Uuid,
    /// Designator, e.g. `R1`.
    pub name: String,
    pub value: String,
    pub device: String,
    pub package: String,
    pub mount_type: MountType,
    pub attributes: Vec<Attribute>,
    /// Variants this component is assembled in; empty means all variants.
    pub assembled_in: Vec<Uuid>,
}

impl Component {
    pub fn is_assembled_in(&self, variant: &Uuid) -> bool {
        self.assembled_in.is_empty() || self.assembled_in.contains(variant)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        find_attribute(&self.attributes, key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    /// Project directory; every project-relative path is resolved against it.
    #[serde(skip)]
    pub directory: PathBuf,
    pub name: String,
    pub version: String,
    pub author: String,
    pub attributes: Vec<Attribute>,
    pub schematics: Vec<String>,
    pub boards: Vec<Board>,
    pub assembly_variants: Vec<AssemblyVariant>,
    pub components: Vec<Component>,
}

impl Project {
    pub fn new(directory: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
            version: String::new(),
            author: String::new(),
            attributes: Vec::new(),
            schematics: Vec::new(),
            boards: Vec::new(),
            assembly_variants: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Loads a project file; its parent directory becomes the project directory.
    pub fn load(path: &Path) -> crate::Result<Self> {
        loader::ProjectLoader::load(path)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `output/<version>` inside the project directory.
    pub fn current_output_dir(&self) -> PathBuf {
        let version = clean_file_name(&self.version);
        let version = if version.is_empty() {
            "unversioned".to_string()
        } else {
            version
        };
        self.directory.join("output").join(version)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        find_attribute(&self.attributes, key)
    }

    pub fn board(&self, uuid: &Uuid) -> Option<&Board> {
        self.boards.iter().find(|b| &b.uuid == uuid)
    }

    pub fn board_mut(&mut self, uuid: &Uuid) -> Option<&mut Board> {
        self.boards.iter_mut().find(|b| &b.uuid == uuid)
    }

    pub fn board_index(&self, uuid: &Uuid) -> Option<usize> {
        self.boards.iter().position(|b| &b.uuid == uuid)
    }

    pub fn assembly_variant(&self, uuid: &Uuid) -> Option<&AssemblyVariant> {
        self.assembly_variants.iter().find(|av| &av.uuid == uuid)
    }

    pub fn component(&self, uuid: &Uuid) -> Option<&Component> {
        self.components.iter().find(|c| &c.uuid == uuid)
    }
}

fn find_attribute<'a>(attributes: &'a [Attribute], key: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.key == key)
        .map(|a| a.value.as_str())
}
