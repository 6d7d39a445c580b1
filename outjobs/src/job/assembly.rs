//! Assembly job configurations: pick&place, BOM and interactive BOM.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::project::MountType;

use super::object_set::ObjectSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickPlaceJob {
    /// Mount types included in the output; empty yields files without rows.
    pub technologies: BTreeSet<MountType>,
    pub include_comment: bool,
    pub create_top: bool,
    pub create_bottom: bool,
    pub create_both: bool,
    pub output_path_top: String,
    pub output_path_bottom: String,
    pub output_path_both: String,
    pub boards: ObjectSet<Uuid>,
    pub variants: ObjectSet<Uuid>,
}

impl Default for PickPlaceJob {
    fn default() -> Self {
        Self {
            technologies: BTreeSet::from([MountType::Smt, MountType::Mixed]),
            include_comment: true,
            create_top: true,
            create_bottom: true,
            create_both: false,
            output_path_top: "assembly/{{PROJECT}}_{{VERSION}}_{{VARIANT}}_PnP-TOP.csv"
                .to_string(),
            output_path_bottom: "assembly/{{PROJECT}}_{{VERSION}}_{{VARIANT}}_PnP-BOT.csv"
                .to_string(),
            output_path_both: "assembly/{{PROJECT}}_{{VERSION}}_{{VARIANT}}_PnP.csv".to_string(),
            boards: ObjectSet::Default,
            variants: ObjectSet::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BomJob {
    /// `None` generates a BOM of the whole circuit instead of one board.
    pub boards: ObjectSet<Option<Uuid>>,
    pub variants: ObjectSet<Uuid>,
    pub custom_attributes: Vec<String>,
    pub output_path: String,
}

impl Default for BomJob {
    fn default() -> Self {
        Self {
            boards: ObjectSet::Default,
            variants: ObjectSet::All,
            custom_attributes: vec!["MPN".to_string(), "MANUFACTURER".to_string()],
            output_path: "assembly/{{PROJECT}}_{{VERSION}}_BOM_{{VARIANT}}.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    BomOnly,
    LeftRight,
    TopBottom,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::BomOnly => "bom_only",
            ViewMode::LeftRight => "left_right",
            ViewMode::TopBottom => "top_bottom",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "bom_only" => Some(ViewMode::BomOnly),
            "left_right" => Some(ViewMode::LeftRight),
            "top_bottom" => Some(ViewMode::TopBottom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightPin1 {
    None,
    Selected,
    All,
}

impl HighlightPin1 {
    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightPin1::None => "none",
            HighlightPin1::Selected => "selected",
            HighlightPin1::All => "all",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "none" => Some(HighlightPin1::None),
            "selected" => Some(HighlightPin1::Selected),
            "all" => Some(HighlightPin1::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractiveBomJob {
    pub view_mode: ViewMode,
    pub highlight_pin1: HighlightPin1,
    pub dark_mode: bool,
    /// Board rotation in degrees.
    pub board_rotation: f64,
    pub offset_back_rotation: bool,
    pub show_silkscreen: bool,
    pub show_fabrication: bool,
    pub show_pads: bool,
    pub show_tracks: bool,
    pub show_zones: bool,
    pub check_boxes: Vec<String>,
    /// Designator prefixes in the order their rows appear.
    pub component_order: Vec<String>,
    pub custom_attributes: Vec<String>,
    pub boards: ObjectSet<Uuid>,
    pub variants: ObjectSet<Uuid>,
    pub output_path: String,
}

impl Default for InteractiveBomJob {
    fn default() -> Self {
        Self {
            view_mode: ViewMode::LeftRight,
            highlight_pin1: HighlightPin1::None,
            dark_mode: false,
            board_rotation: 0.0,
            offset_back_rotation: false,
            show_silkscreen: true,
            show_fabrication: true,
            show_pads: true,
            show_tracks: true,
            show_zones: true,
            check_boxes: vec!["Sourced".to_string(), "Placed".to_string()],
            component_order: ["C", "R", "L", "D", "U", "Y", "X", "F"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            custom_attributes: Vec::new(),
            boards: ObjectSet::Default,
            variants: ObjectSet::All,
            output_path: "assembly/{{PROJECT}}_{{VERSION}}_BOM_{{VARIANT}}.html".to_string(),
        }
    }
}
