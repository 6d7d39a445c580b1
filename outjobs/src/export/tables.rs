//! Pick&place and BOM data with their CSV writers.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::core::JobError;
use crate::parser::format_float;
use crate::project::{BoardSide, MountType};

/// Board side(s) covered by a pick&place file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickPlaceSide {
    Top,
    Bottom,
    Both,
}

impl PickPlaceSide {
    fn contains(&self, side: BoardSide) -> bool {
        match self {
            PickPlaceSide::Top => side == BoardSide::Top,
            PickPlaceSide::Bottom => side == BoardSide::Bottom,
            PickPlaceSide::Both => true,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            PickPlaceSide::Top => "top",
            PickPlaceSide::Bottom => "bottom",
            PickPlaceSide::Both => "top and bottom",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickPlaceItem {
    pub designator: String,
    pub value: String,
    pub device: String,
    pub package: String,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub side: BoardSide,
    pub mount_type: MountType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickPlaceData {
    pub project_name: String,
    pub project_version: String,
    pub board_name: String,
    pub items: Vec<PickPlaceItem>,
}

impl PickPlaceData {
    /// Writes the items of `side` whose mount type is in `technologies`,
    /// sorted by designator.
    pub fn write_csv(
        &self,
        path: &Path,
        side: PickPlaceSide,
        technologies: &BTreeSet<MountType>,
        include_comment: bool,
    ) -> crate::Result<()> {
        let mut file = File::create(path).map_err(|e| JobError::io(path, e))?;
        if include_comment {
            let comment = format!(
                "# Pick&Place data of {} {}, board '{}', {} side\n",
                self.project_name,
                self.project_version,
                self.board_name,
                side.label()
            );
            file.write_all(comment.as_bytes())
                .map_err(|e| JobError::io(path, e))?;
        }

        let mut items: Vec<&PickPlaceItem> = self
            .items
            .iter()
            .filter(|item| side.contains(item.side) && technologies.contains(&item.mount_type))
            .collect();
        items.sort_by(|a, b| a.designator.cmp(&b.designator));

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record([
            "Designator",
            "Value",
            "Device",
            "Package",
            "Position X",
            "Position Y",
            "Rotation",
            "Side",
            "Type",
        ])?;
        for item in items {
            writer.write_record([
                item.designator.clone(),
                item.value.clone(),
                item.device.clone(),
                item.package.clone(),
                format_float(item.x),
                format_float(item.y),
                format_float(item.rotation),
                item.side.as_str().to_string(),
                item.mount_type.as_str().to_string(),
            ])?;
        }
        writer.flush().map_err(|e| JobError::io(path, e))?;
        Ok(())
    }
}

/// One BOM line: all components sharing the same attribute values.
#[derive(Debug, Clone, PartialEq)]
pub struct BomItem {
    pub designators: Vec<String>,
    /// One value per [`Bom::columns`] entry.
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bom {
    pub columns: Vec<String>,
    pub items: Vec<BomItem>,
}

impl Bom {
    pub fn quantity(&self) -> usize {
        self.items.iter().map(|item| item.designators.len()).sum()
    }

    pub fn write_csv(&self, path: &Path) -> crate::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec!["Quantity".to_string(), "Designator".to_string()];
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;
        for item in &self.items {
            let mut record = vec![item.designators.len().to_string(), item.designators.join(", ")];
            record.extend(item.attributes.iter().cloned());
            writer.write_record(&record)?;
        }
        writer.flush().map_err(|e| JobError::io(path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn item(designator: &str, side: BoardSide, mount_type: MountType) -> PickPlaceItem {
        PickPlaceItem {
            designator: designator.to_string(),
            value: "10k".to_string(),
            device: "Resistor".to_string(),
            package: "R0805".to_string(),
            x: 1.5,
            y: -2.0,
            rotation: 90.0,
            side,
            mount_type,
        }
    }

    fn data() -> PickPlaceData {
        PickPlaceData {
            project_name: "Demo".to_string(),
            project_version: "v1".to_string(),
            board_name: "default".to_string(),
            items: vec![
                item("R2", BoardSide::Top, MountType::Smt),
                item("R1", BoardSide::Top, MountType::Smt),
                item("J1", BoardSide::Top, MountType::Tht),
                item("R3", BoardSide::Bottom, MountType::Smt),
            ],
        }
    }

    #[test]
    fn test_pick_place_filters_side_and_technology() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("top.csv");
        let technologies = BTreeSet::from([MountType::Smt]);
        data()
            .write_csv(&path, PickPlaceSide::Top, &technologies, false)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Designator,"));
        assert_eq!(lines[1], "R1,10k,Resistor,R0805,1.5,-2.0,90.0,top,smt");
        assert!(lines[2].starts_with("R2,"));
    }

    #[test]
    fn test_pick_place_comment_and_empty_filter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("both.csv");
        data()
            .write_csv(&path, PickPlaceSide::Both, &BTreeSet::new(), true)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("# Pick&Place data of Demo v1"));
    }

    #[test]
    fn test_bom_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bom.csv");
        let bom = Bom {
            columns: vec!["Value".to_string(), "MPN".to_string()],
            items: vec![BomItem {
                designators: vec!["R1".to_string(), "R2".to_string()],
                attributes: vec!["10k".to_string(), String::new()],
            }],
        };
        bom.write_csv(&path).unwrap();
        assert_eq!(bom.quantity(), 2);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Quantity,Designator,Value,MPN\n2,\"R1, R2\",10k,\n");
    }
}
