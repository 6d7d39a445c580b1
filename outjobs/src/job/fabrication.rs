//! Board fabrication job configurations: Gerber/Excellon, Gerber X3
//! component layers, D356 netlists and STEP models.

use uuid::Uuid;

use super::object_set::ObjectSet;

/// File name suffixes appended to the Gerber/Excellon base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GerberSuffixes {
    pub drills: String,
    pub drills_npth: String,
    pub drills_pth: String,
    pub drills_blind_buried: String,
    pub outlines: String,
    pub copper_top: String,
    pub copper_inner: String,
    pub copper_bot: String,
    pub solder_mask_top: String,
    pub solder_mask_bot: String,
    pub silkscreen_top: String,
    pub silkscreen_bot: String,
    pub solder_paste_top: String,
    pub solder_paste_bot: String,
}

impl Default for GerberSuffixes {
    fn default() -> Self {
        Self {
            drills: "_DRILLS.drl".to_string(),
            drills_npth: "_DRILLS-NPTH.drl".to_string(),
            drills_pth: "_DRILLS-PTH.drl".to_string(),
            drills_blind_buried: "_DRILLS-PLATED-{{START_LAYER}}-{{END_LAYER}}.drl".to_string(),
            outlines: "_OUTLINES.gbr".to_string(),
            copper_top: "_COPPER-TOP.gbr".to_string(),
            copper_inner: "_COPPER-IN{{CU_LAYER}}.gbr".to_string(),
            copper_bot: "_COPPER-BOTTOM.gbr".to_string(),
            solder_mask_top: "_SOLDERMASK-TOP.gbr".to_string(),
            solder_mask_bot: "_SOLDERMASK-BOTTOM.gbr".to_string(),
            silkscreen_top: "_SILKSCREEN-TOP.gbr".to_string(),
            silkscreen_bot: "_SILKSCREEN-BOTTOM.gbr".to_string(),
            solder_paste_top: "_SOLDERPASTE-TOP.gbr".to_string(),
            solder_paste_bot: "_SOLDERPASTE-BOTTOM.gbr".to_string(),
        }
    }
}

impl GerberSuffixes {
    /// Short extensions as used by Protel and many board houses.
    pub fn protel() -> Self {
        Self {
            drills: ".drl".to_string(),
            drills_npth: "_NPTH.drl".to_string(),
            drills_pth: "_PTH.drl".to_string(),
            drills_blind_buried: "_L{{START_NUMBER}}-L{{END_NUMBER}}.drl".to_string(),
            outlines: ".gml".to_string(),
            copper_top: ".gtl".to_string(),
            copper_inner: ".g{{CU_LAYER}}".to_string(),
            copper_bot: ".gbl".to_string(),
            solder_mask_top: ".gts".to_string(),
            solder_mask_bot: ".gbs".to_string(),
            silkscreen_top: ".gto".to_string(),
            silkscreen_bot: ".gbo".to_string(),
            solder_paste_top: ".gtp".to_string(),
            solder_paste_bot: ".gbp".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GerberExcellonJob {
    pub suffixes: GerberSuffixes,
    pub merge_drill_files: bool,
    pub use_g85_slot_command: bool,
    pub enable_solder_paste_top: bool,
    pub enable_solder_paste_bot: bool,
    pub boards: ObjectSet<Uuid>,
    /// Base path, relative to the output directory; suffixes are appended.
    pub output_path: String,
}

impl Default for GerberExcellonJob {
    fn default() -> Self {
        Self {
            suffixes: GerberSuffixes::default(),
            merge_drill_files: false,
            use_g85_slot_command: false,
            enable_solder_paste_top: true,
            enable_solder_paste_bot: true,
            boards: ObjectSet::Default,
            output_path: "gerber/{{PROJECT}}_{{VERSION}}".to_string(),
        }
    }
}

impl GerberExcellonJob {
    pub fn default_style() -> Self {
        Self::default()
    }

    pub fn protel_style() -> Self {
        Self {
            suffixes: GerberSuffixes::protel(),
            merge_drill_files: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GerberX3Job {
    pub create_top: bool,
    pub create_bottom: bool,
    pub output_path_top: String,
    pub output_path_bottom: String,
    pub boards: ObjectSet<Uuid>,
    pub variants: ObjectSet<Uuid>,
}

impl Default for GerberX3Job {
    fn default() -> Self {
        Self {
            create_top: true,
            create_bottom: true,
            output_path_top: "assembly/{{PROJECT}}_{{VERSION}}_{{VARIANT}}_COMPONENTS-TOP.gbr"
                .to_string(),
            output_path_bottom:
                "assembly/{{PROJECT}}_{{VERSION}}_{{VARIANT}}_COMPONENTS-BOTTOM.gbr".to_string(),
            boards: ObjectSet::Default,
            variants: ObjectSet::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetlistJob {
    pub boards: ObjectSet<Uuid>,
    pub output_path: String,
}

impl Default for NetlistJob {
    fn default() -> Self {
        Self {
            boards: ObjectSet::Default,
            output_path: "{{PROJECT}}_{{VERSION}}_{{BOARD}}.d356".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board3DJob {
    pub boards: ObjectSet<Uuid>,
    /// `None` exports the board without any assembly variant applied.
    pub variants: ObjectSet<Option<Uuid>>,
    pub output_path: String,
}

impl Default for Board3DJob {
    fn default() -> Self {
        Self {
            boards: ObjectSet::Default,
            variants: ObjectSet::Default,
            output_path: "3d/{{PROJECT}}_{{VERSION}}_{{BOARD}}.step".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protel_style_merges_drills() {
        let job = GerberExcellonJob::protel_style();
        assert!(job.merge_drill_files);
        assert_eq!(job.suffixes.copper_top, ".gtl");
        assert_eq!(job.output_path, GerberExcellonJob::default().output_path);
        assert_ne!(job, GerberExcellonJob::default_style());
    }
}
