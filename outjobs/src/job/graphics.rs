//! Graphics (PDF/SVG/image) job configuration

use std::collections::BTreeMap;

use uuid::Uuid;

use super::object_set::ObjectSet;

/// Page size keys accepted for `page_size`. `None` in a content means the
/// page size is derived from the drawing.
pub const PAGE_SIZE_KEYS: &[&str] = &[
    "A0", "A1", "A2", "A3", "A4", "A5", "A6", "A7", "A8", "A9", "A10", "B0", "B1", "B2", "B3",
    "B4", "B5", "B6", "B7", "B8", "B9", "B10", "C5E", "DLE", "Letter", "Legal", "Executive",
    "Tabloid", "Ledger", "Comm10E", "Folio", "AnsiC", "AnsiD", "AnsiE", "ArchA", "ArchB",
    "ArchC", "ArchD", "ArchE",
];

pub fn is_valid_page_size(key: &str) -> bool {
    PAGE_SIZE_KEYS.contains(&key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Schematic,
    Board,
    BoardRendering,
    AssemblyGuide,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Schematic => "schematic",
            ContentType::Board => "board",
            ContentType::BoardRendering => "board_rendering",
            ContentType::AssemblyGuide => "assembly_guide",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "schematic" => Some(ContentType::Schematic),
            "board" => Some(ContentType::Board),
            "board_rendering" => Some(ContentType::BoardRendering),
            "assembly_guide" => Some(ContentType::AssemblyGuide),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Auto,
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Auto => "auto",
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(Orientation::Auto),
            "portrait" => Some(Orientation::Portrait),
            "landscape" => Some(Orientation::Landscape),
            _ => None,
        }
    }
}

/// One block of pages in a graphics export.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsContent {
    pub content_type: ContentType,
    pub title: String,
    pub page_size: Option<String>,
    pub orientation: Orientation,
    /// Left, top, right, bottom margins in millimeters.
    pub margins: [f64; 4],
    pub rotate: bool,
    pub mirror: bool,
    /// `None` fits the drawing to the page.
    pub scale: Option<f64>,
    pub pixmap_dpi: u32,
    pub monochrome: bool,
    /// ARGB hex color, `None` for transparent.
    pub background: Option<String>,
    /// Minimum line width in millimeters.
    pub min_line_width: f64,
    /// Layer name to ARGB hex color.
    pub layers: BTreeMap<String, String>,
    pub boards: ObjectSet<Option<Uuid>>,
    pub variants: ObjectSet<Option<Uuid>>,
}

impl GraphicsContent {
    pub fn new(content_type: ContentType, title: impl Into<String>) -> Self {
        Self {
            content_type,
            title: title.into(),
            page_size: Some("A4".to_string()),
            orientation: Orientation::Auto,
            margins: [10.0, 10.0, 10.0, 10.0],
            rotate: false,
            mirror: false,
            scale: None,
            pixmap_dpi: 600,
            monochrome: false,
            background: None,
            min_line_width: 0.1,
            layers: BTreeMap::new(),
            boards: ObjectSet::Default,
            variants: ObjectSet::Default,
        }
    }

    fn with_layers(mut self, layers: &[(&str, &str)]) -> Self {
        for (name, color) in layers {
            self.layers.insert(name.to_string(), color.to_string());
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsJob {
    /// Empty means `{{PROJECT}} {{VERSION}}`.
    pub document_title: String,
    pub output_path: String,
    pub content: Vec<GraphicsContent>,
}

impl Default for GraphicsJob {
    fn default() -> Self {
        Self {
            document_title: String::new(),
            output_path: "{{PROJECT}}_{{VERSION}}.pdf".to_string(),
            content: Vec::new(),
        }
    }
}

impl GraphicsJob {
    pub fn schematic_pdf() -> Self {
        let content = GraphicsContent::new(ContentType::Schematic, "Schematic").with_layers(&[
            ("schematic_frames", "#ff000000"),
            ("schematic_image_borders", "#ff808080"),
            ("schematic_net_lines", "#ff008000"),
            ("schematic_net_labels", "#ff000080"),
            ("schematic_symbol_outlines", "#ff800000"),
            ("schematic_symbol_names", "#ff202020"),
            ("schematic_symbol_values", "#ff202020"),
        ]);
        Self {
            document_title: String::new(),
            output_path: "{{PROJECT}}_{{VERSION}}_Schematic.pdf".to_string(),
            content: vec![content],
        }
    }

    pub fn board_assembly_pdf() -> Self {
        let top = GraphicsContent::new(ContentType::Board, "Assembly Top").with_layers(&[
            ("board_outlines", "#ff000000"),
            ("board_documentation_top", "#ff404040"),
            ("board_legend_top", "#ff000000"),
            ("board_pads_top", "#ffa0a0a0"),
        ]);
        let mut bottom = GraphicsContent::new(ContentType::Board, "Assembly Bottom").with_layers(&[
            ("board_outlines", "#ff000000"),
            ("board_documentation_bottom", "#ff404040"),
            ("board_legend_bottom", "#ff000000"),
            ("board_pads_bottom", "#ffa0a0a0"),
        ]);
        bottom.mirror = true;
        Self {
            document_title: String::new(),
            output_path: "{{PROJECT}}_{{VERSION}}_Assembly.pdf".to_string(),
            content: vec![top, bottom],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_have_valid_page_sizes() {
        for job in [GraphicsJob::schematic_pdf(), GraphicsJob::board_assembly_pdf()] {
            for content in &job.content {
                let key = content.page_size.as_deref().unwrap();
                assert!(is_valid_page_size(key));
            }
        }
        assert!(!is_valid_page_size("A42"));
    }

    #[test]
    fn test_assembly_preset_mirrors_bottom() {
        let job = GraphicsJob::board_assembly_pdf();
        assert!(!job.content[0].mirror);
        assert!(job.content[1].mirror);
    }
}
