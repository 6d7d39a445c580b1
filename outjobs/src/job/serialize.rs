//! Job file reader and writer
//!
//! A jobs file is `(output_jobs (job ...) ...)`. Missing scalar fields fall
//! back to the defaults of the job type, malformed values are errors. Jobs of
//! an unknown type and unrecognized `(option ...)` nodes are kept verbatim.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use uuid::Uuid;

use crate::parser::{bool_atom, format_float, parse_bool, parse_uuid, ParseError, SExp, SExpParser};
use crate::project::MountType;

use super::assembly::{BomJob, HighlightPin1, InteractiveBomJob, PickPlaceJob, ViewMode};
use super::fabrication::{Board3DJob, GerberExcellonJob, GerberSuffixes, GerberX3Job, NetlistJob};
use super::generic::{ArchiveJob, CopyJob, LppzJob, ProjectJsonJob, UnknownJob};
use super::graphics::{ContentType, GraphicsContent, GraphicsJob, Orientation};
use super::object_set::ObjectSet;
use super::{JobKind, OutputJob};

pub const JOBS_ROOT: &str = "output_jobs";

#[derive(Debug, Error)]
pub enum JobParseError {
    #[error("S-expression parse error: {0}")]
    SExpParse(#[from] ParseError),
    #[error("Invalid jobs format: {0}")]
    InvalidFormat(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid value for '{field}': '{value}'")]
    InvalidValue { field: String, value: String },
}

pub fn parse_jobs(content: &str) -> Result<Vec<OutputJob>, JobParseError> {
    let root = SExpParser::new(content).parse()?;
    if root.head() != Some(JOBS_ROOT) {
        return Err(JobParseError::InvalidFormat(format!(
            "Expected {} root",
            JOBS_ROOT
        )));
    }
    root.children("job").into_iter().map(read_job).collect()
}

pub fn jobs_to_string(jobs: &[OutputJob]) -> String {
    let mut root = SExp::list(JOBS_ROOT);
    for job in jobs {
        root.push(write_job(job));
    }
    root.to_pretty_string()
}

pub fn read_job(node: &SExp) -> Result<OutputJob, JobParseError> {
    if node.head() != Some("job") {
        return Err(JobParseError::InvalidFormat(format!(
            "Expected job node, found {}",
            node
        )));
    }
    let uuid_str = node
        .value(0)
        .ok_or_else(|| JobParseError::MissingField("job/uuid".to_string()))?;
    let uuid = parse_uuid(uuid_str).ok_or_else(|| JobParseError::InvalidValue {
        field: "job/uuid".to_string(),
        value: uuid_str.to_string(),
    })?;
    let name = node
        .child_value("name")
        .ok_or_else(|| JobParseError::MissingField("job/name".to_string()))?;
    let type_name = node
        .child_value("type")
        .ok_or_else(|| JobParseError::MissingField("job/type".to_string()))?;

    let fields = Fields(node);
    let kind = match type_name {
        "graphics" => JobKind::Graphics(read_graphics(&fields)?),
        "gerber_excellon" => JobKind::GerberExcellon(read_gerber_excellon(&fields)?),
        "pick_place" => JobKind::PickPlace(read_pick_place(&fields)?),
        "gerber_x3" => JobKind::GerberX3(read_gerber_x3(&fields)?),
        "netlist" => JobKind::Netlist(NetlistJob {
            boards: ObjectSet::read(node, "board")?,
            output_path: fields.string("output", &NetlistJob::default().output_path),
        }),
        "bom" => JobKind::Bom(BomJob {
            boards: ObjectSet::read(node, "board")?,
            variants: ObjectSet::read(node, "variant")?,
            custom_attributes: fields.repeated("custom_attribute"),
            output_path: fields.string("output", &BomJob::default().output_path),
        }),
        "interactive_bom" => JobKind::InteractiveBom(read_interactive_bom(&fields)?),
        "board_3d" => JobKind::Board3D(Board3DJob {
            boards: ObjectSet::read(node, "board")?,
            variants: ObjectSet::read(node, "variant")?,
            output_path: fields.string("output", &Board3DJob::default().output_path),
        }),
        "project_json" => JobKind::ProjectJson(ProjectJsonJob {
            output_path: fields.string("output", &ProjectJsonJob::default().output_path),
        }),
        "lppz" => JobKind::ProjectArchive(LppzJob {
            output_path: fields.string("output", &LppzJob::default().output_path),
        }),
        "copy" => JobKind::Copy(CopyJob {
            boards: ObjectSet::read(node, "board")?,
            variants: ObjectSet::read(node, "variant")?,
            substitute_variables: fields.bool("substitute_variables", false)?,
            input_path: fields.string("input", ""),
            output_path: fields.string("output", ""),
        }),
        "archive" => JobKind::Archive(read_archive(&fields)?),
        other => JobKind::Unknown(UnknownJob {
            type_name: other.to_string(),
            node: node.clone(),
        }),
    };

    let mut job = OutputJob::with_uuid(uuid, name, kind);
    if !job.kind().is_unknown() {
        job.set_options_silently(read_options(node)?);
    }
    Ok(job)
}

pub fn write_job(job: &OutputJob) -> SExp {
    if let JobKind::Unknown(unknown) = job.kind() {
        return write_unknown(job, unknown);
    }

    let mut node = SExp::list("job")
        .with(SExp::atom(job.uuid().to_string()))
        .with(string_child("name", job.name()))
        .with(SExp::list("type").with(SExp::atom(job.type_name())));

    match job.kind() {
        JobKind::Graphics(graphics) => write_graphics(&mut node, graphics),
        JobKind::GerberExcellon(gerber) => write_gerber_excellon(&mut node, gerber),
        JobKind::PickPlace(pnp) => write_pick_place(&mut node, pnp),
        JobKind::GerberX3(x3) => {
            node.push(side_child("top", x3.create_top, &x3.output_path_top));
            node.push(side_child("bottom", x3.create_bottom, &x3.output_path_bottom));
            x3.boards.write(&mut node, "board");
            x3.variants.write(&mut node, "variant");
        }
        JobKind::Netlist(netlist) => {
            netlist.boards.write(&mut node, "board");
            node.push(string_child("output", &netlist.output_path));
        }
        JobKind::Bom(bom) => {
            bom.boards.write(&mut node, "board");
            bom.variants.write(&mut node, "variant");
            for attribute in &bom.custom_attributes {
                node.push(string_child("custom_attribute", attribute));
            }
            node.push(string_child("output", &bom.output_path));
        }
        JobKind::InteractiveBom(ibom) => write_interactive_bom(&mut node, ibom),
        JobKind::Board3D(board_3d) => {
            board_3d.boards.write(&mut node, "board");
            board_3d.variants.write(&mut node, "variant");
            node.push(string_child("output", &board_3d.output_path));
        }
        JobKind::ProjectJson(json) => node.push(string_child("output", &json.output_path)),
        JobKind::ProjectArchive(lppz) => node.push(string_child("output", &lppz.output_path)),
        JobKind::Copy(copy) => {
            copy.boards.write(&mut node, "board");
            copy.variants.write(&mut node, "variant");
            node.push(bool_child("substitute_variables", copy.substitute_variables));
            node.push(string_child("input", &copy.input_path));
            node.push(string_child("output", &copy.output_path));
        }
        JobKind::Archive(archive) => {
            for (uuid, destination) in &archive.input_jobs {
                node.push(
                    SExp::list("input")
                        .with(SExp::atom(uuid.to_string()))
                        .with(SExp::string(destination.as_str())),
                );
            }
            node.push(string_child("output", &archive.output_path));
        }
        JobKind::Unknown(_) => {}
    }

    for options in job.options().values() {
        for option in options {
            node.push(option.clone());
        }
    }
    node
}

/// The stored node with only identity changes applied.
fn write_unknown(job: &OutputJob, unknown: &UnknownJob) -> SExp {
    let mut node = unknown.node.clone();
    let uuid = job.uuid().to_string();
    let name_changed = node.child_value("name") != Some(job.name());
    if let Some(items) = node.as_list_mut() {
        if items.get(1).and_then(SExp::as_atom) != Some(uuid.as_str()) && items.len() > 1 {
            items[1] = SExp::atom(uuid);
        }
        if name_changed {
            if let Some(name) = items.iter_mut().skip(1).find(|i| i.head() == Some("name")) {
                *name = string_child("name", job.name());
            }
        }
    }
    node
}

fn read_options(node: &SExp) -> Result<BTreeMap<String, Vec<SExp>>, JobParseError> {
    let mut options: BTreeMap<String, Vec<SExp>> = BTreeMap::new();
    for option in node.children("option") {
        let key = option
            .value(0)
            .ok_or_else(|| JobParseError::MissingField("option/key".to_string()))?;
        options
            .entry(key.to_string())
            .or_default()
            .push(option.clone());
    }
    Ok(options)
}

/// Typed access to the scalar fields of a job node.
struct Fields<'a>(&'a SExp);

impl Fields<'_> {
    fn string(&self, path: &str, default: &str) -> String {
        self.0.child_value(path).unwrap_or(default).to_string()
    }

    fn repeated(&self, tag: &str) -> Vec<String> {
        self.0
            .children(tag)
            .iter()
            .filter_map(|c| c.value(0))
            .map(str::to_string)
            .collect()
    }

    fn parse<T>(
        &self,
        path: &str,
        default: T,
        from: impl Fn(&str) -> Option<T>,
    ) -> Result<T, JobParseError> {
        match self.0.child_value(path) {
            Some(value) => from(value).ok_or_else(|| JobParseError::InvalidValue {
                field: path.to_string(),
                value: value.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn bool(&self, path: &str, default: bool) -> Result<bool, JobParseError> {
        self.parse(path, default, parse_bool)
    }

    fn float(&self, path: &str, default: f64) -> Result<f64, JobParseError> {
        self.parse(path, default, |s| s.parse().ok())
    }

    /// Comma separated list; an empty string is an empty list.
    fn comma_list(&self, path: &str, default: &[String]) -> Vec<String> {
        match self.0.child_value(path) {
            Some("") => Vec::new(),
            Some(value) => value.split(',').map(|s| s.trim().to_string()).collect(),
            None => default.to_vec(),
        }
    }
}

fn string_child(tag: &str, value: &str) -> SExp {
    SExp::list(tag).with(SExp::string(value))
}

fn atom_child(tag: &str, value: impl Into<String>) -> SExp {
    SExp::list(tag).with(SExp::atom(value))
}

fn bool_child(tag: &str, value: bool) -> SExp {
    SExp::list(tag).with(bool_atom(value))
}

fn side_child(tag: &str, create: bool, output: &str) -> SExp {
    SExp::list(tag)
        .with(bool_child("create", create))
        .with(string_child("output", output))
}

fn read_graphics(fields: &Fields) -> Result<GraphicsJob, JobParseError> {
    let mut content = Vec::new();
    for node in fields.0.children("content") {
        content.push(read_graphics_content(node)?);
    }
    Ok(GraphicsJob {
        document_title: fields.string("document_title", ""),
        output_path: fields.string("output", &GraphicsJob::default().output_path),
        content,
    })
}

fn read_graphics_content(node: &SExp) -> Result<GraphicsContent, JobParseError> {
    let fields = Fields(node);
    let type_name = node
        .child_value("type")
        .ok_or_else(|| JobParseError::MissingField("content/type".to_string()))?;
    let content_type =
        ContentType::from_name(type_name).ok_or_else(|| JobParseError::InvalidValue {
            field: "content/type".to_string(),
            value: type_name.to_string(),
        })?;
    let defaults = GraphicsContent::new(content_type, "");

    let margins = match node.child("margins") {
        Some(margins) => {
            let mut values = [0.0; 4];
            for (i, value) in values.iter_mut().enumerate() {
                let raw = margins.value(i).unwrap_or_default();
                *value = raw.parse().map_err(|_| JobParseError::InvalidValue {
                    field: "content/margins".to_string(),
                    value: raw.to_string(),
                })?;
            }
            values
        }
        None => defaults.margins,
    };

    let mut layers = BTreeMap::new();
    for layer in node.children("layer") {
        let name = layer
            .value(0)
            .ok_or_else(|| JobParseError::MissingField("content/layer".to_string()))?;
        let color = layer
            .child_value("color")
            .ok_or_else(|| JobParseError::MissingField("content/layer/color".to_string()))?;
        layers.insert(name.to_string(), color.to_string());
    }

    Ok(GraphicsContent {
        content_type,
        title: fields.string("title", ""),
        page_size: fields.parse("page_size", defaults.page_size, |s| match s {
            "auto" => Some(None),
            key => Some(Some(key.to_string())),
        })?,
        orientation: fields.parse("orientation", defaults.orientation, Orientation::from_name)?,
        margins,
        rotate: fields.bool("rotate", defaults.rotate)?,
        mirror: fields.bool("mirror", defaults.mirror)?,
        scale: fields.parse("scale", defaults.scale, |s| match s {
            "auto" => Some(None),
            factor => factor.parse().ok().map(Some),
        })?,
        pixmap_dpi: fields.parse("dpi", defaults.pixmap_dpi, |s| s.parse().ok())?,
        monochrome: fields.bool("monochrome", defaults.monochrome)?,
        background: fields.parse("background", defaults.background, |s| match s {
            "none" => Some(None),
            color => Some(Some(color.to_string())),
        })?,
        min_line_width: fields.float("min_line_width", defaults.min_line_width)?,
        layers,
        boards: ObjectSet::read(node, "board")?,
        variants: ObjectSet::read(node, "variant")?,
    })
}

fn write_graphics(node: &mut SExp, job: &GraphicsJob) {
    node.push(string_child("document_title", &job.document_title));
    node.push(string_child("output", &job.output_path));
    for content in &job.content {
        let mut child = SExp::list("content")
            .with(atom_child("type", content.content_type.as_str()))
            .with(string_child("title", &content.title))
            .with(match &content.page_size {
                Some(key) => string_child("page_size", key),
                None => atom_child("page_size", "auto"),
            })
            .with(atom_child("orientation", content.orientation.as_str()));
        let mut margins = SExp::list("margins");
        for margin in content.margins {
            margins.push(SExp::atom(format_float(margin)));
        }
        child.push(margins);
        child.push(bool_child("rotate", content.rotate));
        child.push(bool_child("mirror", content.mirror));
        child.push(match content.scale {
            Some(factor) => atom_child("scale", format_float(factor)),
            None => atom_child("scale", "auto"),
        });
        child.push(atom_child("dpi", content.pixmap_dpi.to_string()));
        child.push(bool_child("monochrome", content.monochrome));
        child.push(match &content.background {
            Some(color) => string_child("background", color),
            None => atom_child("background", "none"),
        });
        child.push(atom_child("min_line_width", format_float(content.min_line_width)));
        for (layer, color) in &content.layers {
            child.push(
                SExp::list("layer")
                    .with(SExp::atom(layer.as_str()))
                    .with(string_child("color", color)),
            );
        }
        content.boards.write(&mut child, "board");
        content.variants.write(&mut child, "variant");
        node.push(child);
    }
}

/// `(tag (suffix "..."))` children of a Gerber job, in file order.
fn gerber_layer_tags(suffixes: &GerberSuffixes) -> [(&'static str, &String); 8] {
    [
        ("outlines", &suffixes.outlines),
        ("copper_top", &suffixes.copper_top),
        ("copper_inner", &suffixes.copper_inner),
        ("copper_bot", &suffixes.copper_bot),
        ("soldermask_top", &suffixes.solder_mask_top),
        ("soldermask_bot", &suffixes.solder_mask_bot),
        ("silkscreen_top", &suffixes.silkscreen_top),
        ("silkscreen_bot", &suffixes.silkscreen_bot),
    ]
}

fn read_gerber_excellon(fields: &Fields) -> Result<GerberExcellonJob, JobParseError> {
    let defaults = GerberExcellonJob::default();
    let d = &defaults.suffixes;
    let suffix = |tag: &str, default: &str| fields.string(&format!("{}/suffix", tag), default);
    let suffixes = GerberSuffixes {
        drills: fields.string("drills/suffix_merged", &d.drills),
        drills_npth: fields.string("drills/suffix_npth", &d.drills_npth),
        drills_pth: fields.string("drills/suffix_pth", &d.drills_pth),
        drills_blind_buried: fields.string("drills/suffix_buried", &d.drills_blind_buried),
        outlines: suffix("outlines", &d.outlines),
        copper_top: suffix("copper_top", &d.copper_top),
        copper_inner: suffix("copper_inner", &d.copper_inner),
        copper_bot: suffix("copper_bot", &d.copper_bot),
        solder_mask_top: suffix("soldermask_top", &d.solder_mask_top),
        solder_mask_bot: suffix("soldermask_bot", &d.solder_mask_bot),
        silkscreen_top: suffix("silkscreen_top", &d.silkscreen_top),
        silkscreen_bot: suffix("silkscreen_bot", &d.silkscreen_bot),
        solder_paste_top: suffix("solderpaste_top", &d.solder_paste_top),
        solder_paste_bot: suffix("solderpaste_bot", &d.solder_paste_bot),
    };
    Ok(GerberExcellonJob {
        suffixes,
        merge_drill_files: fields.bool("drills/merge", defaults.merge_drill_files)?,
        use_g85_slot_command: fields.bool("drills/g85_slots", defaults.use_g85_slot_command)?,
        enable_solder_paste_top: fields
            .bool("solderpaste_top/create", defaults.enable_solder_paste_top)?,
        enable_solder_paste_bot: fields
            .bool("solderpaste_bot/create", defaults.enable_solder_paste_bot)?,
        boards: ObjectSet::read(fields.0, "board")?,
        output_path: fields.string("output", &defaults.output_path),
    })
}

fn write_gerber_excellon(node: &mut SExp, job: &GerberExcellonJob) {
    for (tag, suffix) in gerber_layer_tags(&job.suffixes) {
        node.push(SExp::list(tag).with(string_child("suffix", suffix)));
    }
    node.push(
        SExp::list("solderpaste_top")
            .with(bool_child("create", job.enable_solder_paste_top))
            .with(string_child("suffix", &job.suffixes.solder_paste_top)),
    );
    node.push(
        SExp::list("solderpaste_bot")
            .with(bool_child("create", job.enable_solder_paste_bot))
            .with(string_child("suffix", &job.suffixes.solder_paste_bot)),
    );
    node.push(
        SExp::list("drills")
            .with(bool_child("merge", job.merge_drill_files))
            .with(string_child("suffix_pth", &job.suffixes.drills_pth))
            .with(string_child("suffix_npth", &job.suffixes.drills_npth))
            .with(string_child("suffix_merged", &job.suffixes.drills))
            .with(string_child("suffix_buried", &job.suffixes.drills_blind_buried))
            .with(bool_child("g85_slots", job.use_g85_slot_command)),
    );
    job.boards.write(node, "board");
    node.push(string_child("output", &job.output_path));
}

fn read_side(
    fields: &Fields,
    tag: &str,
    default_create: bool,
    default_output: &str,
) -> Result<(bool, String), JobParseError> {
    Ok((
        fields.bool(&format!("{}/create", tag), default_create)?,
        fields.string(&format!("{}/output", tag), default_output),
    ))
}

fn read_pick_place(fields: &Fields) -> Result<PickPlaceJob, JobParseError> {
    let defaults = PickPlaceJob::default();
    let technologies = match fields.0.child("technology") {
        Some(node) => {
            let mut technologies = BTreeSet::new();
            let items = node.as_list().unwrap_or_default();
            for item in items.iter().skip(1) {
                let name = item.as_atom().unwrap_or_default();
                let mount_type =
                    MountType::from_name(name).ok_or_else(|| JobParseError::InvalidValue {
                        field: "technology".to_string(),
                        value: name.to_string(),
                    })?;
                technologies.insert(mount_type);
            }
            technologies
        }
        None => defaults.technologies,
    };
    let (create_top, output_path_top) =
        read_side(fields, "top", defaults.create_top, &defaults.output_path_top)?;
    let (create_bottom, output_path_bottom) = read_side(
        fields,
        "bottom",
        defaults.create_bottom,
        &defaults.output_path_bottom,
    )?;
    let (create_both, output_path_both) =
        read_side(fields, "both", defaults.create_both, &defaults.output_path_both)?;
    Ok(PickPlaceJob {
        technologies,
        include_comment: fields.bool("comment", defaults.include_comment)?,
        create_top,
        create_bottom,
        create_both,
        output_path_top,
        output_path_bottom,
        output_path_both,
        boards: ObjectSet::read(fields.0, "board")?,
        variants: ObjectSet::read(fields.0, "variant")?,
    })
}

fn write_pick_place(node: &mut SExp, job: &PickPlaceJob) {
    let mut technology = SExp::list("technology");
    for mount_type in &job.technologies {
        technology.push(SExp::atom(mount_type.as_str()));
    }
    node.push(technology);
    node.push(bool_child("comment", job.include_comment));
    node.push(side_child("top", job.create_top, &job.output_path_top));
    node.push(side_child("bottom", job.create_bottom, &job.output_path_bottom));
    node.push(side_child("both", job.create_both, &job.output_path_both));
    job.boards.write(node, "board");
    job.variants.write(node, "variant");
}

fn read_gerber_x3(fields: &Fields) -> Result<GerberX3Job, JobParseError> {
    let defaults = GerberX3Job::default();
    let (create_top, output_path_top) =
        read_side(fields, "top", defaults.create_top, &defaults.output_path_top)?;
    let (create_bottom, output_path_bottom) = read_side(
        fields,
        "bottom",
        defaults.create_bottom,
        &defaults.output_path_bottom,
    )?;
    Ok(GerberX3Job {
        create_top,
        create_bottom,
        output_path_top,
        output_path_bottom,
        boards: ObjectSet::read(fields.0, "board")?,
        variants: ObjectSet::read(fields.0, "variant")?,
    })
}

fn read_interactive_bom(fields: &Fields) -> Result<InteractiveBomJob, JobParseError> {
    let d = InteractiveBomJob::default();
    Ok(InteractiveBomJob {
        view_mode: fields.parse("view_mode", d.view_mode, ViewMode::from_name)?,
        highlight_pin1: fields.parse("highlight_pin1", d.highlight_pin1, HighlightPin1::from_name)?,
        dark_mode: fields.bool("dark_mode", d.dark_mode)?,
        board_rotation: fields.float("rotation", d.board_rotation)?,
        offset_back_rotation: fields.bool("offset_back_rotation", d.offset_back_rotation)?,
        show_silkscreen: fields.bool("show_silkscreen", d.show_silkscreen)?,
        show_fabrication: fields.bool("show_fabrication", d.show_fabrication)?,
        show_pads: fields.bool("show_pads", d.show_pads)?,
        show_tracks: fields.bool("show_tracks", d.show_tracks)?,
        show_zones: fields.bool("show_zones", d.show_zones)?,
        check_boxes: fields.comma_list("checkboxes", &d.check_boxes),
        component_order: fields.comma_list("component_order", &d.component_order),
        custom_attributes: fields.repeated("custom_attribute"),
        boards: ObjectSet::read(fields.0, "board")?,
        variants: ObjectSet::read(fields.0, "variant")?,
        output_path: fields.string("output", &d.output_path),
    })
}

fn write_interactive_bom(node: &mut SExp, job: &InteractiveBomJob) {
    node.push(atom_child("view_mode", job.view_mode.as_str()));
    node.push(atom_child("highlight_pin1", job.highlight_pin1.as_str()));
    node.push(bool_child("dark_mode", job.dark_mode));
    node.push(atom_child("rotation", format_float(job.board_rotation)));
    node.push(bool_child("offset_back_rotation", job.offset_back_rotation));
    node.push(bool_child("show_silkscreen", job.show_silkscreen));
    node.push(bool_child("show_fabrication", job.show_fabrication));
    node.push(bool_child("show_pads", job.show_pads));
    node.push(bool_child("show_tracks", job.show_tracks));
    node.push(bool_child("show_zones", job.show_zones));
    node.push(string_child("checkboxes", &job.check_boxes.join(",")));
    node.push(string_child("component_order", &job.component_order.join(",")));
    for attribute in &job.custom_attributes {
        node.push(string_child("custom_attribute", attribute));
    }
    job.boards.write(node, "board");
    job.variants.write(node, "variant");
    node.push(string_child("output", &job.output_path));
}

fn read_archive(fields: &Fields) -> Result<ArchiveJob, JobParseError> {
    let mut input_jobs = BTreeMap::new();
    for input in fields.0.children("input") {
        let raw = input.value(0).unwrap_or_default();
        let uuid: Uuid = parse_uuid(raw).ok_or_else(|| JobParseError::InvalidValue {
            field: "input".to_string(),
            value: raw.to_string(),
        })?;
        input_jobs.insert(uuid, input.value(1).unwrap_or_default().to_string());
    }
    Ok(ArchiveJob {
        input_jobs,
        output_path: fields.string("output", &ArchiveJob::default().output_path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn roundtrip(job: &OutputJob) -> OutputJob {
        let text = jobs_to_string(std::slice::from_ref(job));
        let mut jobs = parse_jobs(&text).unwrap();
        assert_eq!(jobs.len(), 1);
        jobs.remove(0)
    }

    #[test]
    fn test_every_default_kind_survives_save_and_load() {
        let kinds = vec![
            JobKind::Graphics(GraphicsJob::board_assembly_pdf()),
            JobKind::GerberExcellon(GerberExcellonJob::protel_style()),
            JobKind::PickPlace(PickPlaceJob::default()),
            JobKind::GerberX3(GerberX3Job::default()),
            JobKind::Netlist(NetlistJob::default()),
            JobKind::Bom(BomJob::default()),
            JobKind::InteractiveBom(InteractiveBomJob::default()),
            JobKind::Board3D(Board3DJob::default()),
            JobKind::ProjectJson(ProjectJsonJob::default()),
            JobKind::ProjectArchive(LppzJob::default()),
            JobKind::Copy(CopyJob::default()),
            JobKind::Archive(ArchiveJob::default()),
        ];
        for kind in kinds {
            let job = OutputJob::from_kind(kind);
            assert_eq!(roundtrip(&job), job, "type {}", job.type_name());
        }
    }

    #[test]
    fn test_unknown_type_is_passed_through() {
        let text = r##"(output_jobs
 (job 3f1c0b5e-7e2a-4f0e-9b8e-5a4d3c2b1a00 (name "Future") (type hologram)
  (beam (intensity 11) (color "#ff00ff"))
  (option "x" (y z))
 )
)
"##;
        let jobs = parse_jobs(text).unwrap();
        assert_eq!(jobs[0].type_name(), "hologram");
        assert!(jobs[0].kind().is_unknown());
        assert!(jobs[0].options().is_empty());
        assert_eq!(
            parse(&jobs_to_string(&jobs)).unwrap(),
            parse(text).unwrap()
        );
    }

    #[test]
    fn test_unknown_type_keeps_identity_edits() {
        let text = r#"(output_jobs (job 3f1c0b5e-7e2a-4f0e-9b8e-5a4d3c2b1a00 (name "Future") (type hologram)))"#;
        let mut jobs = parse_jobs(text).unwrap();
        jobs[0].set_name("Renamed");
        let written = write_job(&jobs[0]);
        assert_eq!(written.child_value("name"), Some("Renamed"));
        assert_eq!(written.child_value("type"), Some("hologram"));
    }

    #[test]
    fn test_unknown_options_are_preserved() {
        let text = r#"(output_jobs
 (job 3f1c0b5e-7e2a-4f0e-9b8e-5a4d3c2b1a01 (name "JSON") (type project_json)
  (output "p.json")
  (option "compress" (level 9))
  (option "compress" (level 3))
  (option "annotate" yes)
 )
)"#;
        let jobs = parse_jobs(text).unwrap();
        let options = jobs[0].options();
        assert_eq!(options.len(), 2);
        assert_eq!(options["compress"].len(), 2);

        let again = parse_jobs(&jobs_to_string(&jobs)).unwrap();
        assert_eq!(again, jobs);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let text = r#"(output_jobs (job 3f1c0b5e-7e2a-4f0e-9b8e-5a4d3c2b1a02 (name "PnP") (type pick_place)
 (technology) (board default)))"#;
        let jobs = parse_jobs(text).unwrap();
        match jobs[0].kind() {
            JobKind::PickPlace(pnp) => {
                assert!(pnp.technologies.is_empty());
                assert!(pnp.create_top);
                assert_eq!(pnp.output_path_top, PickPlaceJob::default().output_path_top);
                assert!(pnp.boards.is_default());
                assert_eq!(pnp.variants, ObjectSet::none());
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_bool = r#"(output_jobs (job 3f1c0b5e-7e2a-4f0e-9b8e-5a4d3c2b1a03 (name "C") (type copy) (substitute_variables maybe)))"#;
        assert!(matches!(
            parse_jobs(bad_bool),
            Err(JobParseError::InvalidValue { .. })
        ));
        let no_name = r#"(output_jobs (job 3f1c0b5e-7e2a-4f0e-9b8e-5a4d3c2b1a03 (type copy)))"#;
        assert!(matches!(
            parse_jobs(no_name),
            Err(JobParseError::MissingField(_))
        ));
        assert!(matches!(
            parse_jobs("(jobs)"),
            Err(JobParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_archive_inputs() {
        let source = Uuid::new_v4();
        let mut archive = ArchiveJob::default();
        archive.input_jobs.insert(source, "gerber".to_string());
        let job = OutputJob::from_kind(JobKind::Archive(archive));
        let node = write_job(&job);
        let input = node.child("input").unwrap();
        assert_eq!(input.value(0), Some(source.to_string().as_str()));
        assert_eq!(input.value(1), Some("gerber"));
        assert_eq!(roundtrip(&job), job);
    }
}
