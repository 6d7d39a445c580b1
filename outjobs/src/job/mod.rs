//! Output Job Model
//!
//! An [`OutputJob`] is one user-configured export task of a project. The
//! identity (UUID, name) and the forward-compatible option bag are common to
//! all jobs, the type-specific configuration lives in [`JobKind`].
//!
//! Every mutation goes through a setter (or [`OutputJob::modify`]) which
//! publishes exactly one [`JobEvent`] on the job's channel when the value
//! actually changed.

pub mod assembly;
pub mod fabrication;
pub mod generic;
pub mod graphics;
pub mod list;
pub mod object_set;
pub mod serialize;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::parser::SExp;

pub use assembly::{BomJob, HighlightPin1, InteractiveBomJob, PickPlaceJob, ViewMode};
pub use fabrication::{Board3DJob, GerberExcellonJob, GerberSuffixes, GerberX3Job, NetlistJob};
pub use generic::{ArchiveJob, CopyJob, LppzJob, ProjectJsonJob, UnknownJob};
pub use graphics::{ContentType, GraphicsContent, GraphicsJob, Orientation};
pub use list::JobList;
pub use object_set::ObjectSet;
pub use serialize::JobParseError;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    UuidChanged,
    NameChanged,
    PropertyChanged,
}

/// Type-specific configuration of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobKind {
    Graphics(GraphicsJob),
    GerberExcellon(GerberExcellonJob),
    PickPlace(PickPlaceJob),
    GerberX3(GerberX3Job),
    Netlist(NetlistJob),
    Bom(BomJob),
    InteractiveBom(InteractiveBomJob),
    Board3D(Board3DJob),
    ProjectJson(ProjectJsonJob),
    ProjectArchive(LppzJob),
    Copy(CopyJob),
    Archive(ArchiveJob),
    Unknown(UnknownJob),
}

impl JobKind {
    /// The `type` tag used in job files.
    pub fn type_name(&self) -> &str {
        match self {
            JobKind::Graphics(_) => "graphics",
            JobKind::GerberExcellon(_) => "gerber_excellon",
            JobKind::PickPlace(_) => "pick_place",
            JobKind::GerberX3(_) => "gerber_x3",
            JobKind::Netlist(_) => "netlist",
            JobKind::Bom(_) => "bom",
            JobKind::InteractiveBom(_) => "interactive_bom",
            JobKind::Board3D(_) => "board_3d",
            JobKind::ProjectJson(_) => "project_json",
            JobKind::ProjectArchive(_) => "lppz",
            JobKind::Copy(_) => "copy",
            JobKind::Archive(_) => "archive",
            JobKind::Unknown(unknown) => &unknown.type_name,
        }
    }

    /// Human readable type, e.g. for default job names.
    pub fn display_name(&self) -> &str {
        match self {
            JobKind::Graphics(_) => "Graphics",
            JobKind::GerberExcellon(_) => "Gerber/Excellon",
            JobKind::PickPlace(_) => "Pick&Place",
            JobKind::GerberX3(_) => "Gerber X3",
            JobKind::Netlist(_) => "Netlist",
            JobKind::Bom(_) => "Bill of Materials",
            JobKind::InteractiveBom(_) => "Interactive Bill of Materials",
            JobKind::Board3D(_) => "3D Model",
            JobKind::ProjectJson(_) => "Project JSON",
            JobKind::ProjectArchive(_) => "Project Archive",
            JobKind::Copy(_) => "Copy File",
            JobKind::Archive(_) => "ZIP Archive",
            JobKind::Unknown(unknown) => &unknown.type_name,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, JobKind::Unknown(_))
    }
}

pub struct OutputJob {
    uuid: Uuid,
    name: String,
    options: BTreeMap<String, Vec<SExp>>,
    kind: JobKind,
    on_edited: broadcast::Sender<JobEvent>,
}

impl OutputJob {
    /// Creates a job with a random UUID.
    pub fn new(name: impl Into<String>, kind: JobKind) -> Self {
        Self::with_uuid(Uuid::new_v4(), name, kind)
    }

    pub fn with_uuid(uuid: Uuid, name: impl Into<String>, kind: JobKind) -> Self {
        let (on_edited, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            uuid,
            name: name.into(),
            options: BTreeMap::new(),
            kind,
            on_edited,
        }
    }

    /// Creates a job named after its type.
    pub fn from_kind(kind: JobKind) -> Self {
        let name = kind.display_name().to_string();
        Self::new(name, kind)
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    pub fn kind(&self) -> &JobKind {
        &self.kind
    }

    /// Unrecognized `(option "<key>" ...)` nodes, keyed by option name.
    pub fn options(&self) -> &BTreeMap<String, Vec<SExp>> {
        &self.options
    }

    /// Jobs whose output files this job consumes.
    pub fn dependencies(&self) -> BTreeSet<Uuid> {
        match &self.kind {
            JobKind::Archive(archive) => archive.input_jobs.keys().copied().collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Receives every [`JobEvent`] published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.on_edited.subscribe()
    }

    pub fn set_uuid(&mut self, uuid: Uuid) {
        if uuid != self.uuid {
            self.uuid = uuid;
            self.notify(JobEvent::UuidChanged);
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name != self.name {
            self.name = name;
            self.notify(JobEvent::NameChanged);
        }
    }

    pub fn set_options(&mut self, options: BTreeMap<String, Vec<SExp>>) {
        if options != self.options {
            self.options = options;
            self.notify(JobEvent::PropertyChanged);
        }
    }

    /// Edits the type-specific configuration. Publishes a single
    /// [`JobEvent::PropertyChanged`] if the closure changed anything.
    pub fn modify<R>(&mut self, edit: impl FnOnce(&mut JobKind) -> R) -> R {
        let before = self.kind.clone();
        let result = edit(&mut self.kind);
        if self.kind != before {
            self.notify(JobEvent::PropertyChanged);
        }
        result
    }

    fn notify(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.on_edited.send(event);
    }

    pub(crate) fn set_options_silently(&mut self, options: BTreeMap<String, Vec<SExp>>) {
        self.options = options;
    }
}

impl Clone for OutputJob {
    /// The clone gets its own event channel without subscribers.
    fn clone(&self) -> Self {
        let mut job = Self::with_uuid(self.uuid, self.name.clone(), self.kind.clone());
        job.options = self.options.clone();
        job
    }
}

impl PartialEq for OutputJob {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
            && self.name == other.name
            && self.options == other.options
            && self.kind == other.kind
    }
}

impl fmt::Debug for OutputJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputJob")
            .field("uuid", &self.uuid)
            .field("name", &self.name)
            .field("options", &self.options)
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_setters_fire_one_event_when_changed() {
        let mut job = OutputJob::from_kind(JobKind::Netlist(NetlistJob::default()));
        let mut events = job.subscribe();

        job.set_name("Netlist");
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

        job.set_name("D356");
        assert_eq!(events.try_recv().unwrap(), JobEvent::NameChanged);
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

        job.set_uuid(Uuid::new_v4());
        assert_eq!(events.try_recv().unwrap(), JobEvent::UuidChanged);
    }

    #[test]
    fn test_modify_fires_property_changed() {
        let mut job = OutputJob::from_kind(JobKind::Netlist(NetlistJob::default()));
        let mut events = job.subscribe();

        job.modify(|kind| {
            if let JobKind::Netlist(netlist) = kind {
                netlist.output_path = "net.d356".to_string();
                netlist.boards = ObjectSet::All;
            }
        });
        assert_eq!(events.try_recv().unwrap(), JobEvent::PropertyChanged);
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

        job.modify(|_| ());
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_clone_is_equal_with_own_channel() {
        let job = OutputJob::from_kind(JobKind::Bom(BomJob::default()));
        let mut events = job.subscribe();
        let mut copy = job.clone();
        assert_eq!(copy, job);
        copy.set_name("Other");
        assert_ne!(copy, job);
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_archive_dependencies() {
        let source = Uuid::new_v4();
        let mut archive = ArchiveJob::default();
        archive.input_jobs.insert(source, "gerber".to_string());
        let job = OutputJob::from_kind(JobKind::Archive(archive));
        assert_eq!(job.dependencies(), BTreeSet::from([source]));
        assert_eq!(job.type_name(), "archive");
    }
}
