//! Ordered job list of a project
//!
//! The list order is the execution order. [`JobList::check_dependency_order`]
//! reports dependencies which the runner would reject, the runner itself
//! never reorders jobs.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use uuid::Uuid;

use crate::core::JobError;

use super::serialize::{jobs_to_string, parse_jobs, JobParseError};
use super::{
    ArchiveJob, BomJob, GerberExcellonJob, GraphicsJob, JobKind, LppzJob, OutputJob, PickPlaceJob,
};

/// Problems found by [`JobList::check_dependency_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyIssue {
    /// A dependency which is not part of the list.
    Missing { job: Uuid, dependency: Uuid },
    /// A dependency listed after the job depending on it.
    OutOfOrder { job: Uuid, dependency: Uuid },
    /// Jobs depending on each other, in list order.
    Cycle(Vec<Uuid>),
}

impl fmt::Display for DependencyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyIssue::Missing { job, dependency } => {
                write!(f, "Job {} depends on non-existent job {}", job, dependency)
            }
            DependencyIssue::OutOfOrder { job, dependency } => write!(
                f,
                "Job {} depends on job {} which runs later, move it further up",
                job, dependency
            ),
            DependencyIssue::Cycle(jobs) => {
                let ids: Vec<String> = jobs.iter().map(Uuid::to_string).collect();
                write!(f, "Jobs depend on each other: {}", ids.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobList {
    jobs: Vec<OutputJob>,
}

impl JobList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_jobs(jobs: Vec<OutputJob>) -> Self {
        Self { jobs }
    }

    /// `project/jobs.lp` inside the project directory.
    pub fn default_path(project_dir: &Path) -> PathBuf {
        project_dir.join("project").join("jobs.lp")
    }

    /// The quick start set: schematic and assembly PDFs, Gerber/Excellon,
    /// pick&place, BOM, a ZIP of the Gerber files and the project archive.
    pub fn defaults() -> Self {
        let gerber = OutputJob::from_kind(JobKind::GerberExcellon(
            GerberExcellonJob::default_style(),
        ));
        let mut archive = ArchiveJob::default();
        archive.input_jobs.insert(gerber.uuid(), String::new());

        Self::from_jobs(vec![
            OutputJob::new("Schematic PDF", JobKind::Graphics(GraphicsJob::schematic_pdf())),
            OutputJob::new(
                "Board Assembly PDF",
                JobKind::Graphics(GraphicsJob::board_assembly_pdf()),
            ),
            gerber,
            OutputJob::from_kind(JobKind::PickPlace(PickPlaceJob::default())),
            OutputJob::from_kind(JobKind::Bom(BomJob::default())),
            OutputJob::from_kind(JobKind::Archive(archive)),
            OutputJob::from_kind(JobKind::ProjectArchive(LppzJob::default())),
        ])
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| JobError::io(path, e))?;
        Ok(Self::parse_str(&content)?)
    }

    /// Parses a jobs file; duplicate job UUIDs are rejected.
    pub fn parse_str(content: &str) -> Result<Self, JobParseError> {
        let jobs = parse_jobs(content)?;
        let mut seen = BTreeSet::new();
        for job in &jobs {
            if !seen.insert(job.uuid()) {
                return Err(JobParseError::InvalidFormat(format!(
                    "Duplicate job UUID {}",
                    job.uuid()
                )));
            }
        }
        Ok(Self { jobs })
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| JobError::io(parent, e))?;
        }
        std::fs::write(path, self.to_sexp_string()).map_err(|e| JobError::io(path, e))
    }

    pub fn to_sexp_string(&self) -> String {
        jobs_to_string(&self.jobs)
    }

    pub fn jobs(&self) -> &[OutputJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OutputJob> {
        self.jobs.iter()
    }

    pub fn uuids(&self) -> BTreeSet<Uuid> {
        self.jobs.iter().map(OutputJob::uuid).collect()
    }

    pub fn get(&self, uuid: &Uuid) -> Option<&OutputJob> {
        self.jobs.iter().find(|job| &job.uuid() == uuid)
    }

    pub fn get_mut(&mut self, uuid: &Uuid) -> Option<&mut OutputJob> {
        self.jobs.iter_mut().find(|job| &job.uuid() == uuid)
    }

    pub fn push(&mut self, job: OutputJob) {
        self.jobs.push(job);
    }

    pub fn remove(&mut self, uuid: &Uuid) -> Option<OutputJob> {
        let index = self.jobs.iter().position(|job| &job.uuid() == uuid)?;
        Some(self.jobs.remove(index))
    }

    /// Builds the dependency graph; edges point from a dependency to the job
    /// depending on it. Node indices equal list positions.
    fn dependency_graph(&self) -> (DiGraph<Uuid, ()>, Vec<DependencyIssue>) {
        let mut graph = DiGraph::new();
        let mut nodes: HashMap<Uuid, NodeIndex> = HashMap::new();
        for job in &self.jobs {
            nodes.insert(job.uuid(), graph.add_node(job.uuid()));
        }
        let mut missing = Vec::new();
        for job in &self.jobs {
            for dependency in job.dependencies() {
                match (nodes.get(&dependency), nodes.get(&job.uuid())) {
                    (Some(&from), Some(&to)) => {
                        graph.add_edge(from, to, ());
                    }
                    _ => missing.push(DependencyIssue::Missing {
                        job: job.uuid(),
                        dependency,
                    }),
                }
            }
        }
        (graph, missing)
    }

    pub fn check_dependency_order(&self) -> Vec<DependencyIssue> {
        let (graph, mut issues) = self.dependency_graph();

        let mut in_cycle = BTreeSet::new();
        for component in tarjan_scc(&graph) {
            let self_loop = component.len() == 1
                && graph.contains_edge(component[0], component[0]);
            if component.len() > 1 || self_loop {
                let mut indices: Vec<usize> = component.iter().map(|n| n.index()).collect();
                indices.sort_unstable();
                in_cycle.extend(indices.iter().copied());
                issues.push(DependencyIssue::Cycle(
                    indices.iter().map(|&i| graph[NodeIndex::new(i)]).collect(),
                ));
            }
        }

        for edge in graph.raw_edges() {
            let (from, to) = (edge.source().index(), edge.target().index());
            if from > to && !(in_cycle.contains(&from) && in_cycle.contains(&to)) {
                issues.push(DependencyIssue::OutOfOrder {
                    job: graph[edge.target()],
                    dependency: graph[edge.source()],
                });
            }
        }
        issues
    }

    /// A topological order which keeps the list order wherever possible, or
    /// `None` if the jobs depend on each other. Missing dependencies are
    /// ignored.
    pub fn suggested_order(&self) -> Option<Vec<Uuid>> {
        let (graph, _) = self.dependency_graph();
        let mut in_degree: Vec<usize> = graph
            .node_indices()
            .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();
        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(graph.node_count());
        while let Some(index) = ready.pop_first() {
            let node = NodeIndex::new(index);
            order.push(graph[node]);
            for next in graph.neighbors_directed(node, Direction::Outgoing) {
                in_degree[next.index()] -= 1;
                if in_degree[next.index()] == 0 {
                    ready.insert(next.index());
                }
            }
        }
        (order.len() == graph.node_count()).then_some(order)
    }
}

impl<'a> IntoIterator for &'a JobList {
    type Item = &'a OutputJob;
    type IntoIter = std::slice::Iter<'a, OutputJob>;

    fn into_iter(self) -> Self::IntoIter {
        self.jobs.iter()
    }
}
