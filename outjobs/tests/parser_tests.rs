//! Tests for project and jobs file parsing

mod common;

use common::*;
use outjobs::project::MountType;
use outjobs::{load_project, DependencyIssue, JobKind, JobList, OutputJob};
use uuid::Uuid;

#[test]
fn test_load_demo_project() {
    let (project, jobs) = load_project(&fixture_dir().join("demo.lpp")).unwrap();

    assert_eq!(project.name, "Demo Board");
    assert_eq!(project.version, "v1");
    assert_eq!(project.attribute("ORDER"), Some("1234"));
    assert_eq!(project.schematics, vec!["Main", "Power"]);

    assert_eq!(project.boards.len(), 2);
    assert!(project.boards[0].planes_outdated);
    assert!(!project.boards[1].planes_outdated);
    assert_eq!(project.boards[0].devices.len(), 4);

    let names: Vec<&str> = project
        .assembly_variants
        .iter()
        .map(|v| v.name.as_str())
        .collect();
    assert_eq!(names, vec!["Full", "Lite"]);

    let connector = project
        .components
        .iter()
        .find(|c| c.name == "J1")
        .unwrap();
    assert_eq!(connector.mount_type, MountType::Mixed);
    assert!(connector.is_assembled_in(&project.assembly_variants[0].uuid));
    assert!(!connector.is_assembled_in(&project.assembly_variants[1].uuid));

    assert_eq!(jobs.len(), 6);
}

#[test]
fn test_load_project_without_jobs_file() {
    let (dir, _, _) = demo_project();
    std::fs::remove_file(JobList::default_path(dir.path())).unwrap();

    let (_, jobs) = load_project(&dir.path().join("demo.lpp")).unwrap();
    assert!(jobs.is_empty());
}

#[test]
fn test_unknown_job_survives_save() {
    let (dir, _, jobs) = demo_project();
    let unknown = jobs.get(&Uuid::parse_str(UNKNOWN_JOB).unwrap()).unwrap();
    assert!(unknown.kind().is_unknown());
    assert_eq!(unknown.type_name(), "panelize");
    assert_eq!(unknown.name(), "Panelizer");

    let path = dir.path().join("saved.lp");
    jobs.save(&path).unwrap();
    let saved = std::fs::read_to_string(&path).unwrap();
    assert!(saved.contains("panelize"));
    assert!(saved.contains("2x2"));

    let reloaded = JobList::load(&path).unwrap();
    assert_eq!(reloaded, jobs);
}

#[test]
fn test_demo_jobs_are_in_dependency_order() {
    let (_, _, jobs) = demo_project();
    assert!(jobs.check_dependency_order().is_empty());

    let archive = Uuid::parse_str(ARCHIVE_JOB).unwrap();
    let pnp = Uuid::parse_str(PNP_JOB).unwrap();
    let mut reordered: Vec<OutputJob> = jobs.iter().cloned().collect();
    reordered.rotate_right(2);
    let reordered = JobList::from_jobs(reordered);

    let issues = reordered.check_dependency_order();
    assert!(issues.contains(&DependencyIssue::OutOfOrder {
        job: archive,
        dependency: pnp,
    }));
    let order = reordered.suggested_order().unwrap();
    let position = |uuid: &Uuid| order.iter().position(|u| u == uuid).unwrap();
    assert!(position(&pnp) < position(&archive));
}

#[test]
fn test_archive_inputs_parsed() {
    let (_, _, jobs) = demo_project();
    let archive = jobs.get(&Uuid::parse_str(ARCHIVE_JOB).unwrap()).unwrap();
    match archive.kind() {
        JobKind::Archive(config) => {
            let destinations: Vec<&str> = config.input_jobs.values().map(String::as_str).collect();
            assert_eq!(destinations, vec!["pnp", "bom"]);
            assert_eq!(config.output_path, "{{PROJECT}}_{{VERSION}}_assembly.zip");
        }
        other => panic!("unexpected job kind: {:?}", other),
    }
}

#[test]
fn test_duplicate_job_uuid_rejected() {
    let content = format!(
        "(output_jobs\n (job {id} (name \"A\") (type project_json) (output \"a.json\"))\n \
         (job {id} (name \"B\") (type project_json) (output \"b.json\"))\n)\n",
        id = Uuid::new_v4()
    );
    assert!(JobList::parse_str(&content).is_err());
}
