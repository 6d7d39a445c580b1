//! outjobs CLI - run the output jobs of a PCB project from the command line.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use outjobs::{
    load_project, JobList, OutputJob, OutputJobRunner, Project, ProjectDataBackend,
    RunnerOptions,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "outjobs")]
#[command(about = "Runs the output jobs of PCB projects (Gerber, BOM, pick&place, archives)", long_about = None)]
#[command(version)]
struct Cli {
    /// Log progress (debug output with -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the output jobs of a project
    Run {
        /// Path to the project file
        #[arg(value_name = "PROJECT")]
        project: PathBuf,

        /// Only run these jobs (in list order)
        #[arg(long = "job", value_name = "UUID")]
        jobs: Vec<Uuid>,

        /// Write into this directory instead of output/<version>
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Store the output index after every job
        #[arg(long)]
        persist_index: bool,

        /// Do not refill outdated planes before exporting
        #[arg(long)]
        no_rebuild_planes: bool,
    },

    /// List the output jobs of a project
    List {
        #[arg(value_name = "PROJECT")]
        project: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Check that archive jobs are listed after the jobs they depend on
    Check {
        #[arg(value_name = "PROJECT")]
        project: PathBuf,
    },

    /// Report files in the output directory not written by any job
    UnknownFiles {
        #[arg(value_name = "PROJECT")]
        project: PathBuf,

        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Delete the reported files
        #[arg(long)]
        remove: bool,
    },

    /// Create the default set of output jobs for a project
    Defaults {
        #[arg(value_name = "PROJECT")]
        project: PathBuf,

        /// Replace an existing jobs file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripts
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            project,
            jobs,
            output_dir,
            persist_index,
            no_rebuild_planes,
        } => {
            let options = RunnerOptions {
                persist_index_after_each_job: persist_index,
                rebuild_planes: !no_rebuild_planes,
            };
            handle_run(&project, &jobs, output_dir, options)
        }
        Commands::List { project, format } => handle_list(&project, format),
        Commands::Check { project } => handle_check(&project),
        Commands::UnknownFiles {
            project,
            output_dir,
            remove,
        } => handle_unknown_files(&project, output_dir, remove),
        Commands::Defaults { project, force } => handle_defaults(&project, force),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open(path: &Path) -> Result<(Project, JobList)> {
    load_project(path).with_context(|| format!("Failed to open project {}", path.display()))
}

fn handle_run(
    path: &Path,
    selection: &[Uuid],
    output_dir: Option<PathBuf>,
    options: RunnerOptions,
) -> Result<i32> {
    let (mut project, list) = open(path)?;
    for uuid in selection {
        if list.get(uuid).is_none() {
            bail!("The project has no output job {}", uuid);
        }
    }
    let jobs: Vec<OutputJob> = list
        .iter()
        .filter(|job| selection.is_empty() || selection.contains(&job.uuid()))
        .cloned()
        .collect();

    info!("Running {} of {} output job(s) of '{}'", jobs.len(), list.len(), project.name);
    let mut backend = ProjectDataBackend::new();
    let mut runner = OutputJobRunner::new(&mut project, &mut backend).with_options(options);
    if let Some(dir) = output_dir {
        runner.set_output_directory(dir);
    }
    println!("Output directory: {}", runner.output_directory().display());

    let result = runner.run(&jobs);
    for job in &jobs {
        if let Some(files) = runner.written_files().get(&job.uuid()) {
            println!("  {}: {} file(s)", job.name(), files.len());
            for file in files {
                println!("    {}", file.display());
            }
        }
    }
    result.context("Output jobs did not complete")?;
    println!("{} job(s) finished", jobs.len());
    Ok(0)
}

fn handle_list(path: &Path, format: OutputFormat) -> Result<i32> {
    let (_, jobs) = open(path)?;
    match format {
        OutputFormat::Human => {
            if jobs.is_empty() {
                println!("No output jobs");
            }
            for job in &jobs {
                let marker = if job.kind().is_unknown() { " (unknown type)" } else { "" };
                println!("{}  {:<16} {}{}", job.uuid(), job.type_name(), job.name(), marker);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "jobs": jobs.iter().map(|job| {
                    serde_json::json!({
                        "uuid": job.uuid().to_string(),
                        "name": job.name(),
                        "type": job.type_name(),
                        "known": !job.kind().is_unknown(),
                        "dependencies": job
                            .dependencies()
                            .iter()
                            .map(Uuid::to_string)
                            .collect::<Vec<_>>(),
                    })
                }).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(0)
}

fn handle_check(path: &Path) -> Result<i32> {
    let (_, jobs) = open(path)?;
    let issues = jobs.check_dependency_order();
    if issues.is_empty() {
        println!("No dependency issues found");
        return Ok(0);
    }
    for issue in &issues {
        println!("  - {}", issue);
    }
    if let Some(order) = jobs.suggested_order() {
        println!("\nSuggested order:");
        for uuid in order {
            if let Some(job) = jobs.get(&uuid) {
                println!("  {}  {}", uuid, job.name());
            }
        }
    }
    Ok(1)
}

fn handle_unknown_files(path: &Path, output_dir: Option<PathBuf>, remove: bool) -> Result<i32> {
    let (mut project, jobs) = open(path)?;
    let mut backend = ProjectDataBackend::new();
    let mut runner = OutputJobRunner::new(&mut project, &mut backend);
    if let Some(dir) = output_dir {
        runner.set_output_directory(dir);
    }

    let files = runner.find_unknown_files(&jobs.uuids())?;
    if files.is_empty() {
        println!("No unknown files in {}", runner.output_directory().display());
        return Ok(0);
    }
    for file in &files {
        println!("  {}", file.display());
    }
    if remove {
        runner.remove_unknown_files(&files)?;
        println!("Removed {} file(s)", files.len());
    }
    Ok(0)
}

fn handle_defaults(path: &Path, force: bool) -> Result<i32> {
    let project = Project::load(path)
        .with_context(|| format!("Failed to open project {}", path.display()))?;
    let jobs_path = JobList::default_path(project.directory());
    if jobs_path.exists() && !force {
        bail!(
            "{} already exists, use --force to replace it",
            jobs_path.display()
        );
    }
    let jobs = JobList::defaults();
    jobs.save(&jobs_path)
        .with_context(|| format!("Failed to write {}", jobs_path.display()))?;
    println!("Created {} output job(s) in {}", jobs.len(), jobs_path.display());
    Ok(0)
}
