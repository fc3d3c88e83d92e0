//! fanout CLI: run shell commands with bounded parallelism.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use fanout::config::Config;
use fanout::executor::{ExecutionReport, Executor};
use fanout::model::Task;
use fanout::shell::run_command;
use fanout::telemetry::{TelemetryConfig, init_telemetry};

#[derive(Parser)]
#[command(name = "fanout", about = "Run independent jobs with bounded parallelism")]
struct Cli {
    /// Maximum jobs running at once (overrides FANOUT_MAX_PARALLEL)
    #[arg(long, short = 'j', global = true)]
    max_parallel: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run shell commands, given as arguments or as a named JSON map
    Run {
        /// JSON file mapping job name to command line
        #[arg(long)]
        jobs: Option<PathBuf>,
        /// Command lines to run, identified by position
        commands: Vec<String>,
    },
    /// Run one command per task record from a JSON array of tasks
    Tasks {
        /// JSON file holding an array of task records
        file: PathBuf,
        /// Command line run for each task; the task JSON is in FANOUT_PAYLOAD
        #[arg(long)]
        command: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        log_level: config.log_level.clone(),
        service_name: "fanout".to_string(),
    })?;

    let max_parallel = cli.max_parallel.unwrap_or(config.max_parallel);
    let executor = Executor::new(max_parallel)?;

    match cli.command {
        Command::Run { jobs, commands } => cmd_run(&executor, jobs, commands).await,
        Command::Tasks { file, command } => cmd_tasks(max_parallel, &file, command).await,
    }
}

async fn cmd_run(
    executor: &Executor,
    jobs: Option<PathBuf>,
    commands: Vec<String>,
) -> anyhow::Result<()> {
    let report = match jobs {
        Some(path) => {
            if !commands.is_empty() {
                anyhow::bail!("pass either --jobs or positional commands, not both");
            }
            let jobs = read_jobs(&path)?;
            executor
                .execute_keyed(jobs, |(name, command): (String, String)| async move {
                    run_command(&name, &command, None).await
                })
                .await?
        }
        None => {
            let jobs = commands.into_iter().enumerate().map(|(index, command)| {
                move || async move { run_command(&index.to_string(), &command, None).await }
            });
            executor.execute_all(jobs).await?
        }
    };

    print_summary(&report);
    report.into_result()?;
    Ok(())
}

async fn cmd_tasks(max_parallel: usize, file: &Path, command: String) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)?;
    let tasks: Vec<Task> = serde_json::from_str(&content)?;
    let tasks = Task::index_by_id(tasks);
    let total = tasks.len();

    fanout::run_tasks(
        tasks,
        move |task: Task| {
            let command = command.clone();
            async move {
                let payload = serde_json::to_string(&task)
                    .map_err(|e| fanout::Error::Other(format!("serialize task: {e}")))?;
                run_command(&task.id, &command, Some(&payload)).await
            }
        },
        max_parallel,
    )
    .await?;

    println!("{total} task(s) completed");
    Ok(())
}

/// Read `{ "name": "command", ... }`. Each value becomes the worker's input
/// together with its name.
fn read_jobs(path: &Path) -> anyhow::Result<BTreeMap<String, (String, String)>> {
    let content = std::fs::read_to_string(path)?;
    let jobs: BTreeMap<String, String> = serde_json::from_str(&content)?;
    Ok(jobs
        .into_iter()
        .map(|(name, command)| (name.clone(), (name, command)))
        .collect())
}

fn print_summary(report: &ExecutionReport) {
    let stats = &report.stats;
    println!(
        "{} job(s): {} succeeded, {} failed, peak {} running, {}ms",
        stats.dispatched,
        stats.succeeded,
        stats.failed,
        stats.peak_running,
        stats.elapsed.as_millis()
    );
    for failure in &report.failures {
        println!("  FAILED {failure}");
    }
}
