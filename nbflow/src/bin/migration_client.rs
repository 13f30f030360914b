use anyhow::{anyhow, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use nbflow::database::SqliteStore;
use nbflow::{
    CommandSpec, HttpJobLauncher, JobLauncher, JobStatus, MigrationSession, Settings, Stage,
};

/// Submit one pipeline stage to the execution service and follow it to completion
#[derive(Parser, Debug)]
#[command(name = "migration-client", version)]
struct Args {
    /// Execution service base URL (overrides settings file and environment)
    #[arg(long)]
    service_url: Option<String>,

    /// Pipeline stage this run belongs to: schema, write-workload,
    /// load-execution, unload, read-workload, read-execution
    #[arg(long, default_value = "load-execution")]
    stage: String,

    /// Name for a newly started migration
    #[arg(long, default_value = "Migration")]
    name: String,

    /// Resume the last interrupted migration instead of starting a new one
    #[arg(long)]
    resume: bool,

    /// Program to execute on the service
    #[arg(long)]
    program: String,

    /// Arguments passed to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn parse_stage(name: &str) -> Result<Stage> {
    match name {
        "schema" => Ok(Stage::Schema),
        "write-workload" => Ok(Stage::WriteWorkload),
        "load-execution" => Ok(Stage::LoadExecution),
        "unload" => Ok(Stage::Unload),
        "read-workload" => Ok(Stage::ReadWorkload),
        "read-execution" => Ok(Stage::ReadExecution),
        other => Err(anyhow!("Unknown stage: {}", other)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let stage = parse_stage(&args.stage)?;

    let mut settings = Settings::load();
    if let Some(url) = args.service_url {
        settings.service_url = url;
    }

    let launcher = Arc::new(HttpJobLauncher::new(settings.service_url.clone()));
    if !launcher.health().await.unwrap_or(false) {
        return Err(anyhow!(
            "Execution service validation failed at {}",
            settings.service_url
        ));
    }
    println!("Execution service validation successful");

    let store = SqliteStore::new(nbflow::utils::default_db_path())?;
    let session = MigrationSession::new(launcher, Box::new(store), &settings);

    let workflow = if args.resume {
        match session.resume_last() {
            Some(instance) => {
                println!(
                    "Resuming migration '{}' at {}% progress",
                    instance.name, instance.progress
                );
                instance
            }
            None => {
                println!("Nothing to resume, starting a new migration");
                session
                    .start_workflow(args.name.clone(), "started from migration-client")
                    .ok_or_else(|| anyhow!("Could not start a new migration"))?
            }
        }
    } else {
        session
            .start_workflow(args.name.clone(), "started from migration-client")
            .ok_or_else(|| anyhow!("A migration is already in progress"))?
    };
    println!("Migration instance: {}", workflow.id);

    let spec = CommandSpec::new(args.program, args.args);
    println!("🚀 Submitting {} job", stage.label());
    let job = session.run_stage(stage, spec).await?;
    println!("Execution id: {}\n", job.id);

    // Follow the supervised job, printing stdout as it grows
    let mut printed = 0usize;
    let final_status = loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let Some(job) = session.tracker().get(&job.id) else {
            break JobStatus::Failed;
        };
        for line in &job.stdout[printed.min(job.stdout.len())..] {
            println!("{}", line);
        }
        printed = job.stdout.len();
        if !job.is_running() {
            for line in &job.stderr {
                eprintln!("{}", line);
            }
            break job.status;
        }
    };

    match final_status {
        JobStatus::Completed => {
            println!("\n✅ {} completed", stage.label());
            Ok(())
        }
        status => {
            println!("\n❌ {} ended with status {:?}", stage.label(), status);
            std::process::exit(1);
        }
    }
}
