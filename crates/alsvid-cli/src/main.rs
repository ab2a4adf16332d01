//! Alsvid Command-Line Interface
//!
//! Task runner for QPU resources leased to Slurm jobs. Inside a job the
//! activation hooks have already populated the `{name}_QRMI_*` environment,
//! so the commands here only need a resource name and type to construct the
//! matching vendor client.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{cancel, run, status, target, version};

/// Alsvid - task runner for QPU resources leased to Slurm jobs
#[derive(Parser)]
#[command(name = "alsvid")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task on a leased resource and wait for the result
    Run {
        /// Resource name, as configured at the site
        #[arg(short, long)]
        resource: String,

        /// Resource type (direct-access, qiskit-runtime-service, pasqal-cloud)
        #[arg(short = 't', long = "type")]
        resource_type: String,

        /// Input file (primitive input JSON, or a serialized pulse sequence)
        #[arg(short, long)]
        input: String,

        /// Primitive program for IBM resources (sampler, estimator)
        #[arg(long, default_value = "sampler")]
        program_id: String,

        /// Runs per job for Pasqal resources
        #[arg(long, default_value = "100")]
        job_runs: u32,

        /// Poll interval in seconds
        #[arg(long, default_value = "5")]
        poll_interval: u64,
    },

    /// Query the status of a task
    Status {
        /// Task ID
        task_id: String,

        /// Resource name, as configured at the site
        #[arg(short, long)]
        resource: String,

        /// Resource type (direct-access, qiskit-runtime-service, pasqal-cloud)
        #[arg(short = 't', long = "type")]
        resource_type: String,
    },

    /// Stop a queued or running task
    Cancel {
        /// Task ID
        task_id: String,

        /// Resource name, as configured at the site
        #[arg(short, long)]
        resource: String,

        /// Resource type (direct-access, qiskit-runtime-service, pasqal-cloud)
        #[arg(short = 't', long = "type")]
        resource_type: String,
    },

    /// Print the device target description as JSON
    Target {
        /// Resource name, as configured at the site
        #[arg(short, long)]
        resource: String,

        /// Resource type (direct-access, qiskit-runtime-service, pasqal-cloud)
        #[arg(short = 't', long = "type")]
        resource_type: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Run {
            resource,
            resource_type,
            input,
            program_id,
            job_runs,
            poll_interval,
        } => {
            run::execute(
                &resource,
                &resource_type,
                &input,
                &program_id,
                job_runs,
                poll_interval,
            )
            .await
        }

        Commands::Status {
            task_id,
            resource,
            resource_type,
        } => status::execute(&resource, &resource_type, &task_id).await,

        Commands::Cancel {
            task_id,
            resource,
            resource_type,
        } => cancel::execute(&resource, &resource_type, &task_id).await,

        Commands::Target {
            resource,
            resource_type,
        } => target::execute(&resource, &resource_type).await,

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
