use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tars_app::commands::{run, workers};
use tars_app::config::AppConfig;
use tars_core::CancellationSignal;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tars", version, about = "Run a TARS worker on a task")]
struct Cli {
    /// Path to tars.yaml
    #[arg(long, global = true, default_value = "tars.yaml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one task to completion and print the outcome as JSON
    Run {
        /// Worker profile name (file stem in workers_dir)
        #[arg(long)]
        worker: String,

        /// Extra context appended to the task prompt
        #[arg(long)]
        context: Option<String>,

        task: String,
    },
    /// List worker profiles
    Workers,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Command::Run {
            worker,
            context,
            task,
        } => {
            let cancellation = CancellationSignal::new();
            let signal = cancellation.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() && signal.cancel() {
                    warn!("Interrupt received, stopping after the current round");
                }
            });

            let report =
                run::run(&config, &worker, &task, context.as_deref(), cancellation).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            std::process::exit(report.exit_code());
        }
        Command::Workers => {
            let entries = workers::list_workers(&config.workers_dir)?;
            println!("{}", workers::render(&entries));
        }
    }

    Ok(())
}
