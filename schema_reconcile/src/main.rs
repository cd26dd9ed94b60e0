//! schema_reconcile CLI

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use schema_reconcile::config::LoggingConfig;
use schema_reconcile::plan::script::render_script;
use schema_reconcile::utils::logging::init_logging;
use schema_reconcile::{ReconcileClient, Reconciliation, SchemaSnapshot};

#[derive(Parser)]
#[command(name = "schema_reconcile")]
#[command(about = "Reconcile a database schema against reference files")]
#[command(version)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "schema_reconcile.toml")]
    config: PathBuf,

    /// Log level used when the configuration has no [logging] section
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the repair plan without touching the database
    Plan {
        /// Diff against a snapshot file instead of a live connection
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Print the plan and findings as JSON
        #[arg(long)]
        json: bool,

        /// Also write the plan script into the output directory
        #[arg(long)]
        write: bool,
    },

    /// Plan and apply repairs over a live connection
    Apply,

    /// Exit non-zero when any drift is detected
    Check {
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Introspect the reference tables and save them as a snapshot file
    Snapshot {
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = schema_reconcile::config::load_from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let logging = config.logging.clone().or_else(|| {
        Some(LoggingConfig {
            level: cli.log_level.clone(),
            file: None,
            format: "text".to_string(),
            stdout: true,
        })
    });
    init_logging(&logging)?;

    let client = ReconcileClient::new(config)?;

    match cli.command {
        Commands::Plan {
            snapshot,
            json,
            write,
        } => {
            let reconciliation = reconcile(&client, snapshot).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reconciliation)?);
            } else {
                print!(
                    "{}",
                    render_script(
                        &reconciliation.plan,
                        &reconciliation.findings,
                        client.dialect(),
                        chrono::Utc::now()
                    )
                );
            }
            if write {
                let path = client.write_plan(&reconciliation)?;
                eprintln!("Plan written to {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Apply => {
            let reconciliation = client.sync_database().await?;
            for finding in &reconciliation.findings {
                eprintln!("unrepaired: {}", finding);
            }
            eprintln!(
                "Applied {} repair groups ({} statements)",
                reconciliation.plan.groups.len(),
                reconciliation.plan.statement_count()
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { snapshot } => {
            let reconciliation = reconcile(&client, snapshot).await?;
            if reconciliation.is_clean() {
                println!("Schema is in sync");
                return Ok(ExitCode::SUCCESS);
            }

            for group in &reconciliation.plan.groups {
                println!(
                    "repair: {} {}.{} ({})",
                    group.action, group.table_name, group.target_name, group.reason
                );
            }
            for finding in &reconciliation.findings {
                println!("finding: {}", finding);
            }
            Ok(ExitCode::from(1))
        }
        Commands::Snapshot { output } => {
            let connection = client.connect().await?;
            let snapshot = client.introspect(&connection).await?;
            snapshot.write_to(&output)?;
            eprintln!("Wrote {} tables to {}", snapshot.len(), output.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn reconcile(
    client: &ReconcileClient,
    snapshot: Option<PathBuf>,
) -> anyhow::Result<Reconciliation> {
    let snapshot = match snapshot {
        Some(path) => SchemaSnapshot::from_file(&path)
            .with_context(|| format!("reading snapshot {}", path.display()))?,
        None => {
            if client.config().database.url.is_none() {
                bail!(
                    "no database.url configured for {}; pass --snapshot to plan offline",
                    client.dialect()
                );
            }
            let connection = client.connect().await?;
            client.introspect(&connection).await?
        }
    };

    Ok(client.plan(&snapshot)?)
}
