mod pipeline;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stintel-cli")]
#[command(about = "Startup intelligence pipeline command line interface")]
struct Cli {
    /// Keep everything in process memory instead of Postgres
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full pipeline once and print the run report
    Run {
        /// Look-back window in days (1-30)
        #[arg(long)]
        days_back: Option<u32>,
    },
    /// Collect and store only
    Collect {
        /// Look-back window in days (1-30)
        #[arg(long)]
        days_back: Option<u32>,
    },
    /// Print a stored briefing as JSON
    Briefing {
        /// Briefing date (YYYY-MM-DD); latest when omitted
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Normalize a saved model response into an analysis payload
    Extract {
        /// File holding the raw model text
        file: PathBuf,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("stintel-cli: no command given; try --help");
        return Ok(());
    };

    // extract never touches config or storage
    if let Commands::Extract { file } = &command {
        init_tracing("warn")?;
        return pipeline::run_extract(file);
    }

    let config = pipeline::load_config(cli.memory)?;
    init_tracing(&config.log_level)?;

    match command {
        Commands::Run { days_back } => {
            pipeline::run_pipeline(&config, cli.memory, stintel_core::RunType::Full, days_back).await
        }
        Commands::Collect { days_back } => {
            pipeline::run_pipeline(&config, cli.memory, stintel_core::RunType::CollectOnly, days_back)
                .await
        }
        Commands::Briefing { date } => pipeline::show_briefing(&config, cli.memory, date).await,
        Commands::Db { command } => {
            if cli.memory {
                anyhow::bail!("db commands need Postgres; drop --memory");
            }
            let pool = stintel_db::connect_pool(
                &config.database_url,
                stintel_db::PoolConfig::from_app_config(&config),
            )
            .await?;
            match command {
                DbCommands::Ping => {
                    stintel_db::health_check(&pool).await?;
                    println!("database: ok");
                }
                DbCommands::Migrate => {
                    let applied = stintel_db::run_migrations(&pool).await?;
                    println!("migrations applied: {applied}");
                }
            }
            Ok(())
        }
        Commands::Extract { .. } => Ok(()),
    }
}

fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests;
