mod check;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "shelfwatch")]
#[command(about = "shelfwatch operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check one product URL now: fetch, extract, and ingest the result
    Check {
        /// Product page URL
        url: String,
    },
    /// Fetch and extract a URL without writing anything (dry run)
    Extract {
        /// Product page URL
        url: String,

        /// Print the full snapshot as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Run one check sweep over due tracked products
    Sweep,
    /// Run one notification delivery sweep
    Deliver,
    /// Database management commands
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Test the database connection
    Ping,
    /// Run pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { url } => check::run_check(&url).await,
        Commands::Extract { url, json } => check::run_extract(&url, json).await,
        Commands::Sweep => run_sweep().await,
        Commands::Deliver => run_deliver().await,
        Commands::Db { command } => match command {
            DbCommands::Ping => db_ping().await,
            DbCommands::Migrate => db_migrate().await,
        },
    }
}

async fn connect() -> anyhow::Result<(std::sync::Arc<shelfwatch_core::AppConfig>, sqlx::PgPool)> {
    let config = std::sync::Arc::new(shelfwatch_core::load_app_config()?);
    let pool_config = shelfwatch_db::PoolConfig::from_app_config(&config);
    let pool = shelfwatch_db::connect_pool(&config.database_url, pool_config).await?;
    Ok((config, pool))
}

async fn run_sweep() -> anyhow::Result<()> {
    let (config, pool) = connect().await?;
    let fetcher = shelfwatch_fetch::Fetcher::new(shelfwatch_fetch::FetchConfig::from_app_config(
        &config,
    ))?;
    let state = std::sync::Arc::new(shelfwatch_worker::state::WorkerState::new());

    shelfwatch_worker::sweep::run_check_sweep(&pool, &fetcher, &config, &state).await;
    println!("sweep complete; see scheduler_logs for the summary");
    Ok(())
}

async fn run_deliver() -> anyhow::Result<()> {
    let (config, pool) = connect().await?;
    let sink = shelfwatch_worker::email::EmailSink::from_app_config(&config)?;
    if !sink.is_configured() {
        anyhow::bail!("EMAIL_WEBHOOK_URL is not set; nothing can be delivered");
    }

    let stats = shelfwatch_worker::delivery::run_delivery_sweep(&pool, &sink).await;
    println!(
        "delivery complete: {} attempted, {} delivered, {} failed",
        stats.attempted, stats.delivered, stats.failed
    );
    Ok(())
}

async fn db_ping() -> anyhow::Result<()> {
    let (_config, pool) = connect().await?;
    shelfwatch_db::ping(&pool).await?;
    println!("database reachable");
    Ok(())
}

async fn db_migrate() -> anyhow::Result<()> {
    let (_config, pool) = connect().await?;
    let applied = shelfwatch_db::run_migrations(&pool).await?;
    println!("{applied} migration(s) applied");
    Ok(())
}
