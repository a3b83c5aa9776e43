mod campaign;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::campaign::CampaignCommands;

#[derive(Debug, Parser)]
#[command(name = "leadpipe")]
#[command(about = "Campaign lead pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Run campaigns and inspect their results
    Campaign {
        #[command(subcommand)]
        command: CampaignCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("leadpipe: no command given; run with --help for usage");
        return Ok(());
    };

    let config = leadpipe_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = leadpipe_db::PoolConfig::from_app_config(&config);
    let pool = leadpipe_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                leadpipe_db::health_check(&pool).await?;
                println!("database ok");
            }
            DbCommands::Migrate => {
                let applied = leadpipe_db::run_migrations(&pool).await?;
                println!("applied {applied} migration(s)");
            }
        },
        Commands::Campaign { command } => campaign::dispatch(&pool, &config, command).await?,
    }

    Ok(())
}
