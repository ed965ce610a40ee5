mod scrape;

use std::path::PathBuf;

use canasta_core::AppConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "canasta-cli")]
#[command(about = "Scrape Chilean supermarket listings into fixture JSON")]
struct Cli {
    /// Stores catalog (overrides `CANASTA_STORES_PATH`)
    #[arg(long, global = true)]
    stores: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the configured stores
    Stores,
    /// Scrape one or more stores, one browser session each
    Scrape {
        /// Store slugs to scrape, in order
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        slugs: Vec<String>,
        /// Scrape every configured store
        #[arg(long)]
        all: bool,
        /// Listing page to scrape instead of the configured `target_url`
        #[arg(long)]
        url: Option<Url>,
        /// Output file instead of `<output_dir>/<output_file>`
        #[arg(long)]
        output: Option<PathBuf>,
        /// Parse every price digit instead of the store's digit limit
        #[arg(long)]
        full_prices: bool,
        /// Print the fixture JSON instead of writing it
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = canasta_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    run(Cli::parse(), &config).await
}

async fn run(cli: Cli, config: &AppConfig) -> anyhow::Result<()> {
    let stores_path = cli.stores.unwrap_or_else(|| config.stores_path.clone());

    match cli.command {
        Some(Commands::Stores) => {
            let stores = canasta_core::load_stores(&stores_path)?;
            scrape::list_stores(&stores);
        }
        Some(Commands::Scrape {
            slugs,
            all,
            url,
            output,
            full_prices,
            dry_run,
        }) => {
            let stores = canasta_core::load_stores(&stores_path)?;
            let request = scrape::ScrapeRequest {
                slugs,
                all,
                url,
                output,
                full_prices,
                dry_run,
            };
            scrape::run_scrape(config, &stores, &request).await?;
        }
        None => println!("no command given; try `canasta-cli --help`"),
    }

    Ok(())
}
