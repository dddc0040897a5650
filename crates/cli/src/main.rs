use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tariff_cascade::{SecondarySource, WitsSource, WtoSource};
use tariff_cli::models::TariffRequest;
use tariff_cli::orchestrator::{resolve_tariff, Resolvers};
use tariff_system_store::FileSystemStore;
use tariff_vector_store::embedder_from_env;

#[derive(Parser)]
#[command(name = "tariff-finder")]
#[command(about = "Semantic tariff resolution with a multi-source fallback cascade", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Directory for index snapshots and the system store
    #[arg(long, global = true, default_value = ".tariff-finder")]
    data_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a tariff rate end-to-end
    Resolve {
        /// Natural-language product description
        #[arg(long)]
        product: String,

        /// Reporter country name (whose tariff schedule is queried)
        #[arg(long)]
        reporter: String,

        /// Partner country name
        #[arg(long)]
        partner: String,

        /// Target year
        #[arg(long)]
        year: i32,
    },
    /// Fetch reference catalogs and rebuild their indexes
    Refresh {
        #[arg(long, value_enum, default_value_t = CatalogArg::All)]
        catalog: CatalogArg,
    },
    /// Drop a catalog index and its schema
    Drop {
        #[arg(long, value_enum)]
        catalog: CatalogArg,
    },
}

#[derive(Copy, Clone, ValueEnum)]
enum CatalogArg {
    Product,
    Country,
    All,
}

impl CatalogArg {
    fn includes_product(self) -> bool {
        matches!(self, CatalogArg::Product | CatalogArg::All)
    }

    fn includes_country(self) -> bool {
        matches!(self, CatalogArg::Country | CatalogArg::All)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let system_store = Arc::new(
        FileSystemStore::open(cli.data_dir.join("system_store.json")).await?,
    );
    let embedder = embedder_from_env()?;
    let resolvers = Resolvers::open(&cli.data_dir, system_store, embedder)?;

    match cli.command {
        Commands::Resolve {
            product,
            reporter,
            partner,
            year,
        } => {
            let primary = WitsSource::new()?;
            let secondary = WtoSource::from_env()?;
            if secondary.is_none() {
                log::info!("TARIFF_WTO_API_KEY not set; secondary cross-reference disabled");
            }

            let request = TariffRequest {
                product,
                reporter,
                partner,
                year,
            };
            let answer = resolve_tariff(
                &resolvers,
                &primary,
                secondary.as_ref().map(|source| source as &dyn SecondarySource),
                &request,
            )
            .await?;

            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Commands::Refresh { catalog } => {
            if catalog.includes_product() {
                let count = resolvers.products.refresh().await?;
                log::info!("Product catalog ready ({count} records)");
            }
            if catalog.includes_country() {
                let count = resolvers.countries.refresh().await?;
                log::info!("Country catalog ready ({count} records)");
            }
        }
        Commands::Drop { catalog } => {
            if catalog.includes_product() {
                resolvers.products.drop_catalog().await?;
            }
            if catalog.includes_country() {
                resolvers.countries.drop_catalog().await?;
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();
}
