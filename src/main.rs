use anyhow::{Context, Result};
use carpark_sync::{
    cli::{Cli, Commands, StoreArgs},
    config::{require_api_key, StoreConfig},
    export::CsvExporter,
    feed::{FeedClient, Fetch, PayloadFile},
    normalize::{Normalizer, Svy21, MALL_PREFIX},
    pass::Pipeline,
    schema::table_names,
    store::{JoinSnapshot, Reconciler, Store},
    Timestamp,
};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // stdout carries the JSON result; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Sync { feed, store } => {
            let api_key = require_api_key(feed.api_key.as_deref())?;
            let client = FeedClient::new(feed.api_url, api_key)?;
            run_pass(&store, &client)?;
        }

        Commands::Import { payload, store } => {
            run_pass(&store, &PayloadFile::new(payload))?;
        }

        Commands::Export { store } => {
            let config = store.resolve()?;
            let db = open_store(&config)?;
            let key = pipeline(&config, true)
                .export_only(&db, Timestamp::now())
                .context("Export failed")?;
            println!("{}", serde_json::json!({ "csv_key": key }));
            db.close()?;
        }

        Commands::ListTables => {
            println!("Managed tables:\n");
            for name in table_names() {
                println!("  {}", name);
            }
        }
    }

    Ok(())
}

fn run_pass(args: &StoreArgs, fetch: &dyn Fetch) -> Result<()> {
    // one timestamp for the whole pass, taken before fetching
    let now = Timestamp::now();
    let start = Instant::now();

    let config = args.resolve()?;
    let mut db = open_store(&config)?;
    let outcome = pipeline(&config, config.save_csv)
        .run(&mut db, fetch, now)
        .context("Pass failed")?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    tracing::info!(elapsed_secs = start.elapsed().as_secs_f64(), "done");
    db.close()?;
    Ok(())
}

fn open_store(config: &StoreConfig) -> Result<Store> {
    Store::open(&config.db_path)
        .with_context(|| format!("Failed to open store {:?}", config.db_path))
}

fn pipeline(config: &StoreConfig, export: bool) -> Pipeline<Svy21> {
    let pipeline = Pipeline::new(
        Normalizer::new(MALL_PREFIX, Svy21::new()),
        Reconciler::new(MALL_PREFIX),
        Box::new(JoinSnapshot),
    );
    if export {
        pipeline.with_exporter(Box::new(CsvExporter::new(&config.export_dir)))
    } else {
        pipeline
    }
}
