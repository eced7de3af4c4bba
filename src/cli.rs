use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::feed::API_URL;

#[derive(Parser, Debug)]
#[command(name = "carpark-sync")]
#[command(version, about = "Reconcile LTA mall carpark availability into SQLite")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the live feed from DataMall and reconcile it
    Sync {
        #[command(flatten)]
        feed: FeedArgs,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Reconcile a saved feed payload (JSON)
    Import {
        /// Payload file: `{"value": [...]}` or a bare array of records
        payload: PathBuf,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Export the current store state without reconciling
    Export {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// List all managed table names
    ListTables,
}

#[derive(Args, Debug)]
pub struct FeedArgs {
    /// DataMall account key
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Feed endpoint
    #[arg(long, env = "API_URL", default_value = API_URL)]
    pub api_url: String,
}

#[derive(Args, Debug)]
pub struct StoreArgs {
    /// SQLite database path
    #[arg(long, env = "OPS_DB")]
    pub db: Option<PathBuf>,

    /// Directory for CSV exports
    #[arg(long, env = "EXPORT_DIR")]
    pub export_dir: Option<PathBuf>,

    /// Export a CSV after each pass
    #[arg(
        long,
        env = "SAVE_CSV",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub save_csv: bool,
}

impl StoreArgs {
    pub fn resolve(&self) -> Result<StoreConfig> {
        StoreConfig::resolve(self.db.clone(), self.export_dir.clone(), self.save_csv)
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import() {
        let cli = Cli::try_parse_from([
            "carpark-sync",
            "import",
            "payload.json",
            "--db",
            "ops.sqlite",
            "--save-csv",
            "no",
        ])
        .unwrap();
        match cli.command {
            Commands::Import { payload, store } => {
                assert_eq!(payload, PathBuf::from("payload.json"));
                assert_eq!(store.db, Some(PathBuf::from("ops.sqlite")));
                assert!(!store.save_csv);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_sync_flags() {
        let cli = Cli::try_parse_from([
            "carpark-sync",
            "sync",
            "--api-key",
            "k",
            "--api-url",
            "http://localhost/feed",
        ])
        .unwrap();
        match cli.command {
            Commands::Sync { feed, .. } => {
                assert_eq!(feed.api_key.as_deref(), Some("k"));
                assert_eq!(feed.api_url, "http://localhost/feed");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_list_tables() {
        let cli = Cli::try_parse_from(["carpark-sync", "list-tables"]).unwrap();
        assert!(matches!(cli.command, Commands::ListTables));
    }
}
