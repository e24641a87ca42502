//! Command line interface definition

use clap::{Parser, Subcommand};
use curie_types::ProductKey;
use std::path::PathBuf;

/// curie - fetch and cache Curie product assets
#[derive(Parser)]
#[command(name = "curie")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch and cache Curie product assets")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the asset cache directory
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve product keys to local files, downloading any that are missing
    #[command(alias = "get")]
    Fetch {
        /// Product keys
        #[arg(required = true, value_parser = parse_key)]
        keys: Vec<ProductKey>,

        /// Retry transient failures this many times
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },

    /// Print the cached file for a product key without downloading
    Path {
        #[arg(value_parser = parse_key)]
        key: ProductKey,
    },

    /// List cached assets
    #[command(alias = "ls")]
    List,

    /// Delete a cached asset
    #[command(alias = "rm")]
    Remove {
        #[arg(value_parser = parse_key)]
        key: ProductKey,
    },

    /// Delete temporary files left by interrupted downloads
    Clean,
}

impl Commands {
    /// Whether the command may contact the asset API
    pub fn needs_network(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }
}

fn parse_key(raw: &str) -> Result<ProductKey, String> {
    ProductKey::new(raw).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fetch_parses_keys() {
        let cli = Cli::try_parse_from(["curie", "fetch", "abc", "def", "--retries", "2"]).unwrap();
        match cli.command {
            Commands::Fetch { keys, retries } => {
                assert_eq!(keys.len(), 2);
                assert_eq!(retries, 2);
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_unsafe_key_rejected() {
        assert!(Cli::try_parse_from(["curie", "path", "../secrets"]).is_err());
        assert!(Cli::try_parse_from(["curie", "fetch"]).is_err());
    }
}
