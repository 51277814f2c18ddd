//! Validate every collection of a store snapshot against its indexes
//!
//! Exits with status 1 when any mismatch is found or any index fails.

use anyhow::{Context, Result};
use clap::Parser;
use docstore_validate::{init_logging, validate_store, SnapshotStore, ValidateConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "validate_store")]
#[command(about = "Cross-validate collections against their indexes")]
struct Cli {
    /// Snapshot file to validate
    #[arg(env = "VALIDATE_SNAPSHOT")]
    snapshot: PathBuf,
    /// Only validate this database
    #[arg(long, env = "VALIDATE_DATABASE")]
    database: Option<String>,
    /// Only validate collections with this name
    #[arg(long, env = "VALIDATE_COLLECTION")]
    collection: Option<String>,
    /// Stop at the first index that fails
    #[arg(long, env = "VALIDATE_FAIL_FAST")]
    fail_fast: bool,
    /// Print the report as JSON
    #[arg(long, env = "VALIDATE_JSON")]
    json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    eprintln!("🔍 Loading snapshot {}", cli.snapshot.display());
    let store = SnapshotStore::load(&cli.snapshot)?;

    let config = ValidateConfig {
        database: cli.database,
        collection: cli.collection,
        fail_fast: cli.fail_fast,
        ..Default::default()
    };
    let report = validate_store(&store, &config).context("Validation aborted")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        print!("{}", report);
    }

    if !report.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}
