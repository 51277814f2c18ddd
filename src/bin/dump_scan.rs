//! Print one scan of a collection from a store snapshot
//!
//! Without `--index` this is the natural-order collection scan; with it, the
//! merged index scan. Useful for inspecting what the validator sees.

use anyhow::{Context, Result};
use clap::Parser;
use docstore_validate::{
    init_logging, CollectionScan, DocumentStore, IndexScan, Namespace, ScanSource, SnapshotStore,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dump_scan")]
#[command(about = "Print a collection or index scan")]
struct Cli {
    /// Snapshot file to read
    #[arg(env = "VALIDATE_SNAPSHOT")]
    snapshot: PathBuf,
    /// Database name
    database: String,
    /// Collection name
    collection: String,
    /// Index name; scans the collection when omitted
    #[arg(long)]
    index: Option<String>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    let store = SnapshotStore::load(&cli.snapshot)?;
    let ns = Namespace::new(cli.database, cli.collection);

    let mut scan: Box<dyn ScanSource> = match &cli.index {
        None => Box::new(CollectionScan::open(&store, &ns)?),
        Some(name) => {
            let index = store
                .indexes(&ns)?
                .into_iter()
                .find(|index| &index.name == name)
                .with_context(|| format!("No index named '{}' on '{}'", name, ns))?;
            Box::new(IndexScan::open(&store, &ns, &index)?)
        }
    };

    let mut count = 0usize;
    while let Some(doc) = scan.next_document() {
        println!("{}", doc.render());
        count += 1;
    }
    let failure = scan.err().cloned();
    scan.close()?;
    if let Some(err) = failure {
        return Err(err).context(format!("Scan of '{}' failed after {} records", ns, count));
    }

    eprintln!("✅ {} records", count);
    Ok(())
}
