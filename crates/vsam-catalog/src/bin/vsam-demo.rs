//! Demo harness: loads a KSDS, erases one record and browses the rest.
//!
//! ```text
//! vsam-demo --records 10 --cluster DEMO.KSDS
//! RUST_LOG=debug vsam-demo --snapshot-dir /tmp/vsam
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use vsam_catalog::Catalog;
use vsam_core::{AccessMode, DatasetDefinition, ProcessingMode, Record};

#[derive(Parser, Debug)]
#[command(name = "vsam-demo", about = "Exercise an in-memory KSDS end to end")]
struct Args {
    /// Number of records to load
    #[arg(long, default_value_t = 10)]
    records: u32,

    /// Cluster name of the demo dataset
    #[arg(long, default_value = "DEMO.KSDS", env = "VSAM_CLUSTER")]
    cluster: String,

    /// Persist the dataset as a snapshot under this directory
    #[arg(long, env = "VSAM_SNAPSHOT_DIR")]
    snapshot_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.records > 0, "--records must be at least 1");

    let catalog = match &args.snapshot_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating snapshot directory {}", dir.display()))?;
            Catalog::with_root(dir)
        }
        None => Catalog::new(),
    };

    let definition = DatasetDefinition::ksds(args.cluster.as_str(), 8).with_ci_size(4096);
    let engine = catalog.define(definition)?;
    engine.open(AccessMode::InputOutput, ProcessingMode::Dynamic)?;

    let mut loaded = 0u32;
    for i in 1..=args.records {
        let key = format!("KEY{:05}", i);
        match engine.write(Record::new(key.as_str(), format!("record {}", i).into_bytes())) {
            Ok(_) => loaded += 1,
            Err(e) if e.kind() == vsam_core::ErrorKind::DuplicateKey => {}
            Err(e) => return Err(e.into()),
        }
    }
    info!(loaded, total = engine.record_count(), "records loaded");

    let middle = format!("KEY{:05}", args.records.div_ceil(2));
    let record = engine.read(middle.as_bytes())?;
    info!(key = %record.key(), address = %record.address(), "keyed read");

    if args.records >= 3 {
        let erased = engine.erase(b"KEY00003")?;
        info!(key = %erased.key(), remaining = engine.record_count(), "record erased");
    }

    let browse = engine.start_browse(b"KEY00001", true, false)?;
    let context = engine.browse_context(browse)?;
    if let (false, Some(start)) = (context.at_end(), context.current_key()) {
        println!("browse positioned on {}", start);
    }
    let mut browsed = 0u64;
    loop {
        match engine.read_next(browse) {
            Ok(record) => {
                browsed += 1;
                println!(
                    "{}  {}  {}",
                    record.key(),
                    record.address(),
                    String::from_utf8_lossy(record.data())
                );
            }
            Err(e) if e.is_end_of_data() => {
                info!(browsed, status = e.file_status(), "end of file");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    engine.end_browse(browse)?;

    let stats = engine.statistics();
    println!(
        "{}: {} records, {} operations, {:.1}% space used, avg io {:?}",
        engine.cluster_name(),
        engine.record_count(),
        stats.total_operations(),
        stats.space_utilization(),
        stats.average_io_time()
    );

    engine.close()?;
    Ok(())
}
