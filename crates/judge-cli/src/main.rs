//! kafka-judge - offline consistency judge for Kafka-ordered ledgers.
//!
//! Reads two block directories received from the same ordering service,
//! verifies each against the cluster's signed Merkle proofs, compares them,
//! and attributes any inconsistency to the log cluster, the orderer, or a
//! peer.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use judge_core::{verify_consistency, JudgeRequest};
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Judges whether two ledgers received from a Kafka-backed ordering service
/// are consistent, and names the culpable party when they are not.
#[derive(Parser, Debug)]
#[command(name = "kafka-judge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding the block files of the first ledger
    block_dir1: PathBuf,

    /// Directory holding the block files of the second ledger
    block_dir2: PathBuf,

    /// Label of the peer the first ledger was read from
    identity1: String,

    /// Label of the peer the second ledger was read from
    identity2: String,

    /// Path to the Kafka cluster's raw Ed25519 public key
    kafka_public_key: PathBuf,

    /// Maximum number of envelopes the orderer may batch into one block
    max_batch_size: usize,

    /// Preferred maximum block size in bytes
    preferred_max_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let request = JudgeRequest {
        block_dir1: cli.block_dir1,
        block_dir2: cli.block_dir2,
        identity1: cli.identity1,
        identity2: cli.identity2,
        kafka_public_key: cli.kafka_public_key,
        max_batch_size: cli.max_batch_size,
        preferred_max_bytes: cli.preferred_max_bytes,
    };

    let verdicts = verify_consistency(&request).context("unable to judge the given ledgers")?;
    if verdicts.is_empty() {
        return Ok(());
    }

    for verdict in &verdicts {
        error!("{verdict}");
    }
    bail!("inconsistency in blocks is ascertained, exiting");
}
