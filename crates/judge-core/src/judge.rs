//! Top-level orchestration of one consistency judgement.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::comparator::LedgerComparator;
use crate::keys::{self, KeyError};
use crate::ledger::{self, LedgerError};
use crate::verdict::{Verdict, VerdictError};
use crate::verifier::{LedgerVerifier, VerifierError};

/// Inputs of one judgement run.
#[derive(Debug, Clone)]
pub struct JudgeRequest {
    /// Directory holding the block files of the first ledger.
    pub block_dir1: PathBuf,
    /// Directory holding the block files of the second ledger.
    pub block_dir2: PathBuf,
    /// Label of the peer the first ledger was read from.
    pub identity1: String,
    /// Label of the peer the second ledger was read from.
    pub identity2: String,
    /// Path to the cluster's raw Ed25519 public key.
    pub kafka_public_key: PathBuf,
    /// Maximum number of envelopes the orderer may batch into one block.
    pub max_batch_size: usize,
    /// Preferred maximum block size in bytes.
    pub preferred_max_bytes: usize,
}

/// Fatal errors of the judgement pipeline. These mean the inputs are
/// unusable; culpability is reported through [`Verdict`]s instead.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The cluster public key could not be loaded.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// A ledger could not be read or parsed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Verification hit unusable input.
    #[error(transparent)]
    Verifier(#[from] VerifierError),

    /// A verdict failed factory validation.
    #[error(transparent)]
    Verdict(#[from] VerdictError),
}

/// Judges the consistency of two ledgers.
///
/// Runs, in order: per-ledger verification of both ledgers (Merkle proofs,
/// cluster signatures, sequence numbers), the cross-ledger comparison, and
/// the block-cutting check on each ledger. The first step that finds a
/// violation decides the outcome; an empty result means no irregularity was
/// found.
///
/// # Errors
///
/// Returns a [`JudgeError`] when the inputs are unusable — unreadable
/// directories or key file, malformed blocks or proofs. Such failures carry
/// no blame.
pub fn verify_consistency(request: &JudgeRequest) -> Result<Vec<Verdict>, JudgeError> {
    info!("reading and parsing received blocks");
    let blocks1 = ledger::read_blocks_from_dir(&request.block_dir1)?;
    let blocks2 = ledger::read_blocks_from_dir(&request.block_dir2)?;
    let public_key = keys::load_verifying_key(&request.kafka_public_key)?;

    let verifier1 = LedgerVerifier::new(
        &blocks1,
        public_key,
        &request.identity1,
        request.max_batch_size,
        request.preferred_max_bytes,
    )?;
    let verifier2 = LedgerVerifier::new(
        &blocks2,
        public_key,
        &request.identity2,
        request.max_batch_size,
        request.preferred_max_bytes,
    )?;
    info!(
        blocks1 = blocks1.len(),
        blocks2 = blocks2.len(),
        "blocks parsed"
    );

    info!("verifying merkle proofs, kafka signatures, and sequence numbers of all kafka messages");
    let verdicts = verifier1.verify_kafka_messages()?;
    if !verdicts.is_empty() {
        return Ok(verdicts);
    }
    let verdicts = verifier2.verify_kafka_messages()?;
    if !verdicts.is_empty() {
        return Ok(verdicts);
    }

    info!("comparing kafka messages of both ledgers for reused sequence numbers");
    let comparator = LedgerComparator::new(&verifier1, &verifier2);
    let verdicts = comparator.compare_kafka_messages()?;
    if !verdicts.is_empty() {
        return Ok(verdicts);
    }

    info!("verifying that the orderer cut blocks according to the cutting policy");
    let verdicts = verifier1.verify_block_cutting()?;
    if !verdicts.is_empty() {
        return Ok(verdicts);
    }
    let verdicts = verifier2.verify_block_cutting()?;
    if !verdicts.is_empty() {
        return Ok(verdicts);
    }

    info!("no irregularity was found");
    Ok(Vec::new())
}
