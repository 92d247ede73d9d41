//! Reading and unpacking of ledger block files.
//!
//! Every file in a ledger directory is the framed encoding of one [`Block`].
//! Any failure here is fatal: the judge cannot render an opinion on a ledger
//! it cannot read.

use std::path::{Path, PathBuf};

use prost::Message;
use thiserror::Error;

use crate::proto::{Block, Envelope, KafkaMetadata, Metadata};

/// Block metadata slot written by the ordering service.
pub const ORDERER_METADATA_INDEX: usize = 3;

/// Errors while reading or unpacking a ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A directory entry or block file could not be read.
    #[error("unable to read {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },

    /// A block file does not decode as a framed block.
    #[error("unable to parse block file {path}: {source}")]
    BlockDecode {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: prost::DecodeError,
    },

    /// A transaction datum does not decode as an envelope.
    #[error("block {block}: envelope {index} does not decode: {source}")]
    EnvelopeDecode {
        /// Index of the block within the ledger.
        block: usize,
        /// Index of the datum within the block.
        index: usize,
        /// Underlying decode error.
        #[source]
        source: prost::DecodeError,
    },

    /// A block has no orderer metadata slot.
    #[error("block {block} carries no orderer metadata slot")]
    MissingOrdererMetadata {
        /// Index of the block within the ledger.
        block: usize,
    },

    /// The orderer metadata slot does not decode.
    #[error("block {block}: orderer metadata does not decode: {source}")]
    MetadataDecode {
        /// Index of the block within the ledger.
        block: usize,
        /// Underlying decode error.
        #[source]
        source: prost::DecodeError,
    },

    /// The orderer metadata value does not decode as Kafka metadata.
    #[error("block {block}: kafka metadata does not decode: {source}")]
    KafkaMetadataDecode {
        /// Index of the block within the ledger.
        block: usize,
        /// Underlying decode error.
        #[source]
        source: prost::DecodeError,
    },
}

/// Reads every file of `dir` as a framed block, in file-name order.
///
/// Block files are named so that name ordering is block-height ordering;
/// sorting keeps the result independent of the host's directory enumeration.
///
/// # Errors
///
/// Returns a [`LedgerError`] when the directory or any file cannot be read,
/// or any file does not decode as a block.
pub fn read_blocks_from_dir(dir: &Path) -> Result<Vec<Block>, LedgerError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LedgerError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LedgerError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        paths.push(entry.path());
    }
    paths.sort();

    paths.iter().map(|path| read_block_file(path)).collect()
}

fn read_block_file(path: &Path) -> Result<Block, LedgerError> {
    let bytes = std::fs::read(path).map_err(|source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Block::decode(bytes.as_slice()).map_err(|source| LedgerError::BlockDecode {
        path: path.to_path_buf(),
        source,
    })
}

/// Unpacks parsed blocks into parallel per-block envelope lists and Kafka
/// metadata records.
///
/// # Errors
///
/// Returns a [`LedgerError`] when any envelope or metadata entry does not
/// decode, or a block lacks the orderer metadata slot.
#[allow(clippy::type_complexity)]
pub fn unpack_blocks(
    blocks: &[Block],
) -> Result<(Vec<Vec<Envelope>>, Vec<KafkaMetadata>), LedgerError> {
    let mut envelopes = Vec::with_capacity(blocks.len());
    let mut kafka_metadata = Vec::with_capacity(blocks.len());

    for (block_index, block) in blocks.iter().enumerate() {
        envelopes.push(envelopes_of_block(block, block_index)?);
        kafka_metadata.push(kafka_metadata_of_block(block, block_index)?);
    }

    Ok((envelopes, kafka_metadata))
}

fn envelopes_of_block(block: &Block, block_index: usize) -> Result<Vec<Envelope>, LedgerError> {
    let data = block.data.as_ref().map_or(&[][..], |data| &data.data);

    data.iter()
        .enumerate()
        .map(|(index, datum)| {
            Envelope::decode(datum.as_slice()).map_err(|source| LedgerError::EnvelopeDecode {
                block: block_index,
                index,
                source,
            })
        })
        .collect()
}

fn kafka_metadata_of_block(block: &Block, block_index: usize) -> Result<KafkaMetadata, LedgerError> {
    let slot = block
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.metadata.get(ORDERER_METADATA_INDEX))
        .ok_or(LedgerError::MissingOrdererMetadata { block: block_index })?;

    let metadata =
        Metadata::decode(slot.as_slice()).map_err(|source| LedgerError::MetadataDecode {
            block: block_index,
            source,
        })?;

    KafkaMetadata::decode(metadata.value.as_slice()).map_err(|source| {
        LedgerError::KafkaMetadataDecode {
            block: block_index,
            source,
        }
    })
}
