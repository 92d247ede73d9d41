//! Ledger fixture builder for the judgement scenario tests.
//!
//! Builds ledgers the way the producer does: every consumer message gets a
//! Merkle proof over its signed bytes and a detached Ed25519 signature over
//! the root, offsets are assigned 1, 2, 3, … across envelopes and
//! time-to-cut records, and each block file is the framed encoding of one
//! block. Tests perturb the result to provoke verdicts.

#![allow(dead_code)]

use std::path::Path;

use ed25519_dalek::{Signer, SigningKey};
use judge_core::proto::{
    Block, BlockData, BlockHeader, BlockMetadata, Envelope, KafkaMessageClass, KafkaMetadata,
    KafkaPayload, KafkaRegularMessage, Metadata,
};
use judge_core::reconstruct;
use judge_core::verifier::LedgerVerifier;
use prost::Message;
use sha2::{Digest, Sha256};

/// Batch limit used by the plain scenarios.
pub const MAX_BATCH_SIZE: usize = 10;

/// Size limit used by the plain scenarios.
pub const PREFERRED_MAX_BYTES: usize = 512_000;

/// Metadata slot index the orderer writes.
const ORDERER_SLOT: usize = 3;

/// Deterministic cluster signing key shared by all fixtures.
pub fn cluster_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

/// Shape of one non-genesis block.
#[derive(Clone)]
pub struct BlockSpec {
    /// Envelope payloads, one envelope per entry.
    pub payloads: Vec<Vec<u8>>,
    /// Whether a time-to-cut message cut this block.
    pub ttc: bool,
    /// Body appended to the time-to-cut record after its sequence number.
    pub ttc_body: Vec<u8>,
    /// Whether this block isolates a config message.
    pub config: bool,
}

impl BlockSpec {
    /// Block of envelopes with the given payloads.
    pub fn with_payloads<P: AsRef<[u8]>>(payloads: &[P]) -> Self {
        Self {
            payloads: payloads.iter().map(|p| p.as_ref().to_vec()).collect(),
            ttc: false,
            ttc_body: b"ttc".to_vec(),
            config: false,
        }
    }

    /// Block of envelopes with constant-fill payloads of the given sizes.
    pub fn with_sizes(sizes: &[usize]) -> Self {
        Self {
            payloads: sizes.iter().map(|&len| vec![0x5A; len]).collect(),
            ttc: false,
            ttc_body: b"ttc".to_vec(),
            config: false,
        }
    }

    /// Marks the block as cut by a time-to-cut message.
    #[must_use]
    pub fn ttc(mut self) -> Self {
        self.ttc = true;
        self
    }

    /// Overrides the time-to-cut record body.
    #[must_use]
    pub fn ttc_body(mut self, body: &[u8]) -> Self {
        self.ttc_body = body.to_vec();
        self
    }

    /// Marks the block as a config isolation block.
    #[must_use]
    pub fn config(mut self) -> Self {
        self.config = true;
        self
    }
}

/// Builds a genesis block followed by one block per spec, assigning cluster
/// offsets sequentially.
pub fn build_ledger(key: &SigningKey, specs: &[BlockSpec]) -> Vec<Block> {
    let mut blocks = vec![genesis_block()];
    let mut next_offset: i64 = 1;

    for spec in specs {
        let mut envelopes = Vec::with_capacity(spec.payloads.len());
        for payload in &spec.payloads {
            envelopes.push(signed_envelope(key, payload, next_offset));
            next_offset += 1;
        }

        let mut metadata = KafkaMetadata {
            is_config_message: spec.config,
            ..Default::default()
        };
        if spec.ttc {
            metadata.received_ttc_message = true;
            metadata.ttc_payload = Some(ttc_payload(key, next_offset, &spec.ttc_body));
            next_offset += 1;
        }
        metadata.last_offset_persisted = next_offset - 1;

        blocks.push(assemble_block(blocks.len() as u64, envelopes, metadata));
    }

    blocks
}

/// Genesis block: one envelope that never travelled through the cluster.
pub fn genesis_block() -> Block {
    assemble_block(
        0,
        vec![Envelope {
            payload: b"genesis-config".to_vec(),
            signature: b"genesis-sig".to_vec(),
            kafka_payload: None,
        }],
        KafkaMetadata::default(),
    )
}

/// Builds a verifier over `blocks` with the shared cluster key.
pub fn verifier_for(
    blocks: &[Block],
    identity: &str,
    max_batch_size: usize,
    preferred_max_bytes: usize,
) -> LedgerVerifier {
    LedgerVerifier::new(
        blocks,
        cluster_key().verifying_key(),
        identity,
        max_batch_size,
        preferred_max_bytes,
    )
    .unwrap()
}

/// Writes one framed block file per block, named in height order.
pub fn write_ledger(dir: &Path, blocks: &[Block]) {
    for (height, block) in blocks.iter().enumerate() {
        std::fs::write(
            dir.join(format!("block_{height:03}.pb")),
            block.encode_to_vec(),
        )
        .unwrap();
    }
}

/// Writes the cluster's raw public key.
pub fn write_public_key(path: &Path, key: &SigningKey) {
    std::fs::write(path, key.verifying_key().as_bytes()).unwrap();
}

/// Flips a byte inside the Merkle root of the given envelope's proof header.
pub fn tamper_proof_root(block: &mut Block, envelope_index: usize) {
    let datum = &mut block.data.as_mut().unwrap().data[envelope_index];
    let mut envelope = Envelope::decode(datum.as_slice()).unwrap();
    // Root hash starts right after the 16-byte fixed header.
    envelope.kafka_payload.as_mut().unwrap().kafka_merkle_proof_header[16] ^= 0x01;
    *datum = envelope.encode_to_vec();
}

/// Drops one envelope, leaving a gap in the sequence-number chain.
pub fn remove_envelope(block: &mut Block, envelope_index: usize) {
    block.data.as_mut().unwrap().data.remove(envelope_index);
}

fn signed_envelope(key: &SigningKey, payload: &[u8], offset: i64) -> Envelope {
    let mut envelope = Envelope {
        payload: payload.to_vec(),
        signature: vec![0x01, 0x02, 0x03, 0x04],
        kafka_payload: None,
    };

    let kafka_payload = KafkaPayload {
        kafka_offset: offset,
        kafka_timestamp: 1_500_000_000 + offset,
        kafka_regular_message: Some(KafkaRegularMessage {
            config_seq: 0,
            class: KafkaMessageClass::Normal as i32,
            original_offset: 0,
        }),
        ..Default::default()
    };

    let signed = reconstruct::envelope_signed_input(&envelope, &kafka_payload);
    let (header, signature) = single_leaf_proof(key, &signed);
    envelope.kafka_payload = Some(KafkaPayload {
        kafka_merkle_proof_header: header,
        kafka_signature_header: signature,
        ..kafka_payload
    });
    envelope
}

fn ttc_payload(key: &SigningKey, offset: i64, body: &[u8]) -> KafkaPayload {
    let mut bytes = offset.to_be_bytes().to_vec();
    bytes.extend_from_slice(body);
    let (header, signature) = single_leaf_proof(key, &bytes);
    KafkaPayload {
        consumer_message_bytes: bytes,
        kafka_merkle_proof_header: header,
        kafka_signature_header: signature,
        ..Default::default()
    }
}

/// Packs a one-leaf Merkle proof over `leaf` and signs its root.
fn single_leaf_proof(key: &SigningKey, leaf: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let root: [u8; 32] = Sha256::digest(leaf).into();

    let mut header = Vec::new();
    header.extend_from_slice(&32u32.to_be_bytes());
    header.extend_from_slice(&0u32.to_be_bytes());
    header.extend_from_slice(&0u32.to_be_bytes());
    header.extend_from_slice(&1u32.to_be_bytes());
    header.extend_from_slice(&root);
    header.extend_from_slice(b"SHA-256");

    (header, key.sign(&root).to_bytes().to_vec())
}

fn assemble_block(number: u64, envelopes: Vec<Envelope>, metadata: KafkaMetadata) -> Block {
    let data = envelopes.iter().map(Message::encode_to_vec).collect();

    let wrapped = Metadata {
        value: metadata.encode_to_vec(),
    };
    let mut slots = vec![Vec::new(); ORDERER_SLOT + 1];
    slots[ORDERER_SLOT] = wrapped.encode_to_vec();

    Block {
        header: Some(BlockHeader {
            number,
            ..Default::default()
        }),
        data: Some(BlockData { data }),
        metadata: Some(BlockMetadata { metadata: slots }),
    }
}
