//! Per-ledger verification: Kafka proofs, the sequence-number chain, and the
//! orderer's block-cutting policy.
//!
//! Proof and signature failures are attributed to the orderer for forwarding
//! a faulty block and, when the block is not the ledger's last, also to the
//! peer for accepting it: the protocol allows a peer to reject only the
//! final block and shut down, so an inconsistency surfacing earlier means
//! the peer kept going without reporting.

use ed25519_dalek::VerifyingKey;
use thiserror::Error;
use tracing::debug;

use crate::ledger::{self, LedgerError};
use crate::proof::{Proof, ProofError};
use crate::proto::{Block, Envelope, KafkaMetadata, KafkaPayload};
use crate::reconstruct;
use crate::verdict::{Verdict, VerdictError};

/// Errors of the per-ledger verifier. These mark unusable inputs, not
/// culpable parties; culpability is reported through [`Verdict`]s.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// A packed proof header could not be decoded or names an unknown
    /// algorithm.
    #[error(transparent)]
    Proof(#[from] ProofError),

    /// A verdict failed factory validation.
    #[error(transparent)]
    Verdict(#[from] VerdictError),

    /// The metadata flags a time-to-cut message but carries none.
    #[error("block {block} flags a ttc message but carries no ttc payload")]
    MissingTtcPayload {
        /// Index of the block within the ledger.
        block: usize,
    },

    /// A time-to-cut record is too short to carry its sequence number.
    #[error("block {block}: ttc consumer message is shorter than its 8-byte sequence number")]
    TruncatedTtcMessage {
        /// Index of the block within the ledger.
        block: usize,
    },

    /// A non-genesis block carries no envelopes.
    #[error("block {block} carries no envelopes")]
    EmptyBlock {
        /// Index of the block within the ledger.
        block: usize,
    },
}

/// Holds one unpacked ledger together with everything needed to verify it.
pub struct LedgerVerifier {
    envelopes: Vec<Vec<Envelope>>,
    kafka_metadata: Vec<KafkaMetadata>,
    identity: String,
    public_key: VerifyingKey,
    max_batch_size: usize,
    preferred_max_bytes: usize,
}

impl LedgerVerifier {
    /// Unpacks `blocks` and caches the cluster public key.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] when any block fails to unpack.
    pub fn new(
        blocks: &[Block],
        public_key: VerifyingKey,
        identity: impl Into<String>,
        max_batch_size: usize,
        preferred_max_bytes: usize,
    ) -> Result<Self, LedgerError> {
        let (envelopes, kafka_metadata) = ledger::unpack_blocks(blocks)?;
        Ok(Self {
            envelopes,
            kafka_metadata,
            identity: identity.into(),
            public_key,
            max_batch_size,
            preferred_max_bytes,
        })
    }

    /// Per-block envelope lists, in ledger order.
    #[must_use]
    pub fn envelopes(&self) -> &[Vec<Envelope>] {
        &self.envelopes
    }

    /// Per-block Kafka metadata, parallel to [`Self::envelopes`].
    #[must_use]
    pub fn kafka_metadata(&self) -> &[KafkaMetadata] {
        &self.kafka_metadata
    }

    /// Label of the peer this ledger was read from.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Verifies every Kafka Merkle proof and signature of the ledger, then
    /// checks that the cluster sequence numbers form the exact run 1, 2, 3, …
    ///
    /// Returns the verdicts for the first violation found, or an empty list.
    ///
    /// # Errors
    ///
    /// Returns a [`VerifierError`] when the inputs are unusable (malformed
    /// proof framing, unknown hash algorithm, truncated ttc records).
    pub fn verify_kafka_messages(&self) -> Result<Vec<Verdict>, VerifierError> {
        let last = self.kafka_metadata.len().saturating_sub(1);

        for (block, metadata) in self.kafka_metadata.iter().enumerate() {
            if let Some(payload) = metadata.ttc_payload.as_ref() {
                let verdicts = self.check_metadata_payload(payload, block == last)?;
                if !verdicts.is_empty() {
                    return Ok(verdicts);
                }
            }
            for payload in &metadata.connect_or_ttc_payload {
                let verdicts = self.check_metadata_payload(payload, block == last)?;
                if !verdicts.is_empty() {
                    return Ok(verdicts);
                }
            }
        }

        for (block, batch) in self.envelopes.iter().enumerate() {
            for envelope in batch {
                let verdicts = self.check_envelope(envelope, block == last)?;
                if !verdicts.is_empty() {
                    return Ok(verdicts);
                }
            }
        }

        self.verify_kafka_sequence()
    }

    /// Checks that the orderer followed the block-cutting policy.
    ///
    /// Genesis is exempt. Every other block must have been cut for one of
    /// the documented reasons: config isolation, a single oversized message,
    /// a received time-to-cut, a full batch, or the next envelope not
    /// fitting any more. The ledger's last block cannot be judged against a
    /// successor and is accepted.
    ///
    /// # Errors
    ///
    /// Returns a [`VerifierError`] when a non-genesis block has no envelopes
    /// to inspect.
    pub fn verify_block_cutting(&self) -> Result<Vec<Verdict>, VerifierError> {
        for block in 1..self.envelopes.len() {
            if self.kafka_metadata[block].is_config_message {
                // config messages are isolated
                continue;
            }

            let batch = &self.envelopes[block];
            let block_size: usize = batch.iter().map(envelope_size).sum();

            if block_size > self.preferred_max_bytes || batch.len() > self.max_batch_size {
                if batch.len() == 1 {
                    // a single oversized message is isolated as specified
                    continue;
                }
                return Ok(vec![Verdict::orderer(
                    &self.identity,
                    "Orderer cut the block too late",
                )?]);
            }

            if self.kafka_metadata[block].received_ttc_message
                || batch.len() == self.max_batch_size
            {
                // the ttc offset was already verified, so the cut stands
                continue;
            }

            if block == self.envelopes.len() - 1 {
                // nothing follows; whether the cut was premature is undecidable
                return Ok(Vec::new());
            }

            let next_first = self.envelopes[block + 1]
                .first()
                .ok_or(VerifierError::EmptyBlock { block: block + 1 })?;
            if block_size + envelope_size(next_first) > self.preferred_max_bytes {
                continue;
            }
            if self.kafka_metadata[block + 1].is_config_message {
                // an incoming config message flushes the pending block
                continue;
            }

            // the next envelope would still have fit
            return Ok(vec![Verdict::orderer(
                &self.identity,
                "Orderer cut the block too early",
            )?]);
        }

        Ok(Vec::new())
    }

    fn check_metadata_payload(
        &self,
        payload: &KafkaPayload,
        last_block: bool,
    ) -> Result<Vec<Verdict>, VerifierError> {
        let proof = Proof::from_bytes(&payload.kafka_merkle_proof_header)?;

        if !proof.verify_inclusion(reconstruct::metadata_signed_input(payload)) {
            let message = if last_block {
                "Orderer forwarded faulty block (merkle proof of metadata is invalid)"
            } else {
                "Peer should not have accepted faulty block (merkle proof of metadata is \
                 invalid). Furthermore, the orderer should not have forwarded this block in the \
                 first case"
            };
            return Ok(self.blame_forwarding(message, last_block)?);
        }

        if proof
            .verify_root_signature(&payload.kafka_signature_header, &self.public_key)
            .is_err()
        {
            let message = if last_block {
                "Orderer forwarded faulty block (metadata signature is invalid)"
            } else {
                "Peer should not have accepted faulty block (metadata signature is invalid). \
                 Furthermore, the orderer should not have forwarded this block in the first case"
            };
            return Ok(self.blame_forwarding(message, last_block)?);
        }

        Ok(Vec::new())
    }

    fn check_envelope(
        &self,
        envelope: &Envelope,
        last_block: bool,
    ) -> Result<Vec<Verdict>, VerifierError> {
        let Some(payload) = envelope.kafka_payload.as_ref() else {
            // genesis-like entry, never travelled through the cluster
            return Ok(Vec::new());
        };

        let proof = Proof::from_bytes(&payload.kafka_merkle_proof_header)?;
        let signed = reconstruct::envelope_signed_input(envelope, payload);

        if !proof.verify_inclusion(&signed) {
            let message = if last_block {
                "Orderer forwarded a transaction with an invalid merkle proof"
            } else {
                "Peer should have not accepted blocks containing an invalid Merkle Proof. \
                 Furthermore, the orderer should not have forwarded a transaction with an \
                 invalid merkle proof"
            };
            return Ok(self.blame_forwarding(message, last_block)?);
        }

        if proof
            .verify_root_signature(&payload.kafka_signature_header, &self.public_key)
            .is_err()
        {
            let message = if last_block {
                "Orderer forwarded a transaction with an invalid Kafka signature"
            } else {
                "Peer should have not accepted blocks containing an invalid Kafka signature. \
                 Furthermore, the orderer should not have forwarded a transaction with an \
                 invalid Kafka signature"
            };
            return Ok(self.blame_forwarding(message, last_block)?);
        }

        Ok(Vec::new())
    }

    fn verify_kafka_sequence(&self) -> Result<Vec<Verdict>, VerifierError> {
        let last = self.envelopes.len().saturating_sub(1);
        let mut expected: i64 = 1;

        for (block, batch) in self.envelopes.iter().enumerate() {
            for envelope in batch {
                if let Some(payload) = envelope.kafka_payload.as_ref() {
                    if payload.kafka_offset != expected {
                        debug!(
                            block,
                            expected,
                            found = payload.kafka_offset,
                            "kafka sequence number mismatch"
                        );
                        return Ok(self.blame_skipped(block == last)?);
                    }
                    expected += 1;
                }
            }

            if let Some(offset) = ttc_offset(&self.kafka_metadata[block], block)? {
                if offset != expected {
                    debug!(
                        block,
                        expected,
                        found = offset,
                        "ttc sequence number mismatch"
                    );
                    return Ok(self.blame_skipped(block == last)?);
                }
                expected += 1;
            }
        }

        Ok(Vec::new())
    }

    fn blame_forwarding(&self, message: &str, last_block: bool) -> Result<Vec<Verdict>, VerdictError> {
        let mut verdicts = vec![Verdict::orderer(&self.identity, message)?];
        if !last_block {
            verdicts.push(Verdict::peer(&self.identity, message)?);
        }
        Ok(verdicts)
    }

    fn blame_skipped(&self, last_block: bool) -> Result<Vec<Verdict>, VerdictError> {
        let mut verdicts = vec![Verdict::orderer(
            &self.identity,
            "Orderer skipped Kafka messages",
        )?];
        if !last_block {
            verdicts.push(Verdict::peer(
                &self.identity,
                "Peer accepted invalid block without reporting",
            )?);
        }
        Ok(verdicts)
    }
}

/// Wire size an envelope contributes to its block for the cut policy.
fn envelope_size(envelope: &Envelope) -> usize {
    let headers = envelope.kafka_payload.as_ref().map_or(0, |payload| {
        payload.kafka_merkle_proof_header.len() + payload.kafka_signature_header.len()
    });
    envelope.payload.len() + envelope.signature.len() + headers + 1
}

/// Sequence number a block's time-to-cut record contributes, if any: the
/// big-endian `i64` at the head of its consumer message.
fn ttc_offset(metadata: &KafkaMetadata, block: usize) -> Result<Option<i64>, VerifierError> {
    if !metadata.received_ttc_message {
        return Ok(None);
    }

    let payload = metadata
        .ttc_payload
        .as_ref()
        .ok_or(VerifierError::MissingTtcPayload { block })?;
    let Some(head) = payload.consumer_message_bytes.first_chunk::<8>() else {
        return Err(VerifierError::TruncatedTtcMessage { block });
    };
    Ok(Some(i64::from_be_bytes(*head)))
}
