//! Cross-ledger comparison of Kafka messages.
//!
//! Index-wise comparison is sound only because both ledgers already passed
//! per-ledger verification: their offsets are known to run 1, 2, 3, … so
//! equal flat indices mean equal sequence numbers.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::proto::{Envelope, KafkaMetadata};
use crate::verdict::{Verdict, VerdictError};
use crate::verifier::LedgerVerifier;

/// Flat view of one verified ledger: every envelope across all blocks in
/// traversal order, plus the per-block metadata.
struct UnwrappedLedger<'a> {
    envelopes: Vec<&'a Envelope>,
    metadata: &'a [KafkaMetadata],
    identity: &'a str,
}

impl<'a> UnwrappedLedger<'a> {
    fn from_verifier(verifier: &'a LedgerVerifier) -> Self {
        let count = verifier.envelopes().iter().map(Vec::len).sum();
        let mut envelopes = Vec::with_capacity(count);
        for batch in verifier.envelopes() {
            envelopes.extend(batch.iter());
        }
        Self {
            envelopes,
            metadata: verifier.kafka_metadata(),
            identity: verifier.identity(),
        }
    }
}

/// Compares two verified ledgers for log-cluster equivocation.
pub struct LedgerComparator<'a> {
    ledger1: UnwrappedLedger<'a>,
    ledger2: UnwrappedLedger<'a>,
}

impl<'a> LedgerComparator<'a> {
    /// Borrows two fully verified ledgers.
    #[must_use]
    pub fn new(verifier1: &'a LedgerVerifier, verifier2: &'a LedgerVerifier) -> Self {
        Self {
            ledger1: UnwrappedLedger::from_verifier(verifier1),
            ledger2: UnwrappedLedger::from_verifier(verifier2),
        }
    }

    /// Checks that the cluster never assigned one sequence number to two
    /// different messages: first envelope by envelope, then the time-to-cut
    /// records block by block.
    ///
    /// # Errors
    ///
    /// Returns a [`VerdictError`] when a verdict fails factory validation.
    ///
    /// # Panics
    ///
    /// Panics when exactly one ledger saw a time-to-cut message at some
    /// block. Under the per-ledger sequence guarantee that divergence would
    /// already have surfaced in the envelope comparison, so reaching it is a
    /// programmer error.
    pub fn compare_kafka_messages(&self) -> Result<Vec<Verdict>, VerdictError> {
        debug!(
            ledger1 = self.ledger1.identity,
            ledger2 = self.ledger2.identity,
            "comparing kafka messages"
        );

        // The envelope counts can differ when an orderer misbehaved; the
        // shared prefix still aligns by sequence number.
        let envelope_count = self.ledger1.envelopes.len().min(self.ledger2.envelopes.len());
        for i in 0..envelope_count {
            if envelope_digest(self.ledger1.envelopes[i]) != envelope_digest(self.ledger2.envelopes[i])
            {
                return Ok(vec![Verdict::kafka_cluster(
                    "Kafka signed two different messages with the same sequence number",
                )?]);
            }
        }

        let block_count = self.ledger1.metadata.len().min(self.ledger2.metadata.len());
        for block in 0..block_count {
            let metadata1 = &self.ledger1.metadata[block];
            let metadata2 = &self.ledger2.metadata[block];
            match (metadata1.received_ttc_message, metadata2.received_ttc_message) {
                (true, true) => {
                    let (Some(payload1), Some(payload2)) =
                        (metadata1.ttc_payload.as_ref(), metadata2.ttc_payload.as_ref())
                    else {
                        panic!("ttc flag set without payload despite per-ledger verification");
                    };
                    if sha256(&payload1.consumer_message_bytes)
                        != sha256(&payload2.consumer_message_bytes)
                    {
                        return Ok(vec![Verdict::kafka_cluster(
                            "Kafka signed two different ttc-messages with the same sequence \
                             number",
                        )?]);
                    }
                },
                (false, false) => {},
                _ => panic!(
                    "one ledger saw a ttc message at block {block} and the other did not; the \
                     envelope comparison must have caught this"
                ),
            }
        }

        Ok(Vec::new())
    }
}

fn envelope_digest(envelope: &Envelope) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(&envelope.payload);
    hasher.update(&envelope.signature);
    hasher.finalize().into()
}

fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}
