//! Merkle inclusion proofs signed by the Kafka cluster.
//!
//! The cluster batches consumer messages into a Merkle tree, signs the root,
//! and hands every message a packed proof header. This module decodes that
//! header, re-walks the tree from a leaf, and checks the detached Ed25519
//! signature over the root.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Fixed-size prefix of the packed proof layout: four big-endian `u32`
/// fields (hash length, proof set size, leaf index, leaf size).
const PROOF_HEADER_LEN: usize = 16;

/// The only hashing algorithm the judge can re-compute.
const SUPPORTED_HASH_ALG: &str = "SHA-256";

/// Errors of the proof codec.
#[derive(Debug, Error)]
pub enum ProofError {
    /// The packed buffer is shorter than its header implies, or the header
    /// fields are inconsistent.
    #[error("malformed merkle proof: {reason}")]
    Malformed {
        /// What made the buffer undecodable.
        reason: &'static str,
    },

    /// The proof names a hashing algorithm the judge cannot check.
    #[error("unsupported hashing algorithm {alg:?}")]
    UnsupportedHash {
        /// The algorithm tag carried by the proof.
        alg: String,
    },

    /// The detached cluster signature over the root hash does not verify.
    #[error("kafka cluster signature over the merkle root does not verify")]
    BadSignature,
}

/// Decoded Merkle inclusion proof for one consumer message.
///
/// Packed layout, all integers big-endian:
///
/// | offset           | field                          |
/// |------------------|--------------------------------|
/// | 0..4             | hash length `H`                |
/// | 4..8             | proof set size `S`             |
/// | 8..12            | leaf index                     |
/// | 12..16           | leaf size                      |
/// | 16..16+H         | root hash                      |
/// | 16+H..16+H*(S+1) | proof set, leaf-side first     |
/// | tail             | hash algorithm tag, raw ASCII  |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    root_hash: Vec<u8>,
    proof_set: Vec<Vec<u8>>,
    leaf_index: usize,
    leaf_size: usize,
    hash_alg: String,
}

impl Proof {
    /// Decodes a packed proof header.
    ///
    /// # Errors
    ///
    /// Returns [`ProofError::Malformed`] when the buffer is shorter than its
    /// header implies and [`ProofError::UnsupportedHash`] when the trailing
    /// algorithm tag is anything but `SHA-256` — such a proof cannot be
    /// checked, so decoding fails outright.
    pub fn from_bytes(encoded: &[u8]) -> Result<Self, ProofError> {
        if encoded.len() < PROOF_HEADER_LEN {
            return Err(ProofError::Malformed {
                reason: "buffer is shorter than the fixed header",
            });
        }

        let hash_len = read_u32(encoded, 0);
        let set_size = read_u32(encoded, 4);
        let leaf_index = read_u32(encoded, 8);
        let leaf_size = read_u32(encoded, 12);

        let hashes_len = hash_len
            .checked_mul(set_size.checked_add(1).ok_or(ProofError::Malformed {
                reason: "proof set size overflows",
            })?)
            .and_then(|len| len.checked_add(PROOF_HEADER_LEN))
            .ok_or(ProofError::Malformed {
                reason: "hash section length overflows",
            })?;
        if encoded.len() < hashes_len {
            return Err(ProofError::Malformed {
                reason: "buffer is shorter than its hash section",
            });
        }

        let root_hash = encoded[PROOF_HEADER_LEN..PROOF_HEADER_LEN + hash_len].to_vec();
        let proof_set = (0..set_size)
            .map(|i| {
                let start = PROOF_HEADER_LEN + hash_len * (i + 1);
                encoded[start..start + hash_len].to_vec()
            })
            .collect();

        let hash_alg = std::str::from_utf8(&encoded[hashes_len..])
            .map_err(|_| ProofError::Malformed {
                reason: "hash algorithm tag is not valid UTF-8",
            })?
            .to_string();
        if hash_alg != SUPPORTED_HASH_ALG {
            return Err(ProofError::UnsupportedHash { alg: hash_alg });
        }

        Ok(Self {
            root_hash,
            proof_set,
            leaf_index,
            leaf_size,
            hash_alg,
        })
    }

    /// Verifies that `leaf` is the message this proof commits to.
    ///
    /// Walks the tree bottom-up. At every level the running hash is combined
    /// on the right of its sibling when it is the last node of an odd level
    /// or sits at an odd index, on the left otherwise; a lone final node is
    /// carried up unpaired and consumes no sibling for that level. The walk
    /// succeeds when the final digest equals the root hash.
    #[must_use]
    pub fn verify_inclusion(&self, leaf: &[u8]) -> bool {
        let mut digest = sha256_concat(&[leaf]);
        let mut index = self.leaf_index;
        let mut level_size = self.leaf_size;

        for sibling in &self.proof_set {
            digest = if index + 1 == level_size || index % 2 == 1 {
                sha256_concat(&[sibling, &digest])
            } else {
                sha256_concat(&[&digest, sibling])
            };
            level_size = level_size.div_ceil(2);
            index /= 2;
        }

        digest[..] == self.root_hash[..]
    }

    /// Verifies the detached Ed25519 signature over the root hash.
    ///
    /// # Errors
    ///
    /// Returns [`ProofError::BadSignature`] when the signature bytes do not
    /// parse or do not verify under `public_key`.
    pub fn verify_root_signature(
        &self,
        sig_bytes: &[u8],
        public_key: &VerifyingKey,
    ) -> Result<(), ProofError> {
        let signature = Signature::from_slice(sig_bytes).map_err(|_| ProofError::BadSignature)?;
        public_key
            .verify(&self.root_hash, &signature)
            .map_err(|_| ProofError::BadSignature)
    }

    /// Root hash the cluster signed.
    #[must_use]
    pub fn root_hash(&self) -> &[u8] {
        &self.root_hash
    }

    /// Sibling hashes, leaf-side first.
    #[must_use]
    pub fn proof_set(&self) -> &[Vec<u8>] {
        &self.proof_set
    }

    /// Index of the proven leaf at the bottom level.
    #[must_use]
    pub const fn leaf_index(&self) -> usize {
        self.leaf_index
    }

    /// Leaf count of the tree.
    #[must_use]
    pub const fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Hashing algorithm tag; always `SHA-256` after a successful decode.
    #[must_use]
    pub fn hash_alg(&self) -> &str {
        &self.hash_alg
    }
}

fn read_u32(buf: &[u8], offset: usize) -> usize {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_be_bytes(raw) as usize
}

fn sha256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
