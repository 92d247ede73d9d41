//! # judge-core
//!
//! Core library for `kafka-judge`, an offline forensic judge for a
//! permissioned blockchain whose ordering service is backed by a Kafka-like
//! sequenced log. Given two block ledgers independently received from the
//! ordering service, it decides whether an inconsistency can be conclusively
//! attributed to the log cluster, the orderer, or a peer, and says so as a
//! set of [`Verdict`]s.
//!
//! ## Pipeline
//!
//! - **Parsing**: [`ledger`] reads two block directories into envelopes and
//!   per-block Kafka metadata.
//! - **Per-ledger verification**: [`verifier`] checks every Merkle proof and
//!   cluster signature ([`proof`], with the signed bytes rebuilt by
//!   [`reconstruct`]), the sequence-number chain, and the orderer's
//!   block-cutting policy.
//! - **Cross-ledger comparison**: [`comparator`] detects the cluster signing
//!   two different messages under one sequence number.
//! - **Orchestration**: [`judge::verify_consistency`] runs the steps in
//!   order and stops at the first ascertained inconsistency.
//!
//! The judge is an offline auditor: it never talks to peers or the cluster,
//! persists nothing, and repairs nothing — it only attributes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod comparator;
pub mod judge;
pub mod keys;
pub mod ledger;
pub mod proof;
pub mod proto;
pub mod reconstruct;
pub mod verdict;
pub mod verifier;

pub use judge::{verify_consistency, JudgeError, JudgeRequest};
pub use verdict::{Verdict, VerdictSubject};
