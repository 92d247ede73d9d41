//! End-to-end judgement scenarios over on-disk ledgers.
//!
//! Covers: the happy path over two identical valid ledgers, envelope and
//! time-to-cut equivocation, faulty proofs surfacing mid-ledger versus on
//! the final block, sequence-number gaps, and the fatal error channel for
//! unusable inputs.

mod common;

use common::{
    build_ledger, cluster_key, remove_envelope, tamper_proof_root, verifier_for, write_ledger,
    write_public_key, BlockSpec, MAX_BATCH_SIZE, PREFERRED_MAX_BYTES,
};
use judge_core::comparator::LedgerComparator;
use judge_core::judge::JudgeError;
use judge_core::{verify_consistency, JudgeRequest, VerdictSubject};
use tempfile::TempDir;

/// Four two-envelope blocks, each cut by a time-to-cut message so the
/// cutting policy holds everywhere.
fn plain_specs() -> Vec<BlockSpec> {
    (0..4)
        .map(|i| {
            BlockSpec::with_payloads(&[
                format!("tx-{i}-a").as_bytes(),
                format!("tx-{i}-b").as_bytes(),
            ])
            .ttc()
        })
        .collect()
}

fn request_for(dir1: &TempDir, dir2: &TempDir, key_dir: &TempDir) -> JudgeRequest {
    let key_path = key_dir.path().join("public.key");
    write_public_key(&key_path, &cluster_key());
    JudgeRequest {
        block_dir1: dir1.path().to_path_buf(),
        block_dir2: dir2.path().to_path_buf(),
        identity1: "peer0.org1".to_string(),
        identity2: "peer1.org1".to_string(),
        kafka_public_key: key_path,
        max_batch_size: MAX_BATCH_SIZE,
        preferred_max_bytes: PREFERRED_MAX_BYTES,
    }
}

#[test]
fn happy_path_finds_no_irregularity() {
    let blocks = build_ledger(&cluster_key(), &plain_specs());
    let (dir1, dir2, key_dir) = (TempDir::new().unwrap(), TempDir::new().unwrap(), TempDir::new().unwrap());
    write_ledger(dir1.path(), &blocks);
    write_ledger(dir2.path(), &blocks);

    let verdicts = verify_consistency(&request_for(&dir1, &dir2, &key_dir)).unwrap();
    assert!(verdicts.is_empty());
}

#[test]
fn envelope_equivocation_blames_the_cluster() {
    let specs1 = plain_specs();
    let mut specs2 = plain_specs();
    // Flat index 3 (genesis, then two envelopes of block 1, then this one)
    // diverges in payload bytes; both ledgers stay valid in isolation.
    specs2[1].payloads[0] = b"tx-1-a-forged".to_vec();

    let key = cluster_key();
    let (dir1, dir2, key_dir) = (TempDir::new().unwrap(), TempDir::new().unwrap(), TempDir::new().unwrap());
    write_ledger(dir1.path(), &build_ledger(&key, &specs1));
    write_ledger(dir2.path(), &build_ledger(&key, &specs2));

    let verdicts = verify_consistency(&request_for(&dir1, &dir2, &key_dir)).unwrap();
    assert_eq!(verdicts.len(), 1);
    assert_eq!(verdicts[0].subject(), &VerdictSubject::KafkaCluster);
    assert_eq!(
        verdicts[0].message(),
        "Kafka signed two different messages with the same sequence number"
    );
}

#[test]
fn faulty_proof_mid_ledger_blames_orderer_and_peer() {
    let key = cluster_key();
    let mut blocks = build_ledger(&key, &plain_specs());
    tamper_proof_root(&mut blocks[2], 0);

    let valid = build_ledger(&key, &plain_specs());
    let (dir1, dir2, key_dir) = (TempDir::new().unwrap(), TempDir::new().unwrap(), TempDir::new().unwrap());
    write_ledger(dir1.path(), &blocks);
    write_ledger(dir2.path(), &valid);

    let verdicts = verify_consistency(&request_for(&dir1, &dir2, &key_dir)).unwrap();
    assert_eq!(verdicts.len(), 2);
    assert_eq!(
        verdicts[0].subject(),
        &VerdictSubject::Orderer {
            identity: "peer0.org1".to_string()
        }
    );
    assert_eq!(
        verdicts[1].subject(),
        &VerdictSubject::Peer {
            identity: "peer0.org1".to_string()
        }
    );
}

#[test]
fn faulty_proof_on_final_block_exonerates_the_peer() {
    let key = cluster_key();
    let mut blocks = build_ledger(&key, &plain_specs());
    let last = blocks.len() - 1;
    tamper_proof_root(&mut blocks[last], 0);

    let valid = build_ledger(&key, &plain_specs());
    let (dir1, dir2, key_dir) = (TempDir::new().unwrap(), TempDir::new().unwrap(), TempDir::new().unwrap());
    write_ledger(dir1.path(), &blocks);
    write_ledger(dir2.path(), &valid);

    let verdicts = verify_consistency(&request_for(&dir1, &dir2, &key_dir)).unwrap();
    assert_eq!(verdicts.len(), 1);
    assert_eq!(
        verdicts[0].subject(),
        &VerdictSubject::Orderer {
            identity: "peer0.org1".to_string()
        }
    );
}

#[test]
fn sequence_gap_mid_ledger_blames_orderer_and_peer() {
    let key = cluster_key();
    let mut blocks = build_ledger(&key, &plain_specs());
    remove_envelope(&mut blocks[2], 1);

    let verifier = verifier_for(&blocks, "peer0.org1", MAX_BATCH_SIZE, PREFERRED_MAX_BYTES);
    let verdicts = verifier.verify_kafka_messages().unwrap();

    assert_eq!(verdicts.len(), 2);
    assert_eq!(verdicts[0].message(), "Orderer skipped Kafka messages");
    assert_eq!(
        verdicts[1].message(),
        "Peer accepted invalid block without reporting"
    );
}

#[test]
fn sequence_gap_on_final_block_exonerates_the_peer() {
    let key = cluster_key();
    let mut blocks = build_ledger(&key, &plain_specs());
    let last = blocks.len() - 1;
    remove_envelope(&mut blocks[last], 0);

    let verifier = verifier_for(&blocks, "peer0.org1", MAX_BATCH_SIZE, PREFERRED_MAX_BYTES);
    let verdicts = verifier.verify_kafka_messages().unwrap();

    assert_eq!(verdicts.len(), 1);
    assert_eq!(verdicts[0].message(), "Orderer skipped Kafka messages");
}

#[test]
fn ttc_equivocation_blames_the_cluster() {
    let key = cluster_key();
    let specs1 = plain_specs();
    let mut specs2 = plain_specs();
    specs2[2] = specs2[2].clone().ttc_body(b"ttc-forged");

    let blocks1 = build_ledger(&key, &specs1);
    let blocks2 = build_ledger(&key, &specs2);
    let verifier1 = verifier_for(&blocks1, "peer0.org1", MAX_BATCH_SIZE, PREFERRED_MAX_BYTES);
    let verifier2 = verifier_for(&blocks2, "peer1.org1", MAX_BATCH_SIZE, PREFERRED_MAX_BYTES);
    assert!(verifier1.verify_kafka_messages().unwrap().is_empty());
    assert!(verifier2.verify_kafka_messages().unwrap().is_empty());

    let comparator = LedgerComparator::new(&verifier1, &verifier2);
    let verdicts = comparator.compare_kafka_messages().unwrap();

    assert_eq!(verdicts.len(), 1);
    assert_eq!(verdicts[0].subject(), &VerdictSubject::KafkaCluster);
    assert_eq!(
        verdicts[0].message(),
        "Kafka signed two different ttc-messages with the same sequence number"
    );
}

#[test]
#[should_panic(expected = "one ledger saw a ttc message")]
fn lone_ttc_sighting_is_a_programmer_error() {
    let key = cluster_key();
    let with_ttc = build_ledger(&key, &[BlockSpec::with_payloads(&[b"tx-a", b"tx-b"]).ttc()]);
    let without_ttc = build_ledger(&key, &[BlockSpec::with_payloads(&[b"tx-a", b"tx-b"])]);

    let verifier1 = verifier_for(&with_ttc, "peer0.org1", MAX_BATCH_SIZE, PREFERRED_MAX_BYTES);
    let verifier2 = verifier_for(&without_ttc, "peer1.org1", MAX_BATCH_SIZE, PREFERRED_MAX_BYTES);
    assert!(verifier1.verify_kafka_messages().unwrap().is_empty());
    assert!(verifier2.verify_kafka_messages().unwrap().is_empty());

    let comparator = LedgerComparator::new(&verifier1, &verifier2);
    let _ = comparator.compare_kafka_messages();
}

#[test]
fn unreadable_key_file_is_fatal_not_a_verdict() {
    let blocks = build_ledger(&cluster_key(), &plain_specs());
    let (dir1, dir2, key_dir) = (TempDir::new().unwrap(), TempDir::new().unwrap(), TempDir::new().unwrap());
    write_ledger(dir1.path(), &blocks);
    write_ledger(dir2.path(), &blocks);

    let mut request = request_for(&dir1, &dir2, &key_dir);
    request.kafka_public_key = key_dir.path().join("missing.key");

    assert!(matches!(
        verify_consistency(&request),
        Err(JudgeError::Key(_))
    ));
}

#[test]
fn garbage_block_file_is_fatal_not_a_verdict() {
    let blocks = build_ledger(&cluster_key(), &plain_specs());
    let (dir1, dir2, key_dir) = (TempDir::new().unwrap(), TempDir::new().unwrap(), TempDir::new().unwrap());
    write_ledger(dir1.path(), &blocks);
    write_ledger(dir2.path(), &blocks);
    std::fs::write(dir1.path().join("block_001.pb"), b"\xFF\xFF\xFF\xFF").unwrap();

    assert!(matches!(
        verify_consistency(&request_for(&dir1, &dir2, &key_dir)),
        Err(JudgeError::Ledger(_))
    ));
}
