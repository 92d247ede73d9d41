//! Wire schema for blocks, envelopes, and Kafka cluster records.
//!
//! These are hand-written prost messages with explicit field tags; the
//! encoding must stay producer-compatible because the signed-input
//! reconstruction re-marshals `Envelope` and `KafkaMessage` and compares the
//! result against cluster-signed Merkle leaves byte for byte. proto3
//! semantics apply throughout: scalar fields at their default value are
//! omitted from the encoding.

use prost::{Enumeration, Message};

/// One block of a ledger, as framed into a block file by the orderer.
#[derive(Clone, PartialEq, Message)]
pub struct Block {
    /// Block header carrying the height and chain hashes.
    #[prost(message, optional, tag = "1")]
    pub header: Option<BlockHeader>,

    /// Ordered list of raw transaction datums.
    #[prost(message, optional, tag = "2")]
    pub data: Option<BlockData>,

    /// Indexed metadata vector; slot [`ORDERER_METADATA_INDEX`] is the one
    /// the judge reads.
    ///
    /// [`ORDERER_METADATA_INDEX`]: crate::ledger::ORDERER_METADATA_INDEX
    #[prost(message, optional, tag = "3")]
    pub metadata: Option<BlockMetadata>,
}

/// Header of a [`Block`].
#[derive(Clone, PartialEq, Message)]
pub struct BlockHeader {
    /// Height of the block within its ledger.
    #[prost(uint64, tag = "1")]
    pub number: u64,

    /// Hash of the previous block header.
    #[prost(bytes = "vec", tag = "2")]
    pub previous_hash: Vec<u8>,

    /// Hash of this block's data.
    #[prost(bytes = "vec", tag = "3")]
    pub data_hash: Vec<u8>,
}

/// Raw transaction list of a [`Block`]; each datum decodes as an
/// [`Envelope`].
#[derive(Clone, PartialEq, Message)]
pub struct BlockData {
    /// Marshalled envelopes, in block order.
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub data: Vec<Vec<u8>>,
}

/// Metadata vector of a [`Block`], indexed by slot.
#[derive(Clone, PartialEq, Message)]
pub struct BlockMetadata {
    /// Marshalled [`Metadata`] entries.
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub metadata: Vec<Vec<u8>>,
}

/// Wrapper stored in each block metadata slot.
#[derive(Clone, PartialEq, Message)]
pub struct Metadata {
    /// Slot value; for the orderer slot this is a marshalled
    /// [`KafkaMetadata`].
    #[prost(bytes = "vec", tag = "1")]
    pub value: Vec<u8>,
}

/// A transaction carrier.
///
/// The submitting client produces `payload` and `signature`; the orderer
/// attaches `kafka_payload` when it unwraps the consumer message it read
/// from the cluster. Envelopes without a `kafka_payload` are genesis-like
/// entries that never travelled through the cluster.
#[derive(Clone, PartialEq, Message)]
pub struct Envelope {
    /// Opaque transaction payload.
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,

    /// Submitter's signature over the payload.
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,

    /// Cluster provenance attached by the orderer.
    #[prost(message, optional, tag = "3")]
    pub kafka_payload: Option<KafkaPayload>,
}

/// Provenance record for one consumer message read from the Kafka cluster.
///
/// The producer uses a single type for both places it appears: attached to an
/// [`Envelope`] (merkle proof, signature, offset, timestamp, and the regular
/// message mirror) and inside [`KafkaMetadata`] (where
/// `consumer_message_bytes` carries the raw signed message, its first eight
/// bytes being the big-endian sequence number).
#[derive(Clone, PartialEq, Message)]
pub struct KafkaPayload {
    /// Raw consumer message as signed by the cluster; empty on envelopes.
    #[prost(bytes = "vec", tag = "1")]
    pub consumer_message_bytes: Vec<u8>,

    /// Packed Merkle inclusion proof (see [`crate::proof::Proof`]).
    #[prost(bytes = "vec", tag = "2")]
    pub kafka_merkle_proof_header: Vec<u8>,

    /// Detached Ed25519 signature over the proof's root hash.
    #[prost(bytes = "vec", tag = "3")]
    pub kafka_signature_header: Vec<u8>,

    /// Sequence number the cluster assigned to this message.
    #[prost(int64, tag = "4")]
    pub kafka_offset: i64,

    /// Timestamp the cluster recorded for this message.
    #[prost(int64, tag = "5")]
    pub kafka_timestamp: i64,

    /// Mirror of the regular-message fields the orderer stripped when it
    /// unwrapped the consumer message.
    #[prost(message, optional, tag = "6")]
    pub kafka_regular_message: Option<KafkaRegularMessage>,
}

/// Regular-message fields preserved alongside an unwrapped envelope.
#[derive(Clone, PartialEq, Message)]
pub struct KafkaRegularMessage {
    /// Configuration sequence the message was validated against.
    #[prost(uint64, tag = "1")]
    pub config_seq: u64,

    /// Message class, see [`KafkaMessageClass`].
    #[prost(enumeration = "KafkaMessageClass", tag = "2")]
    pub class: i32,

    /// Offset of the first attempt when the message was resubmitted.
    #[prost(int64, tag = "3")]
    pub original_offset: i64,
}

/// Per-block cluster metadata written into the orderer metadata slot.
#[derive(Clone, PartialEq, Message)]
pub struct KafkaMetadata {
    /// Offset of the last consumer message the orderer persisted.
    #[prost(int64, tag = "1")]
    pub last_offset_persisted: i64,

    /// Last original offset the orderer processed for resubmissions.
    #[prost(int64, tag = "2")]
    pub last_original_offset_processed: i64,

    /// Last config offset the orderer resubmitted.
    #[prost(int64, tag = "3")]
    pub last_resubmitted_config_offset: i64,

    /// Whether a time-to-cut message triggered the cut of this block.
    #[prost(bool, tag = "4")]
    pub received_ttc_message: bool,

    /// Whether this block isolates a config message.
    #[prost(bool, tag = "5")]
    pub is_config_message: bool,

    /// Signed time-to-cut message, populated when `received_ttc_message`.
    #[prost(message, optional, tag = "6")]
    pub ttc_payload: Option<KafkaPayload>,

    /// Signed connect or time-to-cut messages the orderer consumed while
    /// assembling this block without them cutting it.
    #[prost(message, repeated, tag = "7")]
    pub connect_or_ttc_payload: Vec<KafkaPayload>,
}

/// The message type the cluster signs: what the orderer submitted to the
/// sequenced log.
#[derive(Clone, PartialEq, Message)]
pub struct KafkaMessage {
    /// Message variant.
    #[prost(oneof = "kafka_message::Type", tags = "1, 2, 3")]
    pub r#type: Option<kafka_message::Type>,
}

/// Variants of [`KafkaMessage`].
pub mod kafka_message {
    use prost::Oneof;

    /// Tagged variant of one submitted message.
    #[derive(Clone, PartialEq, Oneof)]
    pub enum Type {
        /// A transaction envelope in transit.
        #[prost(message, tag = "1")]
        Regular(super::KafkaMessageRegular),

        /// A time-to-cut instruction.
        #[prost(message, tag = "2")]
        TimeToCut(super::KafkaMessageTimeToCut),

        /// A connect probe posted when the orderer (re)joins the log.
        #[prost(message, tag = "3")]
        Connect(super::KafkaMessageConnect),
    }
}

/// A transaction envelope as submitted to the cluster.
#[derive(Clone, PartialEq, Message)]
pub struct KafkaMessageRegular {
    /// Marshalled [`Envelope`] in its transport form, before the orderer
    /// attached any [`KafkaPayload`].
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,

    /// Configuration sequence the message was validated against.
    #[prost(uint64, tag = "2")]
    pub config_seq: u64,

    /// Message class, see [`KafkaMessageClass`].
    #[prost(enumeration = "KafkaMessageClass", tag = "3")]
    pub class: i32,

    /// Offset of the first attempt when the message was resubmitted.
    #[prost(int64, tag = "4")]
    pub original_offset: i64,
}

/// A time-to-cut instruction for a pending block.
#[derive(Clone, PartialEq, Message)]
pub struct KafkaMessageTimeToCut {
    /// Height of the block the orderer is told to cut.
    #[prost(uint64, tag = "1")]
    pub block_number: u64,
}

/// A connect probe the orderer posts to the log.
#[derive(Clone, PartialEq, Message)]
pub struct KafkaMessageConnect {
    /// Opaque probe payload.
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,
}

/// Classification of a regular message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum KafkaMessageClass {
    /// Class could not be determined.
    Unknown = 0,
    /// An ordinary transaction.
    Normal = 1,
    /// A channel configuration transaction.
    Config = 2,
}
