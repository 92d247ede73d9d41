//! Reconstruction of the byte strings the Kafka cluster signed.
//!
//! The cluster signs the payload of every consumer message: the big-endian
//! offset and timestamp followed by the marshalled [`KafkaMessage`]. The
//! orderer unwraps that message before embedding the envelope in a block, so
//! the judge has to rebuild the signed bytes from the unwrapped form. The
//! envelope is re-marshalled without the `kafka_payload` the orderer
//! attached, wrapped back into a regular [`KafkaMessage`], and prefixed with
//! offset and timestamp again. The output must be byte-identical to what the
//! orderer originally submitted.

use prost::Message;

use crate::proto::{kafka_message, Envelope, KafkaMessage, KafkaMessageRegular, KafkaPayload};

/// Rebuilds the signed input for an envelope that travelled through the
/// cluster. `payload` is the envelope's own `kafka_payload`.
#[must_use]
pub fn envelope_signed_input(envelope: &Envelope, payload: &KafkaPayload) -> Vec<u8> {
    let unwrapped = Envelope {
        payload: envelope.payload.clone(),
        signature: envelope.signature.clone(),
        kafka_payload: None,
    };

    let mirror = payload.kafka_regular_message.as_ref();
    let regular = KafkaMessageRegular {
        payload: unwrapped.encode_to_vec(),
        config_seq: mirror.map_or(0, |m| m.config_seq),
        class: mirror.map_or(0, |m| m.class),
        original_offset: mirror.map_or(0, |m| m.original_offset),
    };
    let message = KafkaMessage {
        r#type: Some(kafka_message::Type::Regular(regular)),
    };

    let mut signed = Vec::with_capacity(16 + message.encoded_len());
    signed.extend_from_slice(&payload.kafka_offset.to_be_bytes());
    signed.extend_from_slice(&payload.kafka_timestamp.to_be_bytes());
    signed.extend_from_slice(&message.encode_to_vec());
    signed
}

/// The signed input of a time-to-cut or connect record: the consumer message
/// itself, verbatim.
#[must_use]
pub fn metadata_signed_input(payload: &KafkaPayload) -> &[u8] {
    &payload.consumer_message_bytes
}
