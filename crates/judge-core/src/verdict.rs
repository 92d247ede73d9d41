//! Attribution verdicts rendered by the judge.
//!
//! A verdict names exactly one culpable party. The subject is a tagged
//! variant, so a cluster verdict cannot carry a peer identity and an
//! orderer or peer verdict cannot lack one.

use std::fmt;

use thiserror::Error;

/// The party a verdict is rendered against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VerdictSubject {
    /// The Kafka cluster, viewed as a single entity.
    KafkaCluster,

    /// The ordering service that forwarded blocks to the named peer.
    Orderer {
        /// Label of the peer whose ledger exposed the orderer.
        identity: String,
    },

    /// The peer that accepted the blocks.
    Peer {
        /// Label of the peer.
        identity: String,
    },
}

/// Errors refused at verdict construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerdictError {
    /// A verdict must carry a non-empty message.
    #[error("a verdict must carry a non-empty message")]
    EmptyMessage,

    /// An orderer or peer verdict must name the peer it concerns.
    #[error("an orderer or peer verdict must name the peer it concerns")]
    EmptyIdentity,
}

/// A structured attribution of one inconsistency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    subject: VerdictSubject,
    message: String,
}

impl Verdict {
    /// Constructs a validated verdict.
    ///
    /// # Errors
    ///
    /// Refuses an empty message, and an empty identity on non-cluster
    /// subjects.
    pub fn new(subject: VerdictSubject, message: impl Into<String>) -> Result<Self, VerdictError> {
        let message = message.into();
        if message.is_empty() {
            return Err(VerdictError::EmptyMessage);
        }
        match &subject {
            VerdictSubject::Orderer { identity } | VerdictSubject::Peer { identity }
                if identity.is_empty() =>
            {
                return Err(VerdictError::EmptyIdentity);
            },
            _ => {},
        }
        Ok(Self { subject, message })
    }

    /// Verdict against the Kafka cluster.
    ///
    /// # Errors
    ///
    /// Refuses an empty message.
    pub fn kafka_cluster(message: impl Into<String>) -> Result<Self, VerdictError> {
        Self::new(VerdictSubject::KafkaCluster, message)
    }

    /// Verdict against the orderer serving the named peer.
    ///
    /// # Errors
    ///
    /// Refuses an empty message or identity.
    pub fn orderer(
        identity: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, VerdictError> {
        Self::new(
            VerdictSubject::Orderer {
                identity: identity.into(),
            },
            message,
        )
    }

    /// Verdict against the named peer.
    ///
    /// # Errors
    ///
    /// Refuses an empty message or identity.
    pub fn peer(
        identity: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, VerdictError> {
        Self::new(
            VerdictSubject::Peer {
                identity: identity.into(),
            },
            message,
        )
    }

    /// The culpable party.
    #[must_use]
    pub const fn subject(&self) -> &VerdictSubject {
        &self.subject
    }

    /// Human-readable explanation.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            VerdictSubject::KafkaCluster => {
                write!(f, "VERDICT (KafkaCluster): {}", self.message)
            },
            VerdictSubject::Orderer { identity } => {
                write!(f, "VERDICT (Orderer of {identity}): {}", self.message)
            },
            VerdictSubject::Peer { identity } => {
                write!(f, "VERDICT ({identity}): {}", self.message)
            },
        }
    }
}
