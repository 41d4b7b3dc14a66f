//! Range-proof client sessions.
//!
//! This crate runs the client side of the authenticated range-proof
//! protocol over any reliable byte stream: length-prefixed framing, the
//! protobuf wire contract, a framed channel with a background reader, and
//! the lockstep session state machine on top.

use srp_lib::SrpError;

pub mod config;
pub mod framing;
pub mod session;
pub mod transport;
pub mod wire;

pub use config::{ClientConfig, ClientIdentity, ConfigError};
pub use framing::{encode_frame, FrameDecoder, FramingError};
pub use session::{
    ClientSession, ProofPlan, RoundFailurePolicy, RoundOutcome, SessionOptions, SessionReport,
    SessionState,
};
pub use transport::{connect, Delivery, FramedChannel};
pub use wire::{Envelope, MessageType};

/// Abstraction for a channel carrying protocol envelopes.
///
/// [`FramedChannel`] implements it over a byte stream; tests can substitute
/// an in-memory pair.
#[async_trait::async_trait]
pub trait MessageChannel: Send {
    /// Send one envelope.
    async fn send(&mut self, envelope: Envelope) -> Result<()>;
    /// Receive the next envelope. End of stream is [`InteractiveError::Disconnected`].
    async fn recv(&mut self) -> Result<Envelope>;
    /// Stop sending; the peer observes end of stream.
    async fn close(&mut self) -> Result<()>;
}

/// Result type for interactive operations.
pub type Result<T> = std::result::Result<T, InteractiveError>;

#[derive(thiserror::Error, Debug)]
pub enum InteractiveError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
    #[error("protocol sequence error: {0}")]
    ProtocolSequence(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Proof(#[from] SrpError),
    #[error("peer closed the connection")]
    Disconnected,
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}

impl From<prost::DecodeError> for InteractiveError {
    fn from(e: prost::DecodeError) -> Self {
        InteractiveError::Serialization(e.to_string())
    }
}

impl InteractiveError {
    /// Whether the failure came from the peer breaking the protocol
    /// rather than from local setup or I/O.
    pub fn is_peer_violation(&self) -> bool {
        matches!(
            self,
            Self::Framing(_) | Self::ProtocolSequence(_) | Self::Authentication(_)
        )
    }
}
