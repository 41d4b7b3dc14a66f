//! Protobuf wire messages (package `secure_range_proof`).
//!
//! Field tags follow declaration order. Every frame payload is an
//! [`Envelope`]; the inner message is carried as opaque bytes and decoded
//! according to [`Envelope::message_type`].

use crate::{InteractiveError, Result};
use prost::Message;
use srp_lib::crypto::{CompressedPoint, COMPRESSED_POINT_LEN};
use srp_lib::range_proof::TERMS;
use srp_lib::RangeProof;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MessageType {
    Unspecified = 0,
    ClientHello = 1,
    ServerChallenge = 2,
    ClientResponse = 3,
    AuthResult = 4,
    RangeProofRequest = 5,
    RangeProofResult = 6,
}

#[derive(Clone, PartialEq, Message)]
pub struct Envelope {
    #[prost(enumeration = "MessageType", tag = "1")]
    pub kind: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
    #[prost(uint32, optional, tag = "3")]
    pub request_id: Option<u32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ClientHello {
    #[prost(bytes = "vec", tag = "1")]
    pub serial_id: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub sig: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ServerChallenge {
    #[prost(bytes = "vec", tag = "1")]
    pub nonce: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub server_sig: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ClientResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub sig: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AuthResult {
    #[prost(bool, tag = "1")]
    pub ok: bool,
    #[prost(string, optional, tag = "2")]
    pub message: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct RangeProofRequest {
    #[prost(uint32, tag = "1")]
    pub min: u32,
    #[prost(uint32, tag = "2")]
    pub max: u32,
    #[prost(uint32, tag = "3")]
    pub bitlen: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub c1: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub c2: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "6")]
    pub lower_commit: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "7")]
    pub upper_commit: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct RangeProofResult {
    #[prost(bool, tag = "1")]
    pub ok: bool,
    #[prost(string, optional, tag = "2")]
    pub message: Option<String>,
}

impl MessageType {
    /// Name as it appears in the protobuf schema.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unspecified => "MESSAGE_TYPE_UNSPECIFIED",
            Self::ClientHello => "CLIENT_HELLO",
            Self::ServerChallenge => "SERVER_CHALLENGE",
            Self::ClientResponse => "CLIENT_RESPONSE",
            Self::AuthResult => "AUTH_RESULT",
            Self::RangeProofRequest => "RANGE_PROOF_REQUEST",
            Self::RangeProofResult => "RANGE_PROOF_RESULT",
        }
    }
}

impl Envelope {
    /// Wrap `inner` under the given type tag.
    pub fn wrap<M: Message>(kind: MessageType, inner: &M, request_id: Option<u32>) -> Self {
        Self {
            kind: kind as i32,
            payload: inner.encode_to_vec(),
            request_id,
        }
    }

    /// The type tag; unknown values are a protocol violation.
    pub fn message_type(&self) -> Result<MessageType> {
        MessageType::try_from(self.kind).map_err(|_| {
            InteractiveError::ProtocolSequence(format!("unknown message type {}", self.kind))
        })
    }

    /// Fail unless this envelope carries `expected`.
    pub fn expect(&self, expected: MessageType) -> Result<()> {
        let actual = self.message_type()?;
        if actual != expected {
            return Err(InteractiveError::ProtocolSequence(format!(
                "expected {}, got {}",
                expected.as_str_name(),
                actual.as_str_name()
            )));
        }
        Ok(())
    }

    /// Decode the payload as `M`.
    pub fn open<M: Message + Default>(&self) -> Result<M> {
        Ok(M::decode(self.payload.as_slice())?)
    }

    /// Decode an envelope from one frame payload.
    pub fn from_frame(frame: &[u8]) -> Result<Self> {
        Ok(Self::decode(frame)?)
    }
}

impl From<&RangeProof> for RangeProofRequest {
    fn from(proof: &RangeProof) -> Self {
        let points = |ps: &[CompressedPoint]| -> Vec<Vec<u8>> {
            ps.iter().map(|p| p.as_bytes().to_vec()).collect()
        };
        Self {
            min: proof.min,
            max: proof.max,
            bitlen: proof.bitlen,
            c1: proof.c1.as_bytes().to_vec(),
            c2: proof.c2.as_bytes().to_vec(),
            lower_commit: points(&proof.lower_commit),
            upper_commit: points(&proof.upper_commit),
        }
    }
}

fn point(field: &str, bytes: &[u8]) -> Result<CompressedPoint> {
    if bytes.len() != COMPRESSED_POINT_LEN {
        return Err(InteractiveError::Serialization(format!(
            "{}: expected {} bytes, got {}",
            field,
            COMPRESSED_POINT_LEN,
            bytes.len()
        )));
    }
    Ok(CompressedPoint::from_slice(bytes)?)
}

fn commitments(field: &str, raw: &[Vec<u8>]) -> Result<[CompressedPoint; TERMS]> {
    if raw.len() != TERMS {
        return Err(InteractiveError::Serialization(format!(
            "{}: expected {} points, got {}",
            field,
            TERMS,
            raw.len()
        )));
    }
    let mut out = [point(field, &raw[0])?; TERMS];
    for (slot, bytes) in out.iter_mut().zip(raw).skip(1) {
        *slot = point(field, bytes)?;
    }
    Ok(out)
}

impl TryFrom<&RangeProofRequest> for RangeProof {
    type Error = InteractiveError;

    fn try_from(req: &RangeProofRequest) -> Result<Self> {
        Ok(RangeProof {
            min: req.min,
            max: req.max,
            bitlen: req.bitlen,
            c1: point("c1", &req.c1)?,
            c2: point("c2", &req.c2)?,
            lower_commit: commitments("lower_commit", &req.lower_commit)?,
            upper_commit: commitments("upper_commit", &req.upper_commit)?,
        })
    }
}
