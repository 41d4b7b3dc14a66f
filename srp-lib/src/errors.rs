//! Error types for range-proof construction and the curve primitives.
//!
//! Every fallible operation in this crate returns [`SrpError`]. Only the
//! retryable kinds ([`SrpError::ZeroScalar`], [`SrpError::CryptoInvariant`])
//! are recovered internally by the proof builder, which retries with fresh
//! randomness; everything else reaches the caller.

use std::fmt;

/// Stable numeric codes, grouped by failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SrpErrorCode {
    /// A scalar about to be committed was zero mod n
    ZeroScalar = 1000,
    /// Key bytes could not be turned into a key object
    InvalidKey = 1001,
    /// A point encoding was not a valid compressed secp256k1 point
    InvalidPoint = 1002,
    /// Sampled proof scalars broke an algebraic invariant
    CryptoInvariant = 1003,
    /// Proof inputs violate the range preconditions
    RangeProofConstruction = 2000,
    /// The retry budget for proof construction ran out
    ProofAttemptsExhausted = 2001,
    /// Commitments do not satisfy the range relations
    ProofRejected = 2002,
    /// The four-squares search found no representation
    FourSquaresExhausted = 3000,
}

/// Error type for the primitive and proof layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SrpError {
    /// A zero scalar was about to be multiplied by the generator.
    ZeroScalar,

    /// Sampled proof scalars failed a consistency check.
    CryptoInvariant(&'static str),

    /// Raw key material could not be loaded.
    InvalidKey {
        /// Which key was being loaded (e.g. "private", "public")
        kind: &'static str,
        /// Underlying reason
        reason: String,
    },

    /// Bytes do not decode to a curve point.
    InvalidPoint(String),

    /// The requested proof is impossible for these inputs.
    RangeProofConstruction(String),

    /// Every attempt produced a degenerate scalar set.
    ProofAttemptsExhausted {
        /// Number of attempts made before giving up
        attempts: usize,
    },

    /// Commitment relations do not hold for a received or built proof.
    ProofRejected(String),

    /// No four-square representation was found for the value.
    FourSquaresExhausted {
        /// The value that could not be decomposed
        value: u64,
    },
}

impl SrpError {
    /// Get the numeric code for this error.
    pub fn code(&self) -> SrpErrorCode {
        match self {
            Self::ZeroScalar => SrpErrorCode::ZeroScalar,
            Self::CryptoInvariant(_) => SrpErrorCode::CryptoInvariant,
            Self::InvalidKey { .. } => SrpErrorCode::InvalidKey,
            Self::InvalidPoint(_) => SrpErrorCode::InvalidPoint,
            Self::RangeProofConstruction(_) => SrpErrorCode::RangeProofConstruction,
            Self::ProofAttemptsExhausted { .. } => SrpErrorCode::ProofAttemptsExhausted,
            Self::ProofRejected(_) => SrpErrorCode::ProofRejected,
            Self::FourSquaresExhausted { .. } => SrpErrorCode::FourSquaresExhausted,
        }
    }

    /// Returns true if retrying with fresh randomness can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ZeroScalar | Self::CryptoInvariant(_))
    }

    /// Create an invalid key error.
    pub fn invalid_key(kind: &'static str, reason: impl fmt::Display) -> Self {
        Self::InvalidKey {
            kind,
            reason: reason.to_string(),
        }
    }

    /// Create a construction error for rejected proof inputs.
    pub fn construction(reason: impl Into<String>) -> Self {
        Self::RangeProofConstruction(reason.into())
    }
}

impl fmt::Display for SrpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroScalar => write!(f, "scalar is zero mod n"),
            Self::CryptoInvariant(what) => write!(f, "proof invariant violated: {}", what),
            Self::InvalidKey { kind, reason } => write!(f, "invalid {} key: {}", kind, reason),
            Self::InvalidPoint(reason) => write!(f, "invalid curve point: {}", reason),
            Self::RangeProofConstruction(reason) => {
                write!(f, "cannot build range proof: {}", reason)
            }
            Self::ProofAttemptsExhausted { attempts } => write!(
                f,
                "range proof construction gave up after {} attempts",
                attempts
            ),
            Self::ProofRejected(reason) => write!(f, "range proof rejected: {}", reason),
            Self::FourSquaresExhausted { value } => write!(
                f,
                "internal error: no four-squares representation found for {}",
                value
            ),
        }
    }
}

impl std::error::Error for SrpError {}
