//! Range proofs over secp256k1 commitments.
//!
//! A prover holding a secret `x` shows that `x ∈ [min, max]` by
//! decomposing `x - min` and `max - x` into four squares each and
//! publishing blinded commitments to every square. This crate holds the
//! curve primitives, the four-squares solver and the proof builder; it is
//! stateless and does no I/O.
//!
//! # Example
//!
//! ```
//! use srp_lib::range_proof::build_range_proof;
//!
//! let proof = build_range_proof(0, 255, 8, 42).unwrap();
//! assert!(proof.verify_commitments().is_ok());
//! ```
//!
//! # Features
//!
//! - **tracing**: debug events when the four-squares search falls back to
//!   the exhaustive scan and when a proof attempt is discarded.

pub mod crypto;
pub mod errors;
pub mod four_squares;
pub mod range_proof;

pub use crypto::{CompressedPoint, PrivateKey, PublicKey, Scalar};
pub use errors::{SrpError, SrpErrorCode};
pub use four_squares::{four_squares, FourSquares};
pub use range_proof::{build_range_proof, RangeProof, RangeProofBuilder};

/// Common result alias for primitive and proof operations.
pub type Result<T> = std::result::Result<T, SrpError>;
