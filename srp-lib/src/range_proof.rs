//! Blinded four-square range proofs.
//!
//! To show `x ∈ [min, max]` the prover decomposes `w = x - min` and
//! `t = max - x` into four squares each and commits to every square with
//! additive blinding:
//!
//! ```text
//! lower_i = s_i² + rParts_i·h        Σ lower_i = w + r·h = c2
//! upper_i = u_i² - uParts_i·h        Σ upper_i = t - r·h = c1
//! ```
//!
//! `rParts` and `uParts` are independent additive sharings of the same
//! blinding scalar `r`, so the two halves are unlinkable to each other while
//! `C1 + C2 = (max - min)·G` still holds. All ten scalars are published only
//! as points (`scalar·G`).

use crate::crypto::{self, CompressedPoint, Scalar};
use crate::four_squares::{FourSquareRepresentation, FourSquares};
use crate::{Result, SrpError};
use k256::ProjectivePoint;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

/// Smallest accepted declared bit length.
pub const MIN_BITLEN: u32 = 1;

/// Largest accepted declared bit length.
pub const MAX_BITLEN: u32 = 32;

/// Domain tag of the blinding multiplier `h`.
pub const BLINDING_DOMAIN: &str = "H";

/// Default cap on construction attempts.
///
/// A single attempt fails only when a sampled scalar lands on zero, so any
/// realistic run succeeds on the first try.
pub const DEFAULT_MAX_PROOF_ATTEMPTS: usize = 1024;

/// Number of squares per half.
pub const TERMS: usize = 4;

/// A range proof as sent to the verifier.
///
/// `min`, `max` and `bitlen` are public policy bounds; only the commitments
/// depend on the secret.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeProof {
    /// Lower bound of the interval.
    pub min: u32,
    /// Upper bound of the interval.
    pub max: u32,
    /// Declared bit length of the interval.
    pub bitlen: u32,
    /// `(t - r·h)·G`
    pub c1: CompressedPoint,
    /// `(w + r·h)·G`
    pub c2: CompressedPoint,
    /// Commitments to the squares of `x - min`.
    pub lower_commit: [CompressedPoint; TERMS],
    /// Commitments to the squares of `max - x`.
    pub upper_commit: [CompressedPoint; TERMS],
}

impl RangeProof {
    /// Check the public relations between the commitments.
    ///
    /// Holds for every honestly built proof:
    /// - `Σ lower_commit = C2` and `Σ upper_commit = C1`
    /// - `C1 + C2 = (max - min)·G`
    /// - the declared bounds fit in `bitlen` bits
    pub fn verify_commitments(&self) -> Result<()> {
        check_bounds(self.min, self.max, self.bitlen).map_err(|e| match e {
            SrpError::RangeProofConstruction(reason) => SrpError::ProofRejected(reason),
            other => other,
        })?;
        if u64::from(self.max) > (1u64 << self.bitlen) - 1 {
            return Err(SrpError::ProofRejected("max exceeds 2^bitlen-1".into()));
        }

        let c1 = self.c1.to_projective()?;
        let c2 = self.c2.to_projective()?;

        if sum_points(&self.lower_commit)? != c2 {
            return Err(SrpError::ProofRejected(
                "lower_commit sum does not match c2".into(),
            ));
        }
        if sum_points(&self.upper_commit)? != c1 {
            return Err(SrpError::ProofRejected(
                "upper_commit sum does not match c1".into(),
            ));
        }

        let width = crypto::scalar_from_u64(u64::from(self.max - self.min));
        if c1 + c2 != ProjectivePoint::GENERATOR * width {
            return Err(SrpError::ProofRejected("c1 + c2 != (max-min)·G".into()));
        }
        Ok(())
    }
}

fn sum_points(points: &[CompressedPoint]) -> Result<ProjectivePoint> {
    points
        .iter()
        .try_fold(ProjectivePoint::IDENTITY, |acc, p| Ok(acc + p.to_projective()?))
}

fn check_bounds(min: u32, max: u32, bitlen: u32) -> Result<()> {
    if min > max {
        return Err(SrpError::construction(format!("min {} > max {}", min, max)));
    }
    if !(MIN_BITLEN..=MAX_BITLEN).contains(&bitlen) {
        return Err(SrpError::construction(format!(
            "bitlen must be {}..{}, got {}",
            MIN_BITLEN, MAX_BITLEN, bitlen
        )));
    }
    Ok(())
}

/// The ten scalars of one construction attempt, before commitment.
#[derive(Clone, Debug)]
pub(crate) struct ProofScalars {
    pub(crate) c1: Scalar,
    pub(crate) c2: Scalar,
    pub(crate) lower: [Scalar; TERMS],
    pub(crate) upper: [Scalar; TERMS],
}

/// Split `r` into four uniformly random scalars summing to `r`.
fn additive_shares<R: RngCore + CryptoRng>(r: &Scalar, rng: &mut R) -> [Scalar; TERMS] {
    let mut shares = [Scalar::ZERO; TERMS];
    for share in shares.iter_mut().take(TERMS - 1) {
        *share = crypto::random_scalar(rng);
    }
    let partial = sum_scalars(&shares[..TERMS - 1]);
    shares[TERMS - 1] = *r - partial;
    shares
}

fn sum_scalars(scalars: &[Scalar]) -> Scalar {
    scalars.iter().fold(Scalar::ZERO, |acc, s| acc + s)
}

fn square_scalar(root: u64) -> Scalar {
    crypto::scalar_from_u64(root * root)
}

impl ProofScalars {
    /// Draw fresh blinding and derive all ten scalars.
    pub(crate) fn sample<R: RngCore + CryptoRng>(
        w: u64,
        t: u64,
        lower_squares: &FourSquareRepresentation,
        upper_squares: &FourSquareRepresentation,
        h: &Scalar,
        rng: &mut R,
    ) -> Self {
        let r = crypto::random_scalar_nonzero(rng);
        let r_parts = additive_shares(&r, rng);
        let u_parts = additive_shares(&r, rng);

        let lower = std::array::from_fn(|i| square_scalar(lower_squares[i]) + r_parts[i] * h);
        let upper = std::array::from_fn(|i| square_scalar(upper_squares[i]) - u_parts[i] * h);

        let rh = r * h;
        Self {
            c1: crypto::scalar_from_u64(t) - rh,
            c2: crypto::scalar_from_u64(w) + rh,
            lower,
            upper,
        }
    }

    /// `Σ lower ≡ c2` and `Σ upper ≡ c1`.
    pub(crate) fn is_consistent(&self) -> bool {
        sum_scalars(&self.lower) == self.c2 && sum_scalars(&self.upper) == self.c1
    }

    fn all(&self) -> impl Iterator<Item = &Scalar> {
        [&self.c1, &self.c2]
            .into_iter()
            .chain(self.lower.iter())
            .chain(self.upper.iter())
    }

    /// Reject attempts that cannot be committed as-is.
    pub(crate) fn check(&self) -> Result<()> {
        if !self.is_consistent() {
            return Err(SrpError::CryptoInvariant("commitment sums do not match"));
        }
        if self.all().any(crypto::is_zero) {
            return Err(SrpError::ZeroScalar);
        }
        Ok(())
    }

    fn commit(&self, min: u32, max: u32, bitlen: u32) -> Result<RangeProof> {
        let commit_all = |scalars: &[Scalar; TERMS]| -> Result<[CompressedPoint; TERMS]> {
            let points = scalars
                .iter()
                .map(crypto::scalar_mul_g)
                .collect::<Result<Vec<_>>>()?;
            points
                .try_into()
                .map_err(|_| SrpError::CryptoInvariant("commitment count"))
        };

        Ok(RangeProof {
            min,
            max,
            bitlen,
            c1: crypto::scalar_mul_g(&self.c1)?,
            c2: crypto::scalar_mul_g(&self.c2)?,
            lower_commit: commit_all(&self.lower)?,
            upper_commit: commit_all(&self.upper)?,
        })
    }
}

/// Builds [`RangeProof`]s with bounded retries.
#[derive(Clone, Debug)]
pub struct RangeProofBuilder {
    max_attempts: usize,
    four_squares: FourSquares,
}

impl Default for RangeProofBuilder {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_PROOF_ATTEMPTS,
            four_squares: FourSquares::default(),
        }
    }
}

impl RangeProofBuilder {
    /// Builder with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of construction attempts.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Use a custom four-squares solver.
    pub fn with_four_squares(mut self, four_squares: FourSquares) -> Self {
        self.four_squares = four_squares;
        self
    }

    /// Attempt cap.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Prove that `x ∈ [min, max]`.
    ///
    /// Invalid inputs fail immediately with
    /// [`SrpError::RangeProofConstruction`]. Degenerate attempts are
    /// retried with fresh randomness up to the attempt cap, after which
    /// [`SrpError::ProofAttemptsExhausted`] is returned.
    pub fn build<R: RngCore + CryptoRng>(
        &self,
        min: u32,
        max: u32,
        bitlen: u32,
        x: u32,
        rng: &mut R,
    ) -> Result<RangeProof> {
        check_bounds(min, max, bitlen)?;
        if x < min || x > max {
            return Err(SrpError::construction(format!(
                "x is outside [{}, {}]",
                min, max
            )));
        }

        let w = u64::from(x - min);
        let t = u64::from(max - x);
        let lower_squares = self.four_squares.decompose(w, rng)?;
        let upper_squares = self.four_squares.decompose(t, rng)?;
        let h = crypto::hash_to_scalar(BLINDING_DOMAIN);

        for attempt in 1..=self.max_attempts {
            let scalars = ProofScalars::sample(w, t, &lower_squares, &upper_squares, &h, rng);
            match scalars.check().and_then(|_| scalars.commit(min, max, bitlen)) {
                Ok(proof) => return Ok(proof),
                Err(e) if e.is_retryable() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, error = %e, "discarding range proof attempt");
                    #[cfg(not(feature = "tracing"))]
                    let _ = attempt;
                }
                Err(e) => return Err(e),
            }
        }

        Err(SrpError::ProofAttemptsExhausted {
            attempts: self.max_attempts,
        })
    }
}

/// Build a proof with default limits and the OS RNG.
pub fn build_range_proof(min: u32, max: u32, bitlen: u32, x: u32) -> Result<RangeProof> {
    RangeProofBuilder::default().build(min, max, bitlen, x, &mut OsRng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::four_squares::four_squares;
    use proptest::prelude::*;

    fn sample_scalars(min: u32, max: u32, x: u32) -> ProofScalars {
        let w = u64::from(x - min);
        let t = u64::from(max - x);
        let s = four_squares(w).unwrap();
        let u = four_squares(t).unwrap();
        let h = crypto::hash_to_scalar(BLINDING_DOMAIN);
        ProofScalars::sample(w, t, &s, &u, &h, &mut OsRng)
    }

    #[test]
    fn test_additive_shares_sum_to_secret() {
        let r = crypto::random_scalar_nonzero(&mut OsRng);
        let shares = additive_shares(&r, &mut OsRng);
        assert_eq!(sum_scalars(&shares), r);
        assert_ne!(shares, additive_shares(&r, &mut OsRng));
    }

    #[test]
    fn test_scalars_consistent_at_bounds() {
        for (min, max, x) in [(0, 255, 0), (0, 255, 255), (7, 7, 7), (0, u32::MAX, 12345)] {
            let scalars = sample_scalars(min, max, x);
            assert!(scalars.is_consistent());
            assert!(scalars.check().is_ok());
        }
    }

    #[test]
    fn test_tampered_scalars_fail_check() {
        let mut scalars = sample_scalars(0, 255, 100);
        scalars.lower[2] += Scalar::ONE;
        assert_eq!(
            scalars.check(),
            Err(SrpError::CryptoInvariant("commitment sums do not match"))
        );
    }

    #[test]
    fn test_zero_scalar_is_retryable() {
        let mut scalars = sample_scalars(0, 255, 100);
        let delta = scalars.lower[0];
        scalars.lower[0] = Scalar::ZERO;
        scalars.lower[1] += delta;
        let err = scalars.check().unwrap_err();
        assert_eq!(err, SrpError::ZeroScalar);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_build_and_self_check() {
        let proof = build_range_proof(0, 255, 8, 42).unwrap();
        assert_eq!((proof.min, proof.max, proof.bitlen), (0, 255, 8));
        proof.verify_commitments().unwrap();
    }

    #[test]
    fn test_build_degenerate_interval() {
        let proof = build_range_proof(1000, 1000, 16, 1000).unwrap();
        proof.verify_commitments().unwrap();
    }

    #[test]
    fn test_proofs_are_randomized() {
        let a = build_range_proof(0, 255, 8, 42).unwrap();
        let b = build_range_proof(0, 255, 8, 42).unwrap();
        assert_ne!(a.c1, b.c1);
        assert_ne!(a.lower_commit, b.lower_commit);
    }

    #[test]
    fn test_construction_errors() {
        let cases = [
            (10, 20, 8, 9),  // x = min - 1
            (10, 20, 8, 21), // x = max + 1
            (5, 3, 8, 4),    // min > max
            (0, 255, 0, 1),  // bitlen = 0
            (0, 255, 33, 1), // bitlen = 33
        ];
        for (min, max, bitlen, x) in cases {
            let err = build_range_proof(min, max, bitlen, x).unwrap_err();
            assert!(
                matches!(err, SrpError::RangeProofConstruction(_)),
                "({}, {}, {}, {}) gave {:?}",
                min,
                max,
                bitlen,
                x,
                err
            );
        }
    }

    #[test]
    fn test_zero_attempt_cap_is_a_liveness_error() {
        let builder = RangeProofBuilder::new().with_max_attempts(0);
        assert_eq!(
            builder.build(0, 255, 8, 1, &mut OsRng),
            Err(SrpError::ProofAttemptsExhausted { attempts: 0 })
        );
    }

    #[test]
    fn test_tampered_commitment_rejected() {
        let mut proof = build_range_proof(0, 255, 8, 42).unwrap();
        proof.lower_commit.swap(0, 1);
        proof.verify_commitments().unwrap();

        proof.upper_commit[3] = proof.lower_commit[0];
        assert!(matches!(
            proof.verify_commitments(),
            Err(SrpError::ProofRejected(_))
        ));
    }

    #[test]
    fn test_bounds_outside_bitlen_rejected() {
        let mut proof = build_range_proof(0, 255, 8, 42).unwrap();
        proof.bitlen = 7;
        assert!(matches!(
            proof.verify_commitments(),
            Err(SrpError::ProofRejected(_))
        ));
    }

    #[test]
    fn test_shifted_interval_rejected() {
        let mut proof = build_range_proof(0, 255, 8, 42).unwrap();
        proof.min = 1;
        assert!(matches!(
            proof.verify_commitments(),
            Err(SrpError::ProofRejected(_))
        ));
    }

    #[test]
    fn test_json_report_uses_hex_points() {
        let proof = build_range_proof(0, 255, 8, 42).unwrap();
        let value = serde_json::to_value(&proof).unwrap();
        assert_eq!(value["c1"], serde_json::json!(proof.c1.to_hex()));
        assert_eq!(value["lower_commit"].as_array().unwrap().len(), 4);

        let back: RangeProof = serde_json::from_value(value).unwrap();
        assert_eq!(back, proof);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Σ lower ≡ c2 and Σ upper ≡ c1 for every valid input.
        #[test]
        fn scalars_always_consistent(min in 0u32..1_000_000, span in 0u32..1_000_000, offset in 0u32..1_000_000) {
            let max = min + span;
            let x = min + offset % (span + 1);
            let scalars = sample_scalars(min, max, x);
            prop_assert!(scalars.is_consistent());
        }
    }
}
