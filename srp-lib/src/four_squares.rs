//! Lagrange four-square decomposition.
//!
//! Every nonnegative integer is a sum of four squares. The search is a
//! randomized pick of the first two roots followed by an exact two-square
//! search on the remainder; if the random phase runs out of attempts, an
//! exhaustive scan in increasing order takes over.

use crate::{Result, SrpError};
use rand::rngs::OsRng;
use rand::{CryptoRng, Rng, RngCore};
use std::collections::HashMap;

/// Default ceiling for the randomized phase.
pub const DEFAULT_MAX_ATTEMPTS: usize = 20_000;

/// Largest accepted input. The search table holds one entry per root, so
/// inputs stay within 32 bits.
pub const MAX_INPUT: u64 = u32::MAX as u64;

/// `(a, b, c, d)` with `a² + b² + c² + d² = n`.
pub type FourSquareRepresentation = [u64; 4];

/// Floor of the square root.
pub fn isqrt(n: u64) -> u64 {
    let mut root = (n as f64).sqrt() as u64;
    while root.checked_mul(root).map_or(true, |sq| sq > n) {
        root -= 1;
    }
    while (root + 1).checked_mul(root + 1).is_some_and(|sq| sq <= n) {
        root += 1;
    }
    root
}

/// Four-squares solver with a configurable random-phase budget.
#[derive(Clone, Debug)]
pub struct FourSquares {
    max_attempts: usize,
}

impl Default for FourSquares {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Square → root table for `0..=limit`.
struct SquareTable {
    roots: HashMap<u64, u64>,
}

impl SquareTable {
    fn up_to(limit: u64) -> Self {
        let roots = (0..=limit).map(|i| (i * i, i)).collect();
        Self { roots }
    }

    fn square(root: u64) -> u64 {
        root * root
    }

    /// First `(a, b)` with `a² + b² = m`, scanning `a` upward.
    fn two_squares(&self, m: u64) -> Option<(u64, u64)> {
        (0..=isqrt(m)).find_map(|a| {
            self.roots
                .get(&(m - Self::square(a)))
                .map(|&b| (a, b))
        })
    }
}

impl FourSquares {
    /// Solver with a custom random-phase budget (0 skips straight to the
    /// exhaustive scan).
    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self { max_attempts }
    }

    /// Random-phase budget.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Decompose `n` into four squares. Fails for `n` above [`MAX_INPUT`].
    pub fn decompose<R: RngCore + CryptoRng>(
        &self,
        n: u64,
        rng: &mut R,
    ) -> Result<FourSquareRepresentation> {
        if n > MAX_INPUT {
            return Err(SrpError::construction(format!(
                "{} exceeds the four-squares input bound {}",
                n, MAX_INPUT
            )));
        }
        if n == 0 {
            return Ok([0, 0, 0, 0]);
        }

        let limit = isqrt(n);
        let table = SquareTable::up_to(limit);

        for _ in 0..self.max_attempts {
            let a = rng.gen_range(0..=limit);
            let b = rng.gen_range(0..=limit);
            let Some(r1) = n
                .checked_sub(SquareTable::square(a))
                .and_then(|r| r.checked_sub(SquareTable::square(b)))
            else {
                continue;
            };
            if let Some((c, d)) = table.two_squares(r1) {
                return Ok([a, b, c, d]);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            n,
            attempts = self.max_attempts,
            "random four-squares search exhausted, scanning"
        );

        self.exhaustive(n, &table)
    }

    fn exhaustive(&self, n: u64, table: &SquareTable) -> Result<FourSquareRepresentation> {
        for a in 0..=isqrt(n) {
            let r0 = n - SquareTable::square(a);
            for b in 0..=isqrt(r0) {
                let r1 = r0 - SquareTable::square(b);
                if let Some((c, d)) = table.two_squares(r1) {
                    return Ok([a, b, c, d]);
                }
            }
        }
        Err(SrpError::FourSquaresExhausted { value: n })
    }
}

/// Decompose `n` with the default budget and the OS RNG.
pub fn four_squares(n: u64) -> Result<FourSquareRepresentation> {
    FourSquares::default().decompose(n, &mut OsRng)
}

/// Sum of the squares of a representation.
pub fn sum_of_squares(rep: &FourSquareRepresentation) -> u128 {
    rep.iter().map(|&x| (x as u128) * (x as u128)).sum()
}
