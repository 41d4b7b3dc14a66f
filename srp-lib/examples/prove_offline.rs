//! Build a range proof locally and check its commitments.
//!
//! Run with: `cargo run -p srp-lib --example prove_offline -- 1000 5000 13 4242`

use srp_lib::four_squares::four_squares;
use srp_lib::{build_range_proof, Result};

fn main() -> Result<()> {
    let args: Vec<u32> = std::env::args()
        .skip(1)
        .filter_map(|a| a.parse().ok())
        .collect();
    let [min, max, bitlen, x] = match args.as_slice() {
        [a, b, c, d] => [*a, *b, *c, *d],
        _ => [0, 255, 8, 42],
    };

    let lower = four_squares(u64::from(x.saturating_sub(min)))?;
    println!("x - min = {:?} (sum of squares)", lower);

    let proof = build_range_proof(min, max, bitlen, x)?;
    println!("c1 = {}", proof.c1.to_hex());
    println!("c2 = {}", proof.c2.to_hex());
    for (i, p) in proof.lower_commit.iter().enumerate() {
        println!("lower[{}] = {}", i, p.to_hex());
    }
    for (i, p) in proof.upper_commit.iter().enumerate() {
        println!("upper[{}] = {}", i, p.to_hex());
    }

    proof.verify_commitments()?;
    println!("commitments consistent");
    Ok(())
}
