//! Samplers for matrices and short vectors
//!
//! Two sources of randomness feed these functions:
//! - entropy: the caller's `RngCore + CryptoRng` (keygen secrets, masking
//!   vectors, commitment randomness)
//! - derivation: a [`ChaCha20Rng`] built by [`seeded_rng`] from a digest and
//!   owned by the one call that needs it (commitment keys, challenges)
//!
//! There is no process-wide generator; every sampler takes its generator as
//! an explicit `&mut` parameter.

use rand::Rng;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

use crate::cyclotomic_ring::{Domain, Polynomial};
use crate::error::Result;
use crate::lattice::Matrix;
use crate::params::{N, Q};

/// Deterministic generator for a 32-byte seed.
pub fn seeded_rng(seed: [u8; 32]) -> ChaCha20Rng {
    ChaCha20Rng::from_seed(seed)
}

/// Polynomial with coefficients uniform in [0, q).
pub fn uniform_polynomial<R: Rng + ?Sized>(rng: &mut R) -> Polynomial {
    let coeffs = (0..N).map(|_| rng.gen_range(0..Q)).collect();
    Polynomial::from_raw(coeffs, Domain::Coefficient)
}

/// Polynomial with coefficients uniform in [−bound, bound].
pub fn bounded_polynomial<R: Rng + ?Sized>(rng: &mut R, bound: i64) -> Polynomial {
    let coeffs = (0..N).map(|_| rng.gen_range(-bound..=bound)).collect();
    Polynomial::from_raw(coeffs, Domain::Coefficient)
}

/// rows × cols matrix with uniform entries.
pub fn uniform_matrix<R: Rng + ?Sized>(rng: &mut R, rows: usize, cols: usize) -> Result<Matrix> {
    Matrix::new(
        (0..rows)
            .map(|_| (0..cols).map(|_| uniform_polynomial(rng)).collect())
            .collect(),
    )
}

/// Column vector of `size` entries with infinity norm at most `bound`.
pub fn bounded_vector<R: Rng + ?Sized>(rng: &mut R, size: usize, bound: i64) -> Result<Matrix> {
    Matrix::column((0..size).map(|_| bounded_polynomial(rng, bound)).collect())
}
