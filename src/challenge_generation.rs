//! Hash-derived values: domain-separated digests and sparse challenges
//!
//! All digests are 32 bytes of SHAKE256 output.
//!
//! | function          | domain tag | input                                   |
//! |-------------------|------------|-----------------------------------------|
//! | [`hash1`]         | `hash1`    | A_mine (keygen commit)                  |
//! | [`hash2`]         | `hash2`    | t_mine (keygen commit)                  |
//! | [`hash3`]         | `hash3`    | commitment batch (sign commit)          |
//! | [`hash4`]         | `hash4`    | message ‖ pk (commitment-key seed)      |
//! | [`hash0`]         | none       | message ‖ c1 ‖ c2 ‖ pk (challenge seed) |
//! | [`eval_commitment`] | none     | commitment batch (tie-break key)        |
//!
//! [`hash0`] expands its digest with a generator owned by the call, so
//! concurrent challenge derivations never share state.

use digest::{ExtendableOutput, Update, XofReader};
use num_bigint::BigUint;
use rand::seq::index;
use rand::Rng;
use sha3::Shake256;

use crate::cyclotomic_ring::{Domain, Polynomial};
use crate::error::Result;
use crate::lattice::Matrix;
use crate::params::N;
use crate::sampling::seeded_rng;

/// 32-byte hash output
pub type Digest = [u8; 32];

fn shake256(parts: &[&[u8]]) -> Digest {
    let mut hasher = Shake256::default();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    hasher.finalize_xof().read(&mut out);
    out
}

/// Commitment to a sampled matrix before it is revealed.
pub fn hash1(data: &[u8]) -> Digest {
    shake256(&[b"hash1", data])
}

/// Commitment to a party's public vector t before it is revealed.
pub fn hash2(data: &[u8]) -> Digest {
    shake256(&[b"hash2", data])
}

/// Commitment to a batch of signing commitments before it is revealed.
pub fn hash3(data: &[u8]) -> Digest {
    shake256(&[b"hash3", data])
}

/// Seed of the per-message commitment keys.
pub fn hash4(data: &[u8]) -> Digest {
    shake256(&[b"hash4", data])
}

/// Sparse ternary challenge with exactly `tau` nonzero coefficients.
///
/// # Algorithm
/// 1. Seed a local ChaCha20 generator with SHAKE256(data)
/// 2. Draw N signs in {−1, +1}
/// 3. Zero a pseudorandom subset of N − τ positions
pub fn hash0(data: &[u8], tau: usize) -> Polynomial {
    let mut rng = seeded_rng(shake256(&[data]));
    let mut coeffs: Vec<i64> = (0..N)
        .map(|_| if rng.gen::<bool>() { 1 } else { -1 })
        .collect();
    for position in index::sample(&mut rng, N, N - tau.min(N)) {
        coeffs[position] = 0;
    }
    Polynomial::from_raw(coeffs, Domain::Coefficient)
}

/// Challenge of a joint commitment: `hash0(message ‖ c1 ‖ c2 ‖ pk)`.
pub fn derive_challenge(
    message: &[u8],
    c1: &Matrix,
    c2: &Matrix,
    pk_bytes: &[u8],
    tau: usize,
) -> Result<Polynomial> {
    let mut data = message.to_vec();
    data.extend_from_slice(&c1.canonical_bytes()?);
    data.extend_from_slice(&c2.canonical_bytes()?);
    data.extend_from_slice(pk_bytes);
    Ok(hash0(&data, tau))
}

/// Seed of the per-message commitment keys: `hash4(message ‖ pk)`.
pub fn commitment_key_seed(message: &[u8], pk_bytes: &[u8]) -> Digest {
    hash4(&[message, pk_bytes].concat())
}

/// Concatenated canonical bytes `c1_0 ‖ c2_0 ‖ c1_1 ‖ c2_1 ‖ …`.
pub fn commitment_batch_bytes(batch: &[(Matrix, Matrix)]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for (c1, c2) in batch {
        out.extend_from_slice(&c1.canonical_bytes()?);
        out.extend_from_slice(&c2.canonical_bytes()?);
    }
    Ok(out)
}

/// Integer key of a commitment batch. Used only to break ties between the
/// two parties, never for security.
pub fn eval_commitment(batch: &[(Matrix, Matrix)]) -> Result<BigUint> {
    let bytes = commitment_batch_bytes(batch)?;
    Ok(BigUint::from_bytes_be(&shake256(&[&bytes])))
}
