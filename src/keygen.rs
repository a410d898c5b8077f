//! Two-party key generation
//!
//! Each party contributes half of the public matrix and one additive share
//! of t, both through commit-then-reveal so neither side can choose its
//! contribution after seeing the other's:
//!
//! ```text
//! A   = A_mine + A_theirs                     (hash1 commit-reveal)
//! t_i = A·s1_i + s2_i                          (hash2 commit-reveal)
//! t1  = Power2Round(t_mine + t_theirs, d).high
//! ```

use std::time::Instant;

use rand_core::{CryptoRng, RngCore};
use tracing::{debug, info};

use crate::challenge_generation::{hash1, hash2};
use crate::communication::Communicator;
use crate::error::Result;
use crate::params::Params;
use crate::protocol::{commit_then_reveal, expect_received};
use crate::sampling::{bounded_vector, uniform_matrix};
use crate::types::{PrivateKeyShare, PublicKey};

pub(crate) fn run<C, R>(
    params: &Params,
    comm: &mut C,
    rng: &mut R,
) -> Result<(PublicKey, PrivateKeyShare)>
where
    C: Communicator + ?Sized,
    R: RngCore + CryptoRng,
{
    let start = Instant::now();

    let a_mine = uniform_matrix(rng, params.k, params.l)?;
    debug!("sampled A_mine");
    let a_theirs = commit_then_reveal(comm, &a_mine, hash1, "matrix A", |a| {
        expect_received(a, (params.k, params.l))
    })?;
    let a = a_mine.add(&a_theirs)?;
    debug!("combined A_mine and A_theirs");

    let s1 = bounded_vector(rng, params.l, params.eta)?;
    let s2 = bounded_vector(rng, params.k, params.eta)?;
    debug!("sampled s1 and s2");

    let t_mine = a.matmul(&s1)?.add(&s2)?;
    debug!("calculated t_mine");
    let t_theirs = commit_then_reveal(comm, &t_mine, hash2, "vector t", |t| {
        expect_received(t, (params.k, 1))
    })?;

    let t = t_mine.add(&t_theirs)?;
    let (t1, _t0) = t.power2round(params.d);
    debug!("calculated t1");

    info!(elapsed = ?start.elapsed(), "finished keygen");
    Ok((PublicKey { a: a.clone(), t1 }, PrivateKeyShare { a, t_theirs, s1, s2 }))
}
