//! Additively homomorphic lattice commitment
//!
//! Keys are two public matrices derived from a per-message seed:
//!
//! ```text
//! A1 = [ I_n | A1' ]            n × k
//! A2 = [ 0_{l×n} | I_l | A2' ]  l × k
//! ```
//!
//! with A1', A2' uniform. A message m (l × 1) is committed under randomness
//! r (k × 1) as `(c1, c2) = (A1·r, A2·r + m)`. Commitments add: the sum of
//! two commitments opens to the sum of the messages under the sum of the
//! randomness, which is what lets the co-signers combine their sessions.

use tracing::trace;

use crate::error::Result;
use crate::lattice::Matrix;
use crate::params::CommitmentParams;
use crate::sampling::{seeded_rng, uniform_matrix};

/// Public commitment matrices (A1, A2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitmentKeys {
    pub a1: Matrix,
    pub a2: Matrix,
}

impl CommitmentKeys {
    /// Expands a 32-byte seed into (A1, A2). The generator is local to the
    /// call; equal seeds always give equal keys.
    pub fn derive(seed: [u8; 32], params: &CommitmentParams) -> Result<Self> {
        let mut rng = seeded_rng(seed);
        let a1_random = uniform_matrix(&mut rng, params.n, params.k - params.n)?;
        let a2_random = uniform_matrix(&mut rng, params.l, params.k - params.n - params.l)?;

        let a1 = Matrix::identity(params.n).augment(&a1_random)?;
        let a2 = Matrix::zeros(params.l, params.n)
            .augment(&Matrix::identity(params.l))?
            .augment(&a2_random)?;
        trace!(a1 = ?a1.shape(), a2 = ?a2.shape(), "derived commitment keys");

        Ok(Self { a1, a2 })
    }

    /// `(A1·r, A2·r + m)`, reduced into [0, q).
    pub fn commit(&self, message: &Matrix, randomness: &Matrix) -> Result<(Matrix, Matrix)> {
        let c1 = self.a1.matmul(randomness)?;
        let c2 = self.a2.matmul(randomness)?.add(message)?;
        Ok((c1, c2))
    }

    /// Accepts iff `(c1, c2)` is exactly the commitment of `message` under
    /// `randomness` and the message's second norm is at most `bound`.
    ///
    /// Malformed shapes are a failed opening, not an error.
    pub fn open(
        &self,
        c1: &Matrix,
        c2: &Matrix,
        message: &Matrix,
        randomness: &Matrix,
        bound: i64,
    ) -> bool {
        if message.second_norm() > bound as f64 {
            return false;
        }
        match self.commit(message, randomness) {
            Ok((e1, e2)) => &e1 == c1 && &e2 == c2,
            Err(_) => false,
        }
    }
}
