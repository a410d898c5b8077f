use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;
use crate::lattice::Matrix;

/// Joint public key, identical on both sides after keygen
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    /// Combined public matrix A = A_mine + A_theirs (K × L)
    pub a: Matrix,
    /// High part of the rounded joint vector t = t_mine + t_theirs (K × 1)
    pub t1: Matrix,
}

impl PublicKey {
    /// `A ‖ t1` in canonical form, the key's contribution to every hash.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let mut out = self.a.canonical_bytes()?;
        out.extend_from_slice(&self.t1.canonical_bytes()?);
        Ok(out)
    }
}

/// One party's half of the signing key. Secrets are wiped on drop.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrivateKeyShare {
    /// Combined public matrix A (K × L)
    pub a: Matrix,
    /// The counterparty's unrounded vector t_theirs (K × 1)
    pub t_theirs: Matrix,
    /// Own secret, L × 1 with coefficients in [−η, η]
    pub s1: Matrix,
    /// Own secret, K × 1 with coefficients in [−η, η]
    pub s2: Matrix,
}

impl Drop for PrivateKeyShare {
    fn drop(&mut self) {
        self.s1.zeroize();
        self.s2.zeroize();
    }
}

impl ZeroizeOnDrop for PrivateKeyShare {}

/// Joint signature
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Combined response z = z_mine + z_theirs (L × 1)
    pub z: Matrix,
    /// Combined commitment (c1, c2)
    pub c: (Matrix, Matrix),
    /// Combined commitment randomness
    pub r: Matrix,
    /// Hint (h1, h2) from the verifier's high bits to the committed ones
    pub h: (Matrix, Matrix),
}
