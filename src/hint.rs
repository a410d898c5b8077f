//! Hint encoding between two high-bits vectors
//!
//! The signer knows both the verifier's view `wH` and the value the
//! commitment was opened against, `wH_roof`. The hint is their difference
//! split as `d = h1·α + h2` with `h2` the centered remainder, so the
//! verifier can move from its own view to `wH_roof` exactly:
//!
//! ```text
//! use_hint(r, hint(r, r', α), α) == r'
//! ```
//!
//! All arithmetic here is unreduced; the law holds over the integers.

use crate::error::Result;
use crate::lattice::Matrix;

/// Encodes `r − r_prime` as `(h1, h2)` with `h2 ∈ (−α/2, α/2]`.
pub fn hint(r: &Matrix, r_prime: &Matrix, alpha: i64) -> Result<(Matrix, Matrix)> {
    let d = r.sub_unreduced(r_prime)?;
    let h2 = d.centered_modulo(alpha);
    let h1 = d.sub_unreduced(&h2)?.map_coefficients(|c| c / alpha);
    Ok((h1, h2))
}

/// `r − (h1·α + h2)`
pub fn use_hint(r: &Matrix, h1: &Matrix, h2: &Matrix, alpha: i64) -> Result<Matrix> {
    let d = h1.scale_int_unreduced(alpha).add_unreduced(h2)?;
    r.sub_unreduced(&d)
}
