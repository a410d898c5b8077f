//! Stateless single-key verification
//!
//! A joint signature verifies exactly like an ordinary one: the verifier
//! never learns that two parties produced it.

use tracing::debug;

use crate::challenge_generation::{commitment_key_seed, derive_challenge};
use crate::commitment::CommitmentKeys;
use crate::error::{Result, TopcoatError};
use crate::hint::use_hint;
use crate::params::{Params, Q};
use crate::types::{PublicKey, Signature};

/// Checks `signature` on `message` under `pk`.
///
/// # Algorithm
/// 1. (A1, A2) from hash4(message ‖ pk)
/// 2. c = hash0(message ‖ c1 ‖ c2 ‖ pk)
/// 3. wH = HighBits(A·z − t1·c·2^d, 2γ')
/// 4. wH_roof = UseHint(wH, h)
/// 5. accept iff (c1, c2) opens to wH_roof under r and ‖z‖∞ < 2(γ − β)
///
/// # Errors
/// Only for unusable inputs: invalid `params`, or a public key of the
/// wrong shape. A malformed signature, including one with coefficients
/// outside their range, is rejected with `Ok(false)`.
pub fn verify(
    params: &Params,
    message: &[u8],
    signature: &Signature,
    pk: &PublicKey,
) -> Result<bool> {
    params.validate()?;
    pk.a.expect_shape((params.k, params.l))?;
    pk.t1.expect_shape((params.k, 1))?;

    match check(params, message, signature, pk) {
        Ok(accepted) => Ok(accepted),
        Err(err) => {
            debug!(error = %err, "rejecting malformed signature");
            Ok(false)
        }
    }
}

fn check(params: &Params, message: &[u8], signature: &Signature, pk: &PublicKey) -> Result<bool> {
    let Signature { z, c: (c1, c2), r, h: (h1, h2) } = signature;
    z.expect_shape((params.l, 1))?;
    r.expect_shape((params.commitment.k, 1))?;
    h1.expect_shape((params.k, 1))?;
    h2.expect_shape((params.k, 1))?;
    let alpha = params.hint_alpha();
    let ranges = [(z, Q), (r, Q), (c1, Q), (c2, Q), (h1, 2 * Q / alpha), (h2, alpha)];
    if let Some(&(_, bound)) = ranges.iter().find(|(m, bound)| !m.within(*bound)) {
        return Err(TopcoatError::CoefficientOutOfRange { bound });
    }

    let pk_bytes = pk.canonical_bytes()?;
    let seed = commitment_key_seed(message, &pk_bytes);
    let keys = CommitmentKeys::derive(seed, &params.commitment)?;
    let challenge = derive_challenge(message, c1, c2, &pk_bytes, params.tau)?;

    let w_high = pk
        .a
        .matmul(z)?
        .sub(&pk.t1.scale(&challenge)?.scale_int(1 << params.d))?
        .high_bits(params.high_bits_alpha());
    let w_high_roof = use_hint(&w_high, h1, h2, alpha)?;

    let opened = keys.open(c1, c2, &w_high_roof, r, params.commitment.beta);
    let short = !z.check_norm_bound(2 * (params.gamma - params.beta));
    debug!(opened, short, "verified signature");
    Ok(opened && short)
}
