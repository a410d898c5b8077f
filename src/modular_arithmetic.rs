//! Scalar modular arithmetic over Z_q, q = 8380417
//!
//! Two representations are in use throughout the crate:
//! - standard: representatives in [0, q), produced by [`reduce`]
//! - centered: representatives in (−q/2, q/2], produced by [`centered`]
//!
//! Montgomery arithmetic uses R = 2^32. [`montgomery_reduce`] maps a
//! product a·b (|a·b| < 2^31·q) to a·b·R⁻¹ mod q without division; the
//! NTT twiddle factors are stored pre-multiplied by R so the reduction
//! cancels the scaling.
//!
//! All coefficients are carried in `i64`. Inputs to the reductions here are
//! bounded by the callers (see [`crate::ntt`]) so no intermediate product
//! leaves the `i64` range.

use crate::params::Q;

/// q⁻¹ mod 2^32
pub const Q_INV: i64 = 58_728_449;

/// R mod q = 2^32 mod q
pub const MONT_R: i64 = 4_193_792;

/// R² mod q = 2^64 mod q
pub const MONT_R2: i64 = 2_365_951;

/// R⁻¹ mod q
pub const MONT_R_INV: i64 = 8_265_825;

/// Reduces `x` into [0, q).
#[inline]
pub fn reduce(x: i64) -> i64 {
    x.rem_euclid(Q)
}

/// Returns `x mod m` centered around zero: in (−m/2, m/2] for even `m`,
/// in [−(m−1)/2, (m−1)/2] for odd `m`.
#[inline]
pub fn centered_modulo(x: i64, m: i64) -> i64 {
    debug_assert!(m > 0, "modulus must be positive");
    let r = x.rem_euclid(m);
    if r > (m >> 1) {
        r - m
    } else {
        r
    }
}

/// Centered representative modulo q.
#[inline]
pub fn centered(x: i64) -> i64 {
    centered_modulo(x, Q)
}

/// Montgomery reduction: a ↦ a·R⁻¹ mod q, centered in (−q/2, q/2].
///
/// # Mathematical Algorithm
/// 1. t = a·q⁻¹ mod 2^32 (low word, signed)
/// 2. (a − t·q) is divisible by 2^32; shifting yields a·R⁻¹ mod q
/// 3. a final centered reduction fixes the representative
///
/// Valid for |a| < 2^62; the sign-extended low word keeps |t·q| < 2^54.
#[inline]
pub fn montgomery_reduce(a: i64) -> i64 {
    let t = (a as i32).wrapping_mul(Q_INV as i32) as i64;
    let r = (a - t * Q) >> 32;
    centered(r)
}

/// Multiply then reduce: Ra · Rb ↦ Rab
#[inline]
pub fn montgomery_mul(a: i64, b: i64) -> i64 {
    debug_assert!(
        a.unsigned_abs().saturating_mul(b.unsigned_abs()) < (1u64 << 62),
        "montgomery_mul operands too large: {} * {}",
        a,
        b
    );
    montgomery_reduce(a * b)
}

/// Enters the Montgomery domain: x ↦ x·R mod q
#[inline]
pub fn to_montgomery(x: i64) -> i64 {
    montgomery_mul(MONT_R2, centered(x))
}

/// Leaves the Montgomery domain: x ↦ x·R⁻¹ mod q
#[inline]
pub fn from_montgomery(x: i64) -> i64 {
    montgomery_reduce(centered(x))
}

/// Splits r into (r1, r0) with r ≡ r1·α + r0 (mod q).
///
/// r0 is the centered remainder of r mod α. When r − r0 = q − 1 the
/// top of the range wraps around to zero: (r1, r0) = (0, r0 − 1). This
/// keeps r1 in [0, (q−1)/α) for α dividing q − 1.
#[inline]
pub fn decompose(r: i64, alpha: i64, q: i64) -> (i64, i64) {
    let r = r.rem_euclid(q);
    let r0 = centered_modulo(r, alpha);
    let high = r - r0;
    if high == q - 1 {
        return (0, r0 - 1);
    }
    let r1 = high / alpha;
    debug_assert_eq!(r, r1 * alpha + r0);
    (r1, r0)
}

/// Splits r mod q into (r1, r0) with r0 ∈ (−2^(d−1), 2^(d−1)] and
/// r1 = (r − r0)/2^d.
#[inline]
pub fn power2round(r: i64, d: u32) -> (i64, i64) {
    let r = reduce(r);
    let r0 = centered_modulo(r, 1 << d);
    ((r - r0) >> d, r0)
}

/// Magnitude of the centered representative of `x` modulo q.
#[inline]
pub fn centered_magnitude(x: i64) -> i64 {
    let r = reduce(x);
    r.min(Q - r)
}

/// True when the centered magnitude of `x` is at least `bound`.
#[inline]
pub fn exceeds_bound(x: i64, bound: i64) -> bool {
    centered_magnitude(x) >= bound
}
