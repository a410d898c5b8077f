//! Number Theoretic Transform over R_q = Z_q[X]/(X^256 + 1)
//!
//! q = 8380417 has a primitive 512-th root of unity ζ = 1753, so X^256 + 1
//! splits completely and multiplication in R_q becomes pointwise
//! multiplication of the 256 evaluations.
//!
//! Mathematical Foundation:
//! - Forward transform: Cooley-Tukey butterflies, standard order in,
//!   bit-reversed order out
//! - Inverse transform: Gentleman-Sande butterflies followed by a scalar
//!   correction with f = R²/256 mod q
//! - Twiddle factors ζ^brv(k)·R mod q are precomputed at compile time, so
//!   every butterfly multiplication is a single Montgomery reduction
//!
//! Scaling: the forward transform is exact. A pointwise product carries a
//! factor R⁻¹ and the inverse transform a factor R, so
//! `inverse(pointwise(forward(a), forward(b)))` equals a·b exactly, while
//! `inverse(forward(a))` equals a·R and needs a Montgomery correction.
//!
//! Coefficient bounds: inputs are centered before each transform, so the
//! forward pass stays below 4.5q and the inverse pass below 2^8·q/2 in
//! magnitude; every product handed to [`montgomery_mul`] fits in 2^62.

use crate::modular_arithmetic::{centered, montgomery_mul, reduce, MONT_R};
use crate::params::{N, Q};

/// Primitive 512-th root of unity modulo q
pub const ROOT_OF_UNITY: i64 = 1753;

/// R²/256 mod q, undoes the 256-fold scaling of the inverse butterflies
pub const INVERSE_SCALE: i64 = 41_978;

/// Montgomery-scaled twiddle factors; entry 0 is unused.
pub const ZETAS: [i64; N] = compute_zetas();

const fn pow_mod(base: i64, mut exp: usize) -> i64 {
    let mut acc = 1i64;
    let mut base = base % Q;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc * base % Q;
        }
        base = base * base % Q;
        exp >>= 1;
    }
    acc
}

const fn bit_reverse_8(x: usize) -> usize {
    let mut out = 0;
    let mut i = 0;
    while i < 8 {
        out |= ((x >> i) & 1) << (7 - i);
        i += 1;
    }
    out
}

const fn compute_zetas() -> [i64; N] {
    let mut zetas = [0i64; N];
    let mut k = 1;
    while k < N {
        let mont = pow_mod(ROOT_OF_UNITY, bit_reverse_8(k)) * MONT_R % Q;
        zetas[k] = if mont > Q / 2 { mont - Q } else { mont };
        k += 1;
    }
    zetas
}

/// In-place forward NTT. Output in [0, q), bit-reversed order.
///
/// # Panics
/// If `coeffs.len() != N`.
pub fn forward(coeffs: &mut [i64]) {
    assert_eq!(coeffs.len(), N, "NTT input must have {} coefficients", N);
    for c in coeffs.iter_mut() {
        *c = centered(*c);
    }

    let mut k = 0;
    let mut len = N / 2;
    while len > 0 {
        let mut start = 0;
        while start < N {
            k += 1;
            let zeta = ZETAS[k];
            for j in start..start + len {
                let t = montgomery_mul(zeta, coeffs[j + len]);
                coeffs[j + len] = coeffs[j] - t;
                coeffs[j] += t;
            }
            start += 2 * len;
        }
        len >>= 1;
    }

    for c in coeffs.iter_mut() {
        *c = reduce(*c);
    }
}

/// In-place inverse NTT, including the multiplication by R/256.
/// Output in [0, q), standard order.
///
/// # Panics
/// If `coeffs.len() != N`.
pub fn inverse(coeffs: &mut [i64]) {
    assert_eq!(coeffs.len(), N, "NTT input must have {} coefficients", N);
    for c in coeffs.iter_mut() {
        *c = centered(*c);
    }

    let mut k = N;
    let mut len = 1;
    while len < N {
        let mut start = 0;
        while start < N {
            k -= 1;
            let zeta = -ZETAS[k];
            for j in start..start + len {
                let t = coeffs[j];
                coeffs[j] = t + coeffs[j + len];
                coeffs[j + len] = montgomery_mul(zeta, t - coeffs[j + len]);
            }
            start += 2 * len;
        }
        len <<= 1;
    }

    for c in coeffs.iter_mut() {
        *c = reduce(montgomery_mul(*c, INVERSE_SCALE));
    }
}

/// Pointwise product of two NTT-domain coefficient vectors, a·b·R⁻¹.
pub fn pointwise(a: &[i64], b: &[i64]) -> Vec<i64> {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| reduce(montgomery_mul(centered(x), centered(y))))
        .collect()
}
