//! Polynomials in the cyclotomic ring R_q = Z_q[X]/(X^256 + 1)
//!
//! A [`Polynomial`] holds exactly [`N`] integer coefficients and a
//! [`Domain`] tag telling whether they are ordinary coefficients or NTT
//! evaluations. Binary operations require matching tags and fail fast with
//! [`TopcoatError::DomainMismatch`] otherwise; transforming twice in the same
//! direction fails with [`TopcoatError::InvalidDomain`].
//!
//! Reduced results are representatives in [0, q). The `_unreduced`
//! variants keep plain integer arithmetic; the hint mechanism depends on
//! them to carry exact differences.

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{Result, TopcoatError};
use crate::modular_arithmetic::{
    centered, centered_magnitude, centered_modulo, decompose, exceeds_bound, from_montgomery,
    power2round, reduce,
};
use crate::ntt;
use crate::params::{N, Q};

/// Representation of a polynomial's coefficient vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Coefficient,
    Ntt,
}

/// Wire form of a polynomial, validated on the way in.
#[derive(Serialize, Deserialize)]
struct RawPolynomial {
    coeffs: Vec<i64>,
    domain: Domain,
}

/// An element of R_q.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPolynomial", into = "RawPolynomial")]
pub struct Polynomial {
    coeffs: Vec<i64>,
    domain: Domain,
}

impl TryFrom<RawPolynomial> for Polynomial {
    type Error = TopcoatError;

    fn try_from(raw: RawPolynomial) -> Result<Self> {
        if raw.coeffs.len() != N {
            return Err(TopcoatError::InvalidDimension {
                expected: (N, 1),
                got: (raw.coeffs.len(), 1),
            });
        }
        Ok(Self {
            coeffs: raw.coeffs,
            domain: raw.domain,
        })
    }
}

impl From<Polynomial> for RawPolynomial {
    fn from(poly: Polynomial) -> Self {
        Self {
            coeffs: poly.coeffs,
            domain: poly.domain,
        }
    }
}

impl Polynomial {
    /// The zero polynomial in the coefficient domain.
    pub fn zero() -> Self {
        Self {
            coeffs: vec![0; N],
            domain: Domain::Coefficient,
        }
    }

    /// The constant polynomial `c`.
    pub fn constant(c: i64) -> Self {
        let mut poly = Self::zero();
        poly.coeffs[0] = c;
        poly
    }

    /// Builds a coefficient-domain polynomial, right-padding with zeros.
    ///
    /// # Errors
    /// `InvalidDimension` if more than [`N`] coefficients are given.
    pub fn from_coefficients(coeffs: &[i64]) -> Result<Self> {
        Self::from_coefficients_in(coeffs, Domain::Coefficient)
    }

    pub fn from_coefficients_in(coeffs: &[i64], domain: Domain) -> Result<Self> {
        if coeffs.len() > N {
            return Err(TopcoatError::InvalidDimension {
                expected: (N, 1),
                got: (coeffs.len(), 1),
            });
        }
        let mut padded = coeffs.to_vec();
        padded.resize(N, 0);
        Ok(Self {
            coeffs: padded,
            domain,
        })
    }

    /// Wraps a vector already known to hold exactly [`N`] coefficients.
    pub(crate) fn from_raw(coeffs: Vec<i64>, domain: Domain) -> Self {
        debug_assert_eq!(coeffs.len(), N);
        Self { coeffs, domain }
    }

    pub fn coefficients(&self) -> &[i64] {
        &self.coeffs
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn is_ntt(&self) -> bool {
        self.domain == Domain::Ntt
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }

    fn ensure_same_domain(&self, other: &Self) -> Result<()> {
        if self.domain != other.domain {
            return Err(TopcoatError::DomainMismatch);
        }
        Ok(())
    }

    fn zip_with(&self, other: &Self, f: impl Fn(i64, i64) -> i64) -> Result<Self> {
        self.ensure_same_domain(other)?;
        Ok(Self {
            coeffs: self
                .coeffs
                .iter()
                .zip(other.coeffs.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
            domain: self.domain,
        })
    }

    /// Coefficient-wise map, keeping the domain tag.
    pub fn map(&self, f: impl Fn(i64) -> i64) -> Self {
        Self {
            coeffs: self.coeffs.iter().map(|&c| f(c)).collect(),
            domain: self.domain,
        }
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| reduce(a + b))
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| reduce(a - b))
    }

    pub fn add_unreduced(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a + b)
    }

    pub fn sub_unreduced(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Multiplies every coefficient by an integer, reducing mod q.
    pub fn scale(&self, scalar: i64) -> Self {
        let scalar = centered(scalar);
        self.map(|c| reduce(centered(c) * scalar))
    }

    /// Multiplies every coefficient by an integer without reduction.
    pub fn scale_unreduced(&self, scalar: i64) -> Self {
        self.map(|c| c * scalar)
    }

    /// Ring product in the operands' own domain.
    ///
    /// - both `Coefficient`: schoolbook negacyclic convolution, O(n²)
    /// - both `Ntt`: pointwise Montgomery product, O(n)
    ///
    /// # Errors
    /// `DomainMismatch` when the tags differ.
    pub fn multiply(&self, other: &Self) -> Result<Self> {
        self.ensure_same_domain(other)?;
        match self.domain {
            Domain::Coefficient => Ok(self.multiply_schoolbook_unchecked(other)),
            Domain::Ntt => Ok(Self {
                coeffs: ntt::pointwise(&self.coeffs, &other.coeffs),
                domain: Domain::Ntt,
            }),
        }
    }

    /// Schoolbook multiplication of two coefficient-domain polynomials.
    ///
    /// Uses X^n = −1: the contribution a_i·b_j lands on X^(i+j) when
    /// i + j < n, and with flipped sign on X^(i+j−n) otherwise.
    pub fn multiply_schoolbook(&self, other: &Self) -> Result<Self> {
        self.expect_domain(Domain::Coefficient)?;
        other.expect_domain(Domain::Coefficient)?;
        Ok(self.multiply_schoolbook_unchecked(other))
    }

    fn multiply_schoolbook_unchecked(&self, other: &Self) -> Self {
        let a: Vec<i64> = self.coeffs.iter().map(|&c| centered(c)).collect();
        let b: Vec<i64> = other.coeffs.iter().map(|&c| centered(c)).collect();
        // |a_i·b_j| ≤ q²/4 and at most n terms per slot: well inside i64
        let mut acc = vec![0i64; N];
        for i in 0..N {
            for j in 0..N {
                let product = a[i] * b[j];
                if i + j < N {
                    acc[i + j] += product;
                } else {
                    acc[i + j - N] -= product;
                }
            }
        }
        Self {
            coeffs: acc.into_iter().map(reduce).collect(),
            domain: Domain::Coefficient,
        }
    }

    /// Coefficient-domain product computed through the NTT: lift both
    /// operands, multiply pointwise, lower and reduce.
    pub fn multiply_ntt(&self, other: &Self) -> Result<Self> {
        self.expect_domain(Domain::Coefficient)?;
        other.expect_domain(Domain::Coefficient)?;
        self.to_ntt()?.multiply(&other.to_ntt()?)?.from_ntt()
    }

    fn expect_domain(&self, expected: Domain) -> Result<()> {
        if self.domain != expected {
            return Err(TopcoatError::InvalidDomain {
                expected,
                got: self.domain,
            });
        }
        Ok(())
    }

    /// Forward NTT. Fails with `InvalidDomain` if already in NTT form.
    pub fn to_ntt(&self) -> Result<Self> {
        self.expect_domain(Domain::Coefficient)?;
        let mut coeffs = self.coeffs.clone();
        ntt::forward(&mut coeffs);
        Ok(Self {
            coeffs,
            domain: Domain::Ntt,
        })
    }

    /// Inverse NTT. Fails with `InvalidDomain` unless in NTT form.
    ///
    /// `a.to_ntt()?.from_ntt()?` equals a·R; apply
    /// [`Polynomial::from_montgomery`] to recover a.
    pub fn from_ntt(&self) -> Result<Self> {
        self.expect_domain(Domain::Ntt)?;
        let mut coeffs = self.coeffs.clone();
        ntt::inverse(&mut coeffs);
        Ok(Self {
            coeffs,
            domain: Domain::Coefficient,
        })
    }

    pub fn from_montgomery(&self) -> Self {
        self.map(|c| reduce(from_montgomery(c)))
    }

    /// Reduces every coefficient into [0, q).
    pub fn reduced(&self) -> Self {
        self.map(reduce)
    }

    /// Centered representatives in (−q/2, q/2].
    pub fn centered(&self) -> Self {
        self.map(centered)
    }

    /// (high, low) with low ∈ (−2^(d−1), 2^(d−1)] and high = (c − low)/2^d.
    pub fn power2round(&self, d: u32) -> (Self, Self) {
        let (high, low): (Vec<i64>, Vec<i64>) =
            self.coeffs.iter().map(|&c| power2round(c, d)).unzip();
        (
            Self {
                coeffs: high,
                domain: self.domain,
            },
            Self {
                coeffs: low,
                domain: self.domain,
            },
        )
    }

    pub fn high_bits(&self, alpha: i64) -> Self {
        self.map(|c| decompose(c, alpha, Q).0)
    }

    pub fn low_bits(&self, alpha: i64) -> Self {
        self.map(|c| decompose(c, alpha, Q).1)
    }

    /// Coefficient-wise centered remainder modulo `m`.
    pub fn centered_modulo(&self, m: i64) -> Self {
        self.map(|c| centered_modulo(c, m))
    }

    /// Largest centered coefficient magnitude.
    pub fn inf_norm(&self) -> i64 {
        self.coeffs
            .iter()
            .map(|&c| centered_magnitude(c))
            .max()
            .unwrap_or(0)
    }

    /// True if every raw coefficient lies strictly inside (−bound, bound).
    ///
    /// Unlike [`Polynomial::check_norm_bound`] this looks at the stored
    /// integers, not their residues, so it bounds what unreduced
    /// arithmetic on them can reach.
    pub fn within(&self, bound: i64) -> bool {
        let bound = bound.unsigned_abs();
        self.coeffs.iter().all(|c| c.unsigned_abs() < bound)
    }

    /// True (reject) if any centered coefficient magnitude reaches `bound`.
    pub fn check_norm_bound(&self, bound: i64) -> bool {
        self.coeffs.iter().any(|&c| exceeds_bound(c, bound))
    }
}

impl Zeroize for Polynomial {
    fn zeroize(&mut self) {
        self.coeffs.as_mut_slice().zeroize();
    }
}
