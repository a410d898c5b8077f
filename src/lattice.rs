//! Module layer: matrices of ring elements
//!
//! A [`Matrix`] is a rows × cols grid of [`Polynomial`]s. Vectors are
//! column matrices (the public matrix A is K × L, the secret s1 is L × 1).
//! Every operation returns a new matrix; nothing is shared between
//! instances, so values received from the counterparty can never alias
//! local state.
//!
//! The canonical byte form used by every hash is the JSON rendering of the
//! nested coefficient arrays, see [`Matrix::canonical_bytes`].

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::cyclotomic_ring::{Domain, Polynomial};
use crate::error::{Result, TopcoatError};
use crate::modular_arithmetic::reduce;
use crate::ntt;
use crate::params::N;

/// A rectangular grid of polynomials. All rows have equal length.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Polynomial>>", into = "Vec<Vec<Polynomial>>")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    elements: Vec<Vec<Polynomial>>,
}

impl TryFrom<Vec<Vec<Polynomial>>> for Matrix {
    type Error = TopcoatError;

    fn try_from(elements: Vec<Vec<Polynomial>>) -> Result<Self> {
        Self::new(elements)
    }
}

impl From<Matrix> for Vec<Vec<Polynomial>> {
    fn from(matrix: Matrix) -> Self {
        matrix.elements
    }
}

impl Matrix {
    /// Builds a matrix from its rows.
    ///
    /// # Errors
    /// `InvalidDimension` if there are no rows, no columns, or the rows
    /// have different lengths.
    pub fn new(elements: Vec<Vec<Polynomial>>) -> Result<Self> {
        let rows = elements.len();
        let cols = elements.first().map(Vec::len).unwrap_or(0);
        if rows == 0 || cols == 0 {
            return Err(TopcoatError::InvalidDimension {
                expected: (1, 1),
                got: (rows, cols),
            });
        }
        if let Some(bad) = elements.iter().find(|row| row.len() != cols) {
            return Err(TopcoatError::InvalidDimension {
                expected: (rows, cols),
                got: (rows, bad.len()),
            });
        }
        Ok(Self {
            rows,
            cols,
            elements,
        })
    }

    /// Column vector from a list of polynomials.
    pub fn column(entries: Vec<Polynomial>) -> Result<Self> {
        Self::new(entries.into_iter().map(|p| vec![p]).collect())
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            elements: vec![vec![Polynomial::zero(); cols]; rows],
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut m = Self::zeros(size, size);
        for i in 0..size {
            m.elements[i][i] = Polynomial::constant(1);
        }
        m
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Polynomial> {
        self.elements.get(row).and_then(|r| r.get(col))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Polynomial> {
        self.elements.iter().flatten()
    }

    /// Fails with `InvalidDimension` unless the shape is exactly `expected`.
    pub fn expect_shape(&self, expected: (usize, usize)) -> Result<()> {
        if self.shape() != expected {
            return Err(TopcoatError::InvalidDimension {
                expected,
                got: self.shape(),
            });
        }
        Ok(())
    }

    fn zip_with(
        &self,
        other: &Self,
        f: impl Fn(&Polynomial, &Polynomial) -> Result<Polynomial>,
    ) -> Result<Self> {
        other.expect_shape(self.shape())?;
        let elements = self
            .elements
            .iter()
            .zip(other.elements.iter())
            .map(|(a, b)| a.iter().zip(b.iter()).map(|(x, y)| f(x, y)).collect())
            .collect::<Result<Vec<Vec<_>>>>()?;
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            elements,
        })
    }

    /// Applies `f` to every polynomial.
    pub fn map(&self, f: impl Fn(&Polynomial) -> Polynomial) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            elements: self
                .elements
                .iter()
                .map(|row| row.iter().map(&f).collect())
                .collect(),
        }
    }

    fn try_map(&self, f: impl Fn(&Polynomial) -> Result<Polynomial>) -> Result<Self> {
        let elements = self
            .elements
            .iter()
            .map(|row| row.iter().map(&f).collect())
            .collect::<Result<Vec<Vec<_>>>>()?;
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            elements,
        })
    }

    /// Applies `f` to every coefficient of every polynomial.
    pub fn map_coefficients(&self, f: impl Fn(i64) -> i64) -> Self {
        self.map(|p| p.map(&f))
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, Polynomial::add)
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, Polynomial::sub)
    }

    pub fn add_unreduced(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, Polynomial::add_unreduced)
    }

    pub fn sub_unreduced(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, Polynomial::sub_unreduced)
    }

    /// Multiplies every entry by an integer, reducing mod q.
    pub fn scale_int(&self, scalar: i64) -> Self {
        self.map(|p| p.scale(scalar))
    }

    pub fn scale_int_unreduced(&self, scalar: i64) -> Self {
        self.map(|p| p.scale_unreduced(scalar))
    }

    /// Multiplies every entry by a coefficient-domain polynomial via the NTT.
    pub fn scale(&self, poly: &Polynomial) -> Result<Self> {
        let poly_hat = poly.to_ntt()?;
        self.try_map(|p| p.to_ntt()?.multiply(&poly_hat)?.from_ntt())
    }

    /// Matrix product using schoolbook ring multiplication.
    pub fn matmul_schoolbook(&self, other: &Self) -> Result<Self> {
        self.check_inner(other)?;
        let mut elements = Vec::with_capacity(self.rows);
        for row in &self.elements {
            let mut out_row = Vec::with_capacity(other.cols);
            for j in 0..other.cols {
                let mut acc = Polynomial::zero();
                for (k, a) in row.iter().enumerate() {
                    acc = acc.add(&a.multiply_schoolbook(&other.elements[k][j])?)?;
                }
                out_row.push(acc);
            }
            elements.push(out_row);
        }
        Self::new(elements)
    }

    /// NTT-accelerated matrix product.
    ///
    /// Both operands are lifted to the NTT domain once, each inner product
    /// is accumulated pointwise, then lowered and reduced into [0, q). The
    /// result equals [`Matrix::matmul_schoolbook`] exactly.
    pub fn matmul(&self, other: &Self) -> Result<Self> {
        self.check_inner(other)?;
        let lhs = self.to_ntt()?;
        let rhs = other.to_ntt()?;

        let elements = lhs
            .elements
            .iter()
            .map(|row| {
                (0..rhs.cols)
                    .map(|j| {
                        let mut acc = vec![0i64; N];
                        for (k, a) in row.iter().enumerate() {
                            let product =
                                ntt::pointwise(a.coefficients(), rhs.elements[k][j].coefficients());
                            for (slot, p) in acc.iter_mut().zip(product) {
                                *slot = reduce(*slot + p);
                            }
                        }
                        Polynomial::from_raw(acc, Domain::Ntt).from_ntt()
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(elements)
    }

    fn check_inner(&self, other: &Self) -> Result<()> {
        if self.cols != other.rows {
            return Err(TopcoatError::InvalidDimension {
                expected: (self.cols, other.cols),
                got: other.shape(),
            });
        }
        if let Some(p) = self.iter().chain(other.iter()).find(|p| p.is_ntt()) {
            return Err(TopcoatError::InvalidDomain {
                expected: Domain::Coefficient,
                got: p.domain(),
            });
        }
        Ok(())
    }

    /// Horizontal concatenation `self | other`.
    pub fn augment(&self, other: &Self) -> Result<Self> {
        if self.rows != other.rows {
            return Err(TopcoatError::InvalidDimension {
                expected: (self.rows, other.cols),
                got: other.shape(),
            });
        }
        let elements = self
            .elements
            .iter()
            .zip(other.elements.iter())
            .map(|(a, b)| a.iter().chain(b.iter()).cloned().collect())
            .collect();
        Self::new(elements)
    }

    pub fn transpose(&self) -> Self {
        let elements = (0..self.cols)
            .map(|j| (0..self.rows).map(|i| self.elements[i][j].clone()).collect())
            .collect();
        Self {
            rows: self.cols,
            cols: self.rows,
            elements,
        }
    }

    pub fn to_ntt(&self) -> Result<Self> {
        self.try_map(Polynomial::to_ntt)
    }

    pub fn from_ntt(&self) -> Result<Self> {
        self.try_map(Polynomial::from_ntt)
    }

    pub fn reduced(&self) -> Self {
        self.map(Polynomial::reduced)
    }

    /// Entry-wise centered representatives modulo `m`.
    pub fn centered_modulo(&self, m: i64) -> Self {
        self.map(|p| p.centered_modulo(m))
    }

    /// Maximum centered coefficient magnitude over all entries.
    pub fn inf_norm(&self) -> i64 {
        self.iter().map(Polynomial::inf_norm).max().unwrap_or(0)
    }

    /// √(Σ ‖entry‖∞²): the Euclidean norm of the per-entry infinity norms.
    pub fn second_norm(&self) -> f64 {
        self.iter()
            .map(|p| {
                let n = p.inf_norm() as f64;
                n * n
            })
            .sum::<f64>()
            .sqrt()
    }

    /// True if every stored coefficient lies strictly inside (−bound, bound).
    pub fn within(&self, bound: i64) -> bool {
        self.iter().all(|p| p.within(bound))
    }

    /// True (reject) if any coefficient's centered magnitude reaches `bound`.
    pub fn check_norm_bound(&self, bound: i64) -> bool {
        self.iter().any(|p| p.check_norm_bound(bound))
    }

    /// Entry-wise power-of-two rounding into (high, low).
    pub fn power2round(&self, d: u32) -> (Self, Self) {
        let (high, low): (Vec<Vec<_>>, Vec<Vec<_>>) = self
            .elements
            .iter()
            .map(|row| row.iter().map(|p| p.power2round(d)).unzip())
            .unzip();
        (
            Self {
                rows: self.rows,
                cols: self.cols,
                elements: high,
            },
            Self {
                rows: self.rows,
                cols: self.cols,
                elements: low,
            },
        )
    }

    pub fn high_bits(&self, alpha: i64) -> Self {
        self.map(|p| p.high_bits(alpha))
    }

    pub fn low_bits(&self, alpha: i64) -> Self {
        self.map(|p| p.low_bits(alpha))
    }

    /// Coefficient arrays, rows × cols × N.
    pub fn coefficients(&self) -> Vec<Vec<&[i64]>> {
        self.elements
            .iter()
            .map(|row| row.iter().map(Polynomial::coefficients).collect())
            .collect()
    }

    /// Canonical serialization: JSON `[[[c0, …, c255], …], …]`.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.coefficients())?)
    }
}

impl Zeroize for Matrix {
    fn zeroize(&mut self) {
        self.elements.iter_mut().flatten().for_each(Zeroize::zeroize);
    }
}
