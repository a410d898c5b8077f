//! Public parameters for the two-party signing system
//!
//! The ring R_q = Z_q[X]/(X^256 + 1) with q = 8380417 is fixed: the NTT
//! twiddle table in [`crate::ntt`] is specific to this modulus. Everything
//! else (module ranks, rejection bounds, commitment dimensions, the number
//! of parallel candidate sessions Θ) is carried in [`Params`], which can be
//! built in code or loaded from JSON and is validated before use.
//!
//! The default set is the NIST level 2 inspired configuration:
//!
//! | name          | value   | meaning                                   |
//! |---------------|---------|-------------------------------------------|
//! | `d`           | 13      | bits dropped from t                       |
//! | `k` × `l`     | 4 × 4   | shape of the public matrix A              |
//! | `eta`         | 2       | secret coefficient bound                  |
//! | `tau`         | 39      | number of ±1 in a challenge               |
//! | `beta`        | 78      | bound on the coefficients of c·s          |
//! | `gamma`       | 2^17    | masking / rejection bound                 |
//! | `gamma_prime` | 95232   | (q − 1)/88, half the high-bits step       |

use serde::{Deserialize, Serialize};

use crate::error::{Result, TopcoatError};

/// Ring dimension n
pub const N: usize = 256;

/// Prime modulus q = 2^23 − 2^13 + 1
pub const Q: i64 = 8380417;

/// Dimensions and norm bound of the commitment scheme.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentParams {
    /// Length of the randomness vector r
    pub k: usize,
    /// Rows of A1 (the size of its identity block)
    pub n: usize,
    /// Length of the committed message (must equal the signing `k`)
    pub l: usize,
    /// Bound on the randomness coefficients and on the opened message norm
    pub beta: i64,
}

impl Default for CommitmentParams {
    fn default() -> Self {
        Self {
            k: 15,
            n: 5,
            l: 4,
            beta: 256,
        }
    }
}

/// Tunable parameter set shared by both parties.
///
/// Both co-signers must run with identical parameters; nothing in the
/// protocol negotiates them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Θ: candidate sessions sampled per retry iteration
    pub parallel_sessions: usize,
    pub d: u32,
    pub k: usize,
    pub l: usize,
    pub eta: i64,
    pub tau: usize,
    pub beta: i64,
    pub gamma: i64,
    pub gamma_prime: i64,
    pub commitment: CommitmentParams,
    /// Upper bound on RESTART iterations; `None` means unbounded.
    pub max_iterations: Option<usize>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            parallel_sessions: 5,
            d: 13,
            k: 4,
            l: 4,
            eta: 2,
            tau: 39,
            beta: 78,
            gamma: 131_072,
            gamma_prime: 95_232,
            commitment: CommitmentParams::default(),
            max_iterations: Some(64),
        }
    }
}

impl Params {
    /// Loads a parameter set from JSON. Missing keys take their default.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Checks the algebraic constraints the protocol relies on.
    ///
    /// # Errors
    /// `InvalidParameters` naming the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(TopcoatError::InvalidParameters(msg));

        if self.parallel_sessions == 0 {
            return fail("parallel_sessions must be at least 1".to_string());
        }
        if self.k == 0 || self.l == 0 {
            return fail(format!("matrix shape {}x{} is empty", self.k, self.l));
        }
        if self.d == 0 || self.d >= 23 {
            return fail(format!("d = {} outside 1..23", self.d));
        }
        if self.eta < 1 {
            return fail(format!("eta = {} must be positive", self.eta));
        }
        if self.tau == 0 || self.tau > N {
            return fail(format!("tau = {} outside 1..={}", self.tau, N));
        }
        if self.gamma_prime <= 0 || (Q - 1) % (2 * self.gamma_prime) != 0 {
            return fail(format!(
                "2 * gamma_prime = {} does not divide q - 1",
                2 * self.gamma_prime
            ));
        }
        if self.beta < 1 || self.beta >= self.gamma || self.beta >= self.gamma_prime {
            return fail(format!(
                "beta = {} must lie in 1..min(gamma, gamma_prime)",
                self.beta
            ));
        }
        if self.commitment.l != self.k {
            return fail(format!(
                "commitment message length {} differs from k = {}",
                self.commitment.l, self.k
            ));
        }
        if self.commitment.k <= self.commitment.n + self.commitment.l {
            return fail(format!(
                "commitment k = {} must exceed n + l = {}",
                self.commitment.k,
                self.commitment.n + self.commitment.l
            ));
        }
        if self.commitment.beta < 1 {
            return fail("commitment beta must be positive".to_string());
        }
        if self.max_iterations == Some(0) {
            return fail("max_iterations must be at least 1".to_string());
        }
        Ok(())
    }

    /// Step used for the high/low bits decomposition of w: 2γ'
    pub fn high_bits_alpha(&self) -> i64 {
        2 * self.gamma_prime
    }

    /// Divisor used by the hint: (q − 1)/(2γ')
    pub fn hint_alpha(&self) -> i64 {
        (Q - 1) / self.high_bits_alpha()
    }
}
