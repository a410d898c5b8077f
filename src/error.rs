use thiserror::Error;

use crate::communication::Control;
use crate::cyclotomic_ring::Domain;

/// Coarse classification of a [`TopcoatError`].
///
/// Callers driving the protocol only need to know which of these three
/// situations they are in; the concrete variant carries the diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The transport is broken. Not recoverable inside the protocol.
    ChannelFailure,
    /// The counterparty aborted, or a local integrity check failed.
    ProtocolViolation,
    /// A candidate session was rejected; the signer resamples.
    RejectionRetry,
    /// Misuse of the API: mismatched domains or shapes, bad parameters.
    Usage,
}

impl ErrorKind {
    /// Everything except [`ErrorKind::RejectionRetry`] ends the run.
    pub fn is_fatal(self) -> bool {
        !matches!(self, ErrorKind::RejectionRetry)
    }
}

#[derive(Error, Debug)]
pub enum TopcoatError {
    #[error("Invalid domain: expected {expected:?}, got {got:?}")]
    InvalidDomain { expected: Domain, got: Domain },

    #[error("Operands are in different domains")]
    DomainMismatch,

    #[error("Invalid dimension: expected {expected:?}, got {got:?}")]
    InvalidDimension {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Channel failure: {0}")]
    ChannelFailure(String),

    #[error("The other side sent: {}", .0.as_str())]
    CounterpartyAbort(Control),

    #[error("The other side sent an invalid reveal of {0}")]
    InvalidReveal(&'static str),

    #[error("Commitment opening failed")]
    CommitmentOpeningFailed,

    #[error("Norm bound violation: {what} reached bound {bound}")]
    NormBoundViolation { what: &'static str, bound: i64 },

    #[error("Coefficient outside (-{bound}, {bound})")]
    CoefficientOutOfRange { bound: i64 },

    #[error("Unexpected message: expected {expected}, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },

    #[error("No jointly accepted session in iteration {iteration}")]
    RejectionRetry { iteration: usize },

    #[error("Retry budget exhausted after {iterations} iterations")]
    RetryBudgetExhausted { iterations: usize },

    #[error("Worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TopcoatError>;

impl TopcoatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ChannelFailure(_) | Self::Serialization(_) | Self::Io(_) => {
                ErrorKind::ChannelFailure
            }
            Self::CounterpartyAbort(_)
            | Self::InvalidReveal(_)
            | Self::CommitmentOpeningFailed
            | Self::NormBoundViolation { .. }
            | Self::CoefficientOutOfRange { .. }
            | Self::UnexpectedMessage { .. } => ErrorKind::ProtocolViolation,
            Self::RejectionRetry { .. } => ErrorKind::RejectionRetry,
            Self::InvalidDomain { .. }
            | Self::DomainMismatch
            | Self::InvalidDimension { .. }
            | Self::InvalidParameters(_)
            | Self::WorkerPool(_)
            | Self::RetryBudgetExhausted { .. } => ErrorKind::Usage,
        }
    }
}

impl From<bincode::Error> for TopcoatError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(format!("bincode: {}", err))
    }
}

impl From<serde_json::Error> for TopcoatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("json: {}", err))
    }
}
