//! Co-signer façade and the message patterns shared by keygen and sign
//!
//! Both interactive operations are built from the same three moves:
//!
//! 1. commit-then-reveal: send `H(x)`, receive `H(x')`, only then send `x`
//!    and receive `x'`, and check `x'` against `H(x')`
//! 2. confirmation: after every successful local check send `ok` and wait
//!    for the counterparty's `ok`
//! 3. abort: before any fatal local failure send `abort`
//!
//! A [`Party`] carries the name used in log spans, the parameter set and
//! the worker pool used for candidate-session sampling.

use rand_core::{CryptoRng, RngCore};
use rayon::{ThreadPool, ThreadPoolBuilder};
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};

use crate::challenge_generation::{commitment_batch_bytes, Digest};
use crate::communication::{Communicator, Control, Message};
use crate::cyclotomic_ring::Domain;
use crate::error::{Result, TopcoatError};
use crate::lattice::Matrix;
use crate::params::{Params, Q};
use crate::types::{PrivateKeyShare, PublicKey, Signature};
use crate::{keygen, sign};

/// Decides whether a candidate response leaks the secret and must be
/// discarded (Fiat-Shamir with aborts).
pub trait RejectionPolicy {
    /// `true` rejects the pair. `z` is the centered candidate response and
    /// `w_minus_cs2` is `w − s2·c` for the same pair.
    fn reject(&self, params: &Params, iteration: usize, z: &Matrix, w_minus_cs2: &Matrix) -> bool;
}

/// The standard checks: ‖z‖∞ < γ − β and ‖LowBits(w − s2·c, 2γ')‖∞ < γ' − β.
#[derive(Clone, Copy, Debug, Default)]
pub struct NormBoundRejection;

impl RejectionPolicy for NormBoundRejection {
    fn reject(&self, params: &Params, _iteration: usize, z: &Matrix, w_minus_cs2: &Matrix) -> bool {
        z.check_norm_bound(params.gamma - params.beta)
            || w_minus_cs2
                .low_bits(params.high_bits_alpha())
                .check_norm_bound(params.gamma_prime - params.beta)
    }
}

/// One of the two co-signers.
pub struct Party {
    name: String,
    params: Params,
    pool: ThreadPool,
}

impl Party {
    /// Validates `params` and sizes the sampling pool to
    /// `min(Θ, available parallelism)`.
    pub fn new(name: impl Into<String>, params: Params) -> Result<Self> {
        params.validate()?;
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(params.parallel_sessions.min(cores))
            .build()?;
        Ok(Self {
            name: name.into(),
            params,
            pool,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Runs the joint key generation against the counterparty on `comm`.
    ///
    /// Both parties end with the same [`PublicKey`] and their own
    /// [`PrivateKeyShare`].
    #[instrument(name = "Topcoat::keygen", level = "info", skip_all, fields(party = %self.name))]
    pub fn keygen<C, R>(&self, comm: &mut C, rng: &mut R) -> Result<(PublicKey, PrivateKeyShare)>
    where
        C: Communicator + ?Sized,
        R: RngCore + CryptoRng,
    {
        keygen::run(&self.params, comm, rng)
    }

    /// Jointly signs `message` with the standard rejection checks.
    pub fn sign<C, R>(
        &self,
        comm: &mut C,
        rng: &mut R,
        message: &[u8],
        pk: &PublicKey,
        sk: &PrivateKeyShare,
    ) -> Result<Signature>
    where
        C: Communicator + ?Sized,
        R: RngCore + CryptoRng,
    {
        self.sign_with_policy(comm, rng, message, pk, sk, &NormBoundRejection)
    }

    /// Jointly signs `message`, deciding candidate rejection with `policy`.
    #[instrument(name = "Topcoat::sign", level = "info", skip_all, fields(party = %self.name))]
    pub fn sign_with_policy<C, R, P>(
        &self,
        comm: &mut C,
        rng: &mut R,
        message: &[u8],
        pk: &PublicKey,
        sk: &PrivateKeyShare,
        policy: &P,
    ) -> Result<Signature>
    where
        C: Communicator + ?Sized,
        R: RngCore + CryptoRng,
        P: RejectionPolicy + ?Sized,
    {
        sign::run(&self.params, &self.pool, comm, rng, message, pk, sk, policy)
    }
}

/// A value that can be committed to by digest and then revealed.
pub(crate) trait Reveal: Sized {
    fn commitment_bytes(&self) -> Result<Vec<u8>>;
    fn to_message(&self) -> Message;
    fn from_message(message: Message) -> Result<Self>;
}

impl Reveal for Matrix {
    fn commitment_bytes(&self) -> Result<Vec<u8>> {
        self.canonical_bytes()
    }

    fn to_message(&self) -> Message {
        Message::Matrix(self.clone())
    }

    fn from_message(message: Message) -> Result<Self> {
        message.into_matrix()
    }
}

impl Reveal for Vec<(Matrix, Matrix)> {
    fn commitment_bytes(&self) -> Result<Vec<u8>> {
        commitment_batch_bytes(self)
    }

    fn to_message(&self) -> Message {
        Message::CommitmentBatch(self.clone())
    }

    fn from_message(message: Message) -> Result<Self> {
        message.into_commitment_batch()
    }
}

/// Shape, domain and coefficient-range check for a matrix received from
/// the counterparty. Accepted coefficients lie in (−q, q), which covers
/// both reduced and centered representatives.
pub(crate) fn expect_received(matrix: &Matrix, shape: (usize, usize)) -> Result<()> {
    matrix.expect_shape(shape)?;
    if let Some(p) = matrix.iter().find(|p| p.is_ntt()) {
        return Err(TopcoatError::InvalidDomain {
            expected: Domain::Coefficient,
            got: p.domain(),
        });
    }
    if !matrix.within(Q) {
        return Err(TopcoatError::CoefficientOutOfRange { bound: Q });
    }
    Ok(())
}

/// Sends `abort` (best effort) and hands back `err` for the caller to return.
pub(crate) fn abort<C: Communicator + ?Sized>(comm: &mut C, err: TopcoatError) -> TopcoatError {
    warn!(error = %err, "aborting protocol");
    if let Err(send_err) = comm.send(Message::Control(Control::Abort)) {
        debug!(error = %send_err, "abort could not be delivered");
    }
    err
}

/// Receives the next message and decodes it. A message of the wrong kind
/// aborts the run; channel failures and counterparty aborts pass through.
pub(crate) fn receive_as<C, T>(comm: &mut C, decode: impl FnOnce(Message) -> Result<T>) -> Result<T>
where
    C: Communicator + ?Sized,
{
    let message = comm.receive()?;
    decode(message).map_err(|err| abort(comm, err))
}

/// Sends `ok` and requires `ok` back.
pub(crate) fn confirm<C: Communicator + ?Sized>(comm: &mut C) -> Result<()> {
    comm.send(Message::Control(Control::Ok))?;
    match receive_as(comm, Message::into_control)? {
        Control::Ok => Ok(()),
        other => Err(abort(
            comm,
            TopcoatError::UnexpectedMessage {
                expected: "ok",
                got: other.as_str(),
            },
        )),
    }
}

/// Commit-then-reveal exchange of `mine` against the counterparty's value.
///
/// `validate` runs on the revealed value before its digest is checked;
/// any failure aborts. On success both sides have confirmed with `ok`.
pub(crate) fn commit_then_reveal<C, T>(
    comm: &mut C,
    mine: &T,
    hash: fn(&[u8]) -> Digest,
    what: &'static str,
    validate: impl FnOnce(&T) -> Result<()>,
) -> Result<T>
where
    C: Communicator + ?Sized,
    T: Reveal,
{
    comm.send(Message::Digest(hash(&mine.commitment_bytes()?)))?;
    let their_digest = receive_as(comm, Message::into_digest)?;
    debug!(what, "exchanged digests");

    comm.send(mine.to_message())?;
    let theirs = receive_as(comm, T::from_message)?;
    debug!(what, "exchanged reveals");

    let recomputed = match validate(&theirs).and_then(|()| theirs.commitment_bytes()) {
        Ok(bytes) => hash(&bytes),
        Err(err) => return Err(abort(comm, err)),
    };
    if !bool::from(recomputed[..].ct_eq(&their_digest[..])) {
        return Err(abort(comm, TopcoatError::InvalidReveal(what)));
    }
    confirm(comm)?;
    debug!(what, "reveal checked");
    Ok(theirs)
}
