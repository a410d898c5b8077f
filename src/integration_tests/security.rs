// Abort, restart and channel-failure behaviour
//
// A dishonest or broken counterparty is simulated by wrapping one party's
// communicator so that it alters a chosen outgoing message. The honest
// side must detect the change, send `abort` and fail; the dishonest side
// must then fail with CounterpartyAbort. Neither may return a signature.

use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRng, RngCore, SeedableRng};

use super::{keygen_pair, run_parties, seeded_rngs, sign_pair, sign_pair_with, KeyPair, MESSAGE};
use crate::challenge_generation::hash1;
use crate::communication::{Communicator, Control, Message, QueueCommunicator};
use crate::error::{ErrorKind, Result, TopcoatError};
use crate::lattice::Matrix;
use crate::params::{Params, Q};
use crate::protocol::{NormBoundRejection, Party, RejectionPolicy};
use crate::types::Signature;
use crate::verify::verify;

/// Rewrites the first outgoing message that `tamper` changes.
struct Tampering<F> {
    inner: QueueCommunicator,
    tamper: F,
    done: bool,
}

impl<F: FnMut(Message) -> (Message, bool)> Communicator for Tampering<F> {
    fn send(&mut self, message: Message) -> Result<()> {
        let message = if self.done {
            message
        } else {
            let (message, changed) = (self.tamper)(message);
            self.done = changed;
            message
        };
        self.inner.send(message)
    }

    fn get(&mut self) -> Result<Message> {
        self.inner.get()
    }
}

fn shift(matrix: &Matrix) -> Matrix {
    matrix.map_coefficients(|c| (c + 1) % Q)
}

fn sign_with_tampering_bob<F>(
    params: &Params,
    keys: &(KeyPair, KeyPair),
    tamper: F,
) -> (Result<Signature>, Result<Signature>)
where
    F: FnMut(Message) -> (Message, bool) + Send + 'static,
{
    let alice = Party::new("alice", params.clone()).unwrap();
    let bob = Party::new("bob", params.clone()).unwrap();
    let ((pk_a, sk_a), (pk_b, sk_b)) = keys.clone();
    run_parties(
        move |mut comm| {
            let mut rng = ChaCha20Rng::seed_from_u64(40);
            alice.sign(&mut comm, &mut rng, MESSAGE, &pk_a, &sk_a)
        },
        move |comm| {
            let mut comm = Tampering {
                inner: comm,
                tamper,
                done: false,
            };
            let mut rng = ChaCha20Rng::seed_from_u64(41);
            bob.sign(&mut comm, &mut rng, MESSAGE, &pk_b, &sk_b)
        },
    )
}

fn assert_counterparty_abort<T: std::fmt::Debug>(result: Result<T>) {
    match result {
        Err(TopcoatError::CounterpartyAbort(Control::Abort)) => {}
        other => panic!("expected counterparty abort, got {other:?}"),
    }
}

#[test]
fn test_invalid_matrix_reveal_aborts_keygen() {
    let params = Params::default();
    let alice = Party::new("alice", params.clone()).unwrap();
    let bob = Party::new("bob", params).unwrap();

    let (result_a, result_b) = run_parties(
        move |mut comm| alice.keygen(&mut comm, &mut ChaCha20Rng::seed_from_u64(1)),
        move |comm| {
            let mut comm = Tampering {
                inner: comm,
                tamper: |message| match message {
                    Message::Matrix(a) => (Message::Matrix(shift(&a)), true),
                    other => (other, false),
                },
                done: false,
            };
            bob.keygen(&mut comm, &mut ChaCha20Rng::seed_from_u64(2))
        },
    );

    let err = result_a.unwrap_err();
    assert!(matches!(err, TopcoatError::InvalidReveal("matrix A")));
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    assert_counterparty_abort(result_b);
}

#[test]
fn test_invalid_batch_reveal_aborts_sign() {
    let params = Params::default();
    let keys = keygen_pair(&params);
    let (result_a, result_b) = sign_with_tampering_bob(&params, &keys, |message| match message {
        Message::CommitmentBatch(mut batch) => {
            batch[0].0 = shift(&batch[0].0);
            (Message::CommitmentBatch(batch), true)
        }
        other => (other, false),
    });

    assert!(matches!(
        result_a,
        Err(TopcoatError::InvalidReveal("commitment batch"))
    ));
    assert_counterparty_abort(result_b);
}

#[test]
fn test_forged_response_fails_opening() {
    let params = Params::default();
    let keys = keygen_pair(&params);
    let (result_a, result_b) = sign_with_tampering_bob(&params, &keys, |message| match message {
        Message::Response { z, r } => (Message::Response { z: shift(&z), r }, true),
        other => (other, false),
    });

    let err = result_a.unwrap_err();
    assert!(
        matches!(
            err,
            TopcoatError::CommitmentOpeningFailed | TopcoatError::NormBoundViolation { .. }
        ),
        "unexpected error {err:?}"
    );
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    assert_counterparty_abort(result_b);
}

#[test]
fn test_out_of_range_matrix_aborts_keygen() {
    let params = Params::default();
    let alice = Party::new("alice", params.clone()).unwrap();
    let huge = Matrix::zeros(params.k, params.l).map_coefficients(|_| i64::MAX - 5);

    // commit to the oversized matrix honestly so only the range check can catch it
    let (result_a, last_b) = run_parties(
        move |mut comm| alice.keygen(&mut comm, &mut ChaCha20Rng::seed_from_u64(1)),
        move |mut comm: QueueCommunicator| {
            let digest = hash1(&huge.canonical_bytes().unwrap());
            comm.send(Message::Digest(digest)).unwrap();
            comm.get().unwrap();
            comm.send(Message::Matrix(huge)).unwrap();
            comm.get().unwrap();
            comm.get()
        },
    );

    let err = result_a.unwrap_err();
    assert!(matches!(err, TopcoatError::CoefficientOutOfRange { bound: Q }));
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    assert_eq!(last_b.unwrap(), Message::Control(Control::Abort));
}

#[test]
fn test_out_of_range_response_aborts_sign() {
    let params = Params::default();
    let keys = keygen_pair(&params);
    // same residues as the honest response, outside (−q, q)
    let (result_a, result_b) = sign_with_tampering_bob(&params, &keys, |message| match message {
        Message::Response { z, r } => {
            let z = z.map_coefficients(|c| c + 2 * Q);
            (Message::Response { z, r }, true)
        }
        other => (other, false),
    });

    assert!(matches!(
        result_a,
        Err(TopcoatError::CoefficientOutOfRange { bound: Q })
    ));
    assert_counterparty_abort(result_b);
}

#[test]
fn test_counterparty_error_signal() {
    let params = Params::default();
    let alice = Party::new("alice", params).unwrap();
    let (result_a, _) = run_parties(
        move |mut comm| alice.keygen(&mut comm, &mut ChaCha20Rng::seed_from_u64(1)),
        |mut comm: QueueCommunicator| {
            comm.get().unwrap();
            comm.send(Message::Control(Control::Error)).unwrap();
        },
    );
    assert!(matches!(
        result_a,
        Err(TopcoatError::CounterpartyAbort(Control::Error))
    ));
}

#[test]
fn test_closed_channel_is_fatal() {
    let params = Params::default();
    let alice = Party::new("alice", params).unwrap();
    let (result_a, _) = run_parties(
        move |mut comm| alice.keygen(&mut comm, &mut ChaCha20Rng::seed_from_u64(1)),
        drop,
    );
    let err = result_a.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChannelFailure);
    assert!(err.kind().is_fatal());
}

/// Every `fill_bytes` replays the same ChaCha20 stream, so each signing
/// iteration samples exactly the same candidate sessions.
struct ReplayRng {
    seed: [u8; 32],
}

impl RngCore for ReplayRng {
    fn next_u32(&mut self) -> u32 {
        ChaCha20Rng::from_seed(self.seed).next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        ChaCha20Rng::from_seed(self.seed).next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        ChaCha20Rng::from_seed(self.seed).fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for ReplayRng {}

fn replay_rngs() -> (ReplayRng, ReplayRng) {
    (ReplayRng { seed: [5u8; 32] }, ReplayRng { seed: [6u8; 32] })
}

/// Rejects every candidate for the first `iterations` rounds.
#[derive(Clone)]
struct RejectFirst {
    iterations: usize,
}

impl RejectionPolicy for RejectFirst {
    fn reject(&self, params: &Params, iteration: usize, z: &Matrix, w_minus_cs2: &Matrix) -> bool {
        iteration <= self.iterations || NormBoundRejection.reject(params, iteration, z, w_minus_cs2)
    }
}

#[test]
fn test_forced_restarts_reach_the_same_signature() {
    let params = Params {
        parallel_sessions: 12,
        ..Params::default()
    };
    let keys = keygen_pair(&params);

    let (baseline, _) = sign_pair(&params, &keys, MESSAGE, replay_rngs(), NormBoundRejection);
    let baseline = baseline.unwrap();

    let policy = RejectFirst { iterations: 3 };
    let (restarted_a, restarted_b) = sign_pair(&params, &keys, MESSAGE, replay_rngs(), policy);
    let (restarted_a, restarted_b) = (restarted_a.unwrap(), restarted_b.unwrap());

    assert_eq!(restarted_a, baseline);
    assert_eq!(restarted_b, baseline);
    assert!(verify(&params, MESSAGE, &baseline, &keys.0 .0).unwrap());
}

#[test]
fn test_retry_budget_is_enforced() {
    let params = Params {
        parallel_sessions: 2,
        max_iterations: Some(3),
        ..Params::default()
    };
    let keys = keygen_pair(&params);
    let policy = RejectFirst {
        iterations: usize::MAX,
    };
    let (result_a, result_b) = sign_pair(&params, &keys, MESSAGE, seeded_rngs(7, 8), policy);

    for result in [result_a, result_b] {
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            TopcoatError::RetryBudgetExhausted { iterations: 3 }
        ));
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}

#[test]
fn test_one_sided_restart_is_honored() {
    let params = Params {
        parallel_sessions: 12,
        ..Params::default()
    };
    let keys = keygen_pair(&params);
    let (baseline, _) = sign_pair(&params, &keys, MESSAGE, replay_rngs(), NormBoundRejection);
    let baseline = baseline.unwrap();

    // only Bob rejects; Alice must follow his restarts
    let policies = (NormBoundRejection, RejectFirst { iterations: 2 });
    let (sig_a, sig_b) = sign_pair_with(&params, &keys, MESSAGE, replay_rngs(), policies);
    let (sig_a, sig_b) = (sig_a.unwrap(), sig_b.unwrap());
    assert_eq!(sig_a, baseline);
    assert_eq!(sig_b, baseline);
    assert!(verify(&params, MESSAGE, &sig_a, &keys.0 .0).unwrap());

    // both sides count the same restarts
    let budget = Params {
        max_iterations: Some(2),
        ..params
    };
    let policies = (NormBoundRejection, RejectFirst { iterations: 2 });
    let (result_a, result_b) = sign_pair_with(&budget, &keys, MESSAGE, replay_rngs(), policies);
    for result in [result_a, result_b] {
        assert!(matches!(
            result,
            Err(TopcoatError::RetryBudgetExhausted { iterations: 2 })
        ));
    }
}
