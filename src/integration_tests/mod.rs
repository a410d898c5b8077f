// Two-party integration tests
//
// Every test runs the two co-signers on separate threads: Alice on the
// test thread, Bob on a spawned one, connected by a QueueCommunicator pair
// unless the test needs another transport. Randomness is seeded so runs are
// reproducible.

use std::thread;

use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRng, RngCore, SeedableRng};

use crate::communication::QueueCommunicator;
use crate::error::Result;
use crate::params::Params;
use crate::protocol::{Party, RejectionPolicy};
use crate::types::{PrivateKeyShare, PublicKey, Signature};

pub mod end_to_end;
pub mod security;

pub type KeyPair = (PublicKey, PrivateKeyShare);

pub const MESSAGE: &[u8] = b"two parties, one signature";

/// Runs `alice` on this thread and `bob` on a new one, each holding one
/// end of a fresh queue pair.
pub fn run_parties<A, B, RA, RB>(alice: A, bob: B) -> (RA, RB)
where
    A: FnOnce(QueueCommunicator) -> RA,
    B: FnOnce(QueueCommunicator) -> RB + Send + 'static,
    RB: Send + 'static,
{
    let (comm_a, comm_b) = QueueCommunicator::pair();
    let handle = thread::spawn(move || bob(comm_b));
    let result_a = alice(comm_a);
    (result_a, handle.join().expect("bob panicked"))
}

pub fn keygen_pair(params: &Params) -> (KeyPair, KeyPair) {
    let alice = Party::new("alice", params.clone()).unwrap();
    let bob = Party::new("bob", params.clone()).unwrap();
    let (a, b) = run_parties(
        move |mut comm| alice.keygen(&mut comm, &mut ChaCha20Rng::seed_from_u64(1)),
        move |mut comm| bob.keygen(&mut comm, &mut ChaCha20Rng::seed_from_u64(2)),
    );
    (a.unwrap(), b.unwrap())
}

/// Signs `message` with both parties, each with its own rng and a copy of
/// `policy`.
pub fn sign_pair<R, P>(
    params: &Params,
    keys: &(KeyPair, KeyPair),
    message: &'static [u8],
    rngs: (R, R),
    policy: P,
) -> (Result<Signature>, Result<Signature>)
where
    R: RngCore + CryptoRng + Send + 'static,
    P: RejectionPolicy + Clone + Send + 'static,
{
    sign_pair_with(params, keys, message, rngs, (policy.clone(), policy))
}

/// Like [`sign_pair`], with a separate rejection policy for each party.
pub fn sign_pair_with<R, PA, PB>(
    params: &Params,
    keys: &(KeyPair, KeyPair),
    message: &'static [u8],
    rngs: (R, R),
    policies: (PA, PB),
) -> (Result<Signature>, Result<Signature>)
where
    R: RngCore + CryptoRng + Send + 'static,
    PA: RejectionPolicy,
    PB: RejectionPolicy + Send + 'static,
{
    let alice = Party::new("alice", params.clone()).unwrap();
    let bob = Party::new("bob", params.clone()).unwrap();
    let ((pk_a, sk_a), (pk_b, sk_b)) = keys.clone();
    let (mut rng_a, mut rng_b) = rngs;
    let (policy, policy_b) = policies;
    run_parties(
        move |mut comm| {
            alice.sign_with_policy(&mut comm, &mut rng_a, message, &pk_a, &sk_a, &policy)
        },
        move |mut comm| {
            bob.sign_with_policy(&mut comm, &mut rng_b, message, &pk_b, &sk_b, &policy_b)
        },
    )
}

pub fn seeded_rngs(a: u64, b: u64) -> (ChaCha20Rng, ChaCha20Rng) {
    (ChaCha20Rng::seed_from_u64(a), ChaCha20Rng::seed_from_u64(b))
}
