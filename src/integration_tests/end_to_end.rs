// End-to-end keygen → sign → verify
//
// Covers the in-process queue transport and the framed TCP transport, and
// checks that the joint signature behaves like an ordinary one: both key
// views accept it, and any change to message or response is rejected.

use std::net::{TcpListener, TcpStream};
use std::thread;

use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

use super::{keygen_pair, seeded_rngs, sign_pair, MESSAGE};
use crate::communication::StreamCommunicator;
use crate::cyclotomic_ring::Polynomial;
use crate::lattice::Matrix;
use crate::params::{Params, Q};
use crate::protocol::{NormBoundRejection, Party};
use crate::types::Signature;
use crate::verify::verify;

fn bump_first_coefficient(matrix: &Matrix) -> Matrix {
    let mut entries: Vec<Polynomial> = matrix.iter().cloned().collect();
    let mut coeffs = entries[0].coefficients().to_vec();
    coeffs[0] = (coeffs[0] + 1) % Q;
    entries[0] = Polynomial::from_coefficients(&coeffs).unwrap();
    Matrix::column(entries).unwrap()
}

#[test]
fn test_keygen_agrees_on_public_key() {
    let params = Params::default();
    let ((pk_a, sk_a), (pk_b, sk_b)) = keygen_pair(&params);

    assert_eq!(pk_a, pk_b);
    assert_eq!(pk_a.a.shape(), (params.k, params.l));
    assert_eq!(pk_a.t1.shape(), (params.k, 1));
    assert_ne!(sk_a.s1, sk_b.s1);
    assert!(sk_a.s1.inf_norm() <= params.eta && sk_a.s2.inf_norm() <= params.eta);

    // each side holds the other's raw t share
    let t_a = pk_a.a.matmul(&sk_a.s1).unwrap().add(&sk_a.s2).unwrap();
    let t_b = pk_b.a.matmul(&sk_b.s1).unwrap().add(&sk_b.s2).unwrap();
    assert_eq!(sk_a.t_theirs, t_b);
    assert_eq!(sk_b.t_theirs, t_a);
    let (t1, _) = t_a.add(&t_b).unwrap().power2round(params.d);
    assert_eq!(pk_a.t1, t1);
}

#[test]
fn test_joint_signature_verifies() {
    let params = Params::default();
    let keys = keygen_pair(&params);
    let rngs = seeded_rngs(10, 20);
    let (sig_a, sig_b) = sign_pair(&params, &keys, MESSAGE, rngs, NormBoundRejection);
    let (sig_a, sig_b) = (sig_a.unwrap(), sig_b.unwrap());
    let ((pk_a, _), (pk_b, _)) = &keys;

    assert_eq!(sig_a, sig_b);
    assert!(verify(&params, MESSAGE, &sig_a, pk_a).unwrap());
    assert!(verify(&params, MESSAGE, &sig_a, pk_b).unwrap());
    assert!(!sig_a.z.check_norm_bound(2 * (params.gamma - params.beta)));
}

#[test]
fn test_tampering_is_rejected() {
    let params = Params::default();
    let keys = keygen_pair(&params);
    let (sig, _) = sign_pair(&params, &keys, MESSAGE, seeded_rngs(11, 21), NormBoundRejection);
    let sig = sig.unwrap();
    let pk = &keys.0 .0;

    assert!(!verify(&params, b"another message", &sig, pk).unwrap());

    let forged = Signature {
        z: bump_first_coefficient(&sig.z),
        ..sig.clone()
    };
    assert!(!verify(&params, MESSAGE, &forged, pk).unwrap());

    let forged = Signature {
        r: bump_first_coefficient(&sig.r),
        ..sig.clone()
    };
    assert!(!verify(&params, MESSAGE, &forged, pk).unwrap());

    let truncated = Signature {
        z: Matrix::zeros(params.l - 1, 1),
        ..sig
    };
    assert!(!verify(&params, MESSAGE, &truncated, pk).unwrap());
}

#[test]
fn test_out_of_range_signature_is_rejected() {
    let params = Params::default();
    let keys = keygen_pair(&params);
    let (sig, _) = sign_pair(&params, &keys, MESSAGE, seeded_rngs(13, 23), NormBoundRejection);
    let sig = sig.unwrap();
    let pk = &keys.0 .0;
    assert!(verify(&params, MESSAGE, &sig, pk).unwrap());

    let huge_hint = Signature {
        h: (sig.h.0.map_coefficients(|c| if c == 0 { i64::MAX / 2 } else { c }), sig.h.1.clone()),
        ..sig.clone()
    };
    assert!(!verify(&params, MESSAGE, &huge_hint, pk).unwrap());

    let huge_z = Signature {
        z: sig.z.map_coefficients(|_| i64::MAX - 5),
        ..sig.clone()
    };
    assert!(!verify(&params, MESSAGE, &huge_z, pk).unwrap());

    // congruent to the real randomness, but not a representative
    let shifted_r = Signature {
        r: sig.r.map_coefficients(|c| c + 4 * Q),
        ..sig.clone()
    };
    assert!(!verify(&params, MESSAGE, &shifted_r, pk).unwrap());

    let low_hint = Signature {
        h: (sig.h.0.clone(), sig.h.1.map_coefficients(|_| i64::MIN)),
        ..sig
    };
    assert!(!verify(&params, MESSAGE, &low_hint, pk).unwrap());
}

#[test]
fn test_signature_survives_serialization() {
    let params = Params::default();
    let keys = keygen_pair(&params);
    let (sig, _) = sign_pair(&params, &keys, MESSAGE, seeded_rngs(12, 22), NormBoundRejection);
    let sig = sig.unwrap();

    let json = serde_json::to_string(&sig).unwrap();
    let decoded: Signature = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, sig);
    assert!(verify(&params, MESSAGE, &decoded, &keys.0 .0).unwrap());
}

#[test]
fn test_protocol_over_tcp() {
    let params = Params {
        parallel_sessions: 2,
        ..Params::default()
    };
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let bob = Party::new("bob", params.clone()).unwrap();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut comm = StreamCommunicator::new(stream);
        let mut rng = ChaCha20Rng::seed_from_u64(32);
        let (pk, sk) = bob.keygen(&mut comm, &mut rng).unwrap();
        let sig = bob.sign(&mut comm, &mut rng, MESSAGE, &pk, &sk).unwrap();
        (pk, sig)
    });

    let alice = Party::new("alice", params.clone()).unwrap();
    let mut comm = StreamCommunicator::new(TcpStream::connect(addr).unwrap());
    let mut rng = ChaCha20Rng::seed_from_u64(31);
    let (pk, sk) = alice.keygen(&mut comm, &mut rng).unwrap();
    let sig = alice.sign(&mut comm, &mut rng, MESSAGE, &pk, &sk).unwrap();

    let (pk_bob, sig_bob) = handle.join().unwrap();
    assert_eq!(pk, pk_bob);
    assert_eq!(sig, sig_bob);
    assert!(verify(&params, MESSAGE, &sig, &pk).unwrap());
}
