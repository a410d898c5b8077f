pub mod challenge_generation;
pub mod commitment;
pub mod communication;
pub mod cyclotomic_ring;
pub mod error;
pub mod hint;
mod keygen;
pub mod lattice;
pub mod modular_arithmetic;
pub mod ntt;
pub mod params;
pub mod protocol;
pub mod sampling;
mod sign;
pub mod types;
pub mod verify;

#[cfg(test)]
mod integration_tests;

pub use challenge_generation::{eval_commitment, hash0, hash1, hash2, hash3, hash4, Digest};
pub use commitment::CommitmentKeys;
pub use communication::{Communicator, Control, Message, QueueCommunicator, StreamCommunicator};
pub use cyclotomic_ring::{Domain, Polynomial};
pub use error::{ErrorKind, Result, TopcoatError};
pub use hint::{hint, use_hint};
pub use lattice::Matrix;
pub use params::{CommitmentParams, Params, N, Q};
pub use protocol::{NormBoundRejection, Party, RejectionPolicy};
pub use types::{PrivateKeyShare, PublicKey, Signature};
pub use verify::verify;
