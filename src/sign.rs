//! Interactive two-party signing
//!
//! # Protocol Overview
//!
//! Every retry iteration each party samples Θ candidate sessions
//! (y, w = A·y, wH = HighBits(w, 2γ'), r, (c1, c2) = Com(wH; r)) and
//! exchanges the batch of commitments by commit-then-reveal. Every pair
//! (their session i, my session j) then gives a joint commitment
//! c[i][j] = c_mine[j] + c_theirs[i] and a challenge
//! ch[i][j] = hash0(message ‖ c[i][j] ‖ pk), for which each party computes
//! its response z = y_j + s1·ch and runs rejection sampling locally.
//!
//! The two Θ × Θ success tables are exchanged and a pair is jointly
//! accepted when both sides accepted it (the counterparty's table is
//! indexed the other way round). Both parties pick the same pair: the
//! lexicographically smallest (i, j) for the party whose batch evaluates
//! higher, (j, i) for the other. With no accepted pair both send
//! `restart` and sample again.
//!
//! For the chosen pair each party reveals (z, r), checks the
//! counterparty's opening, and both combine into
//! `Signature { z, c, r, h }` where h hints from the verifier's recomputed
//! high bits to the committed ones.
//!
//! Only candidate-session sampling runs in parallel; the pool is joined
//! before anything is sent.

use std::time::Instant;

use rand_core::{CryptoRng, RngCore};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info, warn};

use crate::challenge_generation::{commitment_key_seed, derive_challenge, eval_commitment, hash3};
use crate::commitment::CommitmentKeys;
use crate::communication::{Communicator, Control, Message};
use crate::cyclotomic_ring::Polynomial;
use crate::error::{ErrorKind, Result, TopcoatError};
use crate::hint::hint;
use crate::lattice::Matrix;
use crate::params::Params;
use crate::protocol::{
    abort, commit_then_reveal, confirm, expect_received, receive_as, RejectionPolicy,
};
use crate::sampling::{bounded_vector, seeded_rng};
use crate::types::{PrivateKeyShare, PublicKey, Signature};

/// One candidate session, discarded at the end of its iteration.
struct Session {
    y: Matrix,
    w: Matrix,
    w_high: Matrix,
    r: Matrix,
    commitment: (Matrix, Matrix),
}

/// Pair (their session i, my session j).
struct Candidate {
    combined: (Matrix, Matrix),
    challenge: Polynomial,
    z: Matrix,
    accepted: bool,
}

/// State carried out of the retry loop once a pair is jointly accepted.
struct Accepted {
    sessions: Vec<Session>,
    their_batch: Vec<(Matrix, Matrix)>,
    candidates: Vec<Vec<Candidate>>,
    their_index: usize,
    my_index: usize,
    z_theirs: Matrix,
    r_theirs: Matrix,
}

/// Per-run values shared by every iteration.
struct Context<'a> {
    params: &'a Params,
    pool: &'a ThreadPool,
    message: &'a [u8],
    pk_bytes: Vec<u8>,
    keys: CommitmentKeys,
    sk: &'a PrivateKeyShare,
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn run<C, R, P>(
    params: &Params,
    pool: &ThreadPool,
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
    let start = Instant::now();
    check_key_shapes(params, pk, sk)?;

    let pk_bytes = pk.canonical_bytes()?;
    let seed = commitment_key_seed(message, &pk_bytes);
    let keys = CommitmentKeys::derive(seed, &params.commitment)?;
    debug!("derived commitment keys A1 and A2");

    let ctx = Context {
        params,
        pool,
        message,
        pk_bytes,
        keys,
        sk,
    };

    let mut iteration = 0;
    let accepted = loop {
        iteration += 1;
        match iterate(&ctx, comm, rng, policy, iteration) {
            Ok(accepted) => break accepted,
            Err(err) if err.kind() == ErrorKind::RejectionRetry => {
                debug!(iteration, "restarting");
                if params.max_iterations.map_or(false, |max| iteration >= max) {
                    return Err(TopcoatError::RetryBudgetExhausted {
                        iterations: iteration,
                    });
                }
            }
            Err(err) => return Err(err),
        }
    };

    let signature = finish(&ctx, comm, pk, accepted)?;
    info!(elapsed = ?start.elapsed(), iterations = iteration, "finished sign");
    Ok(signature)
}

fn check_key_shapes(params: &Params, pk: &PublicKey, sk: &PrivateKeyShare) -> Result<()> {
    pk.a.expect_shape((params.k, params.l))?;
    pk.t1.expect_shape((params.k, 1))?;
    sk.a.expect_shape((params.k, params.l))?;
    sk.t_theirs.expect_shape((params.k, 1))?;
    sk.s1.expect_shape((params.l, 1))?;
    sk.s2.expect_shape((params.k, 1))
}

fn sample_session(
    params: &Params,
    a: &Matrix,
    keys: &CommitmentKeys,
    seed: [u8; 32],
) -> Result<Session> {
    let mut rng = seeded_rng(seed);
    let y = bounded_vector(&mut rng, params.l, params.gamma - 1)?;
    let w = a.matmul(&y)?;
    let w_high = w.high_bits(params.high_bits_alpha());
    let r = bounded_vector(&mut rng, params.commitment.k, params.commitment.beta)?;
    let commitment = keys.commit(&w_high, &r)?;
    Ok(Session {
        y,
        w,
        w_high,
        r,
        commitment,
    })
}

/// One pass of sampling, exchange and cross-matching. A `restart` from
/// either side comes back as [`TopcoatError::RejectionRetry`].
fn iterate<C, R, P>(
    ctx: &Context<'_>,
    comm: &mut C,
    rng: &mut R,
    policy: &P,
    iteration: usize,
) -> Result<Accepted>
where
    C: Communicator + ?Sized,
    R: RngCore + CryptoRng,
    P: RejectionPolicy + ?Sized,
{
    let params = ctx.params;
    let theta = params.parallel_sessions;

    let mut seed_bytes = vec![0u8; 32 * theta];
    rng.fill_bytes(&mut seed_bytes);
    let seeds: Vec<[u8; 32]> = seed_bytes
        .chunks_exact(32)
        .map(|chunk| {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(chunk);
            seed
        })
        .collect();

    let sessions = ctx.pool.install(|| {
        seeds
            .par_iter()
            .map(|&seed| sample_session(params, &ctx.sk.a, &ctx.keys, seed))
            .collect::<Result<Vec<_>>>()
    })?;
    debug!(iteration, sessions = theta, "sampled candidate sessions");

    let my_batch: Vec<(Matrix, Matrix)> =
        sessions.iter().map(|s| s.commitment.clone()).collect();
    let their_batch = commit_then_reveal(comm, &my_batch, hash3, "commitment batch", |batch| {
        if batch.len() != theta {
            return Err(TopcoatError::InvalidDimension {
                expected: (theta, 2),
                got: (batch.len(), 2),
            });
        }
        batch.iter().try_for_each(|(c1, c2)| {
            expect_received(c1, (params.commitment.n, 1))?;
            expect_received(c2, (params.commitment.l, 1))
        })
    })?;
    let i_am_the_one = eval_commitment(&my_batch)? > eval_commitment(&their_batch)?;
    debug!(iteration, i_am_the_one, "checked commitment batch");

    let candidates = (0..theta)
        .map(|i| {
            (0..theta)
                .map(|j| {
                    evaluate_pair(
                        ctx,
                        policy,
                        iteration,
                        &sessions[j],
                        &my_batch[j],
                        &their_batch[i],
                    )
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let my_table: Vec<Vec<bool>> = candidates
        .iter()
        .map(|row| row.iter().map(|c| c.accepted).collect())
        .collect();
    comm.send(Message::SuccessTable(my_table.clone()))?;
    let their_table = receive_as(comm, |message| {
        let table = message.into_success_table()?;
        if table.len() != theta || table.iter().any(|row| row.len() != theta) {
            return Err(TopcoatError::InvalidDimension {
                expected: (theta, theta),
                got: (table.len(), table.first().map_or(0, Vec::len)),
            });
        }
        Ok(table)
    })?;
    debug!(iteration, "exchanged success tables");

    let chosen = (0..theta)
        .flat_map(|i| (0..theta).map(move |j| (i, j)))
        .filter(|&(i, j)| my_table[i][j] && their_table[j][i])
        .min_by_key(|&(i, j)| if i_am_the_one { (i, j) } else { (j, i) });

    match chosen {
        Some((i, j)) => {
            debug!(iteration, their_index = i, my_index = j, "found jointly accepted session");
            comm.send(Message::Response {
                z: candidates[i][j].z.clone(),
                r: sessions[j].r.clone(),
            })?;
        }
        None => {
            debug!(iteration, "no jointly accepted session, sending restart");
            comm.send(Message::Control(Control::Restart))?;
        }
    }

    match (comm.receive()?, chosen) {
        (Message::Control(Control::Restart), _) => {
            debug!(iteration, "received restart");
            Err(TopcoatError::RejectionRetry { iteration })
        }
        (Message::Response { z, r }, Some((their_index, my_index))) => Ok(Accepted {
            sessions,
            their_batch,
            candidates,
            their_index,
            my_index,
            z_theirs: z,
            r_theirs: r,
        }),
        (other, chosen) => Err(abort(
            comm,
            TopcoatError::UnexpectedMessage {
                expected: if chosen.is_some() { "response" } else { "restart" },
                got: other.name(),
            },
        )),
    }
}

fn evaluate_pair<P: RejectionPolicy + ?Sized>(
    ctx: &Context<'_>,
    policy: &P,
    iteration: usize,
    session: &Session,
    mine: &(Matrix, Matrix),
    theirs: &(Matrix, Matrix),
) -> Result<Candidate> {
    let params = ctx.params;
    let combined = (mine.0.add(&theirs.0)?, mine.1.add(&theirs.1)?);
    let challenge = derive_challenge(
        ctx.message,
        &combined.0,
        &combined.1,
        &ctx.pk_bytes,
        params.tau,
    )?;

    let z = session
        .y
        .add(&ctx.sk.s1.scale(&challenge)?)?
        .map(Polynomial::centered);
    let w_minus_cs2 = session.w.sub(&ctx.sk.s2.scale(&challenge)?)?;
    let accepted = !policy.reject(params, iteration, &z, &w_minus_cs2);

    Ok(Candidate {
        combined,
        challenge,
        z,
        accepted,
    })
}

/// Recomputes the counterparty's high bits and checks its opening and
/// response bound.
fn check_counterparty(ctx: &Context<'_>, accepted: &Accepted) -> Result<Matrix> {
    let params = ctx.params;
    let candidate = &accepted.candidates[accepted.their_index][accepted.my_index];
    expect_received(&accepted.z_theirs, (params.l, 1))?;
    expect_received(&accepted.r_theirs, (params.commitment.k, 1))?;

    let w_high_theirs = ctx
        .sk
        .a
        .matmul(&accepted.z_theirs)?
        .sub(&ctx.sk.t_theirs.scale(&candidate.challenge)?)?
        .high_bits(params.high_bits_alpha());

    let (c1, c2) = &accepted.their_batch[accepted.their_index];
    if !ctx.keys.open(
        c1,
        c2,
        &w_high_theirs,
        &accepted.r_theirs,
        params.commitment.beta,
    ) {
        return Err(TopcoatError::CommitmentOpeningFailed);
    }
    let bound = params.gamma - params.beta;
    if accepted.z_theirs.check_norm_bound(bound) {
        return Err(TopcoatError::NormBoundViolation {
            what: "z_theirs",
            bound,
        });
    }
    Ok(w_high_theirs)
}

/// Low bits of A·z − t·c for the full joint t. Only logged: the hint makes
/// verification exact whatever this shows.
fn uncompressed_key_check(ctx: &Context<'_>, z: &Matrix, challenge: &Polynomial) -> Result<()> {
    let params = ctx.params;
    let sk = ctx.sk;
    let t = sk.a.matmul(&sk.s1)?.add(&sk.s2)?.add(&sk.t_theirs)?;
    let bound = params.gamma_prime - 2 * params.beta;
    let exceeded = sk
        .a
        .matmul(z)?
        .sub(&t.scale(challenge)?)?
        .low_bits(params.high_bits_alpha())
        .check_norm_bound(bound);
    if exceeded {
        warn!(bound, "low bits of A·z − t·c reach the bound");
    } else {
        debug!("uncompressed key check passed");
    }
    Ok(())
}

fn finish<C: Communicator + ?Sized>(
    ctx: &Context<'_>,
    comm: &mut C,
    pk: &PublicKey,
    accepted: Accepted,
) -> Result<Signature> {
    let params = ctx.params;
    let w_high_theirs = match check_counterparty(ctx, &accepted) {
        Ok(w) => w,
        Err(err) => return Err(abort(comm, err)),
    };
    confirm(comm)?;
    debug!("checked counterparty commitment");

    let session = &accepted.sessions[accepted.my_index];
    let candidate = &accepted.candidates[accepted.their_index][accepted.my_index];

    let z = candidate.z.add(&accepted.z_theirs)?;
    let r = session.r.add(&accepted.r_theirs)?;
    let w_high_roof = session.w_high.add(&w_high_theirs)?;
    uncompressed_key_check(ctx, &z, &candidate.challenge)?;

    let w_high = pk
        .a
        .matmul(&z)?
        .sub(&pk.t1.scale(&candidate.challenge)?.scale_int(1 << params.d))?
        .high_bits(params.high_bits_alpha());
    let h = hint(&w_high, &w_high_roof, params.hint_alpha())?;
    debug!("calculated hint");

    Ok(Signature {
        z,
        c: candidate.combined.clone(),
        r,
        h,
    })
}
