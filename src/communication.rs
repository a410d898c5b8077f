//! Point-to-point channel between the two co-signers
//!
//! The protocol needs a blocking, reliable, ordered channel that moves one
//! [`Message`] at a time. [`Communicator`] is that contract; two transports
//! implement it:
//!
//! - [`QueueCommunicator`]: an in-process pair over `std::sync::mpsc`
//! - [`StreamCommunicator`]: any `Read + Write` byte stream (e.g. a
//!   `TcpStream`), one frame per message: 4-byte big-endian length, then
//!   the `bincode` payload
//!
//! Neither transport has timeouts; impose them on the underlying stream.

use std::io::{Read, Write};
use std::sync::mpsc::{channel, Receiver, Sender};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::challenge_generation::Digest;
use crate::error::{Result, TopcoatError};
use crate::lattice::Matrix;

/// Largest frame a [`StreamCommunicator`] accepts.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Control vocabulary shared by keygen and sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    Ok,
    Abort,
    Restart,
    Error,
}

impl Control {
    /// Wire name: `"ok"`, `"abort"`, `"restart"` or `"error"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Control::Ok => "ok",
            Control::Abort => "abort",
            Control::Restart => "restart",
            Control::Error => "error",
        }
    }
}

/// Everything the two parties ever send each other.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Digest(Digest),
    Matrix(Matrix),
    CommitmentBatch(Vec<(Matrix, Matrix)>),
    SuccessTable(Vec<Vec<bool>>),
    Control(Control),
    /// The chosen session's response z and commitment randomness r
    Response { z: Matrix, r: Matrix },
}

macro_rules! expect_variant {
    ($name:ident, $variant:ident, $ty:ty, $label:literal) => {
        pub fn $name(self) -> Result<$ty> {
            match self {
                Message::$variant(value) => Ok(value),
                other => Err(TopcoatError::UnexpectedMessage {
                    expected: $label,
                    got: other.name(),
                }),
            }
        }
    };
}

impl Message {
    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Message::Digest(_) => "digest",
            Message::Matrix(_) => "matrix",
            Message::CommitmentBatch(_) => "commitment batch",
            Message::SuccessTable(_) => "success table",
            Message::Control(c) => c.as_str(),
            Message::Response { .. } => "response",
        }
    }

    expect_variant!(into_digest, Digest, Digest, "digest");
    expect_variant!(into_matrix, Matrix, Matrix, "matrix");
    expect_variant!(
        into_commitment_batch,
        CommitmentBatch,
        Vec<(Matrix, Matrix)>,
        "commitment batch"
    );
    expect_variant!(into_success_table, SuccessTable, Vec<Vec<bool>>, "success table");
    expect_variant!(into_control, Control, Control, "control");
}

/// Blocking message channel to the counterparty.
pub trait Communicator {
    fn send(&mut self, message: Message) -> Result<()>;

    /// Blocks until the next message arrives.
    fn get(&mut self) -> Result<Message>;

    /// Like [`Communicator::get`], but a received `abort` or `error` becomes
    /// [`TopcoatError::CounterpartyAbort`].
    fn receive(&mut self) -> Result<Message> {
        match self.get()? {
            Message::Control(control @ (Control::Abort | Control::Error)) => {
                Err(TopcoatError::CounterpartyAbort(control))
            }
            message => Ok(message),
        }
    }
}

impl<C: Communicator + ?Sized> Communicator for &mut C {
    fn send(&mut self, message: Message) -> Result<()> {
        (**self).send(message)
    }

    fn get(&mut self) -> Result<Message> {
        (**self).get()
    }
}

/// One end of an in-process channel pair.
#[derive(Debug)]
pub struct QueueCommunicator {
    outgoing: Sender<Message>,
    incoming: Receiver<Message>,
}

impl QueueCommunicator {
    /// Two connected ends; what one sends, the other gets.
    pub fn pair() -> (Self, Self) {
        let (to_b, from_a) = channel();
        let (to_a, from_b) = channel();
        (
            Self {
                outgoing: to_b,
                incoming: from_b,
            },
            Self {
                outgoing: to_a,
                incoming: from_a,
            },
        )
    }
}

impl Communicator for QueueCommunicator {
    fn send(&mut self, message: Message) -> Result<()> {
        trace!(kind = message.name(), "queue send");
        self.outgoing
            .send(message)
            .map_err(|_| TopcoatError::ChannelFailure("counterparty queue closed".to_string()))
    }

    fn get(&mut self) -> Result<Message> {
        self.incoming
            .recv()
            .map_err(|_| TopcoatError::ChannelFailure("counterparty queue closed".to_string()))
    }
}

/// Length-prefixed `bincode` frames over a byte stream.
#[derive(Debug)]
pub struct StreamCommunicator<S> {
    stream: S,
}

impl<S: Read + Write> StreamCommunicator<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read + Write> Communicator for StreamCommunicator<S> {
    fn send(&mut self, message: Message) -> Result<()> {
        let payload = bincode::serialize(&message)?;
        let len = u32::try_from(payload.len())
            .ok()
            .filter(|&len| len <= MAX_FRAME_LEN)
            .ok_or_else(|| {
                TopcoatError::ChannelFailure(format!("frame of {} bytes too large", payload.len()))
            })?;
        trace!(kind = message.name(), len, "stream send");
        self.stream.write_u32::<BigEndian>(len)?;
        self.stream.write_all(&payload)?;
        self.stream.flush()?;
        Ok(())
    }

    fn get(&mut self) -> Result<Message> {
        let len = self.stream.read_u32::<BigEndian>()?;
        if len > MAX_FRAME_LEN {
            return Err(TopcoatError::ChannelFailure(format!(
                "announced frame of {} bytes exceeds {}",
                len, MAX_FRAME_LEN
            )));
        }
        let mut payload = vec![0u8; len as usize];
        self.stream.read_exact(&mut payload)?;
        Ok(bincode::deserialize(&payload)?)
    }
}
