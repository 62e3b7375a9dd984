use core::fmt;

use crate::{
    message::{
        CodecError,
        MessageKind,
    },
    ranging::InvalidRanging,
};

use super::State;


/// An error that occured while handling a radio event
///
/// None of these are fatal. [`Tag::handle`] logs them and carries on, the
/// next timeout starts a fresh exchange.
///
/// [`Tag::handle`]: struct.Tag.html#method.handle
#[derive(Debug)]
pub enum Error<E> {
    /// Message belongs to another exchange
    StaleMessage {
        /// Kind of the message
        kind: MessageKind,

        /// Sequence number of the current exchange
        expected: u8,

        /// Sequence number of the message
        received: u8,
    },

    /// Frame was addressed to another node
    ForeignMessage {
        /// Extended destination address, if there is one
        destination: Option<u64>,
    },

    /// Message doesn't fit the current state of the exchange
    UnexpectedMessage {
        /// Kind of the message
        kind: MessageKind,

        /// State of the tag when the message arrived
        state: State,
    },

    /// The radio reported a frame without data
    EmptyFrame,

    /// The received frame doesn't fit into the receive buffer
    FrameTooLong {
        /// Length reported by the radio
        len: usize,
    },

    /// MAC frame could not be encoded or decoded
    Frame(byte::Error),

    /// Ranging message could not be encoded or decoded
    Message(CodecError),

    /// The exchange completed, but yielded no usable distance
    InvalidRanging(InvalidRanging),

    /// The radio driver reported an error
    Radio(E),
}

impl<E> Error<E> {
    /// A short description, suitable for logging
    pub fn reason(&self) -> &'static str {
        match self {
            Error::StaleMessage { .. } => "wrong sequence number",
            Error::ForeignMessage { .. } => "not for me",
            Error::UnexpectedMessage { .. } => "unexpected message",
            Error::EmptyFrame => "empty frame",
            Error::FrameTooLong { .. } => "frame too long",
            Error::Frame(_) => "invalid frame",
            Error::Message(_) => "invalid message",
            Error::InvalidRanging(_) => "invalid ranging",
            Error::Radio(_) => "radio error",
        }
    }
}

impl<E> From<CodecError> for Error<E> {
    fn from(error: CodecError) -> Self {
        Error::Message(error)
    }
}

impl<E> From<InvalidRanging> for Error<E> {
    fn from(error: InvalidRanging) -> Self {
        Error::InvalidRanging(error)
    }
}

impl<E> fmt::Display for Error<E>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::StaleMessage {
                kind,
                expected,
                received,
            } => write!(
                f,
                "{:?} with sequence number {} (expected {})",
                kind, received, expected,
            ),
            Error::ForeignMessage { destination: Some(address) } => {
                write!(f, "frame for {:016x}", address)
            }
            Error::ForeignMessage { destination: None } => {
                write!(f, "frame without extended destination")
            }
            Error::UnexpectedMessage { kind, state } => {
                write!(f, "{:?} while {:?}", kind, state)
            }
            Error::EmptyFrame => write!(f, "empty frame"),
            Error::FrameTooLong { len } => write!(f, "frame too long ({} bytes)", len),
            Error::Frame(error) => write!(f, "invalid frame: {:?}", error),
            Error::Message(error) => write!(f, "invalid message: {}", error),
            Error::InvalidRanging(error) => write!(f, "invalid ranging: {}", error),
            Error::Radio(error) => write!(f, "radio error: {:?}", error),
        }
    }
}
