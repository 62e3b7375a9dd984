//! Ranging messages as they appear on the wire
//!
//! Every message starts with a two-byte header that follows the MAC frame
//! header: the message kind and the ranging sequence number. Only [`Report`]
//! carries additional data.
//!
//! | offset | width | field                                  |
//! |--------|-------|----------------------------------------|
//! | 0      | 1     | kind (`0x01`..=`0x04`)                 |
//! | 1      | 1     | sequence number                        |
//! | 2      | 28    | REPORT payload, see [`ReportPayload`]  |
//!
//! All multi-byte fields are little-endian, without padding.
//!
//! [`Report`]: enum.Message.html#variant.Report

use core::{
    convert::TryFrom,
    fmt,
};

use byte::{
    check_len,
    BytesExt as _,
    TryRead,
    TryWrite,
    LE,
};
use num_enum::{
    IntoPrimitive,
    TryFromPrimitive,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::time::{
    Timestamp,
    TIMESTAMP_LEN,
};


/// Length of the message header (kind and sequence number)
pub const HEADER_LEN: usize = 2;

/// Length of the environmental data block at the end of a REPORT
pub const ENVIRONMENT_LEN: usize = 3 * 4 + 1;

/// Length of the REPORT payload that follows the header
pub const REPORT_PAYLOAD_LEN: usize = 3 * TIMESTAMP_LEN + ENVIRONMENT_LEN;

/// Length of the longest message
pub const MAX_MESSAGE_LEN: usize = HEADER_LEN + REPORT_PAYLOAD_LEN;


/// Identifies the kind of a ranging message
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MessageKind {
    /// Sent by the tag to start an exchange
    Poll = 0x01,

    /// The anchor's reply to a poll
    Answer = 0x02,

    /// The tag's reply to an answer
    Final = 0x03,

    /// The anchor's timestamps for the exchange
    Report = 0x04,
}


/// Environmental sensor data appended to a REPORT by the anchor
///
/// Not used for ranging. It is passed through as received.
///
/// | offset | width | field                    |
/// |--------|-------|--------------------------|
/// | 0      | 4     | pressure (`f32`)         |
/// | 4      | 4     | temperature (`f32`)      |
/// | 8      | 4     | altitude above sea level |
/// | 12     | 1     | pressure valid flag      |
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnvironmentData {
    /// Barometric pressure
    pub pressure: f32,

    /// Temperature
    pub temperature: f32,

    /// Altitude computed from the pressure
    pub asl: f32,

    /// Whether the pressure reading is valid
    pub pressure_ok: bool,
}

impl<'a> TryRead<'a, ()> for EnvironmentData {
    fn try_read(bytes: &'a [u8], _: ()) -> byte::Result<(Self, usize)> {
        check_len(bytes, ENVIRONMENT_LEN)?;

        let offset = &mut 0;
        let pressure = f32::from_bits(bytes.read_with::<u32>(offset, LE)?);
        let temperature = f32::from_bits(bytes.read_with::<u32>(offset, LE)?);
        let asl = f32::from_bits(bytes.read_with::<u32>(offset, LE)?);
        let pressure_ok = bytes.read_with::<u8>(offset, LE)? != 0;

        Ok((
            EnvironmentData {
                pressure,
                temperature,
                asl,
                pressure_ok,
            },
            *offset,
        ))
    }
}

impl TryWrite for EnvironmentData {
    fn try_write(self, bytes: &mut [u8], _: ()) -> byte::Result<usize> {
        check_len(bytes, ENVIRONMENT_LEN)?;

        let offset = &mut 0;
        bytes.write_with(offset, self.pressure.to_bits(), LE)?;
        bytes.write_with(offset, self.temperature.to_bits(), LE)?;
        bytes.write_with(offset, self.asl.to_bits(), LE)?;
        bytes.write_with(offset, self.pressure_ok as u8, LE)?;

        Ok(*offset)
    }
}


/// The data the anchor sends in a REPORT
///
/// | offset | width | field                              |
/// |--------|-------|------------------------------------|
/// | 0      | 5     | POLL receive time, anchor clock    |
/// | 5      | 5     | ANSWER transmit time, anchor clock |
/// | 10     | 5     | FINAL receive time, anchor clock   |
/// | 15     | 13    | [`EnvironmentData`]                |
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReportPayload {
    /// When the anchor received the POLL
    pub poll_rx: Timestamp,

    /// When the anchor sent the ANSWER
    pub answer_tx: Timestamp,

    /// When the anchor received the FINAL
    pub final_rx: Timestamp,

    /// Sensor data, opaque to ranging
    pub environment: EnvironmentData,
}

impl<'a> TryRead<'a, ()> for ReportPayload {
    fn try_read(bytes: &'a [u8], _: ()) -> byte::Result<(Self, usize)> {
        check_len(bytes, REPORT_PAYLOAD_LEN)?;

        let offset = &mut 0;
        let poll_rx: Timestamp = bytes.read_with(offset, ())?;
        let answer_tx: Timestamp = bytes.read_with(offset, ())?;
        let final_rx: Timestamp = bytes.read_with(offset, ())?;
        let environment: EnvironmentData = bytes.read_with(offset, ())?;

        Ok((
            ReportPayload {
                poll_rx,
                answer_tx,
                final_rx,
                environment,
            },
            *offset,
        ))
    }
}

impl TryWrite for ReportPayload {
    fn try_write(self, bytes: &mut [u8], _: ()) -> byte::Result<usize> {
        check_len(bytes, REPORT_PAYLOAD_LEN)?;

        let offset = &mut 0;
        bytes.write_with(offset, self.poll_rx, ())?;
        bytes.write_with(offset, self.answer_tx, ())?;
        bytes.write_with(offset, self.final_rx, ())?;
        bytes.write_with(offset, self.environment, ())?;

        Ok(*offset)
    }
}


/// A ranging message
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    /// Starts an exchange
    Poll {
        /// Sequence number of the exchange
        seq: u8,
    },

    /// Reply to [`Message::Poll`]
    Answer {
        /// Sequence number of the exchange
        seq: u8,
    },

    /// Reply to [`Message::Answer`]
    Final {
        /// Sequence number of the exchange
        seq: u8,
    },

    /// Anchor-side timestamps of the exchange
    Report {
        /// Sequence number of the exchange
        seq: u8,

        /// The timestamps and sensor data
        payload: ReportPayload,
    },
}

impl Message {
    /// The kind of this message
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Poll { .. } => MessageKind::Poll,
            Message::Answer { .. } => MessageKind::Answer,
            Message::Final { .. } => MessageKind::Final,
            Message::Report { .. } => MessageKind::Report,
        }
    }

    /// The sequence number of the exchange this message belongs to
    pub fn seq(&self) -> u8 {
        match *self {
            Message::Poll { seq }
            | Message::Answer { seq }
            | Message::Final { seq }
            | Message::Report { seq, .. } => seq,
        }
    }

    /// The encoded length of this message
    pub fn encoded_len(&self) -> usize {
        match self {
            Message::Report { .. } => HEADER_LEN + REPORT_PAYLOAD_LEN,
            _ => HEADER_LEN,
        }
    }

    /// Writes the message into `buf`
    ///
    /// Returns the number of bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let offset = &mut 0;
        buf.write_with(offset, u8::from(self.kind()), LE)?;
        buf.write_with(offset, self.seq(), LE)?;

        if let Message::Report { payload, .. } = self {
            buf.write_with(offset, *payload, ())?;
        }

        Ok(*offset)
    }

    /// Reads a message from `buf`
    ///
    /// `buf` must contain exactly one message, as found in the payload of a
    /// MAC frame.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let offset = &mut 0;
        let kind: u8 = buf.read_with(offset, LE)?;
        let seq: u8 = buf.read_with(offset, LE)?;

        let kind = MessageKind::try_from(kind)
            .map_err(|_| CodecError::UnknownKind(kind))?;

        let message = match kind {
            MessageKind::Poll => Message::Poll { seq },
            MessageKind::Answer => Message::Answer { seq },
            MessageKind::Final => Message::Final { seq },
            MessageKind::Report => Message::Report {
                seq,
                payload: buf.read_with(offset, ())?,
            },
        };

        if buf.len() != message.encoded_len() {
            return Err(CodecError::InvalidLength {
                expected: message.encoded_len(),
                actual: buf.len(),
            });
        }

        Ok(message)
    }
}


/// Error that can occur while encoding or decoding a [`Message`]
#[derive(Debug)]
pub enum CodecError {
    /// Buffer too short, or otherwise rejected by the codec
    Byte(byte::Error),

    /// The kind byte doesn't name a known message
    UnknownKind(u8),

    /// The buffer is longer than the message it contains
    InvalidLength {
        /// Length of the message
        expected: usize,

        /// Length of the buffer
        actual: usize,
    },
}

impl From<byte::Error> for CodecError {
    fn from(error: byte::Error) -> Self {
        CodecError::Byte(error)
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CodecError::Byte(error) => write!(f, "codec error: {:?}", error),
            CodecError::UnknownKind(kind) => {
                write!(f, "unknown message kind 0x{:02x}", kind)
            }
            CodecError::InvalidLength { expected, actual } => write!(
                f,
                "invalid message length {} (expected {})",
                actual, expected,
            ),
        }
    }
}
