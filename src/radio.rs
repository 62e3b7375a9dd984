//! Interface to the radio driver
//!
//! The tag doesn't talk to hardware itself. The application implements
//! [`Radio`] on top of its DW1000 driver and forwards the driver's interrupts
//! as [`RadioEvent`]s.

use core::fmt;

use crate::time::Timestamp;


/// A radio event that drives the tag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioEvent {
    /// A frame has been received and is ready to be read
    PacketReceived,

    /// The last transmission has finished
    PacketSent,

    /// The delay requested by the last call to the tag has expired
    Timeout,

    /// Reception failed (CRC error, preamble timeout, ...)
    ReceiveFailed,
}


/// Operations the tag needs from the radio driver
///
/// None of these may block. `transmit` and `start_receive` only trigger the
/// operation, completion is reported through a later [`RadioEvent`].
/// Timestamps are raw 40-bit system time values, without antenna delay
/// compensation.
pub trait Radio {
    /// Error reported by the driver
    type Error: fmt::Debug;

    /// Stops any ongoing transmission or reception
    fn idle(&mut self) -> Result<(), Self::Error>;

    /// Starts transmitting a complete MAC frame
    ///
    /// If `wait_for_response` is set, the receiver is enabled as soon as the
    /// transmission has finished.
    fn transmit(&mut self, frame: &[u8], wait_for_response: bool) -> Result<(), Self::Error>;

    /// Re-enables the receiver with the default configuration
    fn start_receive(&mut self) -> Result<(), Self::Error>;

    /// Length of the received frame, without FCS
    fn data_length(&mut self) -> Result<usize, Self::Error>;

    /// Copies the received frame into `buf`
    ///
    /// `buf` is exactly [`Radio::data_length`] bytes long.
    fn read_data(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Transmit time of the last frame sent
    fn tx_timestamp(&mut self) -> Result<Timestamp, Self::Error>;

    /// Receive time of the last frame received
    fn rx_timestamp(&mut self) -> Result<Timestamp, Self::Error>;

    /// Estimated receive power of the last frame received, in dBm
    fn receive_power(&mut self) -> Result<f32, Self::Error>;
}
