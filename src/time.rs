//! Time-related types based on the DW1000's 40-bit system time
//!
//! All timestamps exchanged during ranging are raw values of the radio's
//! 40-bit tick counter. One tick is 1 / (499.2 MHz * 128), about 15.65 ps.


use core::ops::Add;

use byte::{
    check_len,
    TryRead,
    TryWrite,
};
use serde::{
    Deserialize,
    Serialize,
};


/// The maximum value of 40-bit system time stamps.
pub const TIME_MAX: u64 = 0xffffffffff;

/// Length of a timestamp on the wire
pub const TIMESTAMP_LEN: usize = 5;

/// Frequency of the timestamp counter, in Hz
pub const TICK_FREQUENCY_HZ: f64 = 499.2e6 * 128.0;

/// Speed of light in m/s
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// The longest elapsed time the low-32-bit arithmetic can represent
///
/// Interval computations during one exchange only look at the low 32 bits of
/// each timestamp. That is exact as long as the elapsed time stays below
/// 2^32 ticks, which is about 67.2 ms at [`TICK_FREQUENCY_HZ`]. A full
/// POLL/ANSWER/FINAL/REPORT exchange normally takes a few milliseconds.
pub const MAX_EXCHANGE_TICKS: u64 = u32::MAX as u64;


/// A 40-bit timestamp of the radio's system time
///
/// The value is always within `0..=TIME_MAX`. On the wire it is sent as 5
/// little-endian bytes, the same way the DW1000 stores it in its registers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a new instance of `Timestamp`
    ///
    /// The given value must fit in a 40-bit timestamp, so:
    /// 0 <= `value` <= 2^40 - 1
    ///
    /// Returns `Some(...)`, if `value` is within the valid range, `None` if it
    /// isn't.
    ///
    /// # Example
    ///
    /// ``` rust
    /// use dw1000_twr::time::{
    ///     TIME_MAX,
    ///     Timestamp,
    /// };
    ///
    /// assert!(Timestamp::new(TIME_MAX).is_some());
    /// assert!(Timestamp::new(TIME_MAX + 1).is_none());
    /// ```
    pub fn new(value: u64) -> Option<Self> {
        if value <= TIME_MAX {
            Some(Timestamp(value))
        }
        else {
            None
        }
    }

    /// Creates a `Timestamp` from a raw register value, dropping anything
    /// above bit 39
    pub fn from_raw_truncated(value: u64) -> Self {
        Timestamp(value & TIME_MAX)
    }

    /// Returns the raw 40-bit timestamp
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The low 32 bits of the timestamp
    pub fn low32(&self) -> u32 {
        self.0 as u32
    }

    /// The high 8 bits of the timestamp
    pub fn high8(&self) -> u8 {
        (self.0 >> 32) as u8
    }

    /// Decodes the 5-byte wire representation
    pub fn from_bytes(bytes: [u8; TIMESTAMP_LEN]) -> Self {
        let mut value = 0u64;
        for (i, b) in bytes.iter().enumerate() {
            value |= (*b as u64) << (8 * i);
        }
        Timestamp(value)
    }

    /// Returns the 5-byte wire representation
    pub fn to_bytes(&self) -> [u8; TIMESTAMP_LEN] {
        let mut bytes = [0; TIMESTAMP_LEN];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (self.0 >> (8 * i)) as u8;
        }
        bytes
    }

    /// Returns the amount of time passed between the two `Timestamp`s
    ///
    /// Assumes that `&self` represents a later time than the argument
    /// `earlier`. Please make sure that this is the case, as this method has no
    /// way of knowing (DW1000 timestamps can overflow, so comparing the
    /// numerical value of the timestamp doesn't tell anything about order).
    ///
    /// # Example
    ///
    /// ``` rust
    /// use dw1000_twr::time::{
    ///     TIME_MAX,
    ///     Timestamp,
    /// };
    ///
    /// let t1 = Timestamp::new(TIME_MAX - 50).unwrap();
    /// let t2 = Timestamp::new(TIME_MAX).unwrap();
    /// let t3 = Timestamp::new(49).unwrap();
    ///
    /// assert_eq!(t2.duration_since(t1).value(), 50);
    /// assert_eq!(t3.duration_since(t2).value(), 50);
    /// ```
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        if self.value() >= earlier.value() {
            Duration(self.value() - earlier.value())
        }
        else {
            Duration(TIME_MAX - earlier.value() + self.value() + 1)
        }
    }

    /// Elapsed ticks since `earlier`, computed on the low 32 bits
    ///
    /// Returns `None` if the elapsed time is longer than
    /// [`MAX_EXCHANGE_TICKS`], in which case the low-32-bit difference would
    /// have wrapped and no longer match the real elapsed time.
    pub fn elapsed_low32(&self, earlier: Timestamp) -> Option<u32> {
        if self.duration_since(earlier).value() > MAX_EXCHANGE_TICKS {
            return None;
        }

        Some(self.low32().wrapping_sub(earlier.low32()))
    }

    /// Subtracts a duration, wrapping around at zero
    pub fn wrapping_sub(self, rhs: Duration) -> Timestamp {
        Timestamp((self.0 + (TIME_MAX + 1) - rhs.0) % (TIME_MAX + 1))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        // Both values are 40-bit numbers, so this addition can't overflow.
        Timestamp((self.0 + rhs.0) % (TIME_MAX + 1))
    }
}

impl<'a> TryRead<'a, ()> for Timestamp {
    fn try_read(bytes: &'a [u8], _: ()) -> byte::Result<(Self, usize)> {
        check_len(bytes, TIMESTAMP_LEN)?;

        let mut raw = [0; TIMESTAMP_LEN];
        raw.copy_from_slice(&bytes[..TIMESTAMP_LEN]);

        Ok((Timestamp::from_bytes(raw), TIMESTAMP_LEN))
    }
}

impl TryWrite for Timestamp {
    fn try_write(self, bytes: &mut [u8], _: ()) -> byte::Result<usize> {
        check_len(bytes, TIMESTAMP_LEN)?;
        bytes[..TIMESTAMP_LEN].copy_from_slice(&self.to_bytes());
        Ok(TIMESTAMP_LEN)
    }
}


/// A duration between two timestamps, in radio ticks
///
/// Internally uses the same 40-bit values that the DW1000 uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Duration(u64);

impl Duration {
    /// Creates a new instance of `Duration`
    ///
    /// Returns `None`, if `value` doesn't fit in 40 bits.
    pub fn new(value: u64) -> Option<Self> {
        if value <= TIME_MAX {
            Some(Duration(value))
        }
        else {
            None
        }
    }

    /// Returns the raw 40-bit value
    pub fn value(&self) -> u64 {
        self.0
    }
}


/// Antenna delay compensation
///
/// The signal path inside antenna and transceiver adds a fixed latency to
/// every transmission. Half of it is added to transmit timestamps and half is
/// subtracted from receive timestamps, at capture time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AntennaDelay {
    half: Duration,
}

impl AntennaDelay {
    /// No compensation at all
    pub const NONE: AntennaDelay = AntennaDelay { half: Duration(0) };

    /// Derives the delay from the equivalent signal path length in meters
    ///
    /// The half-delay is truncated to whole ticks. Negative offsets are
    /// treated as zero.
    pub fn from_offset_m(offset_m: f64) -> Self {
        let ticks = offset_m * TICK_FREQUENCY_HZ / SPEED_OF_LIGHT;
        let half = ((ticks / 2.0) as u64).min(TIME_MAX);

        AntennaDelay { half: Duration(half) }
    }

    /// Creates a delay from its half value in ticks
    pub fn from_half_ticks(half: Duration) -> Self {
        AntennaDelay { half }
    }

    /// The half-delay applied to each capture
    pub fn half(&self) -> Duration {
        self.half
    }

    /// The full delay, always exactly twice [`AntennaDelay::half`]
    pub fn full(&self) -> u64 {
        self.half.value() * 2
    }

    /// Adjusts a transmit timestamp reported by the radio
    pub fn capture_tx(&self, raw: Timestamp) -> Timestamp {
        raw + self.half
    }

    /// Adjusts a receive timestamp reported by the radio
    pub fn capture_rx(&self, raw: Timestamp) -> Timestamp {
        raw.wrapping_sub(self.half)
    }
}
