//! Symmetric double-sided two-way ranging
//!
//! The tag sends POLL, the anchor replies with ANSWER, the tag replies with
//! FINAL, and the anchor reports its own timestamps in REPORT. From the six
//! timestamps of such an exchange, two round-trip times and two reply times
//! can be derived. Each pair is measured on one clock only, and combining them
//! as below cancels linear clock drift to first order:
//!
//! ``` text
//! tround1 = answer_rx - poll_tx     (tag clock)
//! treply1 = answer_tx - poll_rx     (anchor clock)
//! tround2 = final_rx  - answer_tx   (anchor clock)
//! treply2 = final_tx  - answer_rx   (tag clock)
//!
//!          tround1 * tround2 - treply1 * treply2
//! tprop = ---------------------------------------
//!          tround1 + tround2 + treply1 + treply2
//! ```
//!
//! Please note that the result is not corrected for range bias.

use core::fmt;

use serde::{
    Deserialize,
    Serialize,
};

use crate::time::{
    Timestamp,
    SPEED_OF_LIGHT,
    TICK_FREQUENCY_HZ,
};


/// The six timestamps of a completed exchange
///
/// Tag timestamps (`poll_tx`, `answer_rx`, `final_tx`) are expected to be
/// antenna-delay compensated already. Anchor timestamps come from the REPORT.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RangingTimestamps {
    /// POLL sent, tag clock
    pub poll_tx: Timestamp,

    /// POLL received, anchor clock
    pub poll_rx: Timestamp,

    /// ANSWER sent, anchor clock
    pub answer_tx: Timestamp,

    /// ANSWER received, tag clock
    pub answer_rx: Timestamp,

    /// FINAL sent, tag clock
    pub final_tx: Timestamp,

    /// FINAL received, anchor clock
    pub final_rx: Timestamp,
}


/// Round-trip and reply times of an exchange, in ticks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Intervals {
    /// POLL sent to ANSWER received
    pub round1: u32,

    /// POLL received to ANSWER sent
    pub reply1: u32,

    /// ANSWER sent to FINAL received
    pub round2: u32,

    /// ANSWER received to FINAL sent
    pub reply2: u32,
}

impl Intervals {
    /// Derives the intervals from the timestamps of an exchange
    ///
    /// Each interval is computed on the low 32 bits of its two timestamps.
    /// Fails with [`InvalidRanging::ExchangeTooLong`] if one of them spans more
    /// than [`MAX_EXCHANGE_TICKS`].
    ///
    /// [`MAX_EXCHANGE_TICKS`]: ../time/constant.MAX_EXCHANGE_TICKS.html
    pub fn from_timestamps(t: &RangingTimestamps) -> Result<Self, InvalidRanging> {
        let elapsed = |later: Timestamp, earlier: Timestamp| {
            later
                .elapsed_low32(earlier)
                .ok_or(InvalidRanging::ExchangeTooLong)
        };

        Ok(Intervals {
            round1: elapsed(t.answer_rx, t.poll_tx)?,
            reply1: elapsed(t.answer_tx, t.poll_rx)?,
            round2: elapsed(t.final_rx, t.answer_tx)?,
            reply2: elapsed(t.final_tx, t.answer_rx)?,
        })
    }

    /// Time of flight in ticks
    pub fn time_of_flight(&self) -> Result<f64, InvalidRanging> {
        let round1 = self.round1 as f64;
        let reply1 = self.reply1 as f64;
        let round2 = self.round2 as f64;
        let reply2 = self.reply2 as f64;

        let sum = round1 + round2 + reply1 + reply2;
        if sum == 0.0 {
            return Err(InvalidRanging::ZeroIntervalSum);
        }

        Ok((round1 * round2 - reply1 * reply2) / sum)
    }
}


/// Computes the distance to the anchor, in meters
pub fn compute_distance(timestamps: &RangingTimestamps) -> Result<f64, InvalidRanging> {
    ds_twr_distance(Intervals::from_timestamps(timestamps)?)
}

/// Computes the distance from the intervals of an exchange, in meters
pub fn ds_twr_distance(intervals: Intervals) -> Result<f64, InvalidRanging> {
    ds_twr_distance_with(intervals, SPEED_OF_LIGHT, TICK_FREQUENCY_HZ)
}

/// Like [`ds_twr_distance`], with explicit physical constants
pub fn ds_twr_distance_with(
    intervals: Intervals,
    speed_of_light: f64,
    tick_frequency: f64,
) -> Result<f64, InvalidRanging> {
    let tprop = intervals.time_of_flight()? / tick_frequency;
    let distance = speed_of_light * tprop;

    if !distance.is_finite() {
        return Err(InvalidRanging::NonFinite);
    }

    Ok(distance)
}


/// Returned if an exchange can't produce a distance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidRanging {
    /// A timestamp of the exchange was never captured
    MissingTimestamp,

    /// All four intervals are zero
    ZeroIntervalSum,

    /// An interval is too long for the low-32-bit arithmetic
    ExchangeTooLong,

    /// The computation didn't produce a finite number
    NonFinite,
}

impl fmt::Display for InvalidRanging {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InvalidRanging::MissingTimestamp => write!(f, "timestamp missing"),
            InvalidRanging::ZeroIntervalSum => write!(f, "all intervals are zero"),
            InvalidRanging::ExchangeTooLong => write!(f, "exchange took too long"),
            InvalidRanging::NonFinite => write!(f, "distance is not finite"),
        }
    }
}


#[cfg(test)]
mod tests {
    use crate::time::MAX_EXCHANGE_TICKS;

    use super::*;

    fn ts(value: u64) -> Timestamp {
        Timestamp::new(value).unwrap()
    }

    fn exchange() -> RangingTimestamps {
        RangingTimestamps {
            poll_tx: ts(1000),
            poll_rx: ts(1050),
            answer_tx: ts(1150),
            answer_rx: ts(1200),
            final_tx: ts(1250),
            final_rx: ts(1300),
        }
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn intervals_of_exchange() {
        let intervals = Intervals::from_timestamps(&exchange()).unwrap();

        assert_eq!(
            intervals,
            Intervals {
                round1: 200,
                reply1: 100,
                round2: 150,
                reply2: 50,
            }
        );

        // (200 * 150 - 100 * 50) / 500
        assert_close(intervals.time_of_flight().unwrap(), 50.0);
    }

    #[test]
    fn distance_is_deterministic_and_positive() {
        let a = compute_distance(&exchange()).unwrap();
        let b = compute_distance(&exchange()).unwrap();

        assert_eq!(a, b);
        assert!(a > 0.0);
        assert_close(a, SPEED_OF_LIGHT * 50.0 / TICK_FREQUENCY_HZ);
    }

    #[test]
    fn distance_scales_linearly_with_constants() {
        let intervals = Intervals::from_timestamps(&exchange()).unwrap();
        let base = ds_twr_distance_with(intervals, 3.0e8, 64.0e9).unwrap();

        assert_close(ds_twr_distance_with(intervals, 6.0e8, 64.0e9).unwrap(), 2.0 * base);
        assert_close(ds_twr_distance_with(intervals, 3.0e8, 32.0e9).unwrap(), 2.0 * base);
    }

    #[test]
    fn symmetric_exchange_reduces_to_single_sided() {
        let intervals = Intervals {
            round1: 90_000,
            reply1: 60_000,
            round2: 90_000,
            reply2: 60_000,
        };

        let expected = SPEED_OF_LIGHT * (90_000.0 - 60_000.0) / (2.0 * TICK_FREQUENCY_HZ);
        let distance = ds_twr_distance(intervals).unwrap();

        assert!((distance - expected).abs() < 1e-6);
    }

    #[test]
    fn drift_is_cancelled() {
        // The anchor clock runs 20 ppm fast. A single-sided estimate would be
        // off by about 14 cm, the double-sided one stays within millimeters.
        let tof = 1000.0;
        let reply = 3_000_000.0;
        let drift = 1.0 + 20e-6;

        let intervals = Intervals {
            round1: (2.0 * tof + reply) as u32,
            reply1: (reply * drift) as u32,
            round2: ((2.0 * tof + reply) * drift) as u32,
            reply2: reply as u32,
        };

        let expected = SPEED_OF_LIGHT * tof / TICK_FREQUENCY_HZ;
        let distance = ds_twr_distance(intervals).unwrap();

        assert!((distance - expected).abs() < 0.01, "{} vs {}", distance, expected);
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let t = RangingTimestamps {
            poll_tx: ts(500),
            poll_rx: ts(700),
            answer_tx: ts(700),
            answer_rx: ts(500),
            final_tx: ts(500),
            final_rx: ts(700),
        };

        assert_eq!(compute_distance(&t), Err(InvalidRanging::ZeroIntervalSum));
    }

    #[test]
    fn non_finite_result_is_rejected() {
        let intervals = Intervals {
            round1: 200,
            reply1: 100,
            round2: 150,
            reply2: 50,
        };

        assert_eq!(
            ds_twr_distance_with(intervals, f64::INFINITY, TICK_FREQUENCY_HZ),
            Err(InvalidRanging::NonFinite),
        );
    }

    #[test]
    fn long_exchange_is_rejected() {
        let mut t = exchange();
        t.answer_rx = ts(t.poll_tx.value() + MAX_EXCHANGE_TICKS + 1);

        assert_eq!(compute_distance(&t), Err(InvalidRanging::ExchangeTooLong));
    }

    #[test]
    fn exchange_across_timer_wrap() {
        use crate::time::TIME_MAX;

        let base = TIME_MAX - 1100;
        let wrap = |offset: u64| Timestamp::from_raw_truncated(base + offset);

        let t = RangingTimestamps {
            poll_tx: wrap(1000),
            poll_rx: ts(1050),
            answer_tx: ts(1150),
            answer_rx: wrap(1200),
            final_tx: wrap(1250),
            final_rx: ts(1300),
        };

        assert_eq!(compute_distance(&t), compute_distance(&exchange()));
    }
}
