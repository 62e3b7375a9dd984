use crate::{
    ranging::{
        InvalidRanging,
        RangingTimestamps,
    },
    time::Timestamp,
};


/// Bookkeeping for the exchange in flight
///
/// A new cycle is started with every POLL. Timestamps are `None` until they
/// have been captured during this cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cycle {
    /// Sequence number of the exchange
    pub seq: u8,

    /// POLL sent, tag clock
    pub poll_tx: Option<Timestamp>,

    /// POLL received, anchor clock
    pub poll_rx: Option<Timestamp>,

    /// ANSWER sent, anchor clock
    pub answer_tx: Option<Timestamp>,

    /// ANSWER received, tag clock
    pub answer_rx: Option<Timestamp>,

    /// FINAL sent, tag clock
    pub final_tx: Option<Timestamp>,

    /// FINAL received, anchor clock
    pub final_rx: Option<Timestamp>,

    /// REPORT received, tag clock. Not used for the distance.
    pub report_rx: Option<Timestamp>,
}

impl Cycle {
    /// Starts a cycle with all timestamps pending
    pub fn new(seq: u8) -> Self {
        Cycle {
            seq,
            ..Cycle::default()
        }
    }

    /// The timestamps the distance is computed from
    ///
    /// Fails if one of them hasn't been captured yet.
    pub fn timestamps(&self) -> Result<RangingTimestamps, InvalidRanging> {
        let get = |t: Option<Timestamp>| t.ok_or(InvalidRanging::MissingTimestamp);

        Ok(RangingTimestamps {
            poll_tx: get(self.poll_tx)?,
            poll_rx: get(self.poll_rx)?,
            answer_tx: get(self.answer_tx)?,
            answer_rx: get(self.answer_rx)?,
            final_tx: get(self.final_tx)?,
            final_rx: get(self.final_rx)?,
        })
    }
}
