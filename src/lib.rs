//! Tag-side double-sided two-way ranging for the DW1000 UWB transceiver
//!
//! A tag measures its distance to a fixed anchor by exchanging four messages
//! with it (POLL, ANSWER, FINAL, REPORT) and combining the transmit and
//! receive timestamps both sides record. Clock drift between the two devices
//! cancels out of the double-sided formula.
//!
//! This crate contains the protocol logic only. The radio is reached through
//! the [`Radio`] trait, and [`Tag`] is driven by feeding it [`RadioEvent`]s,
//! either from an interrupt handler or from the blocking loop in [`driver`].
//!
//! Logging goes through the `log` facade by default. Enable the `defmt`
//! feature to log through `defmt` instead.
//!
//! [`Radio`]: radio/trait.Radio.html
//! [`Tag`]: tag/struct.Tag.html
//! [`RadioEvent`]: radio/enum.RadioEvent.html
//! [`driver`]: driver/index.html


#![cfg_attr(not(test), no_std)]

#![deny(missing_docs)]


#[macro_use]
mod macros;

pub mod configs;
pub mod driver;
pub mod frame;
pub mod message;
pub mod radio;
pub mod ranging;
pub mod stats;
pub mod tag;
pub mod time;


#[cfg(not(feature = "defmt"))]
#[allow(unused_imports)]
use log::{
    debug,
    error,
    info,
    warn,
};

#[cfg(feature = "defmt")]
#[allow(unused_imports)]
use defmt::{
    debug,
    error,
    info,
    warn,
};


pub use ieee802154::mac;

pub use crate::{
    configs::TagConfig,
    radio::{
        Radio,
        RadioEvent,
    },
    stats::StatsReport,
    tag::{
        Error,
        State,
        Tag,
    },
    time::{
        Duration,
        Timestamp,
        TIME_MAX,
    },
};
