//! Configuration of a ranging tag
//!
//! Loading the configuration (from flash, a console, ...) is left to the
//! application. The structs derive `serde` traits so they can be stored in
//! whatever format the application prefers.

use core::time::Duration;

use serde::{
    Deserialize,
    Serialize,
};

use crate::time::AntennaDelay;


/// Extended address of the anchor used by the reference deployment
pub const DEFAULT_ANCHOR_ADDRESS: u64 = 0xbccf_0000_0000_0001;

/// PAN ID of the reference deployment
pub const DEFAULT_PAN_ID: u16 = 0xbccf;

/// Time between two ranging attempts, in milliseconds
pub const DEFAULT_RANGING_INTERVAL_MS: u32 = 10;

/// Antenna delay of the reference hardware, as signal path length in meters
pub const DEFAULT_ANTENNA_OFFSET_M: f64 = 154.6;


/// Tag configuration
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TagConfig {
    /// Extended (EUI-64) address of this tag
    pub address: u64,
    /// Extended address of the anchor to range against
    pub anchor_address: u64,
    /// PAN ID written into outgoing frames
    pub pan_id: u16,
    /// Time after which the driving loop should call the tag again
    pub ranging_interval_ms: u32,
    /// Antenna delay, expressed as signal path length in meters
    pub antenna_offset_m: f64,
}

impl TagConfig {
    /// Creates a configuration for the tag at `address`
    ///
    /// All other fields are set to the values of the reference deployment.
    pub fn new(address: u64) -> Self {
        TagConfig {
            address,
            anchor_address: DEFAULT_ANCHOR_ADDRESS,
            pan_id: DEFAULT_PAN_ID,
            ranging_interval_ms: DEFAULT_RANGING_INTERVAL_MS,
            antenna_offset_m: DEFAULT_ANTENNA_OFFSET_M,
        }
    }

    /// The ranging interval as a `Duration`
    pub fn ranging_interval(&self) -> Duration {
        Duration::from_millis(self.ranging_interval_ms as u64)
    }

    /// The antenna delay in radio ticks
    pub fn antenna_delay(&self) -> AntennaDelay {
        AntennaDelay::from_offset_m(self.antenna_offset_m)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_deployment_values() {
        let config = TagConfig::new(0x1234);

        assert_eq!(config.address, 0x1234);
        assert_eq!(config.anchor_address.to_le_bytes(), [1, 0, 0, 0, 0, 0, 0xcf, 0xbc]);
        assert_eq!(config.ranging_interval(), Duration::from_millis(10));
        assert_eq!(config.antenna_delay().half().value(), 16475);
    }
}
