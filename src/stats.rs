//! Running statistics over ranging results

use core::fmt;

use serde::{
    Deserialize,
    Serialize,
};


/// Accumulates ranging results between two reports
///
/// Means are updated incrementally, so no sums are stored that could lose
/// precision over long runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Statistics {
    interrogations: u32,
    successful_interrogations: u32,
    min_distance: f64,
    max_distance: f64,
    avg_distance: f64,
    avg_signal_power: f64,
}

impl Statistics {
    /// Creates an empty accumulator
    pub const fn new() -> Self {
        Statistics {
            interrogations: 0,
            successful_interrogations: 0,
            min_distance: f64::INFINITY,
            max_distance: f64::NEG_INFINITY,
            avg_distance: 0.0,
            avg_signal_power: 0.0,
        }
    }

    /// Counts a ranging attempt (a POLL was sent)
    pub fn record_attempt(&mut self) {
        self.interrogations = self.interrogations.saturating_add(1);
    }

    /// Adds a successful measurement
    ///
    /// `signal_power` is the receive power of the REPORT, in dBm.
    pub fn record_success(&mut self, distance: f64, signal_power: f64) {
        self.successful_interrogations = self.successful_interrogations.saturating_add(1);

        self.min_distance = self.min_distance.min(distance);
        self.max_distance = self.max_distance.max(distance);

        if self.successful_interrogations == 1 {
            self.avg_distance = distance;
            self.avg_signal_power = signal_power;
        }
        else {
            let n = self.successful_interrogations as f64;
            self.avg_distance += (distance - self.avg_distance) / n;
            self.avg_signal_power += (signal_power - self.avg_signal_power) / n;
        }
    }

    /// Number of ranging attempts
    pub fn interrogations(&self) -> u32 {
        self.interrogations
    }

    /// Number of attempts that produced a distance
    pub fn successful_interrogations(&self) -> u32 {
        self.successful_interrogations
    }

    /// Smallest distance so far, `+inf` if there is none
    pub fn min_distance(&self) -> f64 {
        self.min_distance
    }

    /// Largest distance so far, `-inf` if there is none
    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Mean distance
    pub fn avg_distance(&self) -> f64 {
        self.avg_distance
    }

    /// Mean receive power
    pub fn avg_signal_power(&self) -> f64 {
        self.avg_signal_power
    }

    /// Share of attempts without result, in percent
    ///
    /// Zero if there was no attempt yet.
    pub fn packet_loss_percent(&self) -> f64 {
        if self.interrogations == 0 {
            return 0.0;
        }

        let lost = self.interrogations.saturating_sub(self.successful_interrogations);
        lost as f64 / self.interrogations as f64 * 100.0
    }

    /// Returns the current values without resetting them
    pub fn snapshot(&self) -> StatsReport {
        StatsReport {
            max_distance: self.max_distance,
            min_distance: self.min_distance,
            avg_distance: self.avg_distance,
            avg_signal_power: self.avg_signal_power,
            packet_loss_percent: self.packet_loss_percent(),
            interrogations: self.interrogations,
            successful_interrogations: self.successful_interrogations,
        }
    }

    /// Returns the current values and starts over
    pub fn report_and_reset(&mut self) -> StatsReport {
        let report = self.snapshot();
        *self = Statistics::new();
        report
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Statistics::new()
    }
}


/// A snapshot of [`Statistics`]
///
/// Formats as a single line:
///
/// ``` text
/// max =     2.310 min =     2.104 avg =     2.198 rssi =  -78.5 plr =   3.0
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatsReport {
    /// Largest distance in meters
    pub max_distance: f64,

    /// Smallest distance in meters
    pub min_distance: f64,

    /// Mean distance in meters
    pub avg_distance: f64,

    /// Mean receive power in dBm
    pub avg_signal_power: f64,

    /// Attempts without result, in percent
    pub packet_loss_percent: f64,

    /// Number of attempts
    pub interrogations: u32,

    /// Number of attempts with result
    pub successful_interrogations: u32,
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "max = {:9.3} min = {:9.3} avg = {:9.3} rssi = {:6.1} plr = {:5.1}",
            self.max_distance,
            self.min_distance,
            self.avg_distance,
            self.avg_signal_power,
            self.packet_loss_percent,
        )
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [(f64, f64); 6] = [
        (2.31, -78.0),
        (2.104, -80.5),
        (2.2, -77.25),
        (2.9, -79.0),
        (1.75, -81.0),
        (2.05, -76.5),
    ];

    #[test]
    fn starts_empty() {
        let stats = Statistics::new();

        assert_eq!(stats.interrogations(), 0);
        assert_eq!(stats.successful_interrogations(), 0);
        assert_eq!(stats.min_distance(), f64::INFINITY);
        assert_eq!(stats.max_distance(), f64::NEG_INFINITY);
        assert_eq!(stats.packet_loss_percent(), 0.0);
    }

    #[test]
    fn first_sample_sets_the_means() {
        let mut stats = Statistics::new();
        stats.record_success(3.5, -70.0);

        assert_eq!(stats.avg_distance(), 3.5);
        assert_eq!(stats.avg_signal_power(), -70.0);
        assert_eq!(stats.min_distance(), 3.5);
        assert_eq!(stats.max_distance(), 3.5);
    }

    #[test]
    fn incremental_mean_matches_arithmetic_mean() {
        let mut stats = Statistics::new();
        for &(distance, power) in SAMPLES.iter() {
            stats.record_success(distance, power);
        }

        let n = SAMPLES.len() as f64;
        let distance_mean = SAMPLES.iter().map(|s| s.0).sum::<f64>() / n;
        let power_mean = SAMPLES.iter().map(|s| s.1).sum::<f64>() / n;

        assert!((stats.avg_distance() - distance_mean).abs() < 1e-12);
        assert!((stats.avg_signal_power() - power_mean).abs() < 1e-12);
    }

    #[test]
    fn min_and_max_bound_all_samples() {
        let mut stats = Statistics::new();
        for &(distance, power) in SAMPLES.iter() {
            stats.record_success(distance, power);
        }

        for &(distance, _) in SAMPLES.iter() {
            assert!(stats.min_distance() <= distance);
            assert!(distance <= stats.max_distance());
        }
        assert_eq!(stats.min_distance(), 1.75);
        assert_eq!(stats.max_distance(), 2.9);
    }

    #[test]
    fn packet_loss() {
        let mut stats = Statistics::new();
        for _ in 0..4 {
            stats.record_attempt();
        }
        stats.record_success(1.0, -80.0);

        assert_eq!(stats.packet_loss_percent(), 75.0);
    }

    #[test]
    fn report_resets() {
        let mut stats = Statistics::new();
        stats.record_attempt();
        stats.record_attempt();
        stats.record_success(1.5, -80.0);

        let report = stats.report_and_reset();
        assert_eq!(report.interrogations, 2);
        assert_eq!(report.successful_interrogations, 1);
        assert_eq!(report.packet_loss_percent, 50.0);
        assert_eq!(report.avg_distance, 1.5);

        assert_eq!(stats, Statistics::new());
    }

    #[test]
    fn report_line() {
        let mut stats = Statistics::new();
        stats.record_attempt();
        stats.record_attempt();
        stats.record_success(2.5, -80.25);
        stats.record_success(1.5, -79.75);

        let line = format!("{}", stats.report_and_reset());
        assert_eq!(
            line,
            "max =     2.500 min =     1.500 avg =     2.000 rssi =  -80.0 plr =   0.0",
        );
    }
}
