//! Engine Telemetry Simulator
//!
//! Generates one reading per cycle with every channel drawn uniformly from
//! the nominal envelope. With the configured probability a fault is injected
//! into one channel:
//!
//! - pressure drop: pressure 700-1200 PSI (roughly 40-60% of nominal)
//! - vibration spike: vibration 1.5-3.5 mm/s (2-4x nominal)
//! - EGT jump: exhaust gas temperature 950-1200 °C (1.3-1.6x nominal)

use chrono::Utc;
use rand::prelude::*;
use rand_distr::{Bernoulli, BernoulliError, Uniform};

use crate::types::{Channel, FeatureVector, InjectedFault, Reading, ReadingError, NUM_CHANNELS};

// ============================================================================
// Operating Envelope
// ============================================================================

/// Nominal `(low, high)` per channel, in canonical channel order.
pub const NOMINAL_ENVELOPE: [(f64, f64); NUM_CHANNELS] = [
    (8_500.0, 9_500.0), // rpm
    (1_800.0, 2_000.0), // PSI
    (0.1, 0.8),         // mm/s
    (700.0, 800.0),     // °C
];

/// Value range written into the faulted channel
const fn fault_range(fault: InjectedFault) -> (f64, f64) {
    match fault {
        InjectedFault::PressureDrop => (700.0, 1_200.0),
        InjectedFault::VibrationSpike => (1.5, 3.5),
        InjectedFault::EgtJump => (950.0, 1_200.0),
    }
}

/// Draw one nominal feature vector.
///
/// Shared by the simulator and by classifier training so both see the same
/// envelope.
pub fn sample_nominal<R: Rng + ?Sized>(rng: &mut R) -> FeatureVector {
    let mut values = [0.0; NUM_CHANNELS];
    for channel in Channel::ALL {
        let (low, high) = NOMINAL_ENVELOPE[channel.index()];
        values[channel.index()] = Uniform::new_inclusive(low, high).sample(rng);
    }
    values
}

// ============================================================================
// Simulator
// ============================================================================

pub struct TelemetrySimulator {
    rng: StdRng,
    injection: Bernoulli,
    cycle: u64,
    injected: u64,
}

impl TelemetrySimulator {
    /// Create a simulator. `seed = None` draws a fresh seed from the OS.
    ///
    /// Fails only when `anomaly_probability` is outside `[0, 1]`, which config
    /// validation already rules out.
    pub fn new(anomaly_probability: f64, seed: Option<u64>) -> Result<Self, BernoulliError> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            rng,
            injection: Bernoulli::new(anomaly_probability)?,
            cycle: 0,
            injected: 0,
        })
    }

    /// Produce the next reading. Cycle indices start at 1.
    pub fn next_reading(&mut self) -> Result<Reading, ReadingError> {
        self.cycle += 1;

        let mut values = sample_nominal(&mut self.rng);
        let fault = if self.injection.sample(&mut self.rng) {
            let fault = *InjectedFault::ALL
                .choose(&mut self.rng)
                .unwrap_or(&InjectedFault::PressureDrop);
            let (low, high) = fault_range(fault);
            values[fault.channel().index()] = Uniform::new_inclusive(low, high).sample(&mut self.rng);
            self.injected += 1;
            Some(fault)
        } else {
            None
        };

        Reading::at(self.cycle, Utc::now(), values, fault)
    }

    /// Cycles generated so far
    pub const fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Readings that carried an injected fault
    pub const fn injected(&self) -> u64 {
        self.injected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_probability_is_always_nominal() {
        let mut sim = TelemetrySimulator::new(0.0, Some(7)).unwrap();
        for _ in 0..200 {
            let reading = sim.next_reading().unwrap();
            assert!(reading.injected_fault().is_none());
            for channel in Channel::ALL {
                let (low, high) = NOMINAL_ENVELOPE[channel.index()];
                let v = reading.value(channel);
                assert!(v >= low && v <= high, "{channel} = {v}");
            }
        }
        assert_eq!(sim.injected(), 0);
    }

    #[test]
    fn test_full_probability_always_injects() {
        let mut sim = TelemetrySimulator::new(1.0, Some(7)).unwrap();
        for _ in 0..50 {
            let reading = sim.next_reading().unwrap();
            let fault = reading.injected_fault().unwrap();
            let (low, high) = fault_range(fault);
            let v = reading.value(fault.channel());
            assert!(v >= low && v <= high);
        }
        assert_eq!(sim.injected(), 50);
    }

    #[test]
    fn test_cycles_are_sequential() {
        let mut sim = TelemetrySimulator::new(0.5, Some(1)).unwrap();
        let cycles: Vec<u64> = (0..4).map(|_| sim.next_reading().unwrap().cycle()).collect();
        assert_eq!(cycles, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_same_seed_same_values() {
        let mut a = TelemetrySimulator::new(0.3, Some(99)).unwrap();
        let mut b = TelemetrySimulator::new(0.3, Some(99)).unwrap();
        for _ in 0..20 {
            assert_eq!(
                a.next_reading().unwrap().features(),
                b.next_reading().unwrap().features()
            );
        }
    }

    #[test]
    fn test_invalid_probability_rejected() {
        assert!(TelemetrySimulator::new(1.5, None).is_err());
    }
}
