//! Telemetry reading types: Channel, Reading, InjectedFault

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of numeric channels in a reading (the classifier's feature count).
pub const NUM_CHANNELS: usize = 4;

/// Feature vector in canonical channel order (rpm, pressure, vibration, egt).
pub type FeatureVector = [f64; NUM_CHANNELS];

// ============================================================================
// Channels
// ============================================================================

/// One numeric telemetry channel of an engine reading
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Shaft rotational speed (rpm)
    Rpm,
    /// Oil / hydraulic pressure (PSI)
    Pressure,
    /// Vibration amplitude (mm/s)
    Vibration,
    /// Exhaust gas temperature (°C)
    Egt,
}

impl Channel {
    /// All channels in canonical feature order.
    pub const ALL: [Self; NUM_CHANNELS] = [Self::Rpm, Self::Pressure, Self::Vibration, Self::Egt];

    /// Position in the feature vector
    pub const fn index(self) -> usize {
        match self {
            Self::Rpm => 0,
            Self::Pressure => 1,
            Self::Vibration => 2,
            Self::Egt => 3,
        }
    }

    /// Config / log key
    pub const fn key(self) -> &'static str {
        match self {
            Self::Rpm => "rpm",
            Self::Pressure => "pressure",
            Self::Vibration => "vibration",
            Self::Egt => "egt",
        }
    }

    /// Get display name for reports
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Rpm => "RPM",
            Self::Pressure => "Pressure",
            Self::Vibration => "Vibration",
            Self::Egt => "EGT",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::Rpm => "rpm",
            Self::Pressure => "PSI",
            Self::Vibration => "mm/s",
            Self::Egt => "°C",
        }
    }

    /// Format a value of this channel with its customary precision and unit.
    pub fn format_value(self, value: f64) -> String {
        match self {
            Self::Vibration => format!("{value:.2} {}", self.unit()),
            _ => format!("{value:.0} {}", self.unit()),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Injected Faults (simulator ground truth)
// ============================================================================

/// Fault the simulator injected into a reading, if any
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InjectedFault {
    /// Pressure falls to roughly 40-60% of nominal
    PressureDrop,
    /// Vibration climbs to 2-4x nominal
    VibrationSpike,
    /// Exhaust gas temperature jumps to 1.3-1.6x nominal
    EgtJump,
}

impl InjectedFault {
    pub const ALL: [Self; 3] = [Self::PressureDrop, Self::VibrationSpike, Self::EgtJump];

    /// Channel the fault is written to
    pub const fn channel(self) -> Channel {
        match self {
            Self::PressureDrop => Channel::Pressure,
            Self::VibrationSpike => Channel::Vibration,
            Self::EgtJump => Channel::Egt,
        }
    }

    /// Short code for logging
    pub const fn short_code(self) -> &'static str {
        match self {
            Self::PressureDrop => "pressure_drop",
            Self::VibrationSpike => "vibration_spike",
            Self::EgtJump => "egt_jump",
        }
    }
}

impl std::fmt::Display for InjectedFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_code())
    }
}

// ============================================================================
// Reading
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ReadingError {
    #[error("Non-finite value {value} on channel {channel} (cycle {cycle})")]
    NonFinite {
        cycle: u64,
        channel: Channel,
        value: f64,
    },
}

/// One telemetry sample. Fields are private so a reading cannot change after
/// construction, and construction rejects non-finite values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    cycle: u64,
    timestamp: DateTime<Utc>,
    rpm: f64,
    pressure: f64,
    vibration: f64,
    egt: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    injected_fault: Option<InjectedFault>,
}

impl Reading {
    /// Build a reading stamped with the current time.
    pub fn new(cycle: u64, values: FeatureVector) -> Result<Self, ReadingError> {
        Self::at(cycle, Utc::now(), values, None)
    }

    /// Build a reading with an explicit timestamp and optional injected fault.
    pub fn at(
        cycle: u64,
        timestamp: DateTime<Utc>,
        values: FeatureVector,
        injected_fault: Option<InjectedFault>,
    ) -> Result<Self, ReadingError> {
        for channel in Channel::ALL {
            let value = values[channel.index()];
            if !value.is_finite() {
                return Err(ReadingError::NonFinite {
                    cycle,
                    channel,
                    value,
                });
            }
        }

        let [rpm, pressure, vibration, egt] = values;
        Ok(Self {
            cycle,
            timestamp,
            rpm,
            pressure,
            vibration,
            egt,
            injected_fault,
        })
    }

    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub const fn rpm(&self) -> f64 {
        self.rpm
    }

    pub const fn pressure(&self) -> f64 {
        self.pressure
    }

    pub const fn vibration(&self) -> f64 {
        self.vibration
    }

    pub const fn egt(&self) -> f64 {
        self.egt
    }

    pub const fn injected_fault(&self) -> Option<InjectedFault> {
        self.injected_fault
    }

    /// Value of a single channel
    pub const fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Rpm => self.rpm,
            Channel::Pressure => self.pressure,
            Channel::Vibration => self.vibration,
            Channel::Egt => self.egt,
        }
    }

    /// All channels in canonical feature order
    pub const fn features(&self) -> FeatureVector {
        [self.rpm, self.pressure, self.vibration, self.egt]
    }

    /// One-line channel summary used in prompts and reports
    pub fn summary_line(&self) -> String {
        format!(
            "RPM={:.0} | Pressure={:.0} | Vibration={:.2} | EGT={:.0}",
            self.rpm, self.pressure, self.vibration, self.egt
        )
    }
}
