//! Door state detection from ambient light.
//!
//! The fridge lamp (or room light falling in) lifts the LDR reading above a
//! fixed threshold while the door is open.  Single crossings are noisy, so a
//! transition is only accepted when an initial sample and every one of the
//! following confirmation samples fall on the same side of the threshold.
//!
//! Any disagreeing sample throws the whole evaluation away.  There is no
//! retry within the same call; the next control tick simply tries again.

use embedded_hal::delay::DelayNs;
use log::{debug, info, trace};

use crate::app::ports::LightSensorPort;
use crate::config::SystemConfig;

/// Debounced door state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Open,
    Closed,
}

impl DoorState {
    /// Classify one light sample.  Strictly above the threshold is open.
    pub fn from_light(sample: u16, threshold: u16) -> Self {
        if sample > threshold {
            Self::Open
        } else {
            Self::Closed
        }
    }

    /// MQTT payload for the door topic.
    pub fn payload(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSE",
        }
    }
}

/// Owns the light sensor and the inter-sample delay, and the one
/// process-wide [`DoorState`].
pub struct DoorDetector<L, D> {
    light: L,
    delay: D,
    threshold: u16,
    window: u8,
    sample_delay_ms: u32,
    state: DoorState,
}

impl<L: LightSensorPort, D: DelayNs> DoorDetector<L, D> {
    /// The door is assumed closed at power-on.
    pub fn new(light: L, delay: D, threshold: u16, window: u8, sample_delay_ms: u32) -> Self {
        Self {
            light,
            delay,
            threshold,
            window,
            sample_delay_ms,
            state: DoorState::Closed,
        }
    }

    pub fn from_config(light: L, delay: D, config: &SystemConfig) -> Self {
        Self::new(
            light,
            delay,
            config.light_threshold,
            config.debounce_samples,
            config.debounce_sample_delay_ms,
        )
    }

    /// Run one debounce window.
    ///
    /// Returns the new state only when the window agreed unanimously and the
    /// result differs from the current state.
    pub fn evaluate(&mut self) -> Option<DoorState> {
        let first = self.light.read_light();
        trace!("door: light={}", first);
        let candidate = DoorState::from_light(first, self.threshold);

        for n in 1..=self.window {
            self.delay.delay_ms(self.sample_delay_ms);
            let sample = self.light.read_light();
            trace!("door: light={}", sample);
            if DoorState::from_light(sample, self.threshold) != candidate {
                debug!(
                    "door: sample {}/{} ({}) disagrees with {:?}, window discarded",
                    n, self.window, sample, candidate
                );
                return None;
            }
        }

        if candidate == self.state {
            return None;
        }
        info!("door: {:?} -> {:?}", self.state, candidate);
        self.state = candidate;
        Some(candidate)
    }

    pub fn state(&self) -> DoorState {
        self.state
    }

    pub fn light_mut(&mut self) -> &mut L {
        &mut self.light
    }

    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }
}
