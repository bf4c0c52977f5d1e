//! Bottle analysis — infers how many bottles left the fridge.
//!
//! Fed with the debounced door transitions and every published weight
//! reading.  A reading only counts once a rolling window of samples is
//! stable (sample standard deviation below a limit); the window mean is
//! then used as the settled weight.
//!
//! ```text
//!   Start ──CLOSE──▶ InitWeight ──stable──▶ ClosedStable ◀──┐
//!     ▲                  │                   │   │ stable:  │
//!     └──────OPEN────────┘                   │   └ new ref  │
//!                                          OPEN             │
//!                                            ▼              │
//!                          ClosedUnstable ◀─CLOSE── Opened  │
//!                                  └──stable: count bottles─┘
//! ```
//!
//! The weight lost between the reference taken before the door opened and
//! the first stable reading after it closed is divided by the bottle
//! weight.  Only a whole number of bottles within the tolerance counts;
//! anything else (a gain, a half-eaten cheese) is ignored.

use log::{debug, info};

use crate::config::{MAX_STABLE_WINDOW, SystemConfig};
use crate::sensors::door::DoorState;

/// Where the analyzer is in the door cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the first confirmed close.
    Start,
    /// Closed, waiting for the first settled weight.
    InitWeight,
    /// Closed with a settled reference weight.
    ClosedStable,
    /// Open since the last reference.
    Opened,
    /// Closed again, waiting for the weight to settle.
    ClosedUnstable,
}

pub struct BottleAnalyzer {
    phase: Phase,
    window: heapless::Deque<f32, MAX_STABLE_WINDOW>,
    window_len: usize,
    stable_deviation: f32,
    bottle_weight: f32,
    bottle_tolerance: f32,
    reference: Option<f32>,
}

impl BottleAnalyzer {
    /// `window_len` is clamped to `2..=MAX_STABLE_WINDOW`.
    pub fn new(window_len: usize, stable_deviation: f32, bottle_weight: f32, bottle_tolerance: f32) -> Self {
        Self {
            phase: Phase::Start,
            window: heapless::Deque::new(),
            window_len: window_len.clamp(2, MAX_STABLE_WINDOW),
            stable_deviation,
            bottle_weight,
            bottle_tolerance,
            reference: None,
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(
            usize::from(config.stable_window),
            config.stable_deviation,
            config.bottle_weight,
            config.bottle_tolerance,
        )
    }

    /// Feed a debounced door transition.
    pub fn on_door(&mut self, state: DoorState) {
        let next = match (self.phase, state) {
            (Phase::Start, DoorState::Closed) => Phase::InitWeight,
            (Phase::InitWeight, DoorState::Open) => Phase::Start,
            (Phase::ClosedStable, DoorState::Open) => Phase::Opened,
            (Phase::Opened, DoorState::Closed) => Phase::ClosedUnstable,
            (phase, _) => phase,
        };
        if next != self.phase {
            debug!("Analysis: {:?} -> {:?}", self.phase, next);
            self.phase = next;
        }
    }

    /// Feed one weight reading.  Returns the number of bottles taken when
    /// this reading settles a closed-after-open cycle.
    pub fn on_sample(&mut self, weight: f32) -> Option<u32> {
        if self.window.len() == self.window_len {
            self.window.pop_back();
        }
        // Cannot fail: one slot was just freed if the window was full.
        let _ = self.window.push_front(weight);

        let settled = self.settled()?;
        match self.phase {
            Phase::InitWeight => {
                info!("Analysis: initial fridge weight {:.3}", settled);
                self.reference = Some(settled);
                self.phase = Phase::ClosedStable;
                None
            }
            Phase::ClosedStable => {
                self.reference = Some(settled);
                None
            }
            Phase::ClosedUnstable => {
                let taken = self.reference.and_then(|before| self.bottles_between(before, settled));
                self.reference = Some(settled);
                self.phase = Phase::ClosedStable;
                if let Some(n) = taken {
                    info!("Analysis: {} bottle(s) taken", n);
                }
                taken
            }
            Phase::Start | Phase::Opened => None,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Settled weight the next bottle count is measured against.
    pub fn reference(&self) -> Option<f32> {
        self.reference
    }

    // ── Internal ──────────────────────────────────────────────

    /// Window mean, if the window is full and its spread is below the limit.
    fn settled(&self) -> Option<f32> {
        if self.window.len() < self.window_len {
            return None;
        }
        let n = self.window.len() as f32;
        let mean = self.window.iter().sum::<f32>() / n;
        let variance = self.window.iter().map(|w| (w - mean) * (w - mean)).sum::<f32>() / (n - 1.0);
        (variance.sqrt() < self.stable_deviation).then_some(mean)
    }

    fn bottles_between(&self, before: f32, after: f32) -> Option<u32> {
        let lost = before - after;
        if lost <= 0.0 {
            return None;
        }
        let bottles = (lost / self.bottle_weight).round();
        let deviation = (lost - bottles * self.bottle_weight).abs();
        if bottles < 1.0 || deviation > self.bottle_tolerance {
            debug!("Analysis: {:.3} lost, not a whole number of bottles", lost);
            return None;
        }
        Some(bottles as u32)
    }
}
