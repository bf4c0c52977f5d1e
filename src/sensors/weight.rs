//! Weight sensor adapter.
//!
//! Wraps a [`LoadCellPort`] and holds the zero offset.  The offset is the
//! only runtime-adjustable knob (set by the reset command); the
//! calibration factor converting raw units to kilograms is configuration.

use log::debug;

use crate::app::ports::LoadCellPort;

pub struct WeightSensor<C> {
    cell: C,
    offset: i32,
    /// Conversions averaged per scaled reading.
    scaled_samples: u8,
}

impl<C: LoadCellPort> WeightSensor<C> {
    pub fn new(cell: C, offset: i32, scaled_samples: u8) -> Self {
        Self {
            cell,
            offset,
            scaled_samples: scaled_samples.max(1),
        }
    }

    /// Mean of `samples` raw conversions (at least one is always taken).
    pub fn read_average(&mut self, samples: u8) -> i32 {
        let n = samples.max(1);
        let sum: i64 = (0..n).map(|_| i64::from(self.cell.read_raw())).sum();
        let avg = (sum / i64::from(n)) as i32;
        debug!("weight: raw avg={} over {} samples", avg, n);
        avg
    }

    pub fn set_offset(&mut self, offset: i32) {
        self.offset = offset;
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// `(raw_average - offset) / calibration_factor`.
    pub fn read_scaled(&mut self, calibration_factor: f32) -> f32 {
        let raw = self.read_average(self.scaled_samples);
        let net = i64::from(raw) - i64::from(self.offset);
        net as f32 / calibration_factor
    }

    pub fn cell_mut(&mut self) -> &mut C {
        &mut self.cell
    }
}
