//! Ambient light sensor (LDR + divider on ADC1).
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the ADC1 channel via the oneshot API (initialised by
//! hw_init).
//! On host/test: reads from a static `AtomicU16` for injection.

use core::sync::atomic::{AtomicU16, Ordering};

use crate::app::ports::LightSensorPort;

static SIM_LIGHT_ADC: AtomicU16 = AtomicU16::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_light(raw: u16) {
    SIM_LIGHT_ADC.store(raw, Ordering::Relaxed);
}

pub struct LightSensor {
    _adc_channel: u32,
    last: u16,
}

impl LightSensor {
    pub fn new(adc_channel: u32) -> Self {
        Self {
            _adc_channel: adc_channel,
            last: 0,
        }
    }

    /// Most recent sample.
    pub fn last(&self) -> u16 {
        self.last
    }

    /// A failed conversion repeats the previous sample.
    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> u16 {
        match crate::drivers::hw_init::adc1_read(self._adc_channel) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Light: {}, reusing {}", e, self.last);
                self.last
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> u16 {
        SIM_LIGHT_ADC.load(Ordering::Relaxed)
    }
}

impl LightSensorPort for LightSensor {
    fn read_light(&mut self) -> u16 {
        self.last = self.read_adc();
        self.last
    }
}
