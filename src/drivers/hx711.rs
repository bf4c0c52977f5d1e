//! HX711 24-bit bridge ADC (load cell amplifier).
//!
//! Bit-banged two-wire interface: DOUT goes low when a conversion is ready,
//! then 24 clock pulses on PD_SCK shift the result out MSB first.  One
//! extra pulse selects channel A / gain 128 for the next conversion.
//!
//! Generic over `embedded-hal` 1.0 pins and delay so the same driver runs
//! on `esp-idf-hal` `PinDriver`s and on host fakes.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::warn;

use crate::app::ports::LoadCellPort;
use crate::error::SensorError;

/// Extra clock pulses after the data bits: 1 = channel A, gain 128.
const GAIN_128_PULSES: u8 = 1;

/// How long to wait for DOUT to signal data-ready.  At 10 SPS a conversion
/// takes 100 ms.
const READY_TIMEOUT_MS: u32 = 200;

pub struct Hx711<DOUT, SCK, D> {
    dout: DOUT,
    sck: SCK,
    delay: D,
    last: i32,
}

impl<DOUT, SCK, D> Hx711<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    pub fn new(dout: DOUT, sck: SCK, delay: D) -> Self {
        Self {
            dout,
            sck,
            delay,
            last: 0,
        }
    }

    /// DOUT low means a conversion is waiting.
    pub fn is_ready(&mut self) -> Result<bool, SensorError> {
        self.dout.is_low().map_err(|_| SensorError::GpioFailed)
    }

    /// Read one conversion, waiting for data-ready.
    pub fn read(&mut self) -> Result<i32, SensorError> {
        let mut waited_ms = 0;
        while !self.is_ready()? {
            if waited_ms >= READY_TIMEOUT_MS {
                return Err(SensorError::LoadCellNotReady);
            }
            self.delay.delay_ms(1);
            waited_ms += 1;
        }

        let mut raw: u32 = 0;
        for _ in 0..24 {
            self.clock_high()?;
            let bit = self.dout.is_high().map_err(|_| SensorError::GpioFailed)?;
            self.clock_low()?;
            raw = (raw << 1) | u32::from(bit);
        }
        for _ in 0..GAIN_128_PULSES {
            self.clock_high()?;
            self.clock_low()?;
        }

        Ok(sign_extend_24(raw))
    }

    fn clock_high(&mut self) -> Result<(), SensorError> {
        self.sck.set_high().map_err(|_| SensorError::GpioFailed)?;
        self.delay.delay_us(1);
        Ok(())
    }

    fn clock_low(&mut self) -> Result<(), SensorError> {
        self.sck.set_low().map_err(|_| SensorError::GpioFailed)?;
        self.delay.delay_us(1);
        Ok(())
    }
}

impl<DOUT, SCK, D> LoadCellPort for Hx711<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    /// A failed read is logged and the previous good value is returned.
    fn read_raw(&mut self) -> i32 {
        match self.read() {
            Ok(v) => {
                self.last = v;
                v
            }
            Err(e) => {
                warn!("HX711: {} — reusing last value {}", e, self.last);
                self.last
            }
        }
    }
}

/// Two's-complement 24-bit → i32.
fn sign_extend_24(raw: u32) -> i32 {
    ((raw << 8) as i32) >> 8
}
