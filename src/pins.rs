//! GPIO / peripheral pin assignments for the fridge sensor board.
//!
//! Single source of truth for the board wiring.  The ADC channel is passed
//! to the drivers from here; the load cell GPIOs are claimed as typed
//! `Peripherals` pins in `main.rs`, which must match the numbers below.

// ---------------------------------------------------------------------------
// Ambient light (LDR voltage divider → ADC1)
// ---------------------------------------------------------------------------

/// LDR divider output.  ADC1 channel 0 (GPIO 1 on ESP32-S3).
pub const LIGHT_ADC_GPIO: i32 = 1;
/// ADC1 channel number matching [`LIGHT_ADC_GPIO`].
pub const LIGHT_ADC1_CHANNEL: u32 = 0;

// ---------------------------------------------------------------------------
// Load cell (HX711 bridge amplifier)
// ---------------------------------------------------------------------------

/// HX711 DOUT — data-ready / serial data (input).
pub const LOAD_CELL_DOUT_GPIO: i32 = 2;
/// HX711 PD_SCK — serial clock (output).
pub const LOAD_CELL_SCK_GPIO: i32 = 4;
