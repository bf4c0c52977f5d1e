//! Fridgewatch Firmware — Main Entry Point
//!
//! Hexagonal architecture with a single synchronous control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  LightSensor   Hx711        WifiAdapter   MqttAdapter          │
//! │  (Light)       (LoadCell)   (Network)     (Session)            │
//! │  LogEventSink  Watchdog                                        │
//! │  (EventSink)   (Housekeeping)                                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            FridgeService (pure logic)                  │    │
//! │  │  DoorDetector · WeightSensor · ConnectivityManager     │    │
//! │  │  BottleAnalyzer                                        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::{Ets, FreeRtos};
use esp_idf_svc::hal::gpio::PinDriver;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::info;

use fridgewatch::adapters::log_sink::LogEventSink;
use fridgewatch::adapters::mqtt::MqttAdapter;
use fridgewatch::adapters::wifi::WifiAdapter;
use fridgewatch::app::service::FridgeService;
use fridgewatch::config::SystemConfig;
use fridgewatch::drivers::hw_init;
use fridgewatch::drivers::hx711::Hx711;
use fridgewatch::drivers::watchdog::Watchdog;
use fridgewatch::pins;
use fridgewatch::sensors::light::LightSensor;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Fridgewatch v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig::build_time();
    info!(
        "Config: broker {}:{} prefix '{}' ({} WiFi networks)",
        config.broker_host,
        config.broker_port,
        config.topic_prefix,
        config.wifi_networks.len()
    );

    // ── 3. Peripherals ────────────────────────────────────────
    hw_init::init_adc(pins::LIGHT_ADC1_CHANNEL)?;
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let light = LightSensor::new(pins::LIGHT_ADC1_CHANNEL);

    // Pin objects are typed per GPIO; keep these in step with
    // `pins::LOAD_CELL_DOUT_GPIO` / `pins::LOAD_CELL_SCK_GPIO`.
    let dout = PinDriver::input(peripherals.pins.gpio2)?;
    let sck = PinDriver::output(peripherals.pins.gpio4)?;
    info!(
        "HX711 on DOUT=GPIO{} SCK=GPIO{}",
        pins::LOAD_CELL_DOUT_GPIO,
        pins::LOAD_CELL_SCK_GPIO
    );
    let cell = Hx711::new(dout, sck, Ets);

    let wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?;
    let network = WifiAdapter::new(wifi);
    let session = MqttAdapter::new();

    // ── 4. Application service ────────────────────────────────
    let mut service = FridgeService::from_config(&config, light, FreeRtos, cell, network, session);
    let mut sink = LogEventSink::new();
    let mut watchdog = Watchdog::new();

    service.start(&mut sink);

    // ── 5. Control loop (never returns) ───────────────────────
    service.run(&mut sink, &mut watchdog, &mut FreeRtos)
}
