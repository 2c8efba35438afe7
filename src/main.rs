//! Motion-alert firmware: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │  WifiStation   HttpClientTransport   PirSensor   SystemClock │
//! │  (WifiDriver)  (HttpTransport)       (Motion)    (Clock)     │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  AlertStateMachine: FSM · ConnectivityManager ·        │  │
//! │  │                     NotificationClient                 │  │
//! │  └───────────────────────────┬────────────────────────────┘  │
//! │                              ▼                               │
//! │  SharedCore (critical section) ◀── timer service (esp_timer) │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Built for ESP-IDF this drives real GPIO, WiFi and HTTP.  Built for the
//! host it runs the same loop against simulated adapters:
//!
//! ```text
//! cargo run --no-default-features -- path/to/.env
//! ```

#![deny(unused_must_use)]

use anyhow::{Context, Result};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::info;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use motion_alert::adapters::device_id;
use motion_alert::adapters::hardware;
use motion_alert::adapters::http::HttpClientTransport;
use motion_alert::adapters::log_sink::LogEventSink;
use motion_alert::adapters::time::SystemClock;
use motion_alert::adapters::wifi::WifiStation;
use motion_alert::app::ports::{HttpTransport, MotionSensor, WifiDriver};
use motion_alert::app::service::AlertStateMachine;
use motion_alert::config::DeviceConfig;
use motion_alert::connectivity::ConnectivityManager;
use motion_alert::drivers::hw_timer;
use motion_alert::drivers::indicator::ActuatorController;
use motion_alert::drivers::motion::PirSensor;
use motion_alert::notify::NotificationClient;
use motion_alert::shared::SharedCore;

// ── Shared boot path ──────────────────────────────────────────

fn load_config(text: &str) -> Result<DeviceConfig> {
    let mut config = DeviceConfig::from_kv_str(text).context("invalid device configuration")?;
    if config.device_id.is_empty() {
        config.device_id = device_id::device_id(&device_id::read_mac());
    }
    info!("Device ID: {}", config.device_id);
    Ok(config)
}

fn indicator<P: OutputPin>(pin: P, config: &DeviceConfig) -> ActuatorController<P, SmallRng> {
    ActuatorController::new(pin, SmallRng::seed_from_u64(device_id::entropy_seed()))
        .with_flicker_probability(config.flicker_probability)
        .with_jitter_window(config.blink_jitter_min_ms, config.blink_jitter_max_ms)
}

/// Start the timer context, then run the main loop forever.
fn run<D, T, P, R>(
    config: DeviceConfig,
    shared: &'static SharedCore<P, R>,
    wifi: D,
    http: T,
    sensor: &mut impl MotionSensor,
) -> Result<()>
where
    D: WifiDriver,
    T: HttpTransport,
    P: OutputPin + Send + 'static,
    R: RngCore + Send + 'static,
{
    hw_timer::start_timer_service(shared, config.timer_resolution_ms)
        .context("timer service")?;

    let connectivity = ConnectivityManager::new(wifi, &config);
    let notifier = NotificationClient::new(http, &config).context("notification client")?;
    let tick_ms = config.tick_interval_ms;

    let mut machine = AlertStateMachine::new(config, shared, connectivity, notifier);
    let mut board = SystemClock::new();
    let mut sink = LogEventSink::new();
    machine.start(&mut sink);

    loop {
        machine.tick(sensor, &mut board, &mut sink);
        board.delay_ms(tick_ms);
    }
}

// ── ESP-IDF ───────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Motion Alert v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config(include_str!(concat!(env!("OUT_DIR"), "/device.env")))?;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let wifi = WifiStation::new(peripherals.modem, sysloop, Some(nvs)).context("WiFi driver")?;

    let led = hardware::indicator_output(config.indicator_pin).context("indicator pin")?;
    let mut sensor = PirSensor::new(hardware::motion_input(config.motion_pin).context("PIR pin")?);

    let shared: &'static _ = Box::leak(Box::new(SharedCore::new(indicator(led, &config))));
    run(config, shared, wifi, HttpClientTransport::new(), &mut sensor)
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Motion Alert v{} (simulation)", env!("CARGO_PKG_VERSION"));

    let text = match std::env::args().nth(1) {
        Some(path) => {
            std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?
        }
        None => String::new(),
    };
    let mut config = load_config(&text)?;
    if !config.has_credentials() {
        info!("No credentials configured; using the simulated network");
        config.apply_kv_str("ssid=motion-sim\npassword=motion-sim-pass")?;
    }

    let wifi = WifiStation::new(1_500);
    let mut sensor = PirSensor::new(hardware::SimPirPin::new(5_000, 30_000, 500));

    let shared: &'static _ = Box::leak(Box::new(SharedCore::new(indicator(
        hardware::SimIndicatorPin::new(),
        &config,
    ))));
    run(config, shared, wifi, HttpClientTransport::new(), &mut sensor)
}
