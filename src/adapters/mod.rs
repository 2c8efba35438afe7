//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements            | Connects to                  |
//! |-------------|-----------------------|------------------------------|
//! | `wifi`      | WifiDriver            | ESP-IDF WiFi STA             |
//! | `http`      | HttpTransport         | ESP-IDF HTTP client          |
//! | `hardware`  | InputPin / OutputPin  | ESP32 GPIO                   |
//! | `time`      | Clock, DelayNs        | esp_timer, FreeRTOS delay    |
//! | `log_sink`  | EventSink             | Serial log output            |
//! | `device_id` |                       | eFuse MAC, hardware RNG      |

pub mod device_id;
pub mod hardware;
pub mod http;
pub mod log_sink;
pub mod time;
pub mod wifi;
