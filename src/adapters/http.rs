//! Blocking HTTP client adapter.
//!
//! Implements [`HttpTransport`] with one fresh connection per request, so
//! a wedged socket never outlives its timeout.
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::http::client::EspHttpConnection`
//!   wrapped in the `embedded_svc` client.
//! - **all other targets**: a simulated service that answers every
//!   request with a configurable status.

use log::debug;

use crate::app::ports::HttpTransport;
use crate::error::TransportError;

#[cfg(target_os = "espidf")]
mod platform {
    use super::*;

    use core::time::Duration;

    use embedded_svc::http::client::Client as HttpClient;
    use embedded_svc::http::{Method, Status};
    use embedded_svc::io::Write;
    use esp_idf_svc::http::client::{Configuration as HttpClientConfiguration, EspHttpConnection};
    use esp_idf_svc::io::EspIOError;
    use esp_idf_svc::sys::{ESP_ERR_HTTP_CONNECT, ESP_ERR_HTTP_EAGAIN, ESP_ERR_TIMEOUT, EspError};

    fn classify(e: EspError) -> TransportError {
        match e.code() {
            c if c == ESP_ERR_TIMEOUT as i32 || c == ESP_ERR_HTTP_EAGAIN as i32 => {
                TransportError::Timeout
            }
            c if c == ESP_ERR_HTTP_CONNECT as i32 => TransportError::Connection,
            c => TransportError::Io(c),
        }
    }

    fn io_err(e: EspIOError) -> TransportError {
        classify(e.0)
    }

    fn connect(timeout_ms: u32) -> Result<HttpClient<EspHttpConnection>, TransportError> {
        let conf = HttpClientConfiguration {
            timeout: Some(Duration::from_millis(u64::from(timeout_ms))),
            ..Default::default()
        };
        let connection = EspHttpConnection::new(&conf).map_err(classify)?;
        Ok(HttpClient::wrap(connection))
    }

    #[derive(Default)]
    pub struct HttpClientTransport;

    impl HttpClientTransport {
        pub fn new() -> Self {
            Self
        }
    }

    impl HttpTransport for HttpClientTransport {
        fn get(&mut self, url: &str, timeout_ms: u32) -> Result<u16, TransportError> {
            debug!("HTTP: GET {url}");
            let mut client = connect(timeout_ms)?;
            let request = client.request(Method::Get, url, &[]).map_err(io_err)?;
            let response = request.submit().map_err(io_err)?;
            Ok(response.status())
        }

        fn post_json(
            &mut self,
            url: &str,
            body: &[u8],
            timeout_ms: u32,
        ) -> Result<u16, TransportError> {
            debug!("HTTP: POST {url} ({} bytes)", body.len());
            let length = body.len().to_string();
            let headers = [
                ("Content-Type", "application/json"),
                ("Content-Length", length.as_str()),
            ];
            let mut client = connect(timeout_ms)?;
            let mut request = client
                .request(Method::Post, url, &headers)
                .map_err(io_err)?;
            request.write_all(body).map_err(io_err)?;
            request.flush().map_err(io_err)?;
            let response = request.submit().map_err(io_err)?;
            Ok(response.status())
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod platform {
    use super::*;

    /// Simulated alert service.
    pub struct HttpClientTransport {
        status: u16,
        requests: u32,
    }

    impl Default for HttpClientTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HttpClientTransport {
        /// A service that answers every request with 200.
        pub fn new() -> Self {
            Self::with_status(200)
        }

        pub fn with_status(status: u16) -> Self {
            Self {
                status,
                requests: 0,
            }
        }

        pub fn requests(&self) -> u32 {
            self.requests
        }
    }

    impl HttpTransport for HttpClientTransport {
        fn get(&mut self, url: &str, _timeout_ms: u32) -> Result<u16, TransportError> {
            self.requests += 1;
            debug!("HTTP(sim): GET {url} -> {}", self.status);
            Ok(self.status)
        }

        fn post_json(
            &mut self,
            url: &str,
            body: &[u8],
            _timeout_ms: u32,
        ) -> Result<u16, TransportError> {
            self.requests += 1;
            debug!(
                "HTTP(sim): POST {url} {} -> {}",
                String::from_utf8_lossy(body),
                self.status
            );
            Ok(self.status)
        }
    }
}

pub use platform::HttpClientTransport;
