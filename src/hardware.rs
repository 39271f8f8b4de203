//! Forwarding the lever position to an external servo over a line-oriented byte stream.
//!
//! The protocol is deliberately minimal: one decimal integer in `[0, full_scale]` per line,
//! no acknowledgement read back. Writes are best-effort. A failed write is logged and the
//! next tick simply tries again with the fresh value.

use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::{debug, info, warn};

/// Upper bound of the servo protocol range.
pub const SERVO_FULL_SCALE: u16 = 180;

/// Port identifier and baud rate for the serial link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    /// Scale of the written integer. Defaults to [`SERVO_FULL_SCALE`].
    #[serde(default = "default_full_scale")]
    pub full_scale: u16,
}

fn default_full_scale() -> u16 {
    SERVO_FULL_SCALE
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: "COM3".to_string(),
            baud_rate: 9600,
            full_scale: SERVO_FULL_SCALE,
        }
    }
}

/// Maps a normalized position onto `[0, full_scale]`, rounding to the nearest step.
pub fn to_protocol_value(normalized: f32, full_scale: u16) -> u16 {
    let n = if normalized.is_nan() {
        0.0
    } else {
        normalized.clamp(0.0, 1.0)
    };
    (n * f32::from(full_scale)).round() as u16
}

/// Opens the serial port described by `settings` as a writable stream.
#[cfg(feature = "serial")]
pub fn open_serial(settings: &SerialSettings) -> crate::LeverResult<Box<dyn Write + Send>> {
    let port = serialport::new(settings.port.as_str(), settings.baud_rate)
        .timeout(std::time::Duration::from_millis(50))
        .open()?;
    info!(
        "Opened serial port {} at {} baud",
        settings.port, settings.baud_rate
    );
    Ok(Box::new(port))
}

/// Exclusive owner of one output stream.
///
/// The stream is released exactly once, either through [`close`](Self::close) or on drop.
pub struct HardwareOutputAdapter<W: Write = Box<dyn Write + Send>> {
    stream: Option<W>,
    full_scale: u16,
    last_sent: Option<u16>,
    failures: u64,
}

impl<W: Write> std::fmt::Debug for HardwareOutputAdapter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareOutputAdapter")
            .field("open", &self.is_open())
            .field("full_scale", &self.full_scale)
            .field("last_sent", &self.last_sent)
            .field("failures", &self.failures)
            .finish()
    }
}

impl<W: Write> HardwareOutputAdapter<W> {
    pub fn new(stream: W) -> Self {
        Self {
            stream: Some(stream),
            full_scale: SERVO_FULL_SCALE,
            last_sent: None,
            failures: 0,
        }
    }

    /// An adapter with nothing attached. Every push is skipped.
    pub fn disconnected() -> Self {
        Self {
            stream: None,
            full_scale: SERVO_FULL_SCALE,
            last_sent: None,
            failures: 0,
        }
    }

    pub fn with_full_scale(mut self, full_scale: u16) -> Self {
        self.full_scale = full_scale;
        self
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Last value that was written successfully.
    pub fn last_sent(&self) -> Option<u16> {
        self.last_sent
    }

    /// Number of writes that failed since the adapter was created.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Writes the protocol value for `normalized` as one line.
    ///
    /// Returns the value written, or `None` if the stream is closed or the write failed.
    pub fn push(&mut self, normalized: f32) -> Option<u16> {
        let stream = self.stream.as_mut()?;
        let value = to_protocol_value(normalized, self.full_scale);
        let result = writeln!(stream, "{}", value).and_then(|_| stream.flush());
        match result {
            Ok(()) => {
                self.last_sent = Some(value);
                Some(value)
            }
            Err(e) => {
                self.failures += 1;
                warn!("Hardware write of {} failed, retrying next tick: {}", value, e);
                None
            }
        }
    }

    /// Flushes and releases the stream. Returns `true` only on the call that closed it.
    pub fn close(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                if let Err(e) = stream.flush() {
                    debug!("Flush on close failed: {}", e);
                }
                info!("Hardware output closed");
                true
            }
            None => false,
        }
    }

    /// Hands back the stream without closing it, leaving the adapter disconnected.
    pub fn into_inner(mut self) -> Option<W> {
        self.stream.take()
    }
}

impl<W: Write> Drop for HardwareOutputAdapter<W> {
    fn drop(&mut self) {
        self.close();
    }
}
