//! Windowed throughput and ETA estimation plus the formatting used by the
//! progress overlay.

use std::time::{Duration, Instant};

use crate::models::upload::{UploadProgress, UploadStage};

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Windowed-difference throughput estimator.
///
/// Every progress event is observed, but speed is recomputed only once at
/// least `window` has elapsed since the previous recomputation, as
/// `Δbytes / Δtime` over that window. No smoothing is applied.
#[derive(Debug, Clone)]
pub struct ThroughputEstimator {
    window: Duration,
    last_loaded: u64,
    last_time: Instant,
    speed_bps: f64,
}

impl ThroughputEstimator {
    /// Start estimating from `started`, with nothing loaded yet.
    #[must_use]
    pub fn new(window: Duration, started: Instant) -> Self {
        Self {
            window,
            last_loaded: 0,
            last_time: started,
            speed_bps: 0.0,
        }
    }

    /// Current speed estimate in bytes per second.
    #[must_use]
    pub fn speed_bps(&self) -> f64 {
        self.speed_bps
    }

    /// Feed one `(loaded, now)` sample and derive the progress snapshot.
    ///
    /// The stage is [`UploadStage::Forwarding`] as soon as `loaded` reaches
    /// `total`; it never reports [`UploadStage::Done`].
    #[allow(clippy::cast_precision_loss)]
    pub fn observe(&mut self, loaded: u64, total: u64, now: Instant) -> UploadProgress {
        let elapsed = now.saturating_duration_since(self.last_time);
        if elapsed >= self.window && !elapsed.is_zero() {
            let delta = loaded.saturating_sub(self.last_loaded);
            self.speed_bps = delta as f64 / elapsed.as_secs_f64();
            self.last_loaded = loaded;
            self.last_time = now;
        }

        let stage = if loaded >= total {
            UploadStage::Forwarding
        } else {
            UploadStage::Transferring
        };

        UploadProgress {
            stage,
            bytes_sent: loaded,
            bytes_total: total,
            speed_bps: self.speed_bps,
            eta_seconds: eta_seconds(loaded, total, self.speed_bps),
        }
    }
}

/// Seconds remaining at `speed_bps`, rounded; `None` while speed is unset
/// or the transfer is complete.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn eta_seconds(loaded: u64, total: u64, speed_bps: f64) -> Option<u64> {
    if speed_bps <= 0.0 || loaded >= total {
        return None;
    }
    let remaining = (total - loaded) as f64;
    Some((remaining / speed_bps).round() as u64)
}

/// Render a throughput as `B/s`, `KB/s` (integer) or `MB/s` (one decimal).
///
/// Returns `None` for a zero or unset speed.
#[must_use]
pub fn format_speed(speed_bps: f64) -> Option<String> {
    if speed_bps <= 0.0 {
        return None;
    }
    Some(if speed_bps >= MIB {
        format!("{:.1} MB/s", speed_bps / MIB)
    } else if speed_bps >= KIB {
        format!("{:.0} KB/s", speed_bps / KIB)
    } else {
        format!("{speed_bps:.0} B/s")
    })
}

/// Render an ETA as `M min S s` from one minute up, else `S s`.
#[must_use]
pub fn format_eta(seconds: u64) -> String {
    if seconds >= 60 {
        format!("{} min {} s", seconds / 60, seconds % 60)
    } else {
        format!("{seconds} s")
    }
}

/// Render a file size as `B`, `KB` or `MB` (one decimal).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    let value = bytes as f64;
    if value < KIB {
        format!("{bytes} B")
    } else if value < MIB {
        format!("{:.1} KB", value / KIB)
    } else {
        format!("{:.1} MB", value / MIB)
    }
}

/// Render a byte count in megabytes with one decimal.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.1}", bytes as f64 / MIB)
}
