//! Throughput estimation, stage inference and progress formatting.

use std::time::{Duration, Instant};

use bugdesk_client::models::upload::{UploadProgress, UploadStage};
use bugdesk_client::upload::estimator::{
    eta_seconds, format_eta, format_file_size, format_megabytes, format_speed,
    ThroughputEstimator,
};

const MIB: u64 = 1024 * 1024;
const MIB_F: f64 = 1_048_576.0;

fn estimator(start: Instant) -> ThroughputEstimator {
    ThroughputEstimator::new(Duration::from_millis(500), start)
}

#[test]
fn loaded_equal_to_total_flips_to_forwarding() {
    let start = Instant::now();
    let mut est = estimator(start);

    let mid = est.observe(400, 1000, start + Duration::from_millis(100));
    assert_eq!(mid.stage, UploadStage::Transferring);

    let full = est.observe(1000, 1000, start + Duration::from_millis(200));
    assert_eq!(full.stage, UploadStage::Forwarding);
    assert_ne!(full.stage, UploadStage::Done);
    assert_eq!(full.eta_seconds, None);
    assert_eq!(full.percent(), None);
    assert_eq!(full.indicator(), "Processing...");
}

#[test]
fn speed_uses_windowed_difference() {
    let start = Instant::now();
    let mut est = estimator(start);

    est.observe(MIB, 10 * MIB, start + Duration::from_secs(1));
    assert!((est.speed_bps() - MIB_F).abs() < 1e-6);

    // Inside the window: speed is held.
    est.observe(3 * MIB, 10 * MIB, start + Duration::from_millis(1200));
    assert!((est.speed_bps() - MIB_F).abs() < 1e-6);

    // Window elapsed: difference since the last recomputation.
    let progress = est.observe(4 * MIB, 10 * MIB, start + Duration::from_secs(2));
    assert!((progress.speed_bps - 3.0 * MIB_F).abs() < 1e-6);
    assert_eq!(progress.eta_seconds, Some(2));
}

#[test]
fn eta_is_blank_without_speed() {
    assert_eq!(eta_seconds(10, 100, 0.0), None);
    assert_eq!(eta_seconds(100, 100, 50.0), None);
    assert_eq!(eta_seconds(0, 100, 30.0), Some(3));
}

#[test]
fn speed_formatting_by_magnitude() {
    assert_eq!(format_speed(0.0), None);
    assert_eq!(format_speed(500.0).as_deref(), Some("500 B/s"));
    assert_eq!(format_speed(2048.0).as_deref(), Some("2 KB/s"));
    assert_eq!(
        format_speed(1.5 * MIB_F).as_deref(),
        Some("1.5 MB/s")
    );
}

#[test]
fn eta_formatting() {
    assert_eq!(format_eta(42), "42 s");
    assert_eq!(format_eta(60), "1 min 0 s");
    assert_eq!(format_eta(135), "2 min 15 s");
}

#[test]
fn size_formatting() {
    assert_eq!(format_file_size(512), "512 B");
    assert_eq!(format_file_size(1536), "1.5 KB");
    assert_eq!(format_file_size(5 * MIB), "5.0 MB");
    assert_eq!(format_megabytes(MIB / 2), "0.5");
}

#[test]
fn transfer_hint_lists_speed_and_eta() {
    let progress = UploadProgress {
        stage: UploadStage::Transferring,
        bytes_sent: MIB,
        bytes_total: 4 * MIB,
        speed_bps: MIB_F,
        eta_seconds: Some(3),
    };
    assert_eq!(progress.hint(), "1.0 / 4.0 MB \u{2022} 1.0 MB/s \u{2022} ~3 s");
    assert_eq!(progress.indicator(), "25%");
    assert_eq!(progress.stage.heading(), "Stage 1 of 2: uploading to server");
}

#[test]
fn forwarding_hint_is_indeterminate() {
    let progress = UploadProgress {
        stage: UploadStage::Forwarding,
        bytes_sent: 10,
        bytes_total: 10,
        speed_bps: 0.0,
        eta_seconds: None,
    };
    assert_eq!(progress.hint(), "This may take a while for large files...");
    assert_eq!(progress.stage.heading(), "Stage 2 of 2: forwarding to chat");
}
