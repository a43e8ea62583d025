//! Attachment admission control.

use bugdesk_client::models::upload::{FileSource, UploadFileEntry};
use bugdesk_client::upload::admission::{AdmissionError, FileSet};
use bytes::Bytes;

use super::support::attachment;

const MAX_SIZE: u64 = 500 * 1024 * 1024;

fn sized(name: &str, size_bytes: u64) -> UploadFileEntry {
    UploadFileEntry {
        name: name.into(),
        size_bytes,
        mime_type: "video/mp4".into(),
        source: FileSource::Bytes(Bytes::new()),
    }
}

fn set() -> FileSet {
    FileSet::new(10, MAX_SIZE)
}

#[test]
fn eleven_files_admit_ten_and_report_capacity() {
    let mut files = set();
    let batch: Vec<_> = (0..11).map(|i| attachment(&format!("shot-{i}.png"), 16)).collect();

    let report = files.admit(batch);
    assert_eq!(report.accepted.len(), 10);
    assert_eq!(files.len(), 10);
    assert_eq!(report.errors, vec![AdmissionError::Capacity { max: 10 }]);
    assert_eq!(
        report.message().as_deref(),
        Some("no more than 10 files can be attached")
    );
}

#[test]
fn capacity_stops_the_rest_of_the_batch() {
    let mut files = FileSet::new(2, MAX_SIZE);
    let report = files.admit(vec![
        attachment("a.png", 1),
        attachment("b.png", 1),
        attachment("c.png", 1),
        sized("huge.mp4", MAX_SIZE + 1),
    ]);
    assert_eq!(report.accepted, vec!["a.png", "b.png"]);
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(report.errors[0], AdmissionError::Capacity { .. }));
}

#[test]
fn duplicate_name_is_dropped_silently() {
    let mut files = set();
    files.admit(vec![attachment("log.txt", 10)]);

    let report = files.admit(vec![attachment("log.txt", 20)]);
    assert!(report.accepted.is_empty());
    assert_eq!(report.duplicates, vec!["log.txt"]);
    assert!(report.errors.is_empty());
    assert_eq!(report.message(), None);
    assert_eq!(files.len(), 1);
    assert_eq!(files.entries()[0].size_bytes, 10);
}

#[test]
fn oversized_file_is_rejected_and_batch_continues() {
    let mut files = set();
    let report = files.admit(vec![
        sized("huge.mp4", MAX_SIZE + 1),
        sized("ok.mp4", MAX_SIZE),
    ]);
    assert_eq!(report.accepted, vec!["ok.mp4"]);
    assert_eq!(
        report.errors,
        vec![AdmissionError::TooLarge {
            name: "huge.mp4".into(),
            size: MAX_SIZE + 1,
            limit: MAX_SIZE,
        }]
    );
    assert_eq!(
        report.message().as_deref(),
        Some("huge.mp4 is too large (500.0 MB), the limit is 500.0 MB")
    );
}

#[test]
fn remove_frees_a_slot_and_keeps_order() {
    let mut files = FileSet::new(3, MAX_SIZE);
    files.admit(vec![
        attachment("a.png", 1),
        attachment("b.png", 2),
        attachment("c.png", 3),
    ]);

    let removed = files.remove(1).expect("index in range");
    assert_eq!(removed.name, "b.png");
    assert!(files.remove(7).is_none());

    let report = files.admit(vec![attachment("d.png", 4)]);
    assert_eq!(report.accepted, vec!["d.png"]);
    let names: Vec<_> = files.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.png", "c.png", "d.png"]);
    assert_eq!(files.total_bytes(), 8);
}

#[test]
fn counter_text_reflects_selection() {
    let mut files = set();
    assert_eq!(files.counter_text(), None);
    files.admit(vec![attachment("a.png", 1), attachment("b.png", 1)]);
    assert_eq!(files.counter_text().as_deref(), Some("Files selected: 2 of 10"));
}
