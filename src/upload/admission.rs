//! Bounded admission control for the attachment set.

use std::fmt::{Display, Formatter};

use tracing::{debug, warn};

use crate::models::upload::UploadFileEntry;
use crate::upload::estimator::format_file_size;

/// Why a selected file was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// The set already holds the maximum number of files.
    Capacity {
        /// Configured maximum.
        max: usize,
    },
    /// The file exceeds the per-file size ceiling.
    TooLarge {
        /// Offending file name.
        name: String,
        /// Its size in bytes.
        size: u64,
        /// Configured ceiling in bytes.
        limit: u64,
    },
}

impl Display for AdmissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Capacity { max } => write!(f, "no more than {max} files can be attached"),
            Self::TooLarge { name, size, limit } => write!(
                f,
                "{name} is too large ({}), the limit is {}",
                format_file_size(*size),
                format_file_size(*limit)
            ),
        }
    }
}

impl std::error::Error for AdmissionError {}

/// Result of admitting one batch of selected files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissionReport {
    /// Names of files added to the set, in selection order.
    pub accepted: Vec<String>,
    /// Names silently skipped because the set already holds them.
    pub duplicates: Vec<String>,
    /// User-visible rejections.
    pub errors: Vec<AdmissionError>,
}

impl AdmissionReport {
    /// The message to show for this batch, if any file was refused.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.errors.last().map(ToString::to_string)
    }
}

/// Ordered attachment set, unique by name, bounded in count and file size.
#[derive(Debug, Clone)]
pub struct FileSet {
    entries: Vec<UploadFileEntry>,
    max_files: usize,
    max_file_size: u64,
}

impl FileSet {
    /// Create an empty set with the given bounds.
    #[must_use]
    pub fn new(max_files: usize, max_file_size: u64) -> Self {
        Self {
            entries: Vec::new(),
            max_files,
            max_file_size,
        }
    }

    /// Admit a batch of newly selected files.
    ///
    /// Reaching capacity stops the batch. Oversized files are rejected and
    /// duplicates skipped individually; the rest of the batch still goes
    /// through.
    pub fn admit(&mut self, batch: impl IntoIterator<Item = UploadFileEntry>) -> AdmissionReport {
        let mut report = AdmissionReport::default();
        for entry in batch {
            if self.entries.len() >= self.max_files {
                warn!(max = self.max_files, name = %entry.name, "file set full");
                report.errors.push(AdmissionError::Capacity {
                    max: self.max_files,
                });
                break;
            }
            if entry.size_bytes > self.max_file_size {
                warn!(name = %entry.name, size = entry.size_bytes, "file exceeds size limit");
                report.errors.push(AdmissionError::TooLarge {
                    name: entry.name,
                    size: entry.size_bytes,
                    limit: self.max_file_size,
                });
                continue;
            }
            if self.contains(&entry.name) {
                debug!(name = %entry.name, "duplicate file skipped");
                report.duplicates.push(entry.name);
                continue;
            }
            report.accepted.push(entry.name.clone());
            self.entries.push(entry);
        }
        report
    }

    /// Remove the entry at `index`, returning it.
    pub fn remove(&mut self, index: usize) -> Option<UploadFileEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// Whether a file with `name` is already in the set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Accepted entries in selection order.
    #[must_use]
    pub fn entries(&self) -> &[UploadFileEntry] {
        &self.entries
    }

    /// Number of accepted entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of accepted file sizes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size_bytes).sum()
    }

    /// Counter line shown under the picker, `None` when empty.
    #[must_use]
    pub fn counter_text(&self) -> Option<String> {
        (!self.entries.is_empty()).then(|| {
            format!(
                "Files selected: {} of {}",
                self.entries.len(),
                self.max_files
            )
        })
    }
}
