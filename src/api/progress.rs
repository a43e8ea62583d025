//! Byte-level progress observation for outbound request bodies.
//!
//! Attachment bodies are wrapped in counting streams that publish the
//! cumulative number of bytes pulled by the transport. Only the most recent
//! count matters, so the channel is a `watch`.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use tokio::sync::watch;
use tokio_util::io::ReaderStream;

use crate::models::upload::FileSource;

const CHUNK_SIZE: usize = 64 * 1024;

/// Boxed stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync>>;

/// Writer half: shared by every counted body of one submission.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    sent: Arc<AtomicU64>,
    tx: Arc<watch::Sender<u64>>,
}

impl ProgressSink {
    /// Record `bytes` more as sent and publish the new total.
    pub fn advance(&self, bytes: u64) {
        let total = self.sent.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.tx.send_replace(total);
    }

    /// Cumulative bytes recorded so far.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

/// Reader half: yields the latest cumulative byte count.
#[derive(Debug)]
pub struct ProgressWatch {
    rx: watch::Receiver<u64>,
}

impl ProgressWatch {
    /// Wait for the next published total.
    ///
    /// Returns `None` once every [`ProgressSink`] clone has been dropped and
    /// the last value has been observed.
    pub async fn changed(&mut self) -> Option<u64> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// The latest total if it has not been observed yet, without waiting.
    pub fn take_unseen(&mut self) -> Option<u64> {
        match self.rx.has_changed() {
            Ok(true) => Some(*self.rx.borrow_and_update()),
            _ => None,
        }
    }
}

/// Create a connected sink/watch pair starting at zero.
#[must_use]
pub fn progress_channel() -> (ProgressSink, ProgressWatch) {
    let (tx, rx) = watch::channel(0);
    (
        ProgressSink {
            sent: Arc::new(AtomicU64::new(0)),
            tx: Arc::new(tx),
        },
        ProgressWatch { rx },
    )
}

/// Open an attachment as a body stream that reports every chunk to `sink`.
///
/// # Errors
///
/// Returns the I/O error if a file-backed source cannot be opened.
pub async fn open_counted(source: &FileSource, sink: ProgressSink) -> std::io::Result<ByteStream> {
    let raw: ByteStream = match source {
        FileSource::Path(path) => {
            let file = tokio::fs::File::open(path).await?;
            Box::pin(ReaderStream::with_capacity(file, CHUNK_SIZE))
        }
        FileSource::Bytes(data) => Box::pin(stream::iter(
            split_chunks(data.clone())
                .into_iter()
                .map(Ok::<Bytes, std::io::Error>),
        )),
    };

    Ok(Box::pin(raw.inspect(move |chunk| {
        if let Ok(bytes) = chunk {
            sink.advance(bytes.len() as u64);
        }
    })))
}

fn split_chunks(mut data: Bytes) -> Vec<Bytes> {
    let mut chunks = Vec::with_capacity(data.len() / CHUNK_SIZE + 1);
    while data.len() > CHUNK_SIZE {
        chunks.push(data.split_to(CHUNK_SIZE));
    }
    if !data.is_empty() {
        chunks.push(data);
    }
    chunks
}
