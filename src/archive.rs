//! Streamed zip assembly for rendered documents.
//!
//! One [`ArchiveStreamer`] exists per request and exclusively owns the
//! output sink for its lifetime. Entries are appended in batch order with
//! their deduplicated filenames; bytes reach the sink incrementally as each
//! entry is written, so a consumer can start receiving the archive while
//! later documents are still being produced.
//!
//! State machine: `Open → Appending(×N) → Finalizing → Done`, with
//! `Failed` reachable from every active state. A failed or aborted archive
//! is abandoned without writing the trailing central directory; whatever
//! bytes already reached the sink remain there as a truncated, invalid
//! container.

use std::io::{self, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, instrument, warn};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{PipelineError, Result};
use crate::models::RenderedDocument;

/// Suggested download filename for the archive response.
pub const ARCHIVE_FILENAME: &str = "articles_bundle.zip";

/// Lifecycle of one archive job. The idle phase before the container is
/// created is simply the absence of a streamer; construction opens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    Open,
    Appending,
    Finalizing,
    Done,
    Failed,
}

/// Sink wrapper that stops accepting bytes once the archive is abandoned.
///
/// The zip writer finalizes the container when dropped. After an abort,
/// that drop-time finish would turn a deliberately abandoned archive into
/// a valid-looking one with entries silently missing, so the gate rejects
/// every write issued after the job failed.
#[derive(Debug)]
pub struct GatedSink<W> {
    inner: W,
    open: Arc<AtomicBool>,
}

impl<W> GatedSink<W> {
    fn gate_error() -> io::Error {
        io::Error::new(io::ErrorKind::BrokenPipe, "archive job aborted")
    }

    /// The wrapped sink, for consumers that want it back after finalize.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for GatedSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(Self::gate_error());
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(Self::gate_error());
        }
        self.inner.flush()
    }
}

impl<W: Seek> Seek for GatedSink<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(Self::gate_error());
        }
        self.inner.seek(pos)
    }
}

/// Appends rendered documents into a single compressed archive bound to an
/// output sink.
pub struct ArchiveStreamer<W: Write + Seek> {
    zip: Option<ZipWriter<GatedSink<W>>>,
    open: Arc<AtomicBool>,
    state: ArchiveState,
    entries: usize,
}

impl<W: Write + Seek> ArchiveStreamer<W> {
    /// Create the archive container bound to `sink`. Bytes start flowing
    /// to the sink with the first appended entry.
    pub fn open(sink: W) -> Self {
        let open = Arc::new(AtomicBool::new(true));
        let gated = GatedSink {
            inner: sink,
            open: Arc::clone(&open),
        };
        ArchiveStreamer {
            zip: Some(ZipWriter::new(gated)),
            open,
            state: ArchiveState::Open,
            entries: 0,
        }
    }

    /// Number of entries appended so far.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Append one rendered document as a named entry, preserving the
    /// deduplicated filename exactly.
    #[instrument(level = "info", skip_all, fields(filename = %document.filename))]
    pub fn append(&mut self, document: &RenderedDocument) -> Result<()> {
        if !matches!(self.state, ArchiveState::Open | ArchiveState::Appending) {
            return Err(PipelineError::Archive(format!(
                "cannot append in state {:?}",
                self.state
            )));
        }
        self.state = ArchiveState::Appending;

        let Some(zip) = self.zip.as_mut() else {
            self.fail();
            return Err(PipelineError::Archive("archive writer already consumed".into()));
        };

        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .compression_level(Some(9));

        if let Err(e) = zip.start_file(document.filename.as_str(), options) {
            self.fail();
            return Err(e.into());
        }
        if let Err(e) = zip.write_all(&document.bytes) {
            self.fail();
            return Err(PipelineError::Io(e));
        }

        self.entries += 1;
        info!(bytes = document.bytes.len(), entry = self.entries, "appended archive entry");
        Ok(())
    }

    /// Write the trailing index, close the container, and hand the sink
    /// back.
    #[instrument(level = "info", skip_all)]
    pub fn finalize(&mut self) -> Result<W> {
        if !matches!(self.state, ArchiveState::Open | ArchiveState::Appending) {
            return Err(PipelineError::Archive(format!(
                "cannot finalize in state {:?}",
                self.state
            )));
        }
        self.state = ArchiveState::Finalizing;

        let Some(zip) = self.zip.take() else {
            self.fail();
            return Err(PipelineError::Archive("archive writer already consumed".into()));
        };

        match zip.finish() {
            Ok(sink) => {
                self.state = ArchiveState::Done;
                info!(entries = self.entries, "archive finalized");
                Ok(sink.into_inner())
            }
            Err(e) => {
                self.fail();
                Err(e.into())
            }
        }
    }

    /// Abandon the archive without finalizing it. Already-transmitted
    /// bytes cannot be recalled; the sink is left holding a truncated
    /// container.
    #[instrument(level = "info", skip_all)]
    pub fn abort(&mut self) {
        warn!(entries = self.entries, "abandoning archive");
        self.fail();
    }

    fn fail(&mut self) {
        self.state = ArchiveState::Failed;
        self.open.store(false, Ordering::SeqCst);
        // Dropping the writer triggers its best-effort finish, which the
        // closed gate rejects, so no trailing index reaches the sink.
        self.zip = None;
    }
}
