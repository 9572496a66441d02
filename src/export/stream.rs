use crossbeam::channel::{bounded, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::progress::{Emitter, ProgressInfo, ProgressReporter};
use super::sink::MemorySink;
use super::{run_export, ExportJob};
use crate::error::Error;
use crate::graph::GraphStore;
use crate::utils::CancellationToken;

/// Rows buffered between the export worker and the consumer.
pub const STREAM_CAPACITY: usize = 100;

/// Progress rows of an export running on a worker thread. Each row carries
/// the script or CSV text produced since the previous one. The stream ends
/// when the worker is gone; the last row is either `done` or `failed`.
pub struct ProgressStream {
    rows: Receiver<ProgressInfo>,
    worker: JoinHandle<()>,
}

impl ProgressStream {
    /// Stops consuming and waits for the worker. A still running export
    /// fails on its next row and terminates.
    pub fn close(self) -> thread::Result<()> {
        drop(self.rows);
        self.worker.join()
    }
}

impl Iterator for ProgressStream {
    type Item = ProgressInfo;

    fn next(&mut self) -> Option<ProgressInfo> {
        self.rows.recv().ok()
    }
}

pub fn stream_export<S>(store: Arc<S>, job: ExportJob, cancel: CancellationToken) -> ProgressStream
where
    S: GraphStore + Send + Sync + 'static,
{
    let (tx, rows) = bounded(STREAM_CAPACITY);
    let worker = thread::spawn(move || {
        let emitter: Emitter = Box::new(move |row| tx.send(row).map_err(|_| Error::Terminated));
        let mut reporter =
            ProgressReporter::new(job.file.clone(), job.format, job.config.batch_size)
                .streaming(emitter);
        let mut sink = MemorySink::new();
        match run_export(store.as_ref(), &job, &mut sink, &mut reporter, &cancel) {
            Ok(info) => tracing::debug!(
                rows = info.rows,
                batches = info.batches,
                "streamed export finished"
            ),
            Err(e) => {
                tracing::warn!(error = %e, "streamed export failed");
                reporter.fail(&e);
            }
        }
    });
    ProgressStream { rows, worker }
}
