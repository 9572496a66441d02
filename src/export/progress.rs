use serde::Serialize;
use std::time::Instant;

use super::ExportFormat;
use crate::error::{Error, Result};

/// One progress record of an export.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    pub file: Option<String>,
    pub source: String,
    pub format: String,
    pub nodes: u64,
    pub relationships: u64,
    pub properties: u64,
    /// Elapsed milliseconds
    pub time: u64,
    pub rows: u64,
    pub batch_size: usize,
    pub batches: u64,
    pub done: bool,
    /// Text produced since the previous row, when streaming
    pub data: Option<String>,
    pub failed: Option<String>,
}

pub type Emitter = Box<dyn FnMut(ProgressInfo) -> Result<()> + Send>;

/// Accumulates export counts and, when streaming, forwards a row on every
/// update.
pub struct ProgressReporter {
    info: ProgressInfo,
    started: Instant,
    pending: Option<String>,
    emitter: Option<Emitter>,
}

impl ProgressReporter {
    pub fn new(file: Option<String>, format: ExportFormat, batch_size: usize) -> Self {
        Self {
            info: ProgressInfo {
                file,
                format: format.to_string(),
                batch_size,
                ..ProgressInfo::default()
            },
            started: Instant::now(),
            pending: None,
            emitter: None,
        }
    }

    pub fn streaming(mut self, emitter: Emitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.emitter.is_some()
    }

    pub fn set_source(&mut self, source: String) {
        self.info.source = source;
    }

    /// Text to attach to the next emitted row.
    pub fn attach(&mut self, data: String) {
        if data.is_empty() {
            return;
        }
        match &mut self.pending {
            Some(pending) => pending.push_str(&data),
            None => self.pending = Some(data),
        }
    }

    pub fn update(&mut self, nodes: u64, relationships: u64, properties: u64) -> Result<()> {
        self.info.nodes += nodes;
        self.info.relationships += relationships;
        self.info.properties += properties;
        self.info.rows += nodes + relationships;
        self.emit()
    }

    pub fn next_batch(&mut self) {
        self.info.batches += 1;
    }

    pub fn info(&self) -> &ProgressInfo {
        &self.info
    }

    /// Marks the export complete and returns (and emits) the final row.
    pub fn done(&mut self) -> Result<ProgressInfo> {
        self.info.done = true;
        self.emit()?;
        Ok(self.snapshot(None))
    }

    /// Final row of an aborted export: counts so far plus the failure.
    pub fn fail(&mut self, error: &Error) -> ProgressInfo {
        self.info.failed = Some(error.to_string());
        let data = self.pending.take();
        let row = self.snapshot(data);
        if let Some(emitter) = self.emitter.as_mut() {
            // the consumer may already be gone
            let _ = emitter(row.clone());
        }
        row
    }

    fn emit(&mut self) -> Result<()> {
        if self.emitter.is_none() {
            return Ok(());
        }
        let data = self.pending.take();
        let row = self.snapshot(data);
        match self.emitter.as_mut() {
            Some(emitter) => emitter(row),
            None => Ok(()),
        }
    }

    fn snapshot(&self, data: Option<String>) -> ProgressInfo {
        ProgressInfo {
            time: self.started.elapsed().as_millis() as u64,
            data,
            ..self.info.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_update_accumulates_without_emitting() {
        let mut reporter = ProgressReporter::new(Some("out.csv".into()), ExportFormat::Csv, 10);
        reporter.update(2, 0, 5).unwrap();
        reporter.update(0, 3, 1).unwrap();
        let info = reporter.done().unwrap();
        assert_eq!((info.nodes, info.relationships, info.properties), (2, 3, 6));
        assert_eq!(info.rows, 5);
        assert!(info.done);
        assert_eq!(info.format, "csv");
    }

    #[test]
    fn test_streaming_emits_every_update_with_data() {
        let rows = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&rows);
        let mut reporter = ProgressReporter::new(None, ExportFormat::Cypher, 10).streaming(
            Box::new(move |row| {
                sink.lock().unwrap().push(row);
                Ok(())
            }),
        );
        reporter.attach("CREATE ();\n".into());
        reporter.update(1, 0, 0).unwrap();
        reporter.update(1, 0, 0).unwrap();
        reporter.done().unwrap();

        let rows = rows.lock().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].data.as_deref(), Some("CREATE ();\n"));
        assert_eq!(rows[1].data, None);
        assert!(rows[2].done);
    }

    #[test]
    fn test_fail_keeps_counts() {
        let mut reporter = ProgressReporter::new(None, ExportFormat::Csv, 10);
        reporter.update(4, 1, 0).unwrap();
        let row = reporter.fail(&Error::Terminated);
        assert_eq!(row.nodes, 4);
        assert!(!row.done);
        assert!(row.failed.is_some());
    }
}
