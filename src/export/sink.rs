use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Named output streams. Logical names include `schema`, `nodes`,
/// `relationships`, `cleanup` and `header.<name>`.
pub trait ExportSink {
    fn writer(&mut self, name: &str) -> Result<&mut dyn Write>;

    fn flush(&mut self) -> Result<()>;

    /// Text written since the last call, for sinks that stream their output.
    fn take_streamed(&mut self) -> Option<String> {
        None
    }
}

/// Writes to the filesystem: every name into one file, or one file per name
/// next to the base path (`export.nodes.cypher`).
pub struct FileSink {
    base: PathBuf,
    separate: bool,
    files: BTreeMap<PathBuf, BufWriter<File>>,
}

impl FileSink {
    pub fn single<P: AsRef<Path>>(path: P) -> Self {
        Self {
            base: path.as_ref().to_path_buf(),
            separate: false,
            files: BTreeMap::new(),
        }
    }

    pub fn separate<P: AsRef<Path>>(path: P) -> Self {
        Self {
            separate: true,
            ..Self::single(path)
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        if !self.separate {
            return self.base.clone();
        }
        let stem = self
            .base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "export".to_string());
        let file_name = match self.base.extension() {
            Some(ext) => format!("{stem}.{name}.{}", ext.to_string_lossy()),
            None => format!("{stem}.{name}"),
        };
        self.base.with_file_name(file_name)
    }

    /// Files opened so far.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }
}

impl ExportSink for FileSink {
    fn writer(&mut self, name: &str) -> Result<&mut dyn Write> {
        let path = self.path_for(name);
        let writer = match self.files.entry(path) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                if let Some(parent) = entry.key().parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let file = File::create(entry.key())?;
                entry.insert(BufWriter::new(file))
            }
        };
        Ok(writer)
    }

    fn flush(&mut self) -> Result<()> {
        for writer in self.files.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// In-memory buffers per logical name, in first-write order.
#[derive(Debug, Default)]
pub struct MemorySink {
    buffers: Vec<(String, Vec<u8>)>,
    streamed: BTreeMap<String, usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.buffers.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn contents(&self, name: &str) -> Option<String> {
        self.buffers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, buf)| String::from_utf8_lossy(buf).into_owned())
    }

    /// Removes and returns one buffer.
    pub fn take(&mut self, name: &str) -> Option<String> {
        let position = self.buffers.iter().position(|(n, _)| n == name)?;
        let (_, buf) = self.buffers.remove(position);
        self.streamed.remove(name);
        Some(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Concatenation of every buffer in first-write order.
    pub fn drain_all(&mut self) -> String {
        self.streamed.clear();
        self.buffers
            .drain(..)
            .map(|(_, buf)| String::from_utf8_lossy(&buf).into_owned())
            .collect()
    }
}

impl ExportSink for MemorySink {
    fn writer(&mut self, name: &str) -> Result<&mut dyn Write> {
        let position = match self.buffers.iter().position(|(n, _)| n == name) {
            Some(position) => position,
            None => {
                self.buffers.push((name.to_string(), Vec::new()));
                self.buffers.len() - 1
            }
        };
        Ok(&mut self.buffers[position].1)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn take_streamed(&mut self) -> Option<String> {
        let mut out = String::new();
        for (name, buf) in &self.buffers {
            let seen = self.streamed.entry(name.clone()).or_insert(0);
            if *seen < buf.len() {
                out.push_str(&String::from_utf8_lossy(&buf[*seen..]));
                *seen = buf.len();
            }
        }
        (!out.is_empty()).then_some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separate_paths() {
        let sink = FileSink::separate("/tmp/out/export.cypher");
        assert_eq!(sink.path_for("nodes"), PathBuf::from("/tmp/out/export.nodes.cypher"));
        assert_eq!(
            sink.path_for("header.nodes.Person"),
            PathBuf::from("/tmp/out/export.header.nodes.Person.cypher")
        );
        let single = FileSink::single("/tmp/out/export.cypher");
        assert_eq!(single.path_for("cleanup"), PathBuf::from("/tmp/out/export.cypher"));
    }

    #[test]
    fn test_file_sink_writes_one_file_per_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::separate(dir.path().join("graph.csv"));
        writeln!(sink.writer("nodes").unwrap(), "a").unwrap();
        writeln!(sink.writer("relationships").unwrap(), "b").unwrap();
        writeln!(sink.writer("nodes").unwrap(), "c").unwrap();
        sink.flush().unwrap();
        let nodes = std::fs::read_to_string(dir.path().join("graph.nodes.csv")).unwrap();
        assert_eq!(nodes, "a\nc\n");
        assert_eq!(sink.paths().len(), 2);
    }

    #[test]
    fn test_memory_sink_streams_increments() {
        let mut sink = MemorySink::new();
        write!(sink.writer("schema").unwrap(), "s1;").unwrap();
        write!(sink.writer("nodes").unwrap(), "n1;").unwrap();
        assert_eq!(sink.take_streamed().as_deref(), Some("s1;n1;"));
        assert_eq!(sink.take_streamed(), None);
        write!(sink.writer("nodes").unwrap(), "n2;").unwrap();
        assert_eq!(sink.take_streamed().as_deref(), Some("n2;"));
        assert_eq!(sink.names(), vec!["schema", "nodes"]);
        assert_eq!(sink.drain_all(), "s1;n1;n2;");
    }
}
