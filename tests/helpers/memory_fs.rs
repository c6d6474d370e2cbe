//! In-memory handle opener with fault injection.
//!
//! Every sink write is recorded as a separate operation so tests can assert
//! how many flushes happened and exactly what each one carried.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use duplex_bridge::{HandleOpener, SinkHandle, SourceHandle};

#[derive(Debug, Default)]
struct State {
    files: HashMap<PathBuf, Vec<u8>>,
    opened: Vec<PathBuf>,
    writes: Vec<Vec<u8>>,
    reads: Vec<usize>,
    fail_sink_open: bool,
    fail_reads: bool,
    fail_writes: bool,
    stall_writes: bool,
    fail_source_close: bool,
    fail_sink_close: bool,
    source_closed: bool,
    sink_closed: bool,
}

fn injected(what: &str) -> io::Error {
    io::Error::other(format!("injected {what} failure"))
}

/// Opener over a shared in-memory file table.
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    state: Arc<Mutex<State>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source file. Paths without a file fail to open with NotFound.
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.into(), content.into());
        self
    }

    pub fn fail_sink_open(&self) {
        self.state.lock().unwrap().fail_sink_open = true;
    }

    pub fn fail_reads(&self) {
        self.state.lock().unwrap().fail_reads = true;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    /// Make every sink write pend forever, as a sink that never drains.
    pub fn stall_writes(&self) {
        self.state.lock().unwrap().stall_writes = true;
    }

    pub fn fail_source_close(&self) {
        self.state.lock().unwrap().fail_source_close = true;
    }

    pub fn fail_sink_close(&self) {
        self.state.lock().unwrap().fail_sink_close = true;
    }

    /// Paths passed to either open call, in order.
    pub fn opened(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().opened.clone()
    }

    /// Successful sink writes, one entry per operation.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Requested buffer size of every source read.
    pub fn reads(&self) -> Vec<usize> {
        self.state.lock().unwrap().reads.clone()
    }

    pub fn source_closed(&self) -> bool {
        self.state.lock().unwrap().source_closed
    }

    pub fn sink_closed(&self) -> bool {
        self.state.lock().unwrap().sink_closed
    }
}

impl HandleOpener for MemoryOpener {
    type Source = MemorySource;
    type Sink = MemorySink;

    async fn open_source(&self, path: &Path) -> io::Result<MemorySource> {
        let mut state = self.state.lock().unwrap();
        state.opened.push(path.to_path_buf());
        let data = state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        Ok(MemorySource {
            state: Arc::clone(&self.state),
            data,
            offset: 0,
        })
    }

    async fn open_sink(&self, path: &Path) -> io::Result<MemorySink> {
        let mut state = self.state.lock().unwrap();
        state.opened.push(path.to_path_buf());
        if state.fail_sink_open {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        Ok(MemorySink {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct MemorySource {
    state: Arc<Mutex<State>>,
    data: Vec<u8>,
    offset: usize,
}

impl SourceHandle for MemorySource {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.reads.push(buf.len());
        if state.fail_reads {
            return Err(injected("read"));
        }
        let n = buf.len().min(self.data.len() - self.offset);
        buf[..n].copy_from_slice(&self.data[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }

    async fn close(self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.source_closed = true;
        if state.fail_source_close {
            return Err(injected("source close"));
        }
        Ok(())
    }
}

pub struct MemorySink {
    state: Arc<Mutex<State>>,
}

impl SinkHandle for MemorySink {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let stalled = self.state.lock().unwrap().stall_writes;
        if stalled {
            std::future::pending::<()>().await;
        }
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(injected("write"));
        }
        state.writes.push(data.to_vec());
        Ok(())
    }

    async fn close(self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.sink_closed = true;
        if state.fail_sink_close {
            return Err(injected("sink close"));
        }
        Ok(())
    }
}
