//! Real-file fixtures backed by a temporary directory.

use std::path::PathBuf;

use duplex_bridge::BridgeConfig;
use tempfile::TempDir;

/// A temporary directory holding one source file and the path of a sink.
pub(crate) struct FileFixture {
    pub dir: TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl FileFixture {
    /// Create `in.bin` with `content`; `out.bin` does not exist yet.
    pub(crate) fn with_source(content: &[u8]) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let input = dir.path().join("in.bin");
        let output = dir.path().join("out.bin");
        std::fs::write(&input, content).expect("Failed to write source fixture");
        Self { dir, input, output }
    }

    pub(crate) fn config(&self, write_threshold: usize, read_threshold: usize) -> BridgeConfig {
        BridgeConfig::new(&self.input, &self.output)
            .with_writable_high_water_mark(write_threshold)
            .with_readable_high_water_mark(read_threshold)
    }

    pub(crate) fn output_bytes(&self) -> Vec<u8> {
        std::fs::read(&self.output).expect("Failed to read sink fixture")
    }
}
