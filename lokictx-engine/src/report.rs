use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::context::ContextLine;

pub const MATCH_HEADER: &str = "==== Matched log ====";
pub const NO_RESULTS_MARKER: &str = "No logs found.";
pub const CONTEXT_UNAVAILABLE_TAG: &str = "[CONTEXT UNAVAILABLE]";

/// Plain-text report: one block per matched line, each flushed as soon as
/// it is complete.
pub struct ReportWriter<W: Write> {
    out: W,
    blocks: usize,
}

impl ReportWriter<BufWriter<File>> {
    /// Creates or truncates the report file.
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, blocks: 0 }
    }

    pub fn write_no_results(&mut self) -> io::Result<()> {
        writeln!(self.out, "{NO_RESULTS_MARKER}")?;
        self.out.flush()
    }

    pub fn write_block(&mut self, line: &str, context: &[ContextLine]) -> io::Result<()> {
        writeln!(self.out, "{MATCH_HEADER}")?;
        writeln!(self.out, "{line}")?;
        for context_line in context {
            writeln!(self.out, "{context_line}")?;
        }
        self.finish_block()
    }

    /// Block for a line whose context lookup failed and was skipped.
    pub fn write_unavailable_block(&mut self, line: &str, reason: &str) -> io::Result<()> {
        writeln!(self.out, "{MATCH_HEADER}")?;
        writeln!(self.out, "{line}")?;
        writeln!(self.out, "{CONTEXT_UNAVAILABLE_TAG} {reason}")?;
        self.finish_block()
    }

    fn finish_block(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        self.blocks += 1;
        self.out.flush()
    }

    pub fn blocks_written(&self) -> usize {
        self.blocks
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
