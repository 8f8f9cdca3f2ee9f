//! Line-oriented YAML log writer.
//!
//! The stream is a YAML document: a header block, then a `d:` list with one
//! entry per error-bearing iteration.
//!
//! ```text
//! ---
//! hw: Zybo ZYNQ7010
//! test: qsort
//! ...
//! d:
//!  - i: 17
//!    E0: {5: [1a2b, 1a2f], 9: [77, 7f]}
//!    S: {179700: 179699}
//! # 250, 3, 1, 0
//! safeword
//! ```
//!
//! Records are buffered between [`RecordWriter::begin_record`] and
//! [`RecordWriter::end_record`] and written in one piece, so every record is
//! closed exactly once and empty records never reach the sink.

use std::fmt::{self, Write as _};
use std::io::Write;

use seubench_error::{BenchError, Result};

use crate::compare::ErrorReport;
use crate::config::{EngineConfig, PrintMode};
use crate::kernel::{ChecksumMismatch, HeaderField, tags};
use crate::word::Word;

/// Token emitted when the process has finished the measured region.
pub const TERMINAL_SENTINEL: &str = "safeword ";

/// Region an iteration record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Measured,
    /// Warm-up mismatches point at a software bug, so they get their own key.
    Warmup,
}

impl RecordKind {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Measured => "i",
            Self::Warmup => "w",
        }
    }
}

#[derive(Debug)]
struct OpenRecord {
    kind: RecordKind,
    iteration: u64,
    body: String,
}

#[derive(Debug)]
pub struct RecordWriter<W: Write> {
    out: W,
    mode: PrintMode,
    open: Option<OpenRecord>,
    opened: u64,
    closed: u64,
    emitted: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W, mode: PrintMode) -> Self {
        Self {
            out,
            mode,
            open: None,
            opened: 0,
            closed: 0,
            emitted: 0,
        }
    }

    #[must_use]
    pub fn mode(&self) -> PrintMode {
        self.mode
    }

    /// Write the one-time header block, ending with the `d:` list key.
    pub fn write_header(
        &mut self,
        test: &str,
        config: &EngineConfig,
        kernel_fields: &[HeaderField],
    ) -> Result<()> {
        let mut block = String::new();
        let _ = writeln!(block);
        let _ = writeln!(block, "---");
        let _ = writeln!(block, "hw: {}", config.header.hw);
        let _ = writeln!(block, "test: {test}");
        let _ = writeln!(block, "mit: {}", config.header.mitigation);
        let _ = writeln!(block, "printing: {}", config.printing.header_flag());
        for field in kernel_fields {
            let _ = writeln!(block, "{}: {}", field.key, field.value);
        }
        let _ = writeln!(block, "loop_count: {}", config.loop_count);
        let _ = writeln!(block, "warmup_count: {}", config.warmup_count);
        let _ = writeln!(block, "change_rate: {}", config.change_rate);
        let _ = writeln!(block, "ver: {}", config.header.version);
        let _ = writeln!(block, "fac: {}", config.header.facility);
        let _ = writeln!(block, "d:");
        self.out.write_all(block.as_bytes())?;
        Ok(())
    }

    /// Open the record for `iteration`. Fails if a record is already open.
    pub fn begin_record(&mut self, kind: RecordKind, iteration: u64) -> Result<()> {
        if let Some(open) = &self.open {
            return Err(BenchError::internal(format!(
                "record for iteration {} is still open",
                open.iteration
            )));
        }
        self.open = Some(OpenRecord {
            kind,
            iteration,
            body: String::new(),
        });
        self.opened = self.opened.saturating_add(1);
        Ok(())
    }

    /// Append a `key: value` field to the open record.
    pub fn add_field(&mut self, key: &str, value: impl fmt::Display) -> Result<()> {
        let body = self.open_body()?;
        let _ = writeln!(body, "   {key}: {value}");
        Ok(())
    }

    /// Append the mismatches of one comparison under `tag`.
    ///
    /// Robust mode lists `index: [expected, actual]` pairs in hex, followed by
    /// `more: n` when the report captured fewer pairs than it counted. Terse
    /// mode writes the count alone. Clean reports add nothing.
    pub fn add_mismatches<T: Word>(
        &mut self,
        tag: &str,
        report: &ErrorReport<T>,
        format_index: impl Fn(usize) -> String,
    ) -> Result<()> {
        if report.is_clean() {
            return Ok(());
        }
        match self.mode {
            PrintMode::Terse => self.add_field(tag, report.errors),
            PrintMode::Robust => {
                let mut listing = String::from("{");
                for (position, mismatch) in report.mismatches.iter().enumerate() {
                    if position > 0 {
                        listing.push_str(", ");
                    }
                    let _ = write!(
                        listing,
                        "{}: [{:x}, {:x}]",
                        format_index(mismatch.index),
                        mismatch.expected,
                        mismatch.actual
                    );
                }
                let omitted = report.omitted();
                if omitted > 0 {
                    if !report.mismatches.is_empty() {
                        listing.push_str(", ");
                    }
                    let _ = write!(listing, "more: {omitted}");
                }
                listing.push('}');
                self.add_field(tag, listing)
            }
        }
    }

    /// Append a failed secondary checksum as `tag: {expected: actual}`.
    pub fn add_checksum(&mut self, mismatch: &ChecksumMismatch) -> Result<()> {
        self.add_field(
            mismatch.tag,
            format_args!("{{{}: {}}}", mismatch.expected, mismatch.actual),
        )
    }

    /// Append a golden seal failure for the stage logged under `stage_tag`.
    pub fn add_golden_inconsistency(
        &mut self,
        stage_tag: &str,
        expected_seal: u64,
        actual_seal: u64,
    ) -> Result<()> {
        let key = format!("{}{stage_tag}", tags::GOLDEN_PREFIX);
        self.add_field(&key, format_args!("{{{expected_seal:x}: {actual_seal:x}}}"))
    }

    /// Close the open record, writing it if it carries any field.
    ///
    /// Returns whether a record was written. Closing with no open record is a
    /// no-op that returns `false`.
    pub fn end_record(&mut self) -> Result<bool> {
        let Some(record) = self.open.take() else {
            return Ok(false);
        };
        self.closed = self.closed.saturating_add(1);
        if record.body.is_empty() {
            return Ok(false);
        }
        let mut text = String::with_capacity(record.body.len() + 24);
        let _ = writeln!(text, " - {}: {}", record.kind.key(), record.iteration);
        text.push_str(&record.body);
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        self.emitted = self.emitted.saturating_add(1);
        Ok(true)
    }

    /// Alive line: `# iteration, total, affected, checksum`.
    pub fn heartbeat(
        &mut self,
        iteration: u64,
        total_errors: u64,
        affected: u64,
        checksum_errors: u64,
    ) -> Result<()> {
        self.ensure_closed()?;
        writeln!(
            self.out,
            "# {iteration}, {total_errors}, {affected}, {checksum_errors}"
        )?;
        Ok(())
    }

    /// Write text outside any record.
    pub fn write_raw(&mut self, text: &str) -> Result<()> {
        self.ensure_closed()?;
        self.out.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Emit the terminal sentinel and flush.
    pub fn sentinel(&mut self) -> Result<()> {
        self.ensure_closed()?;
        self.out.write_all(TERMINAL_SENTINEL.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    #[must_use]
    pub fn records_opened(&self) -> u64 {
        self.opened
    }

    #[must_use]
    pub fn records_closed(&self) -> u64 {
        self.closed
    }

    #[must_use]
    pub fn records_emitted(&self) -> u64 {
        self.emitted
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn open_body(&mut self) -> Result<&mut String> {
        self.open
            .as_mut()
            .map(|record| &mut record.body)
            .ok_or_else(|| BenchError::internal("no record is open"))
    }

    fn ensure_closed(&self) -> Result<()> {
        match &self.open {
            Some(open) => Err(BenchError::internal(format!(
                "record for iteration {} is still open",
                open.iteration
            ))),
            None => Ok(()),
        }
    }
}
