//! Input recording for replay and debugging.
//!
//! Every transmitted input is written as one JSON object per line, so a session
//! can be fed back through the movement model or replayed against a server.

use crate::prediction::PendingInput;
use anyhow::{Context, Result};
use arena_core::{Fixed, InputSeq};
use arena_physics::InputSample;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Input log entry for JSONL format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLogEntry {
    /// Sequence number the input was sent with.
    pub seq: InputSeq,
    /// The sampled controls.
    pub input: InputSample,
    /// Slow multiplier in effect when the input was applied.
    pub slow_mul: Fixed,
}

impl From<PendingInput> for InputLogEntry {
    fn from(pending: PendingInput) -> Self {
        Self {
            seq: pending.seq,
            input: pending.input,
            slow_mul: pending.slow_mul,
        }
    }
}

/// Input logger that writes to JSONL format.
pub struct InputLogger {
    writer: BufWriter<File>,
    entries_written: u64,
}

impl InputLogger {
    /// Create (or truncate) a log file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create input log: {:?}", path.as_ref()))?;
        Ok(Self {
            writer: BufWriter::new(file),
            entries_written: 0,
        })
    }

    /// Append one entry.
    pub fn log(&mut self, entry: &InputLogEntry) -> Result<()> {
        serde_json::to_writer(&mut self.writer, entry)?;
        writeln!(&mut self.writer)?;
        self.entries_written += 1;
        Ok(())
    }

    /// Flush buffered writes.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Get number of entries written.
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }
}

/// Reads a recorded input log back, entry by entry.
pub struct InputLogReader {
    entries: Vec<InputLogEntry>,
    current_index: usize,
}

impl InputLogReader {
    /// Load a JSONL log; blank lines are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open input log: {:?}", path.as_ref()))?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: InputLogEntry = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse line {}: {}", line_num + 1, line))?;
            entries.push(entry);
        }

        Ok(Self {
            entries,
            current_index: 0,
        })
    }

    /// Next recorded entry, or `None` at the end.
    pub fn next_entry(&mut self) -> Option<InputLogEntry> {
        let entry = self.entries.get(self.current_index).copied()?;
        self.current_index += 1;
        Some(entry)
    }

    /// All entries in recording order.
    pub fn entries(&self) -> &[InputLogEntry] {
        &self.entries
    }

    /// Reset playback to beginning.
    pub fn reset(&mut self) {
        self.current_index = 0;
    }

    /// Get total number of entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Check if playback is complete.
    pub fn is_finished(&self) -> bool {
        self.current_index >= self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn entry(seq: u32) -> InputLogEntry {
        InputLogEntry {
            seq: InputSeq(seq),
            input: InputSample {
                up: true,
                mouse_dx: Fixed(-1500),
                ..InputSample::default()
            },
            slow_mul: Fixed::ONE,
        }
    }

    #[test]
    fn logger_writes_one_line_per_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inputs.jsonl");

        let mut logger = InputLogger::create(&path).unwrap();
        logger.log(&entry(1)).unwrap();
        logger.log(&entry(2)).unwrap();
        logger.flush().unwrap();
        assert_eq!(logger.entries_written(), 2);
        drop(logger);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"seq\":1"));
        assert!(lines[0].contains("\"slow_mul\":1000"));
    }

    #[test]
    fn reader_plays_back_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inputs.jsonl");

        let mut logger = InputLogger::create(&path).unwrap();
        logger.log(&entry(5)).unwrap();
        logger.log(&entry(6)).unwrap();
        logger.flush().unwrap();
        drop(logger);

        let mut reader = InputLogReader::load(&path).unwrap();
        assert_eq!(reader.entry_count(), 2);
        assert_eq!(reader.next_entry(), Some(entry(5)));
        assert_eq!(reader.next_entry(), Some(entry(6)));
        assert_eq!(reader.next_entry(), None);
        assert!(reader.is_finished());

        reader.reset();
        assert!(!reader.is_finished());
        assert_eq!(reader.next_entry(), Some(entry(5)));
    }

    #[test]
    fn reader_skips_blank_lines_and_reports_bad_ones() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inputs.jsonl");
        let line = serde_json::to_string(&entry(1)).unwrap();
        fs::write(&path, format!("{line}\n\n{line}\n")).unwrap();
        assert_eq!(InputLogReader::load(&path).unwrap().entry_count(), 2);

        fs::write(&path, format!("{line}\nnot json\n")).unwrap();
        let err = InputLogReader::load(&path).err().unwrap();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn pending_input_converts() {
        let pending = PendingInput {
            seq: InputSeq(9),
            input: InputSample::default(),
            slow_mul: Fixed(750),
        };
        let logged = InputLogEntry::from(pending);
        assert_eq!(logged.seq, InputSeq(9));
        assert_eq!(logged.slow_mul, Fixed(750));
    }
}
