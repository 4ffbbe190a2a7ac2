//! Append-only step log — binary protobuf frames.
//!
//! Storage format: length-prefixed protobuf frames.
//!   [4-byte LE length][protobuf bytes][4-byte LE length][protobuf bytes]...
//!
//! Rules:
//!   - Strict append only — no mutation, no deletion, no reordering
//!   - fsync after every write
//!   - Sequence strictly increasing (validated on append)

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use prost::Message;

use crate::proto_types::ProtoStepEnvelope;

/// Steps are a few short strings; anything near this is corruption.
const MAX_FRAME_LEN: usize = 64 * 1024;

/// Append-only step log backed by a binary file.
pub struct StepLog {
    path: PathBuf,
    last_sequence: u64,
}

impl StepLog {
    /// Open or create a step log at the given path.
    /// Reads existing steps to determine the last sequence number.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let last_sequence = if path.exists() {
            let steps = Self::read_all_from_file(path)?;
            steps.last().map(|s| s.sequence).unwrap_or(0)
        } else {
            0
        };

        Ok(Self {
            path: path.to_path_buf(),
            last_sequence,
        })
    }

    /// Append a single step to the log.
    ///
    /// Validates strict sequence ordering, writes the length-prefixed
    /// frame, and fsyncs.
    pub fn append_step(&mut self, step: &ProtoStepEnvelope) -> io::Result<()> {
        let expected = self.last_sequence + 1;
        if step.sequence != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Sequence violation in step log: expected {}, got {}",
                    expected, step.sequence
                ),
            ));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let buf = step.encode_to_vec();
        let len = buf.len() as u32;

        {
            let mut writer = BufWriter::new(&mut file);
            writer.write_all(&len.to_le_bytes())?;
            writer.write_all(&buf)?;
            writer.flush()?;
        }
        file.sync_all()?;

        self.last_sequence = step.sequence;
        Ok(())
    }

    /// Load all steps from the log in sequence order.
    pub fn load_all_steps(&self) -> io::Result<Vec<ProtoStepEnvelope>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        Self::read_all_from_file(&self.path)
    }

    /// Get the last sequence number in the log.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Read all steps from a file, validating frame integrity.
    fn read_all_from_file(path: &Path) -> io::Result<Vec<ProtoStepEnvelope>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut steps = Vec::new();
        let mut len_buf = [0u8; 4];

        loop {
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len == 0 || len > MAX_FRAME_LEN {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Invalid frame length: {}", len),
                ));
            }

            let mut frame = vec![0u8; len];
            reader.read_exact(&mut frame).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Truncated frame: {}", e),
                )
            })?;

            let step = ProtoStepEnvelope::decode(frame.as_slice()).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Protobuf decode error: {}", e),
                )
            })?;

            steps.push(step);
        }

        Ok(steps)
    }
}
