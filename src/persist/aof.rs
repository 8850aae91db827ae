//! Append-only command log.
//!
//! Every mutating command is appended as its raw RESP command frame,
//! with literal CR and LF bytes inside the frame escaped to the
//! two-character sequences `\r` and `\n` so that each record is exactly
//! one `\n`-terminated line on disk (`tail -f`/`grep`-able, matching the
//! teacher's own line-oriented log files). This is lossy for bulk
//! payloads that themselves contain a literal `\n` byte — documented in
//! DESIGN.md as a deliberate, spec-required limitation rather than an
//! oversight.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use bytes::Bytes;

use crate::resp::{ParseOutcome, Parser, Value};
use crate::store::Corestore;
use crate::util::error::{Error, SkyResult};

pub struct AofWriter {
    file: File,
}

impl AofWriter {
    pub fn open(path: &Path) -> SkyResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path).map_err(|e| Error::io_extra(e, format!("opening AOF at {}", path.display())))?;
        Ok(Self { file })
    }

    /// Appends one command frame (the same bytes the client sent,
    /// serialized as a RESP array of bulk strings).
    pub fn append(&mut self, args: &[Bytes]) -> SkyResult<()> {
        let frame = Value::Array(args.iter().cloned().map(Value::BulkString).collect()).to_bytes();
        let escaped = escape(&frame);
        self.file.write_all(&escaped).map_err(Error::from)?;
        self.file.write_all(b"\n").map_err(Error::from)?;
        self.file.flush().map_err(Error::from)?;
        Ok(())
    }
}

fn escape(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    for &b in raw {
        match b {
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(line: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len());
    let mut i = 0;
    while i < line.len() {
        if line[i] == b'\\' && i + 1 < line.len() {
            match line[i + 1] {
                b'r' => {
                    out.push(b'\r');
                    i += 2;
                    continue;
                }
                b'n' => {
                    out.push(b'\n');
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        out.push(line[i]);
        i += 1;
    }
    out
}

/// Replays every record in the AOF at `path` through the dispatcher,
/// reconstructing in-memory state. Malformed records are logged and
/// skipped rather than aborting the whole replay.
pub fn replay(path: &Path, store: &Corestore) -> SkyResult<()> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io_extra(e, format!("opening AOF at {}", path.display()))),
    };
    let reader = BufReader::new(file);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(Error::from)?;
        if line.is_empty() {
            continue;
        }
        let raw = unescape(line.as_bytes());
        let value = match Parser::parse(&raw) {
            Ok(ParseOutcome::Complete(v, _)) => v,
            Ok(ParseOutcome::Incomplete) => {
                log::warn!("AOF record {} at {} truncated, skipping", lineno, path.display());
                continue;
            }
            Err(e) => {
                log::warn!("AOF record {} at {} failed to parse ({:?}), skipping", lineno, path.display(), e);
                continue;
            }
        };
        let Some(args) = value.into_command_args() else {
            log::warn!("AOF record {} at {} was not a command array, skipping", lineno, path.display());
            continue;
        };
        // Replay must not re-append to the log it's reading from.
        let _ = crate::dispatch::execute_no_log(store, args);
    }
    Ok(())
}
