// log.rs: Append-only JSONL invocation log with a hash chain.
//
// One JSON object per line. Each event carries the SHA-256 of the previous
// raw line in `previous_hash`, so inserting, deleting or editing a line
// breaks the chain and `verify_chain` reports where.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::AuditError;
use crate::event::InvocationEvent;
use crate::hasher;

pub struct AuditLog {
    writer: BufWriter<File>,
    path: PathBuf,
    /// Hash of the last line written; becomes the next event's `previous_hash`.
    last_hash: Option<String>,
}

impl AuditLog {
    /// Open (or create) a log. An existing log's chain is continued.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| AuditError::OpenFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let last_hash = if path.exists() {
            Self::read_last_hash(&path)?
        } else {
            None
        };
        tracing::debug!(
            path = %path.display(),
            continuing = last_hash.is_some(),
            "audit log opened"
        );

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            last_hash,
        })
    }

    /// Link `event` to the chain, write it and flush.
    pub fn append(&mut self, event: &mut InvocationEvent) -> Result<(), AuditError> {
        event.previous_hash = self.last_hash.clone();
        let json = serde_json::to_string(event)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        // Only advance the chain once the line is durable.
        self.last_hash = Some(hasher::hash_str(&json));
        Ok(())
    }

    /// All events, oldest first. Blank lines are skipped.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<InvocationEvent>, AuditError> {
        let mut events = Vec::new();
        for line in Self::lines(path.as_ref())? {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }
        Ok(events)
    }

    /// The last `n` events, oldest first.
    pub fn read_tail(path: impl AsRef<Path>, n: usize) -> Result<Vec<InvocationEvent>, AuditError> {
        let mut events = Self::read_all(path)?;
        let skip = events.len().saturating_sub(n);
        Ok(events.split_off(skip))
    }

    /// Check every link in the chain. Returns the number of events verified.
    ///
    /// Hashes are taken over the raw lines, not re-serialized events, so
    /// field order in the file is what counts.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<usize, AuditError> {
        let mut previous_hash: Option<String> = None;
        let mut count = 0;

        for (line_num, line) in Self::lines(path.as_ref())?.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: InvocationEvent = serde_json::from_str(&line)?;
            if event.previous_hash != previous_hash {
                tracing::warn!(line = line_num + 1, "audit hash chain broken");
                return Err(AuditError::IntegrityViolation {
                    line: line_num + 1,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: event.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }
            previous_hash = Some(hasher::hash_str(&line));
            count += 1;
        }

        Ok(count)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lines(path: &Path) -> Result<std::io::Lines<BufReader<File>>, AuditError> {
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(BufReader::new(file).lines())
    }

    fn read_last_hash(path: &Path) -> Result<Option<String>, AuditError> {
        let mut last_line: Option<String> = None;
        for line in Self::lines(path)? {
            let line = line?;
            if !line.trim().is_empty() {
                last_line = Some(line);
            }
        }
        Ok(last_line.map(|line| hasher::hash_str(&line)))
    }
}
