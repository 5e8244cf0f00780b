use crate::audit::event::{compute_event_hash, finalize_event, AuditEvent, ZERO_HASH_64};
use crate::error::{CoreError, CoreResult};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Append-only NDJSON log of hash-chained events.
pub struct AuditLog {
    path: PathBuf,
    last_hash: String,
}

impl AuditLog {
    pub fn open_or_create(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            File::create(&path)?;
            return Ok(Self {
                path,
                last_hash: ZERO_HASH_64.to_string(),
            });
        }

        let last_hash = read_events(&path)?
            .last()
            .map(|e| e.event_hash.clone())
            .unwrap_or_else(|| ZERO_HASH_64.to_string());
        Ok(Self { path, last_hash })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_hash(&self) -> &str {
        &self.last_hash
    }

    pub fn append(&mut self, mut event: AuditEvent) -> CoreResult<AuditEvent> {
        event.prev_event_hash = self.last_hash.clone();
        let event = finalize_event(event)?;
        let line = serde_json::to_string(&event)?;
        let mut f = OpenOptions::new().append(true).open(&self.path)?;
        f.write_all(line.as_bytes())?;
        f.write_all(b"\n")?;
        self.last_hash = event.event_hash.clone();
        Ok(event)
    }
}

pub fn read_events(path: impl AsRef<Path>) -> CoreResult<Vec<AuditEvent>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }
    Ok(events)
}

/// Recompute every hash and check the prev links. Returns the event count.
pub fn verify_chain(path: impl AsRef<Path>) -> CoreResult<usize> {
    let events = read_events(path)?;
    let mut prev = ZERO_HASH_64.to_string();
    for (idx, e) in events.iter().enumerate() {
        if e.prev_event_hash != prev {
            return Err(CoreError::DeterminismViolation(format!(
                "audit event {} does not link to its predecessor",
                idx
            )));
        }
        if compute_event_hash(e)? != e.event_hash {
            return Err(CoreError::DeterminismViolation(format!(
                "audit event {} hash mismatch",
                idx
            )));
        }
        prev = e.event_hash.clone();
    }
    Ok(events.len())
}
