// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! The time file: a JSON object mapping ticket → [`Job`].
//!
//! Every command reloads the file; nothing is cached between runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::{JobError, Result};
use crate::job::Job;

/// Every job in the time file, keyed by ticket.
pub type Jobs = BTreeMap<String, Job>;

/// Reads and validates the time file. A missing file is [`JobError::NotFound`];
/// an empty file is an empty store.
pub fn load(path: &Path) -> Result<Jobs> {
    let content = fs::read_to_string(path).map_err(|e| JobError::io(path, e))?;
    if content.trim().is_empty() {
        return Ok(Jobs::new());
    }
    let jobs: Jobs = serde_json::from_str(&content).map_err(|source| JobError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    for (ticket, job) in &jobs {
        job.check(ticket).map_err(|reason| JobError::Corrupt {
            path: path.to_path_buf(),
            ticket: ticket.clone(),
            reason,
        })?;
    }
    tracing::debug!(path = %path.display(), jobs = jobs.len(), "loaded time file");
    Ok(jobs)
}

/// Writes the whole store: serialized to `<path>.tmp` in one write, then renamed over `path`.
pub fn save(path: &Path, jobs: &Jobs) -> Result<()> {
    let json = to_pretty_json(jobs).map_err(|source| JobError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, json.as_bytes()).map_err(|e| JobError::io(path, e))?;
    tracing::debug!(path = %path.display(), jobs = jobs.len(), "saved time file");
    Ok(())
}

/// Creates an empty time file if none exists. Returns true if it was created.
pub fn touch(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| JobError::io(parent, e))?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| JobError::io(path, e))?;
    Ok(true)
}

/// Deletes the time file.
pub fn remove(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| JobError::io(path, e))
}

/// JSON with 4-space indentation, the layout the time file has always had.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    // serde_json only emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Writes `data` to a sibling temp file and renames it over `path`.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, data)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
