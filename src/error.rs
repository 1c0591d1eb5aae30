// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Error kinds surfaced by the job store, the lifecycle, and the config loader.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for store and lifecycle operations.
pub type Result<T> = std::result::Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    /// The store file does not exist. Read paths report "no data", `start` creates it.
    #[error("{} doesn't exist", .path.display())]
    NotFound { path: PathBuf },

    #[error("No job recorded for {ticket}. Run 'jiratrack --start {ticket}' to start the timer.")]
    NotStarted { ticket: String },

    #[error("Already started timer for {ticket} on {started}")]
    AlreadyRunning { ticket: String, started: String },

    #[error("Cannot pause {ticket} again since it is already paused.")]
    AlreadyPaused { ticket: String },

    #[error("Cannot resume {ticket} since it is not paused.")]
    NotPaused { ticket: String },

    #[error("Job {ticket} already finished on {ended}. Run 'jiratrack --start {ticket}' to start another timer.")]
    AlreadyEnded { ticket: String, ended: String },

    #[error("Please enter a JIRA ticket to {action}.")]
    MissingTicket { action: &'static str },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: invalid job data: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: corrupt record for {ticket}: {reason}", .path.display())]
    Corrupt {
        path: PathBuf,
        ticket: String,
        reason: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl JobError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            JobError::NotFound { path }
        } else {
            JobError::Io { path, source }
        }
    }

    /// True for read/write/parse failures that are always fatal to the caller.
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            JobError::Io { .. } | JobError::Parse { .. } | JobError::Corrupt { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Please enter a path in the format --set-time-path=/path/you/want.json (got {})", .path.display())]
    NotJson { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = JobError::io("time.json", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, JobError::NotFound { .. }));
        assert!(!err.is_io_failure());
        assert_eq!(err.to_string(), "time.json doesn't exist");
    }

    #[test]
    fn test_io_other_is_failure() {
        let err = JobError::io("time.json", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, JobError::Io { .. }));
        assert!(err.is_io_failure());
    }

    #[test]
    fn test_messages_carry_ticket() {
        let err = JobError::AlreadyPaused {
            ticket: "ABC-1".to_string(),
        };
        assert!(err.to_string().contains("ABC-1"));
        let err = JobError::MissingTicket { action: "pause" };
        assert_eq!(err.to_string(), "Please enter a JIRA ticket to pause.");
    }
}
