// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Ticket lifecycle over the time file: `start → pause ⇄ resume → end`.
//!
//! Each call is one load → mutate → save cycle. A rejected transition returns
//! before the save, so the file on disk is left exactly as it was.

use std::path::Path;

use chrono::{DateTime, Local};

use crate::error::{JobError, Result};
use crate::job::{Job, JobState};
use crate::store::{self, Jobs};

/// Result of [`start`].
#[derive(Debug)]
pub struct Started {
    pub job: Job,
    /// The time file did not exist and was created.
    pub created_store: bool,
}

/// Starts a timer for `ticket`. Creates the time file if it is missing.
/// An ended job under the same ticket is replaced; an open one is an error.
pub fn start(path: &Path, ticket: &str, now: DateTime<Local>) -> Result<Started> {
    let created_store = store::touch(path)?;
    if created_store {
        tracing::info!(path = %path.display(), "created time file");
    }
    let mut jobs = store::load(path)?;
    if let Some(existing) = jobs.get(ticket) {
        if existing.state() != JobState::Ended {
            return Err(JobError::AlreadyRunning {
                ticket: ticket.to_string(),
                started: existing.start_time_slice().to_string(),
            });
        }
        tracing::debug!(ticket, "replacing finished job");
    }
    let job = Job::start(ticket, now);
    jobs.insert(ticket.to_string(), job.clone());
    store::save(path, &jobs)?;
    tracing::debug!(ticket, start_ms = job.start_ms(), "started");
    Ok(Started { job, created_store })
}

/// Pauses the running timer for `ticket`.
pub fn pause(path: &Path, ticket: &str, now: DateTime<Local>) -> Result<Job> {
    update(path, ticket, |job| job.pause(now))
}

/// Resumes the paused timer for `ticket`.
pub fn resume(path: &Path, ticket: &str, now: DateTime<Local>) -> Result<Job> {
    update(path, ticket, |job| job.resume(now))
}

/// Ends the timer for `ticket` and computes its elapsed time.
pub fn end(path: &Path, ticket: &str, now: DateTime<Local>) -> Result<Job> {
    let job = update(path, ticket, |job| job.end(now))?;
    tracing::debug!(ticket, elapsed_ms = job.elapsed(), jira = job.jira(), "ended");
    Ok(job)
}

/// The job that finished most recently, if any has. Ties go to the first ticket.
pub fn last_finished(jobs: &Jobs) -> Option<&Job> {
    // max_by_key keeps the last maximum, so walk backwards
    jobs.values()
        .rev()
        .filter(|job| job.end_ms().is_some_and(|end| end > 0))
        .max_by_key(|job| job.end_ms())
}

/// Jobs that have not ended, in ticket order.
pub fn unfinished(jobs: &Jobs) -> Vec<&Job> {
    jobs.values()
        .filter(|job| job.state() != JobState::Ended)
        .collect()
}

fn update(path: &Path, ticket: &str, apply: impl FnOnce(&mut Job) -> Result<()>) -> Result<Job> {
    let not_started = || JobError::NotStarted {
        ticket: ticket.to_string(),
    };
    let mut jobs = match store::load(path) {
        Err(JobError::NotFound { .. }) => return Err(not_started()),
        other => other?,
    };
    let job = jobs.get_mut(ticket).ok_or_else(not_started)?;
    apply(job)?;
    let job = job.clone();
    store::save(path, &jobs)?;
    tracing::debug!(ticket, state = ?job.state(), boundaries = job.pauses_ms().len(), "updated");
    Ok(job)
}
