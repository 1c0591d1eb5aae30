// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! # Job records
//!
//! A [`Job`] is the timing record for one ticket. Its state is never stored
//! directly; it is derived from two persisted fields:
//!
//! - `endMs` is `-1` on disk until the job ends (`None` in memory).
//! - `pausesMs` alternates pause, resume, pause, ... so an even length means
//!   the timer is running and an odd length means it is paused.
//!
//! Net working time only counts the running spans:
//! `start → pause₀`, `resume₁ → pause₂`, ..., and `resumeₙ₋₁ → end` when the
//! last boundary is a resume.

use std::iter;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{JobError, Result};

/// Display format for start/end time slices.
const TIME_SLICE_FORMAT: &str = "%a %b %d %H:%M:%S %Z %Y";

/// On-disk value of `endMs` for a job that has not ended.
pub const NOT_ENDED: i64 = -1;

/// Where a ticket is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Running,
    Paused,
    Ended,
}

/// Timing record for one ticket, as stored in the time file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    ticket: String,
    start_ms: i64,
    #[serde(with = "end_ms_sentinel")]
    end_ms: Option<i64>,
    #[serde(default)]
    pauses_ms: Vec<i64>,
    #[serde(default)]
    elapsed: i64,
    #[serde(default, alias = "jiraFormat")]
    jira: String,
    #[serde(default)]
    start_time_slice: String,
    #[serde(default)]
    end_time_slice: String,
}

impl Job {
    /// A fresh running job for `ticket` started at `now`.
    pub fn start(ticket: &str, now: DateTime<Local>) -> Self {
        Job {
            ticket: ticket.to_string(),
            start_ms: now.timestamp_millis(),
            end_ms: None,
            pauses_ms: Vec::new(),
            elapsed: 0,
            jira: String::new(),
            start_time_slice: time_slice(&now),
            end_time_slice: String::new(),
        }
    }

    pub fn ticket(&self) -> &str {
        &self.ticket
    }

    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> Option<i64> {
        self.end_ms
    }

    pub fn pauses_ms(&self) -> &[i64] {
        &self.pauses_ms
    }

    /// Net working milliseconds; 0 until the job ends.
    pub fn elapsed(&self) -> i64 {
        self.elapsed
    }

    /// Jira-style duration; empty until the job ends.
    pub fn jira(&self) -> &str {
        &self.jira
    }

    pub fn start_time_slice(&self) -> &str {
        &self.start_time_slice
    }

    pub fn end_time_slice(&self) -> &str {
        &self.end_time_slice
    }

    pub fn state(&self) -> JobState {
        if self.end_ms.is_some() {
            JobState::Ended
        } else if self.pauses_ms.len() % 2 == 1 {
            JobState::Paused
        } else {
            JobState::Running
        }
    }

    /// Records a pause boundary. Only a running job can be paused.
    pub fn pause(&mut self, now: DateTime<Local>) -> Result<()> {
        match self.state() {
            JobState::Running => {
                let at = self.stamp(&now);
                self.pauses_ms.push(at);
                Ok(())
            }
            JobState::Paused => Err(JobError::AlreadyPaused {
                ticket: self.ticket.clone(),
            }),
            JobState::Ended => Err(self.already_ended()),
        }
    }

    /// Records a resume boundary. Only a paused job can be resumed.
    pub fn resume(&mut self, now: DateTime<Local>) -> Result<()> {
        match self.state() {
            JobState::Paused => {
                let at = self.stamp(&now);
                self.pauses_ms.push(at);
                Ok(())
            }
            JobState::Running => Err(JobError::NotPaused {
                ticket: self.ticket.clone(),
            }),
            JobState::Ended => Err(self.already_ended()),
        }
    }

    /// Finalizes the job: sets the end time, then the elapsed time, then the Jira format.
    pub fn end(&mut self, now: DateTime<Local>) -> Result<()> {
        if self.state() == JobState::Ended {
            return Err(self.already_ended());
        }
        let end_ms = self.stamp(&now);
        self.end_ms = Some(end_ms);
        self.end_time_slice = time_slice_ms(end_ms);
        self.elapsed = elapsed_ms(self.start_ms, end_ms, &self.pauses_ms);
        self.jira = jira_format(self.elapsed);
        Ok(())
    }

    /// Checks the record against the invariants the transitions maintain.
    /// `key` is the ticket the record is stored under.
    pub(crate) fn check(&self, key: &str) -> std::result::Result<(), String> {
        if self.ticket != key {
            return Err(format!("stored under {:?} but names ticket {:?}", key, self.ticket));
        }
        if self.start_ms < 0 {
            return Err(format!("start {} is before the epoch", self.start_ms));
        }
        if self.pauses_ms.windows(2).any(|w| w[1] < w[0]) {
            return Err("pause/resume timestamps are out of order".to_string());
        }
        if let Some(&first) = self.pauses_ms.first() {
            if first < self.start_ms {
                return Err("first pause precedes the start".to_string());
            }
        }
        if let Some(end) = self.end_ms {
            if end < self.start_ms {
                return Err("end precedes the start".to_string());
            }
            if self.pauses_ms.last().is_some_and(|&last| last > end) {
                return Err("pause/resume recorded after the end".to_string());
            }
        }
        Ok(())
    }

    /// Latest timestamp recorded on this job.
    pub fn latest_ms(&self) -> i64 {
        self.pauses_ms.last().copied().unwrap_or(self.start_ms)
    }

    /// Epoch millis for `now`, never earlier than what is already recorded.
    fn stamp(&self, now: &DateTime<Local>) -> i64 {
        let at = now.timestamp_millis();
        let latest = self.latest_ms();
        if at < latest {
            tracing::warn!(ticket = %self.ticket, at, latest, "clock is behind the last recorded boundary");
            latest
        } else {
            at
        }
    }

    fn already_ended(&self) -> JobError {
        JobError::AlreadyEnded {
            ticket: self.ticket.clone(),
            ended: self.end_time_slice.clone(),
        }
    }
}

/// Net working milliseconds between `start_ms` and `end_ms`, excluding paused spans.
///
/// `pauses_ms` must alternate pause, resume, pause, ... in order. Running spans
/// are consecutive pairs of `start, pauses..., [end]`, where `end` closes the
/// last span only when the final boundary is a resume (even count).
pub fn elapsed_ms(start_ms: i64, end_ms: i64, pauses_ms: &[i64]) -> i64 {
    let running_at_end = pauses_ms.len() % 2 == 0;
    let bounds: Vec<i64> = iter::once(start_ms)
        .chain(pauses_ms.iter().copied())
        .chain(running_at_end.then_some(end_ms))
        .collect();
    bounds.chunks_exact(2).map(|span| span[1] - span[0]).sum()
}

/// Formats milliseconds as `"1h 30m 5s"`, leaving out zero units. Zero is `""`.
pub fn jira_format(elapsed_ms: i64) -> String {
    let secs = elapsed_ms.max(0) / 1000;
    let units = [(secs / 3600, 'h'), (secs / 60 % 60, 'm'), (secs % 60, 's')];
    units
        .iter()
        .filter(|(value, _)| *value != 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human-readable local timestamp shown to the user.
pub fn time_slice(at: &DateTime<Local>) -> String {
    at.format(TIME_SLICE_FORMAT).to_string()
}

/// [`time_slice`] for epoch milliseconds; empty if the instant is not representable.
pub fn time_slice_ms(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|at| time_slice(&at))
        .unwrap_or_default()
}

/// Serializes `None` as the `-1` sentinel the time file has always used.
mod end_ms_sentinel {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::NOT_ENDED;

    pub fn serialize<S: Serializer>(end_ms: &Option<i64>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(end_ms.unwrap_or(NOT_ENDED))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match i64::deserialize(d)? {
            NOT_ENDED => Ok(None),
            ms if ms >= 0 => Ok(Some(ms)),
            ms => Err(D::Error::custom(format!("invalid endMs {}", ms))),
        }
    }
}

#[cfg(test)]
pub(crate) fn at_ms(ms: i64) -> DateTime<Local> {
    Local.timestamp_millis_opt(ms).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_is_running() {
        let job = Job::start("T1", at_ms(0));
        assert_eq!(job.ticket(), "T1");
        assert_eq!(job.start_ms(), 0);
        assert_eq!(job.end_ms(), None);
        assert!(job.pauses_ms().is_empty());
        assert_eq!(job.elapsed(), 0);
        assert_eq!(job.jira(), "");
        assert!(!job.start_time_slice().is_empty());
        assert_eq!(job.end_time_slice(), "");
        assert_eq!(job.state(), JobState::Running);
    }

    #[test]
    fn test_pause_resume_end_scenario() {
        let mut job = Job::start("T1", at_ms(0));
        job.pause(at_ms(1000)).unwrap();
        assert_eq!(job.state(), JobState::Paused);
        job.resume(at_ms(4000)).unwrap();
        assert_eq!(job.state(), JobState::Running);
        job.end(at_ms(5000)).unwrap();
        assert_eq!(job.state(), JobState::Ended);
        assert_eq!(job.pauses_ms(), &[1000, 4000]);
        assert_eq!(job.end_ms(), Some(5000));
        assert_eq!(job.elapsed(), 2000);
        assert_eq!(job.jira(), "2s");
        assert!(!job.end_time_slice().is_empty());
    }

    #[test]
    fn test_end_without_pauses() {
        let mut job = Job::start("T2", at_ms(0));
        job.end(at_ms(10_000)).unwrap();
        assert_eq!(job.elapsed(), 10_000);
        assert_eq!(job.jira(), "10s");
    }

    #[test]
    fn test_end_while_paused_drops_trailing_pause() {
        let mut job = Job::start("T", at_ms(0));
        job.pause(at_ms(2000)).unwrap();
        job.end(at_ms(9000)).unwrap();
        assert_eq!(job.elapsed(), 2000);
    }

    #[test]
    fn test_pause_twice_fails() {
        let mut job = Job::start("T", at_ms(0));
        job.pause(at_ms(1000)).unwrap();
        let err = job.pause(at_ms(2000)).unwrap_err();
        assert!(matches!(err, JobError::AlreadyPaused { ref ticket } if ticket == "T"));
        assert_eq!(job.pauses_ms(), &[1000]);
    }

    #[test]
    fn test_resume_never_paused_fails() {
        let mut job = Job::start("T", at_ms(0));
        assert!(matches!(job.resume(at_ms(1000)), Err(JobError::NotPaused { .. })));
    }

    #[test]
    fn test_resume_twice_fails() {
        let mut job = Job::start("T", at_ms(0));
        job.pause(at_ms(1000)).unwrap();
        job.resume(at_ms(2000)).unwrap();
        assert!(matches!(job.resume(at_ms(3000)), Err(JobError::NotPaused { .. })));
        assert_eq!(job.pauses_ms(), &[1000, 2000]);
    }

    #[test]
    fn test_ended_job_is_terminal() {
        let mut job = Job::start("T", at_ms(0));
        job.end(at_ms(1000)).unwrap();
        let before = job.clone();
        assert!(matches!(job.end(at_ms(2000)), Err(JobError::AlreadyEnded { .. })));
        assert!(matches!(job.pause(at_ms(2000)), Err(JobError::AlreadyEnded { .. })));
        assert!(matches!(job.resume(at_ms(2000)), Err(JobError::AlreadyEnded { .. })));
        assert_eq!(job, before);
    }

    #[test]
    fn test_clock_behind_is_clamped() {
        let mut job = Job::start("T", at_ms(5000));
        job.pause(at_ms(4000)).unwrap();
        assert_eq!(job.pauses_ms(), &[5000]);
        job.resume(at_ms(7000)).unwrap();
        job.end(at_ms(6000)).unwrap();
        assert_eq!(job.end_ms(), Some(7000));
        assert_eq!(job.elapsed(), 0);
    }

    #[test]
    fn test_time_slice_ms_matches_time_slice() {
        assert_eq!(time_slice_ms(5000), time_slice(&at_ms(5000)));
    }

    #[test]
    fn test_elapsed_no_pauses() {
        assert_eq!(elapsed_ms(100, 600, &[]), 500);
    }

    #[test]
    fn test_elapsed_running_spans_only() {
        // run 0..10, pause, run 20..30, pause, run 50..end(70)
        assert_eq!(elapsed_ms(0, 70, &[10, 20, 30, 50]), 10 + 10 + 20);
        // ended while paused after 30
        assert_eq!(elapsed_ms(0, 70, &[10, 20, 30]), 10 + 10);
        assert_eq!(elapsed_ms(0, 70, &[10]), 10);
    }

    #[test]
    fn test_elapsed_bounded_by_wall_time() {
        let cases: [&[i64]; 5] = [&[], &[0], &[0, 100], &[10, 10, 20], &[5, 50, 60, 90, 99]];
        for pauses in cases {
            let e = elapsed_ms(0, 100, pauses);
            assert!((0..=100).contains(&e), "{:?} gave {}", pauses, e);
        }
    }

    #[test]
    fn test_jira_format() {
        assert_eq!(jira_format(0), "");
        assert_eq!(jira_format(999), "");
        assert_eq!(jira_format(3_661_000), "1h 1m 1s");
        assert_eq!(jira_format(60_000), "1m");
        assert_eq!(jira_format(3_600_000), "1h");
        assert_eq!(jira_format(3_605_000), "1h 5s");
        assert_eq!(jira_format(90 * 60_000), "1h 30m");
        assert_eq!(jira_format(26 * 3_600_000), "26h");
    }

    #[test]
    fn test_serde_sentinel_and_field_names() {
        let job = Job::start("T1", at_ms(0));
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["endMs"], -1);
        assert_eq!(value["startMs"], 0);
        assert!(value["pausesMs"].as_array().unwrap().is_empty());
        assert_eq!(value["jira"], "");
        assert!(value.get("startTimeSlice").is_some());
        let back: Job = serde_json::from_value(value).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn test_deserialize_original_record() {
        let raw = r#"{
            "ticket": "ABC-12",
            "startMs": 1000,
            "endMs": 7000,
            "pausesMs": [2000, 5000],
            "elapsed": 3000,
            "jira": "3s",
            "startTimeSlice": "Mon Jan 05 2015 09:00:00 GMT+0000 (UTC)",
            "endTimeSlice": "Mon Jan 05 2015 09:00:06 GMT+0000 (UTC)"
        }"#;
        let job: Job = serde_json::from_str(raw).unwrap();
        assert_eq!(job.state(), JobState::Ended);
        assert_eq!(job.end_ms(), Some(7000));
        assert_eq!(job.jira(), "3s");
        assert!(job.check("ABC-12").is_ok());
    }

    #[test]
    fn test_deserialize_jira_format_alias() {
        let raw = r#"{"ticket":"T","startMs":0,"endMs":-1,"pausesMs":[],"elapsed":0,"jiraFormat":""}"#;
        let job: Job = serde_json::from_str(raw).unwrap();
        assert_eq!(job.state(), JobState::Running);
    }

    #[test]
    fn test_deserialize_rejects_negative_end() {
        let raw = r#"{"ticket":"T","startMs":0,"endMs":-7}"#;
        assert!(serde_json::from_str::<Job>(raw).is_err());
    }

    #[test]
    fn test_check_rejects_bad_records() {
        let job: Job = serde_json::from_str(r#"{"ticket":"A","startMs":0,"endMs":-1}"#).unwrap();
        assert!(job.check("B").is_err());
        let job: Job =
            serde_json::from_str(r#"{"ticket":"A","startMs":0,"endMs":-1,"pausesMs":[5,3]}"#).unwrap();
        assert!(job.check("A").is_err());
        let job: Job =
            serde_json::from_str(r#"{"ticket":"A","startMs":10,"endMs":-1,"pausesMs":[5]}"#).unwrap();
        assert!(job.check("A").is_err());
        let job: Job =
            serde_json::from_str(r#"{"ticket":"A","startMs":10,"endMs":20,"pausesMs":[15,25]}"#).unwrap();
        assert!(job.check("A").is_err());
        let job: Job = serde_json::from_str(r#"{"ticket":"A","startMs":10,"endMs":5}"#).unwrap();
        assert!(job.check("A").is_err());
        let job: Job = serde_json::from_str(r#"{"ticket":"A","startMs":-5,"endMs":-1}"#).unwrap();
        assert!(job.check("A").is_err());
    }
}
