// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! # jiratrack — JIRA work timer
//!
//! Times work per JIRA ticket and prints the net time in the format JIRA's
//! "log work" dialog accepts (`1h 30m 5s`). Paused spans are not counted.
//!
//! The time file is `time.json` in the current directory unless another path
//! has been configured with `--set-time-path`.
//!
//! ## Commands
//!
//! | Flag                        | Description |
//! |-----------------------------|-------------|
//! | `--start <TICKET>`          | Start the timer for a ticket. |
//! | `--pause <TICKET>`          | Pause the ticket's timer. |
//! | `--resume <TICKET>`         | Resume a paused timer. |
//! | `--end <TICKET>`            | Stop the timer and print the worked time in JIRA format. |
//! | `--last`                    | Show the last finished job as JSON. |
//! | `--list-jobs`               | List started but unfinished jobs. |
//! | `--clean`                   | Delete the time file. |
//! | `--set-time-path <PATH>`    | Store the time file at PATH (must end in `.json`). |
//! | `--set-default-path`        | Store the time file in the current directory again. |
//! | `--get-time-path`           | Show where the time file is. |
//!
//! Set `RUST_LOG=debug` to trace file loads and saves on stderr.

mod config;
mod error;
mod job;
mod lifecycle;
mod store;

use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Local};
use clap::{ArgGroup, Parser};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::error::{JobError, Result};
use crate::job::time_slice_ms;

/// Track time spent on JIRA tickets
#[derive(Parser, Debug)]
#[command(name = "jiratrack")]
#[command(version, about = "Track time spent on JIRA tickets", long_about = None)]
#[command(group(ArgGroup::new("action").multiple(false)))]
struct Cli {
    /// Starts the job timer.
    #[arg(short = 's', long = "start", value_name = "TICKET_NUM", num_args = 0..=1, default_missing_value = "", group = "action")]
    start: Option<String>,

    /// Pause the job timer.
    #[arg(short = 'p', long = "pause", value_name = "TICKET_NUM", num_args = 0..=1, default_missing_value = "", group = "action")]
    pause: Option<String>,

    /// Resume the job timer.
    #[arg(short = 'r', long = "resume", value_name = "TICKET_NUM", num_args = 0..=1, default_missing_value = "", group = "action")]
    resume: Option<String>,

    /// Stops the job timer and returns the tracked work time in Jira format.
    #[arg(short = 'e', long = "end", visible_alias = "stop", value_name = "TICKET_NUM", num_args = 0..=1, default_missing_value = "", group = "action")]
    end: Option<String>,

    /// Shows the last finished job in JSON.
    #[arg(short = 'l', long = "last", group = "action")]
    last: bool,

    /// Returns a list of started, but not finished, jobs.
    #[arg(long = "list-jobs", group = "action")]
    list_jobs: bool,

    /// Deletes the file that --set-time-path is pointing to.
    #[arg(long = "clean", group = "action")]
    clean: bool,

    /// Sets the path that jiratrack will store your log data to.
    #[arg(long = "set-time-path", value_name = "PATH", num_args = 0..=1, default_missing_value = "", group = "action")]
    set_time_path: Option<String>,

    /// Sets the path that jiratrack should use to be the current working directory.
    #[arg(long = "set-default-path", group = "action")]
    set_default_path: bool,

    /// Returns the current path that jiratrack is using to log out to.
    #[arg(long = "get-time-path", group = "action")]
    get_time_path: bool,
}

/// The one thing a run does.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    Start(String),
    Pause(String),
    Resume(String),
    End(String),
    Last,
    ListJobs,
    Clean,
    SetTimePath(String),
    SetDefaultPath,
    GetTimePath,
}

impl Cli {
    fn action(self) -> Option<Action> {
        let action = if let Some(t) = self.start {
            Action::Start(t)
        } else if let Some(t) = self.pause {
            Action::Pause(t)
        } else if let Some(t) = self.resume {
            Action::Resume(t)
        } else if let Some(t) = self.end {
            Action::End(t)
        } else if self.last {
            Action::Last
        } else if self.list_jobs {
            Action::ListJobs
        } else if self.clean {
            Action::Clean
        } else if let Some(p) = self.set_time_path {
            Action::SetTimePath(p)
        } else if self.set_default_path {
            Action::SetDefaultPath
        } else if self.get_time_path {
            Action::GetTimePath
        } else {
            return None;
        };
        Some(action)
    }
}

/// Where a run reads its settings and resolves relative paths.
struct Context {
    config_file: PathBuf,
    cwd: PathBuf,
}

impl Context {
    fn time_file(&self) -> Result<PathBuf> {
        let config = Config::load(&self.config_file)?;
        Ok(config.store_path(&self.cwd))
    }
}

/// Rejects an empty ticket before anything touches the time file.
fn require_ticket<'a>(ticket: &'a str, action: &'static str) -> Result<&'a str> {
    let ticket = ticket.trim();
    if ticket.is_empty() {
        Err(JobError::MissingTicket { action })
    } else {
        Ok(ticket)
    }
}

/// Writes user-facing output; a closed pipe (e.g. `| head`) is not an error.
fn emit(out: &mut impl Write, text: &str) -> Result<()> {
    match writeln!(out, "{}", text).and_then(|_| out.flush()) {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(JobError::io("<stdout>", e)),
        _ => Ok(()),
    }
}

fn cmd_start(ticket: &str, time_file: &Path, now: DateTime<Local>, out: &mut impl Write) -> Result<()> {
    let ticket = require_ticket(ticket, "start")?;
    let started = lifecycle::start(time_file, ticket, now)?;
    if started.created_store {
        emit(out, &format!("{} doesn't exist. Will create one.", time_file.display()))?;
    }
    emit(out, &format!("Started timer at {}", started.job.start_time_slice()))
}

fn cmd_pause(ticket: &str, time_file: &Path, now: DateTime<Local>, out: &mut impl Write) -> Result<()> {
    let ticket = require_ticket(ticket, "pause")?;
    let job = lifecycle::pause(time_file, ticket, now)?;
    emit(out, &format!("Pausing timer at {}", time_slice_ms(job.latest_ms())))
}

fn cmd_resume(ticket: &str, time_file: &Path, now: DateTime<Local>, out: &mut impl Write) -> Result<()> {
    let ticket = require_ticket(ticket, "resume")?;
    let job = lifecycle::resume(time_file, ticket, now)?;
    emit(out, &format!("Resuming timer at {}", time_slice_ms(job.latest_ms())))
}

fn cmd_end(ticket: &str, time_file: &Path, now: DateTime<Local>, out: &mut impl Write) -> Result<()> {
    let ticket = require_ticket(ticket, "end")?;
    let job = lifecycle::end(time_file, ticket, now)?;
    emit(out, &format!("Ended timer at {}", job.end_time_slice()))?;
    emit(out, &format!("Jira format: {}", job.jira()))
}

/// Loads the time file for a read-only report; `None` (after telling the user) if there is none.
fn load_for_report(time_file: &Path, out: &mut impl Write) -> Result<Option<store::Jobs>> {
    match store::load(time_file) {
        Ok(jobs) => Ok(Some(jobs)),
        Err(JobError::NotFound { .. }) => {
            emit(out, "\nFile inaccessible... Are you sure you have stored data?")?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn cmd_last(time_file: &Path, out: &mut impl Write) -> Result<()> {
    let Some(jobs) = load_for_report(time_file, out)? else {
        return Ok(());
    };
    match lifecycle::last_finished(&jobs) {
        Some(job) => {
            let json = store::to_pretty_json(job).map_err(|source| JobError::Parse {
                path: time_file.to_path_buf(),
                source,
            })?;
            emit(out, "\nHere is the record of the last finished job:\n")?;
            emit(out, json.trim_end())
        }
        None => emit(out, "Unable to find the last ended job."),
    }
}

fn cmd_list_jobs(time_file: &Path, out: &mut impl Write) -> Result<()> {
    let Some(jobs) = load_for_report(time_file, out)? else {
        return Ok(());
    };
    let open = lifecycle::unfinished(&jobs);
    if open.is_empty() {
        return emit(out, "There are currently no unfinished jobs, good work!");
    }
    emit(out, "\nHere is a list of all currently stored unfinished jobs:\n")?;
    for (i, job) in open.iter().enumerate() {
        emit(out, &format!("{}. {}", i + 1, job.ticket()))?;
    }
    emit(out, "")
}

fn cmd_clean(time_file: &Path, out: &mut impl Write) -> Result<()> {
    store::remove(time_file)?;
    emit(out, &format!("Successfully deleted {}", time_file.display()))
}

fn cmd_set_time_path(path: &str, ctx: &Context, out: &mut impl Write) -> Result<()> {
    config::set_time_path(&ctx.config_file, path.trim(), &ctx.cwd)?;
    emit(out, "Path successfully changed.")
}

fn cmd_set_default_path(ctx: &Context, out: &mut impl Write) -> Result<()> {
    config::set_default_path(&ctx.config_file)?;
    emit(out, "The logging path has been changed to the current working directory.")
}

fn run(action: Action, ctx: &Context, now: DateTime<Local>, out: &mut impl Write) -> Result<()> {
    tracing::debug!(?action, config = %ctx.config_file.display(), "dispatching");
    match action {
        Action::Start(t) => cmd_start(&t, &ctx.time_file()?, now, out),
        Action::Pause(t) => cmd_pause(&t, &ctx.time_file()?, now, out),
        Action::Resume(t) => cmd_resume(&t, &ctx.time_file()?, now, out),
        Action::End(t) => cmd_end(&t, &ctx.time_file()?, now, out),
        Action::Last => cmd_last(&ctx.time_file()?, out),
        Action::ListJobs => cmd_list_jobs(&ctx.time_file()?, out),
        Action::Clean => cmd_clean(&ctx.time_file()?, out),
        Action::SetTimePath(p) => cmd_set_time_path(&p, ctx, out),
        Action::SetDefaultPath => cmd_set_default_path(ctx, out),
        Action::GetTimePath => emit(out, &format!("Logs will be saved to {}", ctx.time_file()?.display())),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let Some(action) = Cli::parse().action() else {
        println!("Use 'jiratrack --help' to see a list of commands.");
        return ExitCode::SUCCESS;
    };
    let cwd = match env::current_dir() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("cannot determine current directory: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let ctx = Context {
        config_file: config::config_file(),
        cwd,
    };
    let mut stdout = io::stdout().lock();
    match run(action, &ctx, Local::now(), &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, fatal = e.is_io_failure(), "command failed");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
