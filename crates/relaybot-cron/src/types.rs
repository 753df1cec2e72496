//! Cron type system — schedule, payload, job state, and the persistent store.
//!
//! All types derive `Serialize`/`Deserialize` with `camelCase` keys for the
//! on-disk JSON document.

use chrono::Utc;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// CronSchedule
// ─────────────────────────────────────────────

/// Schedule variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    /// One-shot: fire at a specific timestamp.
    At,
    /// Interval: fire every N milliseconds.
    Every,
    /// Cron expression — conventional 5-field form, or 6/7-field with
    /// seconds.
    Cron,
}

/// When a cron job fires.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronSchedule {
    pub kind: ScheduleKind,
    /// One-shot timestamp (Unix epoch milliseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_ms: Option<i64>,
    /// Interval in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub every_ms: Option<i64>,
    /// Cron expression (e.g. `"0 9 * * *"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
}

impl CronSchedule {
    /// Create a one-shot schedule.
    pub fn at(at_ms: i64) -> Self {
        Self {
            kind: ScheduleKind::At,
            at_ms: Some(at_ms),
            every_ms: None,
            expr: None,
        }
    }

    /// Create an interval schedule.
    pub fn every(every_ms: i64) -> Self {
        Self {
            kind: ScheduleKind::Every,
            at_ms: None,
            every_ms: Some(every_ms),
            expr: None,
        }
    }

    /// Create a cron-expression schedule.
    pub fn cron(expr: impl Into<String>) -> Self {
        Self {
            kind: ScheduleKind::Cron,
            at_ms: None,
            every_ms: None,
            expr: Some(expr.into()),
        }
    }
}

impl Default for CronSchedule {
    fn default() -> Self {
        Self::every(60_000) // 1 minute
    }
}

// ─────────────────────────────────────────────
// CronPayload
// ─────────────────────────────────────────────

/// What a cron job does when it fires.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronPayload {
    /// Prompt text sent to the agent.
    #[serde(default)]
    pub message: String,
    /// Whether to deliver the agent's response to a channel.
    #[serde(default)]
    pub deliver: bool,
    /// Target channel name for delivery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Recipient chat identifier within the channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

// ─────────────────────────────────────────────
// CronJobState
// ─────────────────────────────────────────────

/// Run status of a job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Ok,
    Error,
    Skipped,
}

/// Mutable state for a cron job.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobState {
    /// Next scheduled run (Unix epoch ms). Always strictly in the future
    /// after a successful `every`/`cron` fire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run_at_ms: Option<i64>,
    /// Last run time (Unix epoch ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at_ms: Option<i64>,
    /// Status of the last run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status: Option<JobStatus>,
    /// Error message from the last failed run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

// ─────────────────────────────────────────────
// CronJob
// ─────────────────────────────────────────────

/// A scheduled job.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJob {
    /// Unique identifier (UUID v4, first 8 chars).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether the job is active.
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub schedule: CronSchedule,
    pub payload: CronPayload,
    #[serde(default)]
    pub state: CronJobState,
    /// Creation timestamp (Unix epoch ms).
    #[serde(default)]
    pub created_at_ms: i64,
    /// Last update timestamp (Unix epoch ms).
    #[serde(default)]
    pub updated_at_ms: i64,
    /// Whether to delete the job after a single run.
    #[serde(default)]
    pub delete_after_run: bool,
}

fn default_true() -> bool {
    true
}

impl CronJob {
    /// Create a new job with a generated ID.
    pub fn new(name: impl Into<String>, schedule: CronSchedule, payload: CronPayload) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
            name: name.into(),
            enabled: true,
            schedule,
            payload,
            state: CronJobState::default(),
            created_at_ms: now,
            updated_at_ms: now,
            delete_after_run: false,
        }
    }

    /// Whether this job is due to run (now >= next_run_at_ms).
    pub fn is_due(&self) -> bool {
        if !self.enabled {
            return false;
        }
        match self.state.next_run_at_ms {
            Some(next) => Utc::now().timestamp_millis() >= next,
            None => false,
        }
    }

    /// Session key for this job's conversation history.
    pub fn session_key(&self) -> String {
        format!("cron:{}", self.id)
    }
}

/// Parse a cron expression, accepting the conventional five-field form
/// (minute hour day-of-month month day-of-week).
///
/// The `cron` crate wants a leading seconds field; five-field input gets
/// `0 ` prepended so `"0 9 * * *"` fires at 09:00. Six- and seven-field
/// expressions pass through unchanged.
pub fn parse_cron_expr(expr: &str) -> Result<cron::Schedule, cron::error::Error> {
    if expr.split_whitespace().count() == 5 {
        format!("0 {expr}").parse()
    } else {
        expr.parse()
    }
}

/// Compute the next run time from a given timestamp (for testability).
pub fn compute_next_run_from(schedule: &CronSchedule, now_ms: i64) -> Option<i64> {
    match schedule.kind {
        ScheduleKind::At => schedule.at_ms,
        ScheduleKind::Every => {
            let interval = schedule.every_ms.unwrap_or(60_000);
            Some(now_ms + interval)
        }
        ScheduleKind::Cron => {
            let expr = schedule.expr.as_deref()?;
            let parsed = parse_cron_expr(expr).ok()?;
            let next = parsed.upcoming(Utc).next()?;
            Some(next.timestamp_millis())
        }
    }
}

// ─────────────────────────────────────────────
// CronStore
// ─────────────────────────────────────────────

/// Persistent store for cron jobs — one JSON document on disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronStore {
    /// Store format version.
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub jobs: Vec<CronJob>,
}

fn default_version() -> u32 {
    1
}

impl Default for CronStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CronStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            version: 1,
            jobs: Vec::new(),
        }
    }

    /// Find a job by ID.
    pub fn find(&self, id: &str) -> Option<&CronJob> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Find a mutable job by ID.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut CronJob> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    /// Add a job.
    pub fn add(&mut self, job: CronJob) {
        self.jobs.push(job);
    }

    /// Remove a job by ID. Returns whether it was found.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.jobs.len();
        self.jobs.retain(|j| j.id != id);
        self.jobs.len() < before
    }

    /// Get all due jobs.
    pub fn due_jobs(&self) -> Vec<&CronJob> {
        self.jobs.iter().filter(|j| j.is_due()).collect()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
