//! Scheduled-job service — persistent timed dispatch back into the agent.

pub mod service;
pub mod types;

pub use service::{CronService, OnJobFn};
pub use types::{
    parse_cron_expr, CronJob, CronPayload, CronSchedule, CronStore, JobStatus, ScheduleKind,
};
