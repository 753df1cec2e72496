//! Schedule tool — the LLM-facing interface to the cron service.
//!
//! Lets the model create, list, enable, and remove scheduled jobs. New jobs
//! deliver their reply to the conversation that created them: the agent
//! loop keeps the tool's context pointed at the current `(channel,
//! chat_id)` pair.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeZone;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use relaybot_cron::{CronJob, CronPayload, CronSchedule, CronService, ScheduleKind};

use super::base::{optional_bool, optional_i64, optional_string, require_string, Tool};

// ─────────────────────────────────────────────
// ScheduleTool
// ─────────────────────────────────────────────

/// Tool for managing scheduled jobs from inside a conversation.
pub struct ScheduleTool {
    service: Arc<CronService>,
    /// Delivery target for newly created jobs.
    context: Mutex<(String, String)>,
}

impl ScheduleTool {
    pub fn new(service: Arc<CronService>) -> Self {
        Self {
            service,
            context: Mutex::new(("cli".into(), "direct".into())),
        }
    }

    async fn add(&self, params: &HashMap<String, Value>) -> anyhow::Result<String> {
        let name = require_string(params, "name")?;
        let message = require_string(params, "message")?;

        let schedule = if let Some(secs) = optional_i64(params, "every_seconds") {
            if secs <= 0 {
                anyhow::bail!("every_seconds must be positive");
            }
            CronSchedule::every(secs * 1000)
        } else if let Some(expr) = optional_string(params, "cron") {
            relaybot_cron::parse_cron_expr(&expr)
                .map_err(|e| anyhow::anyhow!("Invalid cron expression '{}': {}", expr, e))?;
            CronSchedule::cron(expr)
        } else if let Some(at) = optional_string(params, "at") {
            let ts_ms = parse_local_datetime(&at)?;
            CronSchedule::at(ts_ms)
        } else {
            anyhow::bail!("Specify one of: every_seconds, cron, or at");
        };

        let (channel, chat_id) = {
            let ctx = self.context.lock().await;
            ctx.clone()
        };

        let payload = CronPayload {
            message,
            deliver: true,
            channel: Some(channel),
            to: Some(chat_id),
        };

        let job = CronJob::new(name.clone(), schedule, payload);
        let id = self.service.add_job(job).await?;
        Ok(format!("Scheduled job '{name}' (id: {id})"))
    }

    async fn list(&self) -> String {
        let jobs = self.service.list_jobs().await;
        if jobs.is_empty() {
            return "No scheduled jobs.".to_string();
        }

        let mut lines = Vec::new();
        for job in jobs {
            let schedule = match job.schedule.kind {
                ScheduleKind::Every => {
                    let secs = job.schedule.every_ms.unwrap_or(0) / 1000;
                    format!("every {secs}s")
                }
                ScheduleKind::Cron => job.schedule.expr.clone().unwrap_or_default(),
                ScheduleKind::At => "one-time".to_string(),
            };
            let status = if job.enabled { "enabled" } else { "disabled" };
            lines.push(format!(
                "{} — {} ({schedule}, {status})",
                job.id, job.name
            ));
        }
        lines.join("\n")
    }

    async fn remove(&self, params: &HashMap<String, Value>) -> anyhow::Result<String> {
        let id = require_string(params, "job_id")?;
        if self.service.remove_job(&id).await? {
            Ok(format!("Removed job {id}"))
        } else {
            Ok(format!("Job {id} not found"))
        }
    }

    async fn enable(&self, params: &HashMap<String, Value>) -> anyhow::Result<String> {
        let id = require_string(params, "job_id")?;
        let enabled = !optional_bool(params, "disable");
        if self.service.set_enabled(&id, enabled).await? {
            Ok(format!(
                "{} job {id}",
                if enabled { "Enabled" } else { "Disabled" }
            ))
        } else {
            Ok(format!("Job {id} not found"))
        }
    }
}

/// Parse a local ISO-8601 datetime into epoch milliseconds.
fn parse_local_datetime(s: &str) -> anyhow::Result<i64> {
    let dt = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|e| {
            anyhow::anyhow!("Invalid datetime '{s}': {e} (expected ISO 8601, e.g. 2026-03-01T09:00:00)")
        })?;
    match chrono::Local.from_local_datetime(&dt) {
        chrono::LocalResult::Single(aware) => Ok(aware.timestamp_millis()),
        _ => anyhow::bail!("Ambiguous or invalid local time: {s}"),
    }
}

#[async_trait]
impl Tool for ScheduleTool {
    fn name(&self) -> &str {
        "cron"
    }

    fn description(&self) -> &str {
        "Manage scheduled jobs. Actions: 'add' (requires name, message, and one of \
         every_seconds/cron/at), 'list', 'remove' (requires job_id), 'enable' \
         (requires job_id, optional disable=true). Replies from scheduled jobs are \
         delivered to this conversation."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "description": "Operation to perform",
                    "enum": ["add", "list", "remove", "enable"]
                },
                "name": {
                    "type": "string",
                    "description": "Job name (for 'add')"
                },
                "message": {
                    "type": "string",
                    "description": "Prompt sent to the agent when the job fires (for 'add')"
                },
                "every_seconds": {
                    "type": "integer",
                    "description": "Interval schedule in seconds (for 'add')"
                },
                "cron": {
                    "type": "string",
                    "description": "Cron expression in the 5-field form, e.g. '0 9 * * *'; \
                                    a leading seconds field is also accepted (for 'add')"
                },
                "at": {
                    "type": "string",
                    "description": "One-shot ISO 8601 local datetime (for 'add')"
                },
                "job_id": {
                    "type": "string",
                    "description": "Job identifier (for 'remove'/'enable')"
                },
                "disable": {
                    "type": "boolean",
                    "description": "With action=enable, disable the job instead"
                }
            },
            "required": ["action"]
        })
    }

    async fn set_context(&self, channel: &str, chat_id: &str) {
        let mut ctx = self.context.lock().await;
        *ctx = (channel.to_string(), chat_id.to_string());
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let action = require_string(&params, "action")?;
        match action.as_str() {
            "add" => self.add(&params).await,
            "list" => Ok(self.list().await),
            "remove" => self.remove(&params).await,
            "enable" => self.enable(&params).await,
            other => Ok(format!(
                "Error: Unknown action '{other}'. Supported: add, list, remove, enable"
            )),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
