//! Cron service — custom async scheduler with job persistence.
//!
//! Architecture:
//! - Jobs stored in `~/.relaybot/cron/jobs.json` (atomic rewrite)
//! - Timer sleeps until the nearest `next_run_at_ms`, then fires due jobs
//!   one at a time per job — the same job never overlaps itself
//! - Job execution invokes a callback (typically `agent.process_direct()`)
//! - Results optionally delivered to a channel via the message bus
//!
//! Load-time policy: `every`/`cron` schedules get a fresh `next_run_at_ms`
//! relative to now; one-shot `at` jobs whose time passed while the process
//! was down are **skipped** — disabled without firing, stamped
//! `last_status: skipped`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};

use relaybot_core::bus::queue::MessageBus;
use relaybot_core::bus::types::OutboundMessage;
use relaybot_core::utils::atomic_write;

use crate::types::{compute_next_run_from, CronJob, CronStore, JobStatus, ScheduleKind};

// ─────────────────────────────────────────────
// Job callback type
// ─────────────────────────────────────────────

/// Callback invoked when a job fires.
///
/// Receives the job and returns the agent's reply text. In the server this
/// wraps `agent.process_direct()`.
pub type OnJobFn = Arc<
    dyn Fn(CronJob) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<String>> + Send>>
        + Send
        + Sync,
>;

// ─────────────────────────────────────────────
// CronService
// ─────────────────────────────────────────────

/// Cron scheduler — manages jobs, persistence, and timed execution.
pub struct CronService {
    /// Path to the jobs JSON file.
    store_path: PathBuf,
    /// In-memory job store.
    store: Arc<Mutex<CronStore>>,
    /// Message bus for outbound delivery.
    bus: Arc<MessageBus>,
    /// Callback for job execution.
    on_job: Arc<Mutex<Option<OnJobFn>>>,
    /// Shutdown signal.
    shutdown: Arc<Notify>,
    /// Re-arm signal (when jobs are added/modified).
    rearm: Arc<Notify>,
}

impl CronService {
    /// Create a new cron service.
    ///
    /// If `store_path` is `None`, defaults to `~/.relaybot/cron/jobs.json`.
    pub fn new(bus: Arc<MessageBus>, store_path: Option<PathBuf>) -> Self {
        let path = store_path.unwrap_or_else(|| {
            relaybot_core::utils::get_data_path()
                .join("cron")
                .join("jobs.json")
        });

        Self {
            store_path: path,
            store: Arc::new(Mutex::new(CronStore::new())),
            bus,
            on_job: Arc::new(Mutex::new(None)),
            shutdown: Arc::new(Notify::new()),
            rearm: Arc::new(Notify::new()),
        }
    }

    /// Set the on-job callback.
    pub async fn set_on_job(&self, callback: OnJobFn) {
        let mut on_job = self.on_job.lock().await;
        *on_job = Some(callback);
    }

    // ─────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────

    /// Load the store from disk and normalize schedules relative to now.
    pub async fn load(&self) -> anyhow::Result<()> {
        if !self.store_path.exists() {
            debug!(path = %self.store_path.display(), "no cron store file, starting empty");
            return Ok(());
        }

        let data = tokio::fs::read_to_string(&self.store_path).await?;
        let mut loaded: CronStore = serde_json::from_str(&data)
            .map_err(|e| anyhow::anyhow!("failed to parse cron store: {}", e))?;

        // Recompute schedules: interval/cron jobs anchor to now; one-shot
        // jobs that expired while we were down are skipped, not fired.
        let now_ms = Utc::now().timestamp_millis();
        for job in loaded.jobs.iter_mut() {
            if !job.enabled {
                continue;
            }
            match job.schedule.kind {
                ScheduleKind::Every | ScheduleKind::Cron => {
                    job.state.next_run_at_ms = compute_next_run_from(&job.schedule, now_ms);
                }
                ScheduleKind::At => {
                    let at = job.schedule.at_ms.unwrap_or(0);
                    if at <= now_ms {
                        info!(id = %job.id, name = %job.name, "skipping missed one-shot job");
                        job.enabled = false;
                        job.state.next_run_at_ms = None;
                        job.state.last_status = Some(JobStatus::Skipped);
                    } else {
                        job.state.next_run_at_ms = Some(at);
                    }
                }
            }
        }

        {
            let mut store = self.store.lock().await;
            *store = loaded;
            info!(
                path = %self.store_path.display(),
                jobs = store.jobs.len(),
                "loaded cron store"
            );
        }
        self.save().await?;
        Ok(())
    }

    /// Save the store to disk (temp-file + rename).
    pub async fn save(&self) -> anyhow::Result<()> {
        let json = {
            let store = self.store.lock().await;
            serde_json::to_string_pretty(&*store)?
        };
        atomic_write(&self.store_path, &json)?;
        debug!(path = %self.store_path.display(), "saved cron store");
        Ok(())
    }

    // ─────────────────────────────────────────
    // Job management
    // ─────────────────────────────────────────

    /// Add a job. Computes the initial next run time and saves.
    pub async fn add_job(&self, mut job: CronJob) -> anyhow::Result<String> {
        let now_ms = Utc::now().timestamp_millis();
        job.state.next_run_at_ms = compute_next_run_from(&job.schedule, now_ms);

        let id = job.id.clone();
        {
            let mut store = self.store.lock().await;
            store.add(job);
        }
        self.save().await?;
        self.rearm.notify_one();
        info!(id = %id, "added cron job");
        Ok(id)
    }

    /// Remove a job by ID.
    pub async fn remove_job(&self, id: &str) -> anyhow::Result<bool> {
        let removed = {
            let mut store = self.store.lock().await;
            store.remove(id)
        };
        if removed {
            self.save().await?;
            self.rearm.notify_one();
            info!(id = %id, "removed cron job");
        }
        Ok(removed)
    }

    /// Enable or disable a job.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> anyhow::Result<bool> {
        let found = {
            let mut store = self.store.lock().await;
            if let Some(job) = store.find_mut(id) {
                job.enabled = enabled;
                job.updated_at_ms = Utc::now().timestamp_millis();
                if enabled {
                    let now = Utc::now().timestamp_millis();
                    job.state.next_run_at_ms = compute_next_run_from(&job.schedule, now);
                }
                true
            } else {
                false
            }
        };
        if found {
            self.save().await?;
            self.rearm.notify_one();
        }
        Ok(found)
    }

    /// List all jobs (snapshot).
    pub async fn list_jobs(&self) -> Vec<CronJob> {
        let store = self.store.lock().await;
        store.jobs.clone()
    }

    /// Get a single job by ID.
    pub async fn get_job(&self, id: &str) -> Option<CronJob> {
        let store = self.store.lock().await;
        store.find(id).cloned()
    }

    // ─────────────────────────────────────────
    // Timer loop
    // ─────────────────────────────────────────

    /// Start the scheduler loop.
    ///
    /// Loads the store, then repeats:
    /// 1. Find nearest `next_run_at_ms`
    /// 2. Sleep until that time (or shutdown/rearm signal)
    /// 3. Execute all due jobs
    pub async fn start(&self) -> anyhow::Result<()> {
        if let Err(e) = self.load().await {
            warn!(error = %e, "failed to load cron store, starting empty");
        }

        info!("cron service started");

        loop {
            let sleep_ms = {
                let store = self.store.lock().await;
                Self::next_wake_ms(&store)
            };

            let sleep_duration = if let Some(ms) = sleep_ms {
                let delay = (ms - Utc::now().timestamp_millis()).max(0) as u64;
                std::time::Duration::from_millis(delay)
            } else {
                // No scheduled jobs — rearm will wake us
                std::time::Duration::from_secs(3600)
            };

            debug!(sleep_ms = sleep_duration.as_millis() as u64, "cron timer armed");

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.execute_due_jobs().await;
                }
                _ = self.rearm.notified() => {
                    debug!("cron timer re-armed (job added/modified)");
                }
                _ = self.shutdown.notified() => {
                    info!("cron service shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// Stop the scheduler.
    pub fn stop(&self) {
        info!("stopping cron service");
        self.shutdown.notify_waiters();
    }

    /// Find the nearest next_run_at_ms across all enabled jobs.
    fn next_wake_ms(store: &CronStore) -> Option<i64> {
        store
            .jobs
            .iter()
            .filter(|j| j.enabled)
            .filter_map(|j| j.state.next_run_at_ms)
            .min()
    }

    /// Execute all due jobs, one at a time per job id.
    async fn execute_due_jobs(&self) {
        let due_ids: Vec<String> = {
            let store = self.store.lock().await;
            store.due_jobs().iter().map(|j| j.id.clone()).collect()
        };

        if due_ids.is_empty() {
            return;
        }

        debug!(count = due_ids.len(), "executing due cron jobs");

        for id in &due_ids {
            self.execute_job(id).await;
        }
    }

    /// Execute a single job by ID (also the manual-fire entry point).
    pub async fn execute_job(&self, id: &str) {
        let job = {
            let store = self.store.lock().await;
            store.find(id).cloned()
        };

        let job = match job {
            Some(j) => j,
            None => {
                warn!(id = %id, "cron job not found for execution");
                return;
            }
        };

        info!(id = %job.id, name = %job.name, "executing cron job");

        let result = {
            let on_job = self.on_job.lock().await;
            if let Some(ref callback) = *on_job {
                Some(callback(job.clone()).await)
            } else {
                warn!(id = %id, "no on_job callback set, skipping execution");
                None
            }
        };

        let now_ms = Utc::now().timestamp_millis();
        let mut should_delete = false;

        {
            let mut store = self.store.lock().await;
            if let Some(j) = store.find_mut(id) {
                j.state.last_run_at_ms = Some(now_ms);

                match &result {
                    Some(Ok(response)) => {
                        j.state.last_status = Some(JobStatus::Ok);
                        j.state.last_error = None;

                        if j.payload.deliver {
                            if let (Some(channel), Some(to)) =
                                (j.payload.channel.as_ref(), j.payload.to.as_ref())
                            {
                                let outbound =
                                    OutboundMessage::new(channel.clone(), to.clone(), response.clone());
                                if let Err(e) = self.bus.publish_outbound(outbound) {
                                    error!(error = %e, "failed to deliver cron response");
                                }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        j.state.last_status = Some(JobStatus::Error);
                        j.state.last_error = Some(e.to_string());
                        error!(id = %id, name = %j.name, error = %e, "cron job failed");
                    }
                    None => {
                        j.state.last_status = Some(JobStatus::Skipped);
                    }
                }

                // One-shot jobs retire after firing; recurring jobs advance
                if j.schedule.kind == ScheduleKind::At && j.delete_after_run {
                    should_delete = true;
                } else if j.schedule.kind == ScheduleKind::At {
                    j.enabled = false;
                    j.state.next_run_at_ms = None;
                } else {
                    j.state.next_run_at_ms = compute_next_run_from(&j.schedule, now_ms);
                }

                j.updated_at_ms = now_ms;
            }

            if should_delete {
                store.remove(id);
            }
        }

        if let Err(e) = self.save().await {
            error!(error = %e, "failed to save cron store after job execution");
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
