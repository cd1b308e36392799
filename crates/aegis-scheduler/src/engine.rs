use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::{Result, SchedulerError},
    schedule::compute_next_run,
    store::JobStore,
    types::{Job, JobStatus, Schedule},
};

/// In-memory job table backed by a [`JobStore`] JSON file, shared between the
/// [`SchedulerHandle`] (mutation from tool calls / HTTP) and the
/// [`SchedulerEngine`] (the polling tick loop).
struct JobTable {
    store: JobStore,
    jobs: Vec<Job>,
}

impl JobTable {
    fn open(path: &Path) -> Result<Self> {
        let store = JobStore::open(path)?;
        let jobs = store.load()?;
        Ok(Self { store, jobs })
    }

    fn persist(&self) -> Result<()> {
        self.store.save(&self.jobs)
    }
}

/// Shared handle for job management (list/add/remove) while the engine loop runs.
#[derive(Clone)]
pub struct SchedulerHandle {
    table: Arc<Mutex<JobTable>>,
}

impl SchedulerHandle {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            table: Arc::new(Mutex::new(JobTable::open(path)?)),
        })
    }

    pub fn add_job(&self, name: &str, schedule: Schedule, action: &str) -> Result<Job> {
        let mut table = self.table.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let next = compute_next_run(&schedule, now).map(|dt| dt.to_rfc3339());

        let job = Job {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            schedule,
            action: action.to_string(),
            status: JobStatus::Pending,
            last_run: None,
            next_run: next,
            run_count: 0,
            max_runs: None,
            created_at: now_str.clone(),
            updated_at: now_str,
        };

        table.jobs.push(job.clone());
        table.persist()?;
        info!(job_id = %job.id, %name, "job added via handle");
        Ok(job)
    }

    pub fn remove_job(&self, id: &str) -> Result<()> {
        let mut table = self.table.lock().unwrap();
        let before = table.jobs.len();
        table.jobs.retain(|j| j.id != id);
        if table.jobs.len() == before {
            return Err(SchedulerError::JobNotFound { id: id.to_string() });
        }
        table.persist()?;
        info!(job_id = %id, "job removed via handle");
        Ok(())
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>> {
        let table = self.table.lock().unwrap();
        let mut jobs = table.jobs.clone();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(jobs)
    }
}

/// Core scheduler: persists jobs to a JSON file and drives execution at ±1 s
/// precision.
pub struct SchedulerEngine {
    table: Arc<Mutex<JobTable>>,
    /// If set, fired jobs are sent here for delivery routing.
    fired_tx: Option<mpsc::Sender<Job>>,
}

impl SchedulerEngine {
    /// Create a new engine over the job file at `path`.
    ///
    /// Pass `Some(tx)` to receive a copy of every fired [`Job`] via mpsc.
    /// The sender is non-blocking (`try_send`) so the tick loop is never stalled.
    pub fn open(path: &Path, fired_tx: Option<mpsc::Sender<Job>>) -> Result<Self> {
        Ok(Self {
            table: Arc::new(Mutex::new(JobTable::open(path)?)),
            fired_tx,
        })
    }

    /// A [`SchedulerHandle`] sharing this engine's in-memory table, for tool
    /// calls and HTTP routes to mutate jobs without racing the tick loop.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            table: Arc::clone(&self.table),
        }
    }

    /// Main event loop. Polls every second until `shutdown` broadcasts `true`.
    ///
    /// On startup: past one-shot triggers still marked `Pending` are dropped
    /// per §4.9 ("drop past one-shot triggers" on rehydration) rather than
    /// marked `Missed` and fired late — a one-shot reminder that fires hours
    /// after the process was down is worse than silently skipped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("scheduler engine started");
        self.drop_stale_one_shots_on_startup();

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick() {
                        error!("scheduler tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    fn drop_stale_one_shots_on_startup(&self) {
        let mut table = self.table.lock().unwrap();
        let now = Utc::now();
        let before = table.jobs.len();
        table.jobs.retain(|j| {
            if !j.schedule.is_one_shot() || j.status != JobStatus::Pending {
                return true;
            }
            match &j.next_run {
                Some(next) => next
                    .parse::<chrono::DateTime<Utc>>()
                    .map(|t| t > now)
                    .unwrap_or(false),
                None => false,
            }
        });
        let dropped = before - table.jobs.len();
        if dropped > 0 {
            warn!(count = dropped, "dropped stale one-shot jobs on startup");
            let _ = table.persist();
        }
    }

    /// Process all jobs whose next_run has arrived.
    fn tick(&self) -> Result<()> {
        let mut table = self.table.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        let due_ids: Vec<String> = table
            .jobs
            .iter()
            .filter(|j| {
                j.status == JobStatus::Pending
                    && j.next_run
                        .as_deref()
                        .and_then(|s| s.parse::<chrono::DateTime<Utc>>().ok())
                        .is_some_and(|next| next <= now)
            })
            .map(|j| j.id.clone())
            .collect();

        for id in due_ids {
            // One-shot jobs self-delete before the notification send, to
            // avoid duplicate fires on restart (§4.9).
            let fired = {
                let job = table.jobs.iter_mut().find(|j| j.id == id).unwrap();
                job.run_count += 1;
                job.last_run = Some(now_str.clone());
                job.updated_at = now_str.clone();

                if job.schedule.is_one_shot() {
                    job.status = JobStatus::Completed;
                    job.next_run = None;
                } else {
                    job.next_run = compute_next_run(&job.schedule, now).map(|dt| dt.to_rfc3339());
                    if job.next_run.is_none() {
                        job.status = JobStatus::Completed;
                    }
                }

                info!(job_id = %job.id, name = %job.name, run = job.run_count, "firing job");
                job.clone()
            };

            if job_is_one_shot(&fired) {
                table.jobs.retain(|j| j.id != fired.id);
            }

            if let Some(ref tx) = self.fired_tx {
                if tx.try_send(fired).is_err() {
                    warn!(job_id = %id, "delivery channel full or closed — job dropped");
                }
            }
        }

        table.persist()
    }
}

fn job_is_one_shot(job: &Job) -> bool {
    job.schedule.is_one_shot()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::parse_trigger_spec;

    #[test]
    fn add_list_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let handle = SchedulerHandle::open(&dir.path().join("jobs.json")).unwrap();

        let schedule = parse_trigger_spec("in 5 minutes").unwrap();
        let job = handle.add_job("reminder", schedule, "{}").unwrap();
        assert_eq!(handle.list_jobs().unwrap().len(), 1);

        handle.remove_job(&job.id).unwrap();
        assert!(handle.list_jobs().unwrap().is_empty());
    }

    #[test]
    fn removing_unknown_job_errors() {
        let dir = tempfile::tempdir().unwrap();
        let handle = SchedulerHandle::open(&dir.path().join("jobs.json")).unwrap();
        assert!(handle.remove_job("nonexistent").is_err());
    }

    #[tokio::test]
    async fn one_shot_job_fires_and_self_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        let (tx, mut rx) = mpsc::channel(4);
        let engine = SchedulerEngine::open(&path, Some(tx)).unwrap();
        let handle = engine.handle();

        // Schedule a job one second in the past so the first tick fires it.
        let schedule = crate::schedule::Schedule::Once {
            at: Utc::now() - chrono::Duration::seconds(1),
        };
        handle.add_job("test", schedule, "{}").unwrap();

        engine.tick().unwrap();

        let fired = rx.try_recv().expect("job should have fired");
        assert_eq!(fired.name, "test");
        assert!(handle.list_jobs().unwrap().is_empty());
    }
}
