//! Flat-file persistence for scheduled jobs — a single JSON file rewritten
//! atomically on every mutation (write to a `.tmp` sibling, then rename).

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SchedulerError};
use crate::types::Job;

pub struct JobStore {
    path: PathBuf,
}

impl JobStore {
    /// Open (or create) the job file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            write_atomic(path, &Vec::<Job>::new())?;
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn load(&self) -> Result<Vec<Job>> {
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw)
            .map_err(|e| SchedulerError::InvalidSchedule(format!("corrupt job store: {e}")))
    }

    pub fn save(&self, jobs: &[Job]) -> Result<()> {
        write_atomic(&self.path, jobs)
    }
}

fn write_atomic(path: &Path, jobs: &[Job]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let body = serde_json::to_string_pretty(jobs)
        .map_err(|e| SchedulerError::InvalidSchedule(format!("serialize job store: {e}")))?;
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Schedule;
    use crate::types::JobStatus;
    use chrono::Utc;

    fn sample_job(id: &str) -> Job {
        Job {
            id: id.to_string(),
            name: "test".to_string(),
            schedule: Schedule::Once { at: Utc::now() },
            action: "{}".to_string(),
            status: JobStatus::Pending,
            last_run: None,
            next_run: None,
            run_count: 0,
            max_runs: None,
            created_at: Utc::now().to_rfc3339(),
            updated_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        let store = JobStore::open(&path).unwrap();
        assert!(store.load().unwrap().is_empty());

        store.save(&[sample_job("a"), sample_job("b")]).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "a");
    }

    #[test]
    fn reopening_an_existing_file_preserves_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        let store = JobStore::open(&path).unwrap();
        store.save(&[sample_job("x")]).unwrap();

        let reopened = JobStore::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap().len(), 1);
    }
}
