//! `aegis-scheduler` — job scheduler backed by a single JSON file.
//!
//! # Overview
//!
//! Jobs are held in memory and persisted to a JSON file rewritten atomically
//! (`JobStore`, write-tmp-then-rename) on every mutation. [`engine::SchedulerEngine`]
//! polls the table every second and fires any job whose `next_run` has
//! arrived, updating state and computing the next scheduled time.
//!
//! # Schedule variants
//!
//! | Variant | Behaviour                                                      |
//! |---------|-----------------------------------------------------------------|
//! | `Once`  | Single fire at an absolute UTC instant, then self-delete         |
//! | `Cron`  | Classical five-field cron expression (`* , - /` all supported)   |

pub mod engine;
pub mod error;
pub mod schedule;
pub mod store;
pub mod types;

pub use engine::{SchedulerEngine, SchedulerHandle};
pub use error::{Result, SchedulerError};
pub use schedule::{compute_next_run, parse_trigger_spec, Schedule};
pub use types::{Job, JobStatus};
