//! `/stop` and `/abort` emergency stop — cancels all active pipelines via
//! the cooperative cancellation registry, kills PTY sessions, and removes
//! pending scheduler jobs.

use tracing::info;

use aegis_engine::CancelLevel;

use crate::app::AppState;

/// Execute the emergency stop sequence for a user and return a human-readable
/// report.
///
/// Steps:
/// 1. Set the user's cancellation flag (observed at the next loop-round
///    boundary, between tool batches, or before a streaming adapter call).
/// 2. Cancel all active pipeline operations (drain `active_operations`).
/// 3. Kill all PTY sessions.
/// 4. Remove all pending scheduler jobs.
pub async fn execute_stop(app: &AppState, user_id: &str, level: CancelLevel) -> String {
    let mut lines: Vec<String> = Vec::new();

    app.cancellation.set(user_id, level);
    lines.push(format!("- Cancellation flag set: `{level:?}`"));

    // 1. Cancel all active pipeline operations.
    let cancelled: Vec<String> = app
        .active_operations
        .iter()
        .map(|entry| {
            entry.value().cancel();
            entry.key().clone()
        })
        .collect();
    app.active_operations.clear();
    if cancelled.is_empty() {
        lines.push("- No active pipelines".to_string());
    } else {
        for key in &cancelled {
            lines.push(format!("- Pipeline cancelled: `{}`", key));
        }
    }

    // 2. Kill all PTY sessions.
    let mut pty_killed = 0usize;
    {
        let mut term = app.terminal.lock().await;
        let session_ids: Vec<_> = term.list().iter().map(|s| s.id.clone()).collect();
        for sid in session_ids {
            if term.kill(&sid).await.is_ok() {
                pty_killed += 1;
            }
        }
    }
    if pty_killed > 0 {
        lines.push(format!("- {} PTY session(s) killed", pty_killed));
    } else {
        lines.push("- No PTY sessions".to_string());
    }

    // 3. Remove all pending scheduler jobs.
    let mut jobs_removed = 0usize;
    if let Ok(jobs) = app.scheduler.list_jobs() {
        for job in &jobs {
            if app.scheduler.remove_job(&job.id).is_ok() {
                jobs_removed += 1;
            }
        }
    }
    if jobs_removed > 0 {
        lines.push(format!("- {} scheduler job(s) removed", jobs_removed));
    } else {
        lines.push("- No scheduler jobs".to_string());
    }

    let report = format!("**Emergency stop executed:**\n{}", lines.join("\n"));
    info!(
        user_id,
        level = ?level,
        "/stop executed: cancelled={} pty={} jobs={}",
        cancelled.len(),
        pty_killed,
        jobs_removed
    );
    report
}
