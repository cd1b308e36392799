//! Process-wide cancellation registry — `user-id -> {stop, abort}`.
//!
//! Replaces per-session `CancellationToken` plumbing with a single shared map
//! keyed on the user, so `/stop` and `/abort` reach whichever loop (top-level,
//! sub-agent, debate round) is currently running for that user without the
//! caller needing to hold a reference to it. Read sites check in between tool
//! batches, at sub-agent and debate round boundaries, and before each
//! streaming adapter call; `clear` happens once the reading loop has folded
//! the flag into its reply.

use dashmap::DashMap;

/// Cancellation severity requested for a user's in-flight loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelLevel {
    /// `/stop` — finish the current step, then end the turn gracefully.
    Stop,
    /// `/abort` — end immediately, discarding any partial tool results.
    Abort,
}

/// Shared `user-id -> CancelLevel` map. Cheap to clone (wraps an `Arc`
/// internally via `DashMap`'s own sharding); construct one instance per
/// process and hand out clones to every channel adapter and the loop itself.
#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    flags: DashMap<String, CancelLevel>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation at the given level for `user_id`. A later
    /// `Abort` overrides an earlier `Stop`; a later `Stop` does not downgrade
    /// a pending `Abort`.
    pub fn set(&self, user_id: &str, level: CancelLevel) {
        match self.flags.get(user_id).map(|v| *v) {
            Some(CancelLevel::Abort) if level == CancelLevel::Stop => {}
            _ => {
                self.flags.insert(user_id.to_string(), level);
            }
        }
    }

    /// Current cancellation state for `user_id`, if any is pending.
    pub fn check(&self, user_id: &str) -> Option<CancelLevel> {
        self.flags.get(user_id).map(|v| *v)
    }

    /// Clear a pending flag once the loop has integrated it into its reply.
    pub fn clear(&self, user_id: &str) {
        self.flags.remove(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_overrides_stop_but_not_vice_versa() {
        let reg = CancellationRegistry::new();
        reg.set("u1", CancelLevel::Abort);
        reg.set("u1", CancelLevel::Stop);
        assert_eq!(reg.check("u1"), Some(CancelLevel::Abort));
    }

    #[test]
    fn clear_removes_flag() {
        let reg = CancellationRegistry::new();
        reg.set("u1", CancelLevel::Stop);
        reg.clear("u1");
        assert_eq!(reg.check("u1"), None);
    }

    #[test]
    fn unset_user_has_no_flag() {
        let reg = CancellationRegistry::new();
        assert_eq!(reg.check("nobody"), None);
    }
}
