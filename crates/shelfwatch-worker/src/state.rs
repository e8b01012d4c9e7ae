//! Shared worker state surfaced on the control endpoints.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;

/// Per-loop switch and activity flags for `/status`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LoopStatus {
    pub enabled: bool,
    pub running: bool,
}

/// Process-wide worker state. Cheap to share; every field is independently
/// synchronized.
pub struct WorkerState {
    started_at: Instant,
    shutting_down: AtomicBool,
    schedulers_started: AtomicUsize,
    leader_lock_key: Mutex<Option<i64>>,
    loops: Mutex<BTreeMap<&'static str, LoopStatus>>,
    active_products: Mutex<BTreeSet<i64>>,
}

impl WorkerState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            shutting_down: AtomicBool::new(false),
            schedulers_started: AtomicUsize::new(0),
            leader_lock_key: Mutex::new(None),
            loops: Mutex::new(BTreeMap::new()),
            active_products: Mutex::new(BTreeSet::new()),
        }
    }

    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub fn set_leader_key(&self, key: i64) {
        *self.leader_lock_key.lock().expect("leader key lock") = Some(key);
    }

    pub fn clear_leader_key(&self) {
        *self.leader_lock_key.lock().expect("leader key lock") = None;
    }

    #[must_use]
    pub fn leader_held(&self) -> bool {
        self.leader_lock_key.lock().expect("leader key lock").is_some()
    }

    /// Every advisory lock this worker currently holds, by label.
    #[must_use]
    pub fn held_locks(&self) -> BTreeMap<String, i64> {
        let mut locks = BTreeMap::new();
        if let Some(key) = *self.leader_lock_key.lock().expect("leader key lock") {
            locks.insert("main_scheduler".to_string(), key);
        }
        for product_id in self.active_products.lock().expect("active set lock").iter() {
            locks.insert(
                format!("product:{product_id}"),
                shelfwatch_db::advisory_key(
                    shelfwatch_db::LockNamespace::ProductCheck,
                    *product_id,
                ),
            );
        }
        locks
    }

    pub fn register_loop(&self, name: &'static str, enabled: bool) {
        self.loops.lock().expect("loops lock").insert(
            name,
            LoopStatus {
                enabled,
                running: false,
            },
        );
    }

    pub fn set_loop_running(&self, name: &'static str, running: bool) {
        if let Some(status) = self.loops.lock().expect("loops lock").get_mut(name) {
            status.running = running;
        }
    }

    #[must_use]
    pub fn loop_statuses(&self) -> BTreeMap<&'static str, LoopStatus> {
        self.loops.lock().expect("loops lock").clone()
    }

    pub fn mark_scheduler_started(&self) {
        self.schedulers_started.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn schedulers_started(&self) -> usize {
        self.schedulers_started.load(Ordering::SeqCst)
    }

    pub fn job_started(&self, product_id: i64) {
        self.active_products
            .lock()
            .expect("active set lock")
            .insert(product_id);
    }

    pub fn job_finished(&self, product_id: i64) {
        self.active_products
            .lock()
            .expect("active set lock")
            .remove(&product_id);
    }

    #[must_use]
    pub fn active_products(&self) -> Vec<i64> {
        self.active_products
            .lock()
            .expect("active set lock")
            .iter()
            .copied()
            .collect()
    }

    /// Readiness: leader lock held, at least one scheduler started, not
    /// shutting down.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.leader_held() && self.schedulers_started() > 0 && !self.is_shutting_down()
    }
}

impl Default for WorkerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_not_ready() {
        let state = WorkerState::new();
        assert!(!state.ready());
        assert!(!state.is_shutting_down());
        assert!(state.active_products().is_empty());
    }

    #[test]
    fn readiness_requires_leader_and_a_scheduler() {
        let state = WorkerState::new();
        state.set_leader_key(0);
        assert!(!state.ready(), "no scheduler started yet");

        state.mark_scheduler_started();
        assert!(state.ready());

        state.begin_shutdown();
        assert!(!state.ready(), "shutdown flips readiness");
    }

    #[test]
    fn held_locks_cover_leader_and_active_products() {
        let state = WorkerState::new();
        state.set_leader_key(0);
        state.job_started(42);

        let locks = state.held_locks();
        assert_eq!(locks.get("main_scheduler"), Some(&0));
        assert!(locks.contains_key("product:42"));

        state.job_finished(42);
        assert!(!state.held_locks().contains_key("product:42"));
    }

    #[test]
    fn loop_flags_round_trip() {
        let state = WorkerState::new();
        state.register_loop("check", true);
        state.set_loop_running("check", true);

        let loops = state.loop_statuses();
        assert!(loops["check"].enabled);
        assert!(loops["check"].running);
    }
}
