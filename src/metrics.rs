//! Server metrics: lock-free counters sampled by the `/metrics` endpoint.

use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Atomic counters for server activity. Cheap to bump from any task.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    active_sessions: AtomicI64,
    sessions_attached: AtomicU64,
    sessions_rejected: AtomicU64,
    active_rooms: AtomicI64,
    rooms_created: AtomicU64,
    rooms_disposed: AtomicU64,
    matches_started: AtomicU64,
    matches_finished: AtomicU64,
    goals_scored: AtomicU64,
    rematches_agreed: AtomicU64,
    anti_cheat_drops: AtomicU64,
    events_dropped: AtomicU64,
    sessions_overloaded: AtomicU64,
}

/// Point-in-time copy of the counters, serialized on `/metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub active_sessions: i64,
    pub sessions_attached: u64,
    pub sessions_rejected: u64,
    pub active_rooms: i64,
    pub rooms_created: u64,
    pub rooms_disposed: u64,
    pub matches_started: u64,
    pub matches_finished: u64,
    pub goals_scored: u64,
    pub rematches_agreed: u64,
    pub anti_cheat_drops: u64,
    pub events_dropped: u64,
    pub sessions_overloaded: u64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_active_sessions(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
        self.sessions_attached.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_sessions(&self) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn increment_sessions_rejected(&self) {
        self.sessions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_created(&self) {
        self.active_rooms.fetch_add(1, Ordering::Relaxed);
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_disposed(&self) {
        self.active_rooms.fetch_sub(1, Ordering::Relaxed);
        self.rooms_disposed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_matches_started(&self) {
        self.matches_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_matches_finished(&self) {
        self.matches_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_goals_scored(&self) {
        self.goals_scored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rematches_agreed(&self) {
        self.rematches_agreed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_anti_cheat_drops(&self) {
        self.anti_cheat_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_events_dropped(&self, count: u64) {
        if count > 0 {
            self.events_dropped.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn increment_sessions_overloaded(&self) {
        self.sessions_overloaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            sessions_attached: self.sessions_attached.load(Ordering::Relaxed),
            sessions_rejected: self.sessions_rejected.load(Ordering::Relaxed),
            active_rooms: self.active_rooms.load(Ordering::Relaxed),
            rooms_created: self.rooms_created.load(Ordering::Relaxed),
            rooms_disposed: self.rooms_disposed.load(Ordering::Relaxed),
            matches_started: self.matches_started.load(Ordering::Relaxed),
            matches_finished: self.matches_finished.load(Ordering::Relaxed),
            goals_scored: self.goals_scored.load(Ordering::Relaxed),
            rematches_agreed: self.rematches_agreed.load(Ordering::Relaxed),
            anti_cheat_drops: self.anti_cheat_drops.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            sessions_overloaded: self.sessions_overloaded.load(Ordering::Relaxed),
        }
    }
}
