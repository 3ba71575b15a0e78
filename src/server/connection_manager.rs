use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use crate::broadcast::OutboundQueue;
use crate::metrics::ServerMetrics;
use crate::protocol::{Principal, RoomId, Seat, SessionId, UserId};

/// One live transport connection.
#[derive(Clone)]
pub(crate) struct SessionEntry {
    pub principal: Principal,
    pub room_id: Option<RoomId>,
    pub seat: Option<Seat>,
    pub connected_at: chrono::DateTime<chrono::Utc>,
    pub queue: Arc<OutboundQueue>,
}

#[derive(Debug, Error)]
#[error("user already has an active session")]
pub(crate) struct AlreadyConnectedError;

/// Session registry: exclusively owns sessions, indexed by session id and
/// by user id. Both indexes are updated under the user-id entry lock so a
/// live session is always discoverable both ways.
pub(crate) struct ConnectionManager {
    sessions: DashMap<SessionId, SessionEntry>,
    by_user: DashMap<UserId, SessionId>,
    metrics: Arc<ServerMetrics>,
}

impl ConnectionManager {
    pub fn new(metrics: Arc<ServerMetrics>) -> Self {
        Self {
            sessions: DashMap::new(),
            by_user: DashMap::new(),
            metrics,
        }
    }

    /// Register a session for a verified principal.
    ///
    /// A second concurrent session for the same user is rejected
    /// (last-writer-wins is deliberately not allowed). A stale index entry
    /// left behind by an already-removed session is replaced.
    pub fn attach(
        &self,
        principal: Principal,
        queue: Arc<OutboundQueue>,
    ) -> Result<SessionId, AlreadyConnectedError> {
        let session_id = uuid::Uuid::new_v4();
        let entry = SessionEntry {
            principal: principal.clone(),
            room_id: None,
            seat: None,
            connected_at: chrono::Utc::now(),
            queue,
        };

        // The session insert happens while the user-index entry is held, so
        // a concurrent attach for the same user observes both or neither.
        match self.by_user.entry(principal.user_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if self.sessions.contains_key(occupied.get()) {
                    return Err(AlreadyConnectedError);
                }
                // Stale mapping from a session that already closed.
                occupied.insert(session_id);
                self.sessions.insert(session_id, entry);
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(session_id);
                self.sessions.insert(session_id, entry);
            }
        }

        self.metrics.increment_active_sessions();
        Ok(session_id)
    }

    /// Remove a session and both index entries. Returns the removed entry,
    /// or `None` when it was already detached.
    pub fn detach(&self, session_id: &SessionId) -> Option<SessionEntry> {
        let (_, entry) = self.sessions.remove(session_id)?;
        self.by_user
            .remove_if(&entry.principal.user_id, |_, mapped| mapped == session_id);
        self.metrics.decrement_active_sessions();
        Some(entry)
    }

    pub fn lookup(&self, session_id: &SessionId) -> Option<SessionEntry> {
        self.sessions.get(session_id).map(|entry| entry.clone())
    }

    pub fn lookup_by_user(&self, user_id: &str) -> Option<SessionId> {
        self.by_user.get(user_id).map(|entry| *entry.value())
    }

    pub fn queue_of(&self, session_id: &SessionId) -> Option<Arc<OutboundQueue>> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.queue.clone())
    }

    /// Current (room, seat) held by a session.
    pub fn room_of(&self, session_id: &SessionId) -> Option<(RoomId, Seat)> {
        self.sessions
            .get(session_id)
            .and_then(|entry| entry.room_id.zip(entry.seat))
    }

    /// Record the single (room, seat) a session may hold.
    pub fn assign_room(&self, session_id: &SessionId, room_id: RoomId, seat: Seat) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.room_id = Some(room_id);
            entry.seat = Some(seat);
        }
    }

    pub fn clear_room(&self, session_id: &SessionId) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.room_id = None;
            entry.seat = None;
        }
    }

    pub fn all_session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::DEFAULT_QUEUE_DEPTH;

    fn principal(user: &str) -> Principal {
        Principal {
            user_id: user.to_string(),
            wallet_address: format!("0x{}", "a".repeat(40)),
        }
    }

    fn queue() -> Arc<OutboundQueue> {
        Arc::new(OutboundQueue::new(DEFAULT_QUEUE_DEPTH))
    }

    fn manager() -> ConnectionManager {
        ConnectionManager::new(Arc::new(ServerMetrics::new()))
    }

    #[test]
    fn attach_indexes_both_ways() {
        let manager = manager();
        let session_id = manager.attach(principal("userA"), queue()).unwrap();

        assert!(manager.lookup(&session_id).is_some());
        assert_eq!(manager.lookup_by_user("userA"), Some(session_id));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn second_session_for_same_user_is_rejected() {
        let manager = manager();
        let first = manager.attach(principal("userA"), queue()).unwrap();

        assert!(manager.attach(principal("userA"), queue()).is_err());
        // The original session is untouched: no last-writer-wins.
        assert_eq!(manager.lookup_by_user("userA"), Some(first));
    }

    #[test]
    fn reattach_allowed_after_detach() {
        let manager = manager();
        let first = manager.attach(principal("userA"), queue()).unwrap();
        assert!(manager.detach(&first).is_some());
        assert!(manager.detach(&first).is_none());

        let second = manager.attach(principal("userA"), queue()).unwrap();
        assert_eq!(manager.lookup_by_user("userA"), Some(second));
    }

    #[test]
    fn room_assignment_round_trips() {
        let manager = manager();
        let session_id = manager.attach(principal("userA"), queue()).unwrap();
        let room_id = uuid::Uuid::new_v4();

        manager.assign_room(&session_id, room_id, Seat::P1);
        assert_eq!(manager.room_of(&session_id), Some((room_id, Seat::P1)));

        manager.clear_room(&session_id);
        assert_eq!(manager.room_of(&session_id), None);
    }
}
