use std::sync::{Arc, Mutex as StdMutex};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::protocol::{room_codes, Room, RoomId};

/// A live room plus its task handles. The `room` mutex is the per-room
/// serializer: every state mutation happens under it.
pub(crate) struct RoomHandle {
    pub room: Mutex<Room>,
    /// Creation instant, duplicated out of the mutex for lock-free
    /// oldest-first matchmaking.
    pub created_at: chrono::DateTime<chrono::Utc>,
    ticker: StdMutex<Option<CancellationToken>>,
    rematch_timer: StdMutex<Option<CancellationToken>>,
}

impl RoomHandle {
    fn new(room: Room) -> Self {
        Self {
            created_at: room.created_at,
            room: Mutex::new(room),
            ticker: StdMutex::new(None),
            rematch_timer: StdMutex::new(None),
        }
    }

    /// Install the ticker token, cancelling any stale one.
    pub fn set_ticker(&self, token: CancellationToken) {
        let previous = match self.ticker.lock() {
            Ok(mut guard) => guard.replace(token),
            Err(poisoned) => poisoned.into_inner().replace(token),
        };
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    pub fn cancel_ticker(&self) {
        let token = match self.ticker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(token) = token {
            token.cancel();
        }
    }

    pub fn set_rematch_timer(&self, token: CancellationToken) {
        let previous = match self.rematch_timer.lock() {
            Ok(mut guard) => guard.replace(token),
            Err(poisoned) => poisoned.into_inner().replace(token),
        };
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    pub fn cancel_rematch_timer(&self) {
        let token = match self.rematch_timer.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(token) = token {
            token.cancel();
        }
    }
}

/// Room registry: creates, indexes by id and by code, deletes on disposal.
/// Codes are unique among live rooms; uniqueness is enforced through the
/// code index's entry lock.
pub(crate) struct RoomRegistry {
    rooms: DashMap<RoomId, Arc<RoomHandle>>,
    by_code: DashMap<String, RoomId>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            by_code: DashMap::new(),
        }
    }

    /// Create a room with a freshly generated, unique code.
    pub fn create(&self, code_length: usize, match_duration_ms: u64) -> Arc<RoomHandle> {
        loop {
            let code = room_codes::generate_room_code_of_length(code_length);
            match self.by_code.entry(code.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => continue,
                dashmap::mapref::entry::Entry::Vacant(vacant) => {
                    let room = Room::new(code, match_duration_ms);
                    let room_id = room.id;
                    let handle = Arc::new(RoomHandle::new(room));
                    vacant.insert(room_id);
                    self.rooms.insert(room_id, handle.clone());
                    return handle;
                }
            }
        }
    }

    pub fn get(&self, room_id: &RoomId) -> Option<Arc<RoomHandle>> {
        self.rooms.get(room_id).map(|entry| entry.value().clone())
    }

    /// Look up a live room by its normalized code.
    pub fn find_by_code(&self, code: &str) -> Option<Arc<RoomHandle>> {
        let room_id = *self.by_code.get(code)?;
        self.get(&room_id)
    }

    /// Remove a room from both indexes. The code entry is only removed when
    /// it still points at this room (a new room may have recycled the code).
    pub fn remove(&self, room_id: &RoomId, code: &str) -> Option<Arc<RoomHandle>> {
        let removed = self.rooms.remove(room_id).map(|(_, handle)| handle);
        if removed.is_some() {
            self.by_code.remove_if(code, |_, mapped| mapped == room_id);
        }
        removed
    }

    /// All live rooms, oldest first (matchmaking prefers the oldest open room).
    pub fn snapshot(&self) -> Vec<Arc<RoomHandle>> {
        let mut handles: Vec<Arc<RoomHandle>> = self
            .rooms
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        handles.sort_by_key(|handle| handle.created_at);
        handles
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }
}
