//! Outbound event queues with priority-aware back-pressure.
//!
//! Every session owns one bounded [`OutboundQueue`]. Events are pushed
//! synchronously by whichever task decided them (so per-room decision order
//! is preserved) and drained by the session's socket writer.
//!
//! Overflow policy:
//! - critical events are never dropped: they append past capacity and force
//!   the queue to drain; crossing the hard limit marks the session
//!   overloaded, which detaches it once the backlog has flushed
//! - `timer_update` is coalesced: only the latest survives
//! - otherwise a full queue evicts its oldest strictly-lower-priority entry
//!   before the incoming event is dropped

use smallvec::SmallVec;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::protocol::{ServerEvent, SessionId};

/// Default per-session queue depth.
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

/// Recipient list sized for two-seat rooms.
pub type SessionIdList = SmallVec<[SessionId; 2]>;

/// Delivery tier of an event, used to decide what to drop on overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventPriority {
    /// Stats/heartbeat chatter; first to go.
    Low,
    /// Periodic state (timer updates, warnings); coalescible.
    Medium,
    /// Gameplay stream (positions, ball, seat changes); best-effort.
    High,
    /// Lifecycle decisions (ready, goals, start/end, rematch, errors);
    /// never dropped.
    Critical,
}

impl EventPriority {
    pub fn of(event: &ServerEvent) -> Self {
        match event {
            ServerEvent::Welcome { .. }
            | ServerEvent::RoomJoined(_)
            | ServerEvent::RoomFull { .. }
            | ServerEvent::PlayerReadyState { .. }
            | ServerEvent::GameStarted { .. }
            | ServerEvent::GoalScored { .. }
            | ServerEvent::TimeUp {}
            | ServerEvent::GameEnded(_)
            | ServerEvent::RematchRequested { .. }
            | ServerEvent::RematchConfirmed {}
            | ServerEvent::RematchDeclined { .. }
            | ServerEvent::RematchTimeout {}
            | ServerEvent::ServerShutdown {}
            | ServerEvent::Error { .. } => EventPriority::Critical,
            ServerEvent::PlayerPosition { .. }
            | ServerEvent::BallState { .. }
            | ServerEvent::PlayerJoined { .. }
            | ServerEvent::PlayerLeft { .. } => EventPriority::High,
            ServerEvent::TimerUpdate { .. } | ServerEvent::TimerWarning { .. } => {
                EventPriority::Medium
            }
            ServerEvent::Pong => EventPriority::Low,
        }
    }
}

/// Only the latest of these matters to a client.
fn is_coalescible(event: &ServerEvent) -> bool {
    matches!(event, ServerEvent::TimerUpdate { .. })
}

/// Result of offering an event to a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Replaced an older entry of the same kind.
    Coalesced,
    /// Overflow: the event (or an older lower-priority one) was discarded.
    Dropped,
}

/// What the socket writer gets from the queue next.
#[derive(Debug)]
pub enum Delivery {
    Event(Arc<ServerEvent>),
    /// Backlog flushed after the hard limit was crossed; the session must
    /// be detached with reason `overloaded`.
    Overloaded,
    Closed,
}

struct QueueInner {
    deque: VecDeque<Arc<ServerEvent>>,
    overloaded: bool,
    closed: bool,
    dropped: u64,
}

/// Bounded single-consumer event queue for one session.
pub struct OutboundQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
    capacity: usize,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(QueueInner {
                deque: VecDeque::with_capacity(capacity.min(64)),
                overloaded: false,
                closed: false,
                dropped: 0,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Criticals may exceed `capacity`; past this point the session is
    /// declared overloaded and will be detached after draining.
    fn hard_limit(&self) -> usize {
        self.capacity.saturating_mul(2)
    }

    /// Offer an event. Never blocks; per-room ordering is preserved because
    /// callers push while holding the room serializer.
    pub fn push(&self, event: Arc<ServerEvent>) -> PushOutcome {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if inner.closed {
            return PushOutcome::Dropped;
        }

        let priority = EventPriority::of(&event);

        if is_coalescible(&event) {
            if let Some(slot) = inner
                .deque
                .iter_mut()
                .find(|queued| is_coalescible(queued))
            {
                *slot = event;
                self.notify.notify_one();
                return PushOutcome::Coalesced;
            }
        }

        if inner.deque.len() < self.capacity {
            inner.deque.push_back(event);
            self.notify.notify_one();
            return PushOutcome::Queued;
        }

        if priority == EventPriority::Critical {
            inner.deque.push_back(event);
            if inner.deque.len() >= self.hard_limit() {
                inner.overloaded = true;
            }
            self.notify.notify_one();
            return PushOutcome::Queued;
        }

        // Full: sacrifice the oldest strictly-lower-priority entry first.
        if let Some(pos) = inner
            .deque
            .iter()
            .position(|queued| EventPriority::of(queued) < priority)
        {
            inner.deque.remove(pos);
            inner.deque.push_back(event);
            inner.dropped += 1;
            self.notify.notify_one();
            return PushOutcome::Dropped;
        }

        inner.dropped += 1;
        PushOutcome::Dropped
    }

    /// Await the next delivery. Single consumer: the session's writer task.
    pub async fn next(&self) -> Delivery {
        loop {
            {
                let mut inner = match self.inner.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if let Some(event) = inner.deque.pop_front() {
                    return Delivery::Event(event);
                }
                // Overload is only reported once the backlog has flushed so
                // critical events are never lost.
                if inner.overloaded {
                    return Delivery::Overloaded;
                }
                if inner.closed {
                    return Delivery::Closed;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Stop accepting events; the writer drains what is queued then stops.
    pub fn close(&self) {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.closed = true;
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.deque.len(),
            Err(poisoned) => poisoned.into_inner().deque.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events discarded so far (overflow policy).
    pub fn dropped(&self) -> u64 {
        match self.inner.lock() {
            Ok(guard) => guard.dropped,
            Err(poisoned) => poisoned.into_inner().dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ErrorCode, Score, Seat};

    fn position_event(x: f32) -> Arc<ServerEvent> {
        Arc::new(ServerEvent::PlayerPosition {
            seat: Seat::P1,
            x,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
        })
    }

    fn timer_event(ms: u64) -> Arc<ServerEvent> {
        Arc::new(ServerEvent::TimerUpdate {
            time_remaining_ms: ms,
        })
    }

    fn critical_event() -> Arc<ServerEvent> {
        Arc::new(ServerEvent::GoalScored {
            scorer: Seat::P1,
            score: Score { p1: 1, p2: 0 },
        })
    }

    #[tokio::test]
    async fn delivers_in_fifo_order() {
        let queue = OutboundQueue::new(8);
        queue.push(position_event(1.0));
        queue.push(position_event(2.0));

        for expected in [1.0f32, 2.0] {
            match queue.next().await {
                Delivery::Event(event) => match event.as_ref() {
                    ServerEvent::PlayerPosition { x, .. } => assert_eq!(*x, expected),
                    other => panic!("unexpected event {other:?}"),
                },
                other => panic!("unexpected delivery {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn timer_updates_coalesce_to_latest() {
        let queue = OutboundQueue::new(8);
        queue.push(timer_event(59_000));
        assert_eq!(queue.push(timer_event(58_000)), PushOutcome::Coalesced);
        assert_eq!(queue.len(), 1);

        match queue.next().await {
            Delivery::Event(event) => {
                assert!(matches!(
                    event.as_ref(),
                    ServerEvent::TimerUpdate {
                        time_remaining_ms: 58_000
                    }
                ));
            }
            other => panic!("unexpected delivery {other:?}"),
        }
    }

    #[test]
    fn overflow_evicts_lower_priority_first() {
        let queue = OutboundQueue::new(2);
        queue.push(Arc::new(ServerEvent::Pong));
        queue.push(position_event(1.0));

        // Queue full; the high-priority position evicts the low-priority pong.
        assert_eq!(queue.push(position_event(2.0)), PushOutcome::Dropped);
        assert_eq!(queue.len(), 2);

        // Full of high-priority entries: an incoming high is dropped instead.
        assert_eq!(queue.push(position_event(3.0)), PushOutcome::Dropped);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped(), 2);
    }

    #[tokio::test]
    async fn critical_events_survive_overflow() {
        let queue = OutboundQueue::new(2);
        queue.push(position_event(1.0));
        queue.push(position_event(2.0));

        assert_eq!(queue.push(critical_event()), PushOutcome::Queued);
        assert_eq!(queue.len(), 3);

        let mut saw_goal = false;
        for _ in 0..3 {
            if let Delivery::Event(event) = queue.next().await {
                saw_goal |= matches!(event.as_ref(), ServerEvent::GoalScored { .. });
            }
        }
        assert!(saw_goal);
    }

    #[tokio::test]
    async fn hard_limit_reports_overloaded_after_drain() {
        let queue = OutboundQueue::new(1);
        queue.push(critical_event());
        // Hard limit is 2x capacity; the second critical append crosses it.
        queue.push(critical_event());

        assert!(matches!(queue.next().await, Delivery::Event(_)));
        assert!(matches!(queue.next().await, Delivery::Event(_)));
        assert!(matches!(queue.next().await, Delivery::Overloaded));
    }

    #[tokio::test]
    async fn close_drains_then_stops() {
        let queue = OutboundQueue::new(4);
        queue.push(Arc::new(ServerEvent::error(ErrorCode::ServerShutdown)));
        queue.close();

        assert!(matches!(queue.next().await, Delivery::Event(_)));
        assert!(matches!(queue.next().await, Delivery::Closed));
        assert_eq!(queue.push(Arc::new(ServerEvent::Pong)), PushOutcome::Dropped);
    }
}
