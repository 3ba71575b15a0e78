use std::sync::Arc;

use super::room_registry::RoomHandle;
use super::MatchServer;
use crate::protocol::{RoomStatus, ServerEvent};
use crate::store::MatchStatus;

impl MatchServer {
    /// One logical clock per playing room. The task advances the match
    /// timer at a fixed step, announces whole-second crossings and warning
    /// thresholds, and drives the time-up finish. It is cancellable within
    /// one tick and stops by itself the moment the room leaves `Playing`,
    /// so a cancelled room never receives a stale tick.
    pub(super) fn spawn_ticker(self: &Arc<Self>, handle: Arc<RoomHandle>) {
        let token = self.child_token();
        handle.set_ticker(token.clone());

        let server = Arc::clone(self);
        let dt = server.config.tick;
        let dt_ms = dt.as_millis() as u64;

        tokio::spawn(async move {
            // First tick fires one full step after start; the clock never
            // loses time to task startup.
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + dt, dt);

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let plan = {
                    let mut room = handle.room.lock().await;
                    if room.status != RoomStatus::Playing {
                        break;
                    }

                    let outcome =
                        room.tick(dt_ms, &server.config.timer_warning_thresholds_ms);

                    if let Some(time_remaining_ms) = outcome.timer_update {
                        server.broadcast_to_room(
                            &room,
                            Arc::new(ServerEvent::TimerUpdate { time_remaining_ms }),
                            None,
                        );
                    }
                    for threshold in outcome.warnings {
                        server.broadcast_to_room(
                            &room,
                            Arc::new(ServerEvent::TimerWarning { threshold }),
                            None,
                        );
                    }

                    if outcome.time_up {
                        server.broadcast_to_room(&room, Arc::new(ServerEvent::TimeUp {}), None);
                        Some(server.finish_locked(&handle, &mut room, None, MatchStatus::Finished))
                    } else {
                        None
                    }
                };

                if let Some(plan) = plan {
                    server.persist_finish(plan).await;
                    break;
                }
            }
        });
    }
}
