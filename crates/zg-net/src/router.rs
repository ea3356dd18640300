use crate::session::SocketManager;
use tracing::{debug, warn};
use zg_core::{stage_bytes, GuestExport, GuestInstance, HostEvent, SocketEvent};

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub delivered: u64,
    pub dropped: u64,
}

/// Delivers queued host events into guest entry points.
///
/// Routing happens in two steps so the embedder can release its borrow of
/// the session manager before calling into the guest: [`admit`] filters the
/// event against live sessions, [`deliver`] performs the guest calls.
///
/// Delivery failures are logged and counted, never reported to the guest.
///
/// [`admit`]: EventRouter::admit
/// [`deliver`]: EventRouter::deliver
#[derive(Debug, Default)]
pub struct EventRouter {
    stats: RouterStats,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    /// Decide whether `event` still has a recipient and update session
    /// state for it.
    ///
    /// Events of destroyed or unknown sessions are dropped. A terminal event
    /// removes its session, so anything the transport reports afterwards is
    /// dropped too.
    pub fn admit(&mut self, sessions: &mut SocketManager, event: HostEvent) -> Option<HostEvent> {
        if let HostEvent::Socket { session, event: socket_event } = &event {
            if !sessions.is_live(*session) {
                debug!(%session, ?socket_event, "dropping event for closed socket session");
                self.stats.dropped += 1;
                return None;
            }
            match socket_event {
                SocketEvent::Open => sessions.mark_open(*session),
                SocketEvent::Close | SocketEvent::Error => sessions.finish(*session),
                SocketEvent::Message { .. } => {}
            }
        }
        Some(event)
    }

    /// Call the guest entry point for an admitted event. Returns whether the
    /// guest received it.
    pub fn deliver<G>(&mut self, guest: &mut G, event: HostEvent) -> bool
    where
        G: GuestInstance + ?Sized,
    {
        let result = match &event {
            HostEvent::Socket { session, event } => {
                let id = session.get() as i32;
                match event {
                    SocketEvent::Open => guest.invoke(GuestExport::SocketOpen, &[id]),
                    SocketEvent::Close => guest.invoke(GuestExport::SocketClose, &[id]),
                    SocketEvent::Error => guest.invoke(GuestExport::SocketError, &[id]),
                    SocketEvent::Message { binary, payload } => {
                        match stage_bytes(guest, GuestExport::SocketAlloc, payload) {
                            Ok(ptr) => guest.invoke(
                                GuestExport::SocketMessage,
                                &[id, *binary as i32, ptr as i32, payload.len() as i32],
                            ),
                            Err(err) => Err(err),
                        }
                    }
                }
            }
            HostEvent::Input(input) => {
                let (export, args) = input.guest_call();
                guest.invoke(export, &args)
            }
        };

        match result {
            Ok(_) => {
                self.stats.delivered += 1;
                true
            }
            Err(err) => {
                warn!(?event, "host event not delivered: {}", err);
                self.stats.dropped += 1;
                false
            }
        }
    }

    /// Admit and deliver in one go. Without a live guest the event is
    /// dropped; session bookkeeping still happens.
    pub fn route<G>(
        &mut self,
        sessions: &mut SocketManager,
        guest: Option<&mut G>,
        event: HostEvent,
    ) -> bool
    where
        G: GuestInstance + ?Sized,
    {
        let Some(event) = self.admit(sessions, event) else {
            return false;
        };
        match guest {
            Some(guest) => self.deliver(guest, event),
            None => {
                debug!(?event, "no live guest, dropping host event");
                self.stats.dropped += 1;
                false
            }
        }
    }
}
