use crate::assets::DraftedDisplay;
use crate::store::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;

// Bounded per subscriber; a viewer that falls this far behind is dropped.
const EVENT_CHANNEL_BUFFER: usize = 256;

pub type EventSender = mpsc::Sender<DraftEvent>;
pub type EventReceiver = mpsc::Receiver<DraftEvent>;

/// Everything a viewer's room can receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DraftEvent {
    CardsUpdated {
        cards: Vec<String>,
    },
    HeroUpdated {
        hero: String,
    },
    DraftedUpdated {
        drafted: Vec<DraftedDisplay>,
        manas: Vec<u8>,
    },
    DraftFinished,
}

impl DraftEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DraftEvent::CardsUpdated { .. } => "cards_updated",
            DraftEvent::HeroUpdated { .. } => "hero_updated",
            DraftEvent::DraftedUpdated { .. } => "drafted_updated",
            DraftEvent::DraftFinished => "draft_finished",
        }
    }

    /// The `data` half of the wire form; `{}` for events without a payload.
    pub fn payload(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(mut map)) => map
                .remove("data")
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            _ => serde_json::Value::Object(Default::default()),
        }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Event relay unavailable: {0}")]
    Unavailable(String),
}

/// Room-based publish/subscribe.
///
/// Ordering holds only for events published through the same instance for
/// the same room. An implementation relaying through an external bus may
/// reorder across processes.
pub trait MessageBus: Send + Sync + fmt::Debug {
    /// Delivers `event` to every current member of the room without
    /// waiting on any of them. Returns how many subscribers accepted it.
    fn publish(&self, session_id: &SessionId, event: DraftEvent) -> Result<usize, PublishError>;

    /// Joins the room. Leaving happens when the subscription is dropped.
    fn subscribe(&self, session_id: SessionId) -> EventSubscription;
}

/// A live membership in one room.
pub struct EventSubscription {
    session_id: SessionId,
    pub receiver: EventReceiver,
    on_drop: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl EventSubscription {
    pub fn new(
        session_id: SessionId,
        receiver: EventReceiver,
        on_drop: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            session_id,
            receiver,
            on_drop: Some(Box::new(on_drop)),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }
}

impl fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(on_drop) = self.on_drop.take() {
            on_drop();
        }
    }
}

/// Single-process [`MessageBus`].
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

#[derive(Debug, Default)]
struct EventBusInner {
    rooms: RwLock<HashMap<SessionId, Vec<(usize, EventSender)>>>,
    next_id: AtomicUsize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribe_raw(&self, session_id: SessionId) -> (usize, EventReceiver) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
        let id = self.inner.next_id.fetch_add(1, Ordering::AcqRel);
        let mut guard = self
            .inner
            .rooms
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.entry(session_id.clone()).or_default().push((id, tx));

        tracing::info!(
            session_id = %session_id,
            subscriber_id = id,
            "viewer joined room"
        );

        (id, rx)
    }

    pub fn unsubscribe(&self, session_id: &SessionId, subscriber_id: usize) {
        self.remove_subscribers(session_id, &[subscriber_id]);
    }

    pub fn subscriber_count(&self) -> usize {
        let guard = self
            .inner
            .rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard.values().map(|list| list.len()).sum()
    }

    pub fn room_size(&self, session_id: &SessionId) -> usize {
        let guard = self
            .inner
            .rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard.get(session_id).map_or(0, |list| list.len())
    }

    fn remove_subscribers(&self, session_id: &SessionId, ids: &[usize]) {
        let mut guard = self
            .inner
            .rooms
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = guard.get_mut(session_id) {
            list.retain(|(id, _)| !ids.contains(id));
            if list.is_empty() {
                guard.remove(session_id);
            }
        }
    }
}

impl MessageBus for EventBus {
    fn publish(&self, session_id: &SessionId, event: DraftEvent) -> Result<usize, PublishError> {
        tracing::debug!(
            session_id = %session_id,
            event = event.name(),
            "publishing draft event"
        );

        let members = {
            let guard = self
                .inner
                .rooms
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            guard.get(session_id).cloned()
        };

        let Some(members) = members else {
            tracing::debug!(session_id = %session_id, "no viewers in room");
            return Ok(0);
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, sender) in members {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id,
                        subscriber_id = id,
                        error = %e,
                        "dropping viewer that cannot accept events"
                    );
                    failed.push(id);
                }
            }
        }
        if !failed.is_empty() {
            self.remove_subscribers(session_id, &failed);
        }
        Ok(delivered)
    }

    fn subscribe(&self, session_id: SessionId) -> EventSubscription {
        let (subscriber_id, receiver) = self.subscribe_raw(session_id.clone());
        let bus = self.clone();
        let room = session_id.clone();
        EventSubscription::new(session_id, receiver, move || {
            bus.unsubscribe(&room, subscriber_id);
        })
    }
}
