//! Chat delivery to battle viewers

use crate::error::Result;
use crate::event_log::ChatMessage;
use async_trait::async_trait;
use livearena_common::events::{ArenaEvent, EventBus};
use uuid::Uuid;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver an already-logged message to everyone watching `battle_id`
    async fn deliver(&self, battle_id: Uuid, message: &ChatMessage) -> Result<()>;
}

/// Delivers chat as `ChatPosted` events on the EventBus (and so over SSE)
#[derive(Clone)]
pub struct EventBusChatTransport {
    event_bus: EventBus,
}

impl EventBusChatTransport {
    pub fn new(event_bus: EventBus) -> Self {
        Self { event_bus }
    }
}

#[async_trait]
impl ChatTransport for EventBusChatTransport {
    async fn deliver(&self, battle_id: Uuid, message: &ChatMessage) -> Result<()> {
        self.event_bus.emit_lossy(ArenaEvent::ChatPosted {
            battle_id,
            sequence: message.sequence,
            sender_id: message.sender_id.clone(),
            text: message.text.clone(),
            timestamp: message.timestamp,
        });
        Ok(())
    }
}
