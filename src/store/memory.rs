use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::models::event::{self, Event, UpdateEventRequest};
use crate::models::ticket::{PurchaseOrder, Ticket};
use crate::store::TicketingStore;
use crate::utils::error::AppError;

type EventSlot = Arc<Mutex<Event>>;

/// In-memory store for development and tests.
///
/// Each event lives behind its own async mutex; that mutex is the exclusion
/// scope for the purchase check-and-increment and for admin writes, so
/// purchases against different events proceed in parallel. Lock order is
/// events map, then event slot, then tickets — the map guard is dropped
/// before a slot is awaited.
#[derive(Default)]
pub struct MemoryStore {
    events: RwLock<Vec<(Uuid, EventSlot)>>,
    tickets: RwLock<HashMap<Uuid, Ticket>>,
    issued_keys: RwLock<HashMap<String, Uuid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, id: Uuid) -> Result<EventSlot, AppError> {
        let events = self.events.read().await;
        events
            .iter()
            .find(|(event_id, _)| *event_id == id)
            .map(|(_, slot)| Arc::clone(slot))
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", id)))
    }

    async fn replay_for_key(&self, key: Option<&str>) -> Option<Ticket> {
        let key = key?;
        let ticket_id = *self.issued_keys.read().await.get(key)?;
        self.tickets.read().await.get(&ticket_id).cloned()
    }
}

#[async_trait]
impl TicketingStore for MemoryStore {
    async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        let slots: Vec<EventSlot> = {
            let events = self.events.read().await;
            events.iter().map(|(_, slot)| Arc::clone(slot)).collect()
        };
        let mut listed = Vec::with_capacity(slots.len());
        for slot in slots {
            listed.push(slot.lock().await.clone());
        }
        Ok(listed)
    }

    async fn get_event(&self, id: Uuid) -> Result<Event, AppError> {
        let slot = self.slot(id).await?;
        let event = slot.lock().await;
        Ok(event.clone())
    }

    async fn create_event(&self, event: Event) -> Result<Event, AppError> {
        let mut events = self.events.write().await;
        events.push((event.id, Arc::new(Mutex::new(event.clone()))));
        Ok(event)
    }

    async fn update_event(&self, id: Uuid, patch: UpdateEventRequest) -> Result<Event, AppError> {
        let slot = self.slot(id).await?;
        let mut event = slot.lock().await;
        event::apply_update(&mut event, patch)?;
        Ok(event.clone())
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), AppError> {
        let mut events = self.events.write().await;
        let index = events
            .iter()
            .position(|(event_id, _)| *event_id == id)
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", id)))?;
        let (_, slot) = events.remove(index);
        // Wait out an in-flight purchase on this event before finishing.
        let _guard = slot.lock().await;
        Ok(())
    }

    async fn commit_purchase(&self, order: &PurchaseOrder) -> Result<Ticket, AppError> {
        if let Some(existing) = self.replay_for_key(order.idempotency_key.as_deref()).await {
            return Ok(existing);
        }

        let slot = self.slot(order.event_id).await?;
        let mut event = slot.lock().await;

        // Re-check under the event's lock so a concurrent retry of the same
        // request cannot reserve twice.
        if let Some(existing) = self.replay_for_key(order.idempotency_key.as_deref()).await {
            return Ok(existing);
        }

        let lines = event::reserve_lines(&mut event, &order.lines)?;
        let ticket = order.issue(lines);

        self.tickets
            .write()
            .await
            .insert(ticket.id, ticket.clone());
        if let Some(key) = &order.idempotency_key {
            self.issued_keys
                .write()
                .await
                .insert(key.clone(), ticket.id);
        }
        Ok(ticket)
    }

    async fn attach_qr(&self, ticket_id: Uuid, qr_code: &str) -> Result<Ticket, AppError> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| AppError::NotFound(format!("Ticket {} not found", ticket_id)))?;
        ticket.qr_code = Some(qr_code.to_owned());
        Ok(ticket.clone())
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Ticket, AppError> {
        self.tickets
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Ticket {} not found", id)))
    }
}
