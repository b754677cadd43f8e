use async_trait::async_trait;
use uuid::Uuid;

use crate::models::event::{Event, UpdateEventRequest};
use crate::models::ticket::{PurchaseOrder, Ticket};
use crate::utils::error::AppError;

pub mod memory;
pub mod postgres;

/// Persistence boundary for the event catalog and the ticket store.
///
/// `commit_purchase` carries the concurrency contract: implementations must
/// serialize the inventory check-and-increment per event (purchases against
/// different events stay independent) and persist the reservation together
/// with the ticket as one atomic unit. Admin writes to an event serialize
/// against purchases on that event through the same scope.
#[async_trait]
pub trait TicketingStore: Send + Sync {
    async fn list_events(&self) -> Result<Vec<Event>, AppError>;

    async fn get_event(&self, id: Uuid) -> Result<Event, AppError>;

    async fn create_event(&self, event: Event) -> Result<Event, AppError>;

    async fn update_event(&self, id: Uuid, patch: UpdateEventRequest) -> Result<Event, AppError>;

    /// Removes the event. Issued tickets survive as historical records.
    async fn delete_event(&self, id: Uuid) -> Result<(), AppError>;

    /// Atomically reserves the order's lines against the event's inventory
    /// and persists the resulting ticket. A replayed idempotency key returns
    /// the already-issued ticket without touching inventory.
    async fn commit_purchase(&self, order: &PurchaseOrder) -> Result<Ticket, AppError>;

    /// Patches the QR credential onto an already-persisted ticket.
    async fn attach_qr(&self, ticket_id: Uuid, qr_code: &str) -> Result<Ticket, AppError>;

    async fn get_ticket(&self, id: Uuid) -> Result<Ticket, AppError>;
}
