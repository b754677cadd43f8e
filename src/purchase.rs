use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::models::ticket::{PurchaseRequest, Ticket};
use crate::qr;
use crate::store::TicketingStore;
use crate::utils::error::AppError;

/// Runs the purchase flow: validate the request, atomically reserve
/// inventory and persist the ticket, then issue the QR credential.
///
/// The credential step is deliberately non-fatal: once the ticket is
/// durable, a QR or patch failure degrades the response (ticket without
/// `qrCode`) instead of losing the sale.
pub struct PurchaseService {
    store: Arc<dyn TicketingStore>,
}

impl PurchaseService {
    pub fn new(store: Arc<dyn TicketingStore>) -> Self {
        Self { store }
    }

    pub async fn purchase(&self, request: PurchaseRequest) -> Result<Ticket, AppError> {
        let order = request.into_order()?;
        let ticket = self.store.commit_purchase(&order).await?;

        // An idempotent replay already carries its credential.
        if ticket.qr_code.is_some() {
            return Ok(ticket);
        }

        let data_url = match qr::data_url(ticket.id) {
            Ok(url) => url,
            Err(e) => {
                warn!(ticket_id = %ticket.id, error = %e, "QR generation failed, ticket issued without credential");
                return Ok(ticket);
            }
        };

        match self.attach_with_retry(ticket.id, &data_url).await {
            Ok(patched) => Ok(patched),
            Err(e) => {
                warn!(ticket_id = %ticket.id, error = %e, "QR attach failed, ticket issued without credential");
                Ok(ticket)
            }
        }
    }

    async fn attach_with_retry(&self, ticket_id: Uuid, qr_code: &str) -> Result<Ticket, AppError> {
        match self.store.attach_qr(ticket_id, qr_code).await {
            Ok(ticket) => Ok(ticket),
            Err(AppError::Storage(_)) => self.store.attach_qr(ticket_id, qr_code).await,
            Err(e) => Err(e),
        }
    }

    pub async fn get_ticket(&self, id: Uuid) -> Result<Ticket, AppError> {
        self.store.get_ticket(id).await
    }
}
