use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ticket::{PurchaseLineRequest, PurchaseRequest};
use crate::utils::error::AppError;

/// The client-held pending cart: one event plus its selected ticket lines.
///
/// The server never stores this. Clients persist the JSON form in durable
/// local storage so the cart survives page reloads, and clear it only after
/// a purchase is confirmed. This type pins down that contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub event_id: Uuid,
    pub items: Vec<CartItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub ticket_type: String,
    pub quantity: u32,
}

impl Cart {
    pub fn new(event_id: Uuid) -> Self {
        Self {
            event_id,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sets the quantity for a ticket type, replacing any existing line.
    /// A quantity of zero removes the line.
    pub fn set_item(&mut self, ticket_type: &str, quantity: u32) {
        self.items.retain(|item| item.ticket_type != ticket_type);
        if quantity > 0 {
            self.items.push(CartItem {
                ticket_type: ticket_type.to_owned(),
                quantity,
            });
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Finishes the cart into the purchase request the server accepts.
    pub fn into_purchase_request(
        self,
        buyer_name: impl Into<String>,
        buyer_email: Option<String>,
        buyer_phone: Option<String>,
    ) -> PurchaseRequest {
        PurchaseRequest {
            event_id: self.event_id,
            buyer_name: buyer_name.into(),
            buyer_email,
            buyer_phone,
            idempotency_key: Some(Uuid::new_v4().to_string()),
            tickets: self
                .items
                .into_iter()
                .map(|item| PurchaseLineRequest {
                    ticket_type: item.ticket_type,
                    quantity: item.quantity,
                    price: None,
                })
                .collect(),
        }
    }

    /// Serialized form for durable client-local storage.
    pub fn to_json(&self) -> Result<String, AppError> {
        serde_json::to_string(self).map_err(|e| AppError::Validation(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::Validation(format!("unreadable cart: {}", e)))
    }
}
