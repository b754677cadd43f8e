use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Valid,
    Revoked,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Valid => "valid",
            TicketStatus::Revoked => "revoked",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "valid" => Ok(TicketStatus::Valid),
            "revoked" => Ok(TicketStatus::Revoked),
            other => Err(AppError::Validation(format!(
                "unknown ticket status '{}'",
                other
            ))),
        }
    }
}

/// One purchased line: the ticket type name, the quantity, and the unit
/// price snapshotted at purchase time. Later price edits on the event never
/// reach an issued ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketLine {
    pub ticket_type: String,
    pub quantity: u32,
    pub price: Decimal,
}

impl TicketLine {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub buyer_name: String,
    pub buyer_email: Option<String>,
    pub buyer_phone: Option<String>,
    pub tickets_purchased: Vec<TicketLine>,
    pub total_amount: Decimal,
    pub status: TicketStatus,
    pub qr_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Purchase request as it arrives on the wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub event_id: Uuid,
    pub buyer_name: String,
    #[serde(default)]
    pub buyer_email: Option<String>,
    #[serde(default)]
    pub buyer_phone: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    pub tickets: Vec<PurchaseLineRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLineRequest {
    pub ticket_type: String,
    pub quantity: u32,
    /// Accepted for wire compatibility, never trusted: unit prices are
    /// snapshotted from the event at purchase time.
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// A requested line after validation, before inventory resolution.
#[derive(Debug, Clone)]
pub struct RequestedLine {
    pub ticket_type: String,
    pub quantity: u32,
}

/// A validated purchase order ready for the atomic reservation.
#[derive(Debug, Clone)]
pub struct PurchaseOrder {
    pub event_id: Uuid,
    pub buyer_name: String,
    pub buyer_email: Option<String>,
    pub buyer_phone: Option<String>,
    pub idempotency_key: Option<String>,
    pub lines: Vec<RequestedLine>,
}

impl PurchaseRequest {
    pub fn into_order(self) -> Result<PurchaseOrder, AppError> {
        let buyer_name = self.buyer_name.trim().to_owned();
        if buyer_name.is_empty() {
            return Err(AppError::Validation("buyerName must not be empty".into()));
        }
        if self.tickets.is_empty() {
            return Err(AppError::Validation(
                "at least one ticket line is required".into(),
            ));
        }

        let mut lines = Vec::with_capacity(self.tickets.len());
        for (i, line) in self.tickets.iter().enumerate() {
            if line.ticket_type.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "ticket line at index {} has an empty ticketType",
                    i
                )));
            }
            if line.quantity == 0 {
                return Err(AppError::Validation(format!(
                    "quantity for '{}' must be at least 1",
                    line.ticket_type
                )));
            }
            if self.tickets[..i]
                .iter()
                .any(|other| other.ticket_type == line.ticket_type)
            {
                return Err(AppError::Validation(format!(
                    "duplicate ticket line for '{}'",
                    line.ticket_type
                )));
            }
            lines.push(RequestedLine {
                ticket_type: line.ticket_type.clone(),
                quantity: line.quantity,
            });
        }

        Ok(PurchaseOrder {
            event_id: self.event_id,
            buyer_name,
            buyer_email: self.buyer_email,
            buyer_phone: self.buyer_phone,
            idempotency_key: self.idempotency_key,
            lines,
        })
    }
}

impl PurchaseOrder {
    /// Builds the ticket record for a completed reservation. The total is
    /// derived from the snapshotted lines and never recomputed afterwards.
    pub fn issue(&self, lines: Vec<TicketLine>) -> Ticket {
        let total_amount = lines.iter().map(TicketLine::line_total).sum();
        Ticket {
            id: Uuid::new_v4(),
            event_id: self.event_id,
            buyer_name: self.buyer_name.clone(),
            buyer_email: self.buyer_email.clone(),
            buyer_phone: self.buyer_phone.clone(),
            tickets_purchased: lines,
            total_amount,
            status: TicketStatus::Valid,
            qr_code: None,
            created_at: Utc::now(),
        }
    }
}
