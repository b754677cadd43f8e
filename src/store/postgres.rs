use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::event::{self, Event, TicketType, UpdateEventRequest};
use crate::models::ticket::{PurchaseOrder, Ticket, TicketStatus};
use crate::store::TicketingStore;
use crate::utils::error::AppError;

const EVENT_COLUMNS: &str = "id, title, banner_image, date, venue, created_at, updated_at";
const TICKET_COLUMNS: &str = "id, event_id, buyer_name, buyer_email, buyer_phone, lines, \
                              total_amount, status, qr_code, created_at";
const IDEMPOTENCY_INDEX: &str = "tickets_idempotency_key_idx";

/// PostgreSQL-backed store.
///
/// Purchases and admin writes on one event all begin by locking that event's
/// row (`SELECT ... FOR UPDATE`), which serializes the check-and-increment;
/// the surrounding transaction makes the reservation and the ticket insert
/// a single atomic unit. `DELETE` waits on the same row lock.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn event_from_row(row: &PgRow, ticket_types: Vec<TicketType>) -> Event {
    Event {
        id: row.get("id"),
        title: row.get("title"),
        banner_image: row.get("banner_image"),
        date: row.get("date"),
        venue: row.get("venue"),
        ticket_types,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn ticket_type_from_row(row: &PgRow) -> TicketType {
    TicketType {
        name: row.get("name"),
        price: row.get("price"),
        total_available: row.get::<i32, _>("total_available") as u32,
        sold: row.get::<i32, _>("sold") as u32,
    }
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket, AppError> {
    let lines: sqlx::types::Json<Vec<crate::models::ticket::TicketLine>> = row.try_get("lines")?;
    let status: String = row.get("status");
    Ok(Ticket {
        id: row.get("id"),
        event_id: row.get("event_id"),
        buyer_name: row.get("buyer_name"),
        buyer_email: row.get("buyer_email"),
        buyer_phone: row.get("buyer_phone"),
        tickets_purchased: lines.0,
        total_amount: row.get("total_amount"),
        status: TicketStatus::parse(&status)?,
        qr_code: row.get("qr_code"),
        created_at: row.get("created_at"),
    })
}

async fn fetch_ticket_types(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
) -> Result<Vec<TicketType>, AppError> {
    let rows = sqlx::query(
        "SELECT name, price, total_available, sold FROM ticket_types \
         WHERE event_id = $1 ORDER BY position",
    )
    .bind(event_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows.iter().map(ticket_type_from_row).collect())
}

async fn insert_ticket_types(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    ticket_types: &[TicketType],
) -> Result<(), AppError> {
    for (position, t) in ticket_types.iter().enumerate() {
        sqlx::query(
            "INSERT INTO ticket_types (event_id, position, name, price, total_available, sold) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event_id)
        .bind(position as i32)
        .bind(&t.name)
        .bind(t.price)
        .bind(t.total_available as i32)
        .bind(t.sold as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn lock_event(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
) -> Result<Event, AppError> {
    let row = sqlx::query(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
    ))
    .bind(event_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;
    let ticket_types = fetch_ticket_types(tx, event_id).await?;
    Ok(event_from_row(&row, ticket_types))
}

async fn fetch_ticket_by_key(
    tx: &mut Transaction<'_, Postgres>,
    key: &str,
) -> Result<Option<Ticket>, AppError> {
    let row = sqlx::query(&format!(
        "SELECT {TICKET_COLUMNS} FROM tickets WHERE idempotency_key = $1"
    ))
    .bind(key)
    .fetch_optional(&mut **tx)
    .await?;
    row.as_ref().map(ticket_from_row).transpose()
}

#[async_trait]
impl TicketingStore for PgStore {
    async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        let event_rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        let type_rows = sqlx::query(
            "SELECT event_id, name, price, total_available, sold FROM ticket_types \
             ORDER BY event_id, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut types_by_event: HashMap<Uuid, Vec<TicketType>> = HashMap::new();
        for row in &type_rows {
            types_by_event
                .entry(row.get("event_id"))
                .or_default()
                .push(ticket_type_from_row(row));
        }

        let mut events = Vec::with_capacity(event_rows.len());
        for row in &event_rows {
            let id: Uuid = row.get("id");
            events.push(event_from_row(
                row,
                types_by_event.remove(&id).unwrap_or_default(),
            ));
        }
        Ok(events)
    }

    async fn get_event(&self, id: Uuid) -> Result<Event, AppError> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", id)))?;
        let type_rows = sqlx::query(
            "SELECT name, price, total_available, sold FROM ticket_types \
             WHERE event_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(event_from_row(
            &row,
            type_rows.iter().map(ticket_type_from_row).collect(),
        ))
    }

    async fn create_event(&self, event: Event) -> Result<Event, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO events (id, title, banner_image, date, venue, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.banner_image)
        .bind(event.date)
        .bind(&event.venue)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await?;
        insert_ticket_types(&mut tx, event.id, &event.ticket_types).await?;
        tx.commit().await?;
        Ok(event)
    }

    async fn update_event(&self, id: Uuid, patch: UpdateEventRequest) -> Result<Event, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut event = lock_event(&mut tx, id).await?;
        event::apply_update(&mut event, patch)?;

        sqlx::query(
            "UPDATE events SET title = $2, banner_image = $3, date = $4, venue = $5, \
             updated_at = $6 WHERE id = $1",
        )
        .bind(id)
        .bind(&event.title)
        .bind(&event.banner_image)
        .bind(event.date)
        .bind(&event.venue)
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM ticket_types WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_ticket_types(&mut tx, id, &event.ticket_types).await?;

        tx.commit().await?;
        Ok(event)
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Event {} not found", id)));
        }
        Ok(())
    }

    async fn commit_purchase(&self, order: &PurchaseOrder) -> Result<Ticket, AppError> {
        let mut tx = self.pool.begin().await?;

        if let Some(key) = order.idempotency_key.as_deref() {
            if let Some(existing) = fetch_ticket_by_key(&mut tx, key).await? {
                return Ok(existing);
            }
        }

        let mut event = lock_event(&mut tx, order.event_id).await?;
        let lines = event::reserve_lines(&mut event, &order.lines)?;

        for line in &lines {
            sqlx::query(
                "UPDATE ticket_types SET sold = sold + $3 \
                 WHERE event_id = $1 AND name = $2",
            )
            .bind(order.event_id)
            .bind(&line.ticket_type)
            .bind(line.quantity as i32)
            .execute(&mut *tx)
            .await?;
        }

        let ticket = order.issue(lines);
        let inserted = sqlx::query(
            "INSERT INTO tickets (id, event_id, buyer_name, buyer_email, buyer_phone, lines, \
             total_amount, status, qr_code, idempotency_key, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(ticket.id)
        .bind(ticket.event_id)
        .bind(&ticket.buyer_name)
        .bind(&ticket.buyer_email)
        .bind(&ticket.buyer_phone)
        .bind(sqlx::types::Json(&ticket.tickets_purchased))
        .bind(ticket.total_amount)
        .bind(ticket.status.as_str())
        .bind(&ticket.qr_code)
        .bind(&order.idempotency_key)
        .bind(ticket.created_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {
                tx.commit().await?;
                Ok(ticket)
            }
            // A concurrent request with the same idempotency key won the
            // race; dropping the transaction rolls our reservation back and
            // the winner's ticket is returned instead.
            Err(sqlx::Error::Database(db)) if db.constraint() == Some(IDEMPOTENCY_INDEX) => {
                drop(tx);
                let key = order.idempotency_key.as_deref().unwrap_or_default();
                let row = sqlx::query(&format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets WHERE idempotency_key = $1"
                ))
                .bind(key)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(AppError::Storage(sqlx::Error::RowNotFound))?;
                ticket_from_row(&row)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn attach_qr(&self, ticket_id: Uuid, qr_code: &str) -> Result<Ticket, AppError> {
        let result = sqlx::query("UPDATE tickets SET qr_code = $2 WHERE id = $1")
            .bind(ticket_id)
            .bind(qr_code)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Ticket {} not found",
                ticket_id
            )));
        }
        self.get_ticket(ticket_id).await
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Ticket, AppError> {
        let row = sqlx::query(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {} not found", id)))?;
        ticket_from_row(&row)
    }
}
