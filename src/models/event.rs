use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ticket::{RequestedLine, TicketLine};
use crate::utils::error::AppError;

/// A named, priced, capacity-limited inventory line within an event.
///
/// `sold <= total_available` holds at all times; the purchase path is the
/// only writer of `sold`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketType {
    pub name: String,
    pub price: Decimal,
    pub total_available: u32,
    pub sold: u32,
}

impl TicketType {
    pub fn remaining(&self) -> u32 {
        self.total_available - self.sold
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub banner_image: Option<String>,
    pub date: DateTime<Utc>,
    pub venue: String,
    pub ticket_types: Vec<TicketType>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ticket type as supplied on the admin API. `sold` is not accepted from
/// clients; new types start at zero and edits carry the stored count forward.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketTypeInput {
    pub name: String,
    pub price: Decimal,
    pub total_available: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub banner_image: Option<String>,
    pub date: DateTime<Utc>,
    pub venue: String,
    #[serde(default)]
    pub ticket_types: Vec<TicketTypeInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub banner_image: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub ticket_types: Option<Vec<TicketTypeInput>>,
}

impl CreateEventRequest {
    pub fn into_event(self) -> Result<Event, AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".into()));
        }
        if self.venue.trim().is_empty() {
            return Err(AppError::Validation("venue must not be empty".into()));
        }
        validate_ticket_type_inputs(&self.ticket_types)?;

        let now = Utc::now();
        Ok(Event {
            id: Uuid::new_v4(),
            title: self.title,
            banner_image: self.banner_image,
            date: self.date,
            venue: self.venue,
            ticket_types: self
                .ticket_types
                .into_iter()
                .map(|t| TicketType {
                    name: t.name,
                    price: t.price,
                    total_available: t.total_available,
                    sold: 0,
                })
                .collect(),
            created_at: now,
            updated_at: now,
        })
    }
}

fn validate_ticket_type_inputs(inputs: &[TicketTypeInput]) -> Result<(), AppError> {
    for (i, input) in inputs.iter().enumerate() {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "ticket type at index {} has an empty name",
                i
            )));
        }
        if input.price.is_sign_negative() {
            return Err(AppError::Validation(format!(
                "ticket type '{}' has a negative price",
                input.name
            )));
        }
        if inputs[..i].iter().any(|other| other.name == input.name) {
            return Err(AppError::Validation(format!(
                "duplicate ticket type name '{}'",
                input.name
            )));
        }
    }
    Ok(())
}

/// Applies a partial admin update to an event in place.
///
/// Replacing the ticket type list carries each surviving type's `sold` count
/// forward and rejects edits that would leave `sold > total_available` or
/// drop a type that already has sales.
pub fn apply_update(event: &mut Event, patch: UpdateEventRequest) -> Result<(), AppError> {
    if let Some(title) = patch.title {
        if title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".into()));
        }
        event.title = title;
    }
    if let Some(venue) = patch.venue {
        if venue.trim().is_empty() {
            return Err(AppError::Validation("venue must not be empty".into()));
        }
        event.venue = venue;
    }
    if let Some(date) = patch.date {
        event.date = date;
    }
    if let Some(banner) = patch.banner_image {
        event.banner_image = Some(banner);
    }
    if let Some(inputs) = patch.ticket_types {
        validate_ticket_type_inputs(&inputs)?;

        for existing in &event.ticket_types {
            let survives = inputs.iter().any(|input| input.name == existing.name);
            if existing.sold > 0 && !survives {
                return Err(AppError::Validation(format!(
                    "cannot remove ticket type '{}': {} already sold",
                    existing.name, existing.sold
                )));
            }
        }

        let mut replacement = Vec::with_capacity(inputs.len());
        for input in inputs {
            let carried_sold = event
                .ticket_types
                .iter()
                .find(|t| t.name == input.name)
                .map(|t| t.sold)
                .unwrap_or(0);
            if input.total_available < carried_sold {
                return Err(AppError::Validation(format!(
                    "cannot reduce capacity of '{}' below {} already sold",
                    input.name, carried_sold
                )));
            }
            replacement.push(TicketType {
                name: input.name,
                price: input.price,
                total_available: input.total_available,
                sold: carried_sold,
            });
        }
        event.ticket_types = replacement;
    }
    event.updated_at = Utc::now();
    Ok(())
}

/// Resolves and reserves the requested lines against the event's inventory.
///
/// All lines are checked before any `sold` count moves, so a request that
/// fails on one line leaves every count untouched. Returned lines carry the
/// unit price snapshotted at this moment. The caller must hold the event's
/// exclusion scope for the check-and-increment to be race free.
pub fn reserve_lines(
    event: &mut Event,
    requested: &[RequestedLine],
) -> Result<Vec<TicketLine>, AppError> {
    let mut lines = Vec::with_capacity(requested.len());
    let mut picks = Vec::with_capacity(requested.len());
    for req in requested {
        let index = event
            .ticket_types
            .iter()
            .position(|t| t.name == req.ticket_type)
            .ok_or_else(|| AppError::InvalidTicketType(req.ticket_type.clone()))?;
        let ticket_type = &event.ticket_types[index];
        if ticket_type.sold as u64 + req.quantity as u64 > ticket_type.total_available as u64 {
            return Err(AppError::SoldOut(req.ticket_type.clone()));
        }
        picks.push((index, req.quantity));
        lines.push(TicketLine {
            ticket_type: ticket_type.name.clone(),
            quantity: req.quantity,
            price: ticket_type.price,
        });
    }
    for (index, quantity) in picks {
        event.ticket_types[index].sold += quantity;
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concert() -> Event {
        CreateEventRequest {
            title: "Concert".into(),
            banner_image: None,
            date: Utc::now(),
            venue: "Main Hall".into(),
            ticket_types: vec![
                TicketTypeInput {
                    name: "GA".into(),
                    price: Decimal::new(5000, 2),
                    total_available: 10,
                },
                TicketTypeInput {
                    name: "VIP".into(),
                    price: Decimal::new(12000, 2),
                    total_available: 2,
                },
            ],
        }
        .into_event()
        .expect("valid event")
    }

    fn line(name: &str, quantity: u32) -> RequestedLine {
        RequestedLine {
            ticket_type: name.into(),
            quantity,
        }
    }

    #[test]
    fn create_starts_with_zero_sold() {
        let event = concert();
        assert!(event.ticket_types.iter().all(|t| t.sold == 0));
        assert_eq!(event.ticket_types[0].remaining(), 10);
    }

    #[test]
    fn create_rejects_blank_title_and_venue() {
        let request = CreateEventRequest {
            title: "  ".into(),
            banner_image: None,
            date: Utc::now(),
            venue: "Somewhere".into(),
            ticket_types: vec![],
        };
        assert!(matches!(
            request.into_event(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn create_rejects_duplicate_type_names() {
        let request = CreateEventRequest {
            title: "Concert".into(),
            banner_image: None,
            date: Utc::now(),
            venue: "Main Hall".into(),
            ticket_types: vec![
                TicketTypeInput {
                    name: "GA".into(),
                    price: Decimal::ZERO,
                    total_available: 1,
                },
                TicketTypeInput {
                    name: "GA".into(),
                    price: Decimal::ZERO,
                    total_available: 1,
                },
            ],
        };
        assert!(matches!(
            request.into_event(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn reserve_snapshots_price_and_increments_sold() {
        let mut event = concert();
        let lines = reserve_lines(&mut event, &[line("GA", 3)]).expect("reserved");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].price, Decimal::new(5000, 2));
        assert_eq!(event.ticket_types[0].sold, 3);
    }

    #[test]
    fn reserve_rejects_unknown_type() {
        let mut event = concert();
        let err = reserve_lines(&mut event, &[line("Backstage", 1)]).unwrap_err();
        assert!(matches!(err, AppError::InvalidTicketType(name) if name == "Backstage"));
        assert_eq!(event.ticket_types[0].sold, 0);
    }

    #[test]
    fn reserve_rejects_oversell() {
        let mut event = concert();
        let err = reserve_lines(&mut event, &[line("VIP", 3)]).unwrap_err();
        assert!(matches!(err, AppError::SoldOut(name) if name == "VIP"));
        assert_eq!(event.ticket_types[1].sold, 0);
    }

    #[test]
    fn reserve_is_all_or_nothing_across_lines() {
        let mut event = concert();
        // VIP only has 2 seats, so the whole request must fail and GA must
        // stay untouched.
        let err = reserve_lines(&mut event, &[line("GA", 2), line("VIP", 3)]).unwrap_err();
        assert!(matches!(err, AppError::SoldOut(_)));
        assert_eq!(event.ticket_types[0].sold, 0);
        assert_eq!(event.ticket_types[1].sold, 0);
    }

    #[test]
    fn update_carries_sold_forward() {
        let mut event = concert();
        reserve_lines(&mut event, &[line("GA", 4)]).unwrap();

        let patch = UpdateEventRequest {
            ticket_types: Some(vec![
                TicketTypeInput {
                    name: "GA".into(),
                    price: Decimal::new(6000, 2),
                    total_available: 20,
                },
                TicketTypeInput {
                    name: "VIP".into(),
                    price: Decimal::new(12000, 2),
                    total_available: 2,
                },
            ]),
            ..Default::default()
        };
        apply_update(&mut event, patch).expect("updated");
        let ga = &event.ticket_types[0];
        assert_eq!(ga.sold, 4);
        assert_eq!(ga.total_available, 20);
        assert_eq!(ga.price, Decimal::new(6000, 2));
    }

    #[test]
    fn update_cannot_shrink_capacity_below_sold() {
        let mut event = concert();
        reserve_lines(&mut event, &[line("GA", 4)]).unwrap();

        let patch = UpdateEventRequest {
            ticket_types: Some(vec![
                TicketTypeInput {
                    name: "GA".into(),
                    price: Decimal::new(5000, 2),
                    total_available: 3,
                },
                TicketTypeInput {
                    name: "VIP".into(),
                    price: Decimal::new(12000, 2),
                    total_available: 2,
                },
            ]),
            ..Default::default()
        };
        let err = apply_update(&mut event, patch).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(event.ticket_types[0].sold, 4);
        assert_eq!(event.ticket_types[0].total_available, 10);
    }

    #[test]
    fn update_cannot_drop_type_with_sales() {
        let mut event = concert();
        reserve_lines(&mut event, &[line("VIP", 1)]).unwrap();

        let patch = UpdateEventRequest {
            ticket_types: Some(vec![TicketTypeInput {
                name: "GA".into(),
                price: Decimal::new(5000, 2),
                total_available: 10,
            }]),
            ..Default::default()
        };
        assert!(matches!(
            apply_update(&mut event, patch),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn update_of_scalar_fields_leaves_inventory_alone() {
        let mut event = concert();
        reserve_lines(&mut event, &[line("GA", 2)]).unwrap();

        let patch = UpdateEventRequest {
            title: Some("Concert (rescheduled)".into()),
            ..Default::default()
        };
        apply_update(&mut event, patch).expect("updated");
        assert_eq!(event.title, "Concert (rescheduled)");
        assert_eq!(event.ticket_types[0].sold, 2);
    }
}
