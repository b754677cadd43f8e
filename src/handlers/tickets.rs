use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::models::ticket::PurchaseRequest;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn purchase(
    State(state): State<AppState>,
    Json(request): Json<PurchaseRequest>,
) -> Result<Response, AppError> {
    let ticket = state.purchase.purchase(request).await?;
    Ok(created(ticket, "Ticket purchased").into_response())
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let ticket = state.purchase.get_ticket(id).await?;
    Ok(success(ticket, "Ticket retrieved").into_response())
}
