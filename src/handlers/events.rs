use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn list_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.store.list_events().await?;
    Ok(success(events, "Events retrieved").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state.store.get_event(id).await?;
    Ok(success(event, "Event retrieved").into_response())
}
