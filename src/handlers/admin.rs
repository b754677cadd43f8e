use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::models::event::{CreateEventRequest, UpdateEventRequest};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

pub async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> Result<Response, AppError> {
    let event = request.into_event()?;
    let event = state.store.create_event(event).await?;
    Ok(created(event, "Event created").into_response())
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateEventRequest>,
) -> Result<Response, AppError> {
    let event = state.store.update_event(id, patch).await?;
    Ok(success(event, "Event updated").into_response())
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    state.store.delete_event(id).await?;
    Ok(empty_success("Event deleted").into_response())
}
