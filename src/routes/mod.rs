use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::require_admin;
use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{admin, events, health_check, tickets};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/events", post(admin::create_event))
        .route(
            "/events/:id",
            put(admin::update_event).delete(admin::delete_event),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/events", get(events::list_events))
        .route("/events/:id", get(events::get_event))
        .route("/tickets/purchase", post(tickets::purchase))
        .route("/tickets/:id", get(tickets::get_ticket))
        .nest("/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
