use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;

use gatepass_server::auth::{AdminCredential, StaticToken};
use gatepass_server::config::Config;
use gatepass_server::routes::create_routes;
use gatepass_server::state::AppState;
use gatepass_server::store::postgres::PgStore;
use gatepass_server::store::TicketingStore;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let store: Arc<dyn TicketingStore> = Arc::new(PgStore::new(pool));
    let admin: Arc<dyn AdminCredential> = Arc::new(StaticToken::new(config.admin_token.clone()));
    let app: Router = create_routes(AppState::new(store, admin));

    let addr = config.bind_addr;
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
