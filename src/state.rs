use std::sync::Arc;

use crate::auth::AdminCredential;
use crate::purchase::PurchaseService;
use crate::store::TicketingStore;

/// Shared application state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TicketingStore>,
    pub purchase: Arc<PurchaseService>,
    pub admin: Arc<dyn AdminCredential>,
}

impl AppState {
    pub fn new(store: Arc<dyn TicketingStore>, admin: Arc<dyn AdminCredential>) -> Self {
        Self {
            purchase: Arc::new(PurchaseService::new(Arc::clone(&store))),
            store,
            admin,
        }
    }
}
