use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::state::AppState;
use crate::utils::error::AppError;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Credential check for the admin surface. The shipped implementation is a
/// shared secret; swapping in a real identity provider only touches this
/// seam.
pub trait AdminCredential: Send + Sync {
    fn verify(&self, presented: &str) -> bool;
}

pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl AdminCredential for StaticToken {
    fn verify(&self, presented: &str) -> bool {
        let expected = self.token.as_bytes();
        let presented = presented.as_bytes();
        if expected.is_empty() || expected.len() != presented.len() {
            return false;
        }
        // Constant-time comparison
        expected
            .iter()
            .zip(presented)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// Rejects the request with 401 before any storage access unless a valid
/// admin credential is presented via `x-admin-token` or a bearer token.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .or_else(|| {
            request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_owned)
        });

    match presented {
        Some(token) if state.admin.verify(&token) => next.run(request).await,
        _ => AppError::Unauthorized("Missing or invalid admin credential".into()).into_response(),
    }
}
