use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::Luma;
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use uuid::Uuid;

use crate::utils::error::AppError;

const QR_MIN_DIMENSIONS: u32 = 240;

/// Payload carried inside the QR image. Scanners read this back and resolve
/// the ticket id for entry validation.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QrPayload {
    ticket_id: Uuid,
}

pub fn encode_payload(ticket_id: Uuid) -> Result<String, AppError> {
    serde_json::to_string(&QrPayload { ticket_id })
        .map_err(|e| AppError::CredentialIssuance(e.to_string()))
}

pub fn decode_payload(raw: &str) -> Result<Uuid, AppError> {
    let payload: QrPayload = serde_json::from_str(raw)
        .map_err(|e| AppError::CredentialIssuance(format!("unreadable payload: {}", e)))?;
    Ok(payload.ticket_id)
}

/// Renders the ticket's QR credential as a PNG data URL, the form the API
/// returns and clients display directly in an `img` tag.
pub fn data_url(ticket_id: Uuid) -> Result<String, AppError> {
    let payload = encode_payload(ticket_id)?;
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| AppError::CredentialIssuance(e.to_string()))?;
    let pixels = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_MIN_DIMENSIONS, QR_MIN_DIMENSIONS)
        .build();

    let mut png = Vec::new();
    pixels
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| AppError::CredentialIssuance(e.to_string()))?;

    Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
}
