// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! QR pairing lifecycle.
//!
//! The raw negotiated QR payload is rendered into a displayable SVG data URL
//! at issue time. A pending QR is invalidated by its expiry window (120s by
//! default), by a replacement QR, or by a successful connect.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use herald_core::HeraldError;
use qrcode::QrCode;
use qrcode::render::svg;
use tokio::time::Instant;

/// Renders a raw QR payload into an SVG data URL.
pub fn render_qr(payload: &str) -> Result<String, HeraldError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| HeraldError::Internal(format!("QR encoding failed: {e}")))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        BASE64.encode(image.as_bytes())
    ))
}

/// A QR code awaiting scan.
#[derive(Debug, Clone)]
pub struct PendingQr {
    /// Rendered data URL, served to the control surface.
    pub image: String,
    /// Raw negotiated payload, kept for provider-side re-validation.
    pub raw_payload: String,
    pub issued_at: Instant,
    pub issued_at_utc: String,
}

impl PendingQr {
    pub fn new(image: String, raw_payload: String) -> Self {
        Self {
            image,
            raw_payload,
            issued_at: Instant::now(),
            issued_at_utc: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_expired(&self, ttl: std::time::Duration) -> bool {
        self.issued_at.elapsed() >= ttl
    }
}

/// QR code as returned by the control surface.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QrCodeInfo {
    pub image: String,
    pub issued_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn render_produces_svg_data_url() {
        let image = render_qr("2@abcdef0123456789,xyz").expect("render");
        assert!(image.starts_with("data:image/svg+xml;base64,"));

        let encoded = image.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let decoded = BASE64.decode(encoded).expect("valid base64");
        let svg_text = String::from_utf8(decoded).expect("utf8 svg");
        assert!(svg_text.contains("<svg"));
    }

    #[test]
    fn render_is_deterministic_for_same_payload() {
        let a = render_qr("payload").expect("render");
        let b = render_qr("payload").expect("render");
        assert_eq!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_qr_expires_after_ttl() {
        let qr = PendingQr::new("data:...".into(), "raw".into());
        let ttl = Duration::from_secs(120);

        assert!(!qr.is_expired(ttl));
        tokio::time::advance(Duration::from_secs(119)).await;
        assert!(!qr.is_expired(ttl));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(qr.is_expired(ttl));
    }
}
