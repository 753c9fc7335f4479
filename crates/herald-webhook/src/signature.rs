// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook payload signing.
//!
//! Tenants verify authenticity by recomputing HMAC-SHA256 over the raw body
//! bytes concatenated with the session id, using the shared secret, and
//! comparing it to the `X-Webhook-Signature` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the hex HMAC-SHA256 signature of `body ‖ session_id`.
pub fn compute_signature(body: &[u8], session_id: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    mac.update(session_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
