use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use tracing::debug;

use shared_models::auth::JwtClaims;

/// Reads the claims segment of a bearer token without verifying the
/// signature. Returns `None` for tokens that are not three-part JWTs.
pub fn decode_claims(token: &str) -> Option<JwtClaims> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let bytes = match URL_SAFE_NO_PAD.decode(parts[1].trim_end_matches('=')) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Failed to decode token claims: {}", e);
            return None;
        }
    };

    match serde_json::from_slice::<JwtClaims>(&bytes) {
        Ok(claims) => Some(claims),
        Err(e) => {
            debug!("Failed to parse token claims: {}", e);
            None
        }
    }
}

/// Opaque tokens and tokens without `exp` are treated as live; the backend
/// remains the authority and will answer 401 if it disagrees.
pub fn is_token_expired(token: &str, now: DateTime<Utc>) -> bool {
    match decode_claims(token).and_then(|claims| claims.exp) {
        Some(exp) if exp < now.timestamp() => {
            debug!("Token expired at {} (now: {})", exp, now.timestamp());
            true
        }
        _ => false,
    }
}
