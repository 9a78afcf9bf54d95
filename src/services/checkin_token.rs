//! Time-boxed QR check-in tokens.
//!
//! A token binds a fund and a member for a short window so a photo of a
//! picket-line QR poster cannot be replayed hours later. The payload is
//! plain base64-encoded JSON, not a signature: trust is bounded by the
//! transport channel that delivered the QR code.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Tokens are valid for 5 minutes from issuance.
pub const TOKEN_TTL_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Payload schema version
    pub v: u32,
    pub fund_id: i32,
    pub member_id: i32,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Generate an opaque check-in token for (fund, member).
pub fn generate_token(fund_id: i32, member_id: i32, now: DateTime<Utc>) -> String {
    let claims = TokenClaims {
        v: 1,
        fund_id,
        member_id,
        issued_at: now.timestamp(),
        expires_at: now.timestamp() + TOKEN_TTL_SECS,
    };
    // Serializing a plain struct of ints cannot fail.
    let json = serde_json::to_vec(&claims).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode and time-validate a token. Fund/member binding is checked by
/// the caller, which knows the requested pair.
pub fn validate_token(token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|_| TokenError::Malformed)?;
    let claims: TokenClaims = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

    if now.timestamp() > claims.expires_at {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn round_trip_within_window() {
        let now = Utc::now();
        let token = generate_token(7, 42, now);

        let claims = validate_token(&token, now + Duration::seconds(60)).unwrap();
        assert_eq!(claims.fund_id, 7);
        assert_eq!(claims.member_id, 42);
        assert_eq!(claims.expires_at - claims.issued_at, TOKEN_TTL_SECS);
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let token = generate_token(7, 42, now);

        let err = validate_token(&token, now + Duration::seconds(TOKEN_TTL_SECS + 1)).unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }

    #[test]
    fn token_valid_at_exact_expiry() {
        let now = Utc::now();
        let token = generate_token(7, 42, now);

        // expires_at itself is still inside the window
        assert!(validate_token(&token, now + Duration::seconds(TOKEN_TTL_SECS)).is_ok());
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(
            validate_token("not!!valid!!base64", Utc::now()).unwrap_err(),
            TokenError::Malformed
        );
    }

    #[test]
    fn truncated_token_is_malformed() {
        let token = generate_token(7, 42, Utc::now());
        let truncated = &token[..token.len() / 2];
        assert_eq!(
            validate_token(truncated, Utc::now()).unwrap_err(),
            TokenError::Malformed
        );
    }

    #[test]
    fn valid_base64_wrong_shape_is_malformed() {
        let token = URL_SAFE_NO_PAD.encode(b"{\"hello\":\"world\"}");
        assert_eq!(
            validate_token(&token, Utc::now()).unwrap_err(),
            TokenError::Malformed
        );
    }
}
