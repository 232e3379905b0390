use base64::alphabet;
use base64::engine::{general_purpose::GeneralPurpose, DecodePaddingMode, GeneralPurposeConfig};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::Value;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// Claims read from the payload segment. The signature is never verified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenClaims {
    /// Expiry, seconds since epoch
    pub exp: Option<f64>,
    pub sub: Option<String>,
    pub email: Option<String>,
}

/// Structural reading of a stored token
#[derive(Debug, Clone, PartialEq)]
pub enum TokenShape {
    /// Segment count other than three
    Malformed,
    /// Three segments, but the payload is not base64 JSON
    Undecodable,
    Decoded(TokenClaims),
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.exp?;
        DateTime::<Utc>::from_timestamp_millis((exp * 1000.0) as i64)
    }

    /// Strictly-in-the-future check; tokens without `exp` never expire
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.exp {
            Some(exp) => exp <= epoch_seconds(now),
            None => false,
        }
    }
}

pub fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

pub fn inspect(token: &str) -> TokenShape {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return TokenShape::Malformed;
    }

    let bytes = match URL_SAFE_LENIENT
        .decode(segments[1])
        .or_else(|_| STANDARD_LENIENT.decode(segments[1]))
    {
        Ok(bytes) => bytes,
        Err(_) => return TokenShape::Undecodable,
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(payload) => TokenShape::Decoded(claims_from(&payload)),
        Err(_) => TokenShape::Undecodable,
    }
}

fn claims_from(payload: &Value) -> TokenClaims {
    TokenClaims {
        exp: payload.get("exp").and_then(numeric),
        sub: payload.get("sub").and_then(stringish),
        email: payload.get("email").and_then(|v| v.as_str()).map(str::to_string),
    }
}

// Non-numeric exp values are ignored, the same as a missing claim
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn stringish(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn token_with(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn test_segment_count() {
        assert_eq!(inspect("abc.def"), TokenShape::Malformed);
        assert_eq!(inspect("a.b.c.d"), TokenShape::Malformed);
        assert_eq!(inspect(""), TokenShape::Malformed);
    }

    #[test]
    fn test_undecodable_payload() {
        assert_eq!(inspect("head.!!!.sig"), TokenShape::Undecodable);
        // Valid base64 but not JSON
        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode("plain text"));
        assert_eq!(inspect(&not_json), TokenShape::Undecodable);
    }

    #[test]
    fn test_claims_decoding() {
        let shape = inspect(&token_with(r#"{"sub":42,"exp":1700000000,"email":"a@b.c"}"#));
        let TokenShape::Decoded(claims) = shape else { panic!("expected decoded claims") };
        assert_eq!(claims.exp, Some(1_700_000_000.0));
        assert_eq!(claims.sub.as_deref(), Some("42"));
        assert_eq!(claims.email.as_deref(), Some("a@b.c"));
        assert_eq!(claims.expires_at().map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn test_padded_standard_payload_decodes() {
        use base64::engine::general_purpose::STANDARD;
        let token = format!("h.{}.s", STANDARD.encode(r#"{"exp":5}"#));
        assert!(matches!(inspect(&token), TokenShape::Decoded(TokenClaims { exp: Some(_), .. })));
    }

    #[test]
    fn test_expiry_is_strict() {
        let now = Utc::now();
        let at_now = TokenClaims { exp: Some(epoch_seconds(now)), ..Default::default() };
        assert!(at_now.is_expired_at(now));

        let later = TokenClaims { exp: Some(epoch_seconds(now) + 60.0), ..Default::default() };
        assert!(!later.is_expired_at(now));

        assert!(!TokenClaims::default().is_expired_at(now));
    }
}
