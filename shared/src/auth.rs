use crate::config::AuthConfig;
use crate::error::FormsError;
use crate::responses::{error_response, json_response, parse_body};
use crate::session::{session_ttl, Access, Clock, SessionContext};
use crate::types::{AuthUser, LoginRequest, LoginResponse};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use lambda_http::{http::HeaderMap, http::StatusCode, Body, Error, Response};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TokenClaims {
    pub email: String,
    pub authenticated: bool,
    /// Issued-at, seconds since the epoch. Doubles as the session's login time.
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    pub fn into_user(self) -> AuthUser {
        AuthUser {
            email: self.email,
            is_authenticated: self.authenticated,
            login_time: self.iat * 1000,
        }
    }
}

fn mac_for(secret: &str, signing_input: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signing_input.as_bytes());
    mac
}

/// Admin credential check against the configured pair.
pub fn check_credentials(config: &AuthConfig, email: &str, password: &str) -> bool {
    email == config.admin_email && password == config.admin_password
}

/// HS256 JWT carrying the session, valid for the session TTL.
pub fn issue_token(secret: &str, email: &str, now: DateTime<Utc>) -> Result<String, FormsError> {
    let claims = TokenClaims {
        email: email.to_string(),
        authenticated: true,
        iat: now.timestamp(),
        exp: (now + session_ttl()).timestamp(),
    };
    let claims_json = serde_json::to_vec(&claims)
        .map_err(|e| FormsError::Upstream(format!("token encoding failed: {}", e)))?;
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(TOKEN_HEADER),
        URL_SAFE_NO_PAD.encode(claims_json)
    );
    let signature = mac_for(secret, &signing_input).finalize().into_bytes();
    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
}

/// Checks structure and signature only; expiry is the session gate's job.
pub fn verify_token(secret: &str, token: &str) -> Result<TokenClaims, FormsError> {
    let invalid = || FormsError::Unauthorized("Invalid token".to_string());

    let mut parts = token.split('.');
    let (header, claims, signature) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(c), Some(s), None) => (h, c, s),
        _ => return Err(invalid()),
    };

    let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| invalid())?;
    mac_for(secret, &format!("{}.{}", header, claims))
        .verify_slice(&signature)
        .map_err(|_| invalid())?;

    let header_json = URL_SAFE_NO_PAD.decode(header).map_err(|_| invalid())?;
    let header: serde_json::Value = serde_json::from_slice(&header_json).map_err(|_| invalid())?;
    if header.get("alg").and_then(|a| a.as_str()) != Some("HS256") {
        return Err(invalid());
    }

    let claims_json = URL_SAFE_NO_PAD.decode(claims).map_err(|_| invalid())?;
    serde_json::from_slice(&claims_json).map_err(|_| invalid())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Session gate for admin routes: bearer token → session → guard.
pub fn authorize_admin(
    config: &AuthConfig,
    clock: Arc<dyn Clock>,
    headers: &HeaderMap,
) -> Result<AuthUser, FormsError> {
    let token = bearer_token(headers)
        .ok_or_else(|| FormsError::Unauthorized("Missing Authorization header".to_string()))?;
    let claims = verify_token(&config.jwt_secret, token)?;

    let mut session = SessionContext::restore(claims.into_user(), clock);
    match session.guard() {
        Access::Granted => session
            .current_user()
            .cloned()
            .ok_or_else(|| FormsError::Unauthorized("Session expired".to_string())),
        Access::Redirect(_) => {
            tracing::info!("Rejected admin request: session expired or unauthenticated");
            Err(FormsError::Unauthorized("Session expired".to_string()))
        }
    }
}

/// POST /auth
pub async fn login(config: &AuthConfig, clock: &dyn Clock, body: &Body) -> Result<Response<Body>, Error> {
    tracing::info!("Login request received");

    let request: LoginRequest = match parse_body(body) {
        Ok(req) => req,
        Err(resp) => return Ok(resp),
    };

    if !check_credentials(config, &request.email, &request.password) {
        tracing::warn!("Invalid credentials for {}", request.email);
        return error_response(&FormsError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = match issue_token(&config.jwt_secret, &request.email, clock.now()) {
        Ok(token) => token,
        Err(e) => return error_response(&e),
    };
    tracing::info!("Authentication successful for {}", request.email);
    json_response(StatusCode::OK, &LoginResponse { success: true, token })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FixedClock;
    use chrono::{Duration, TimeZone};
    use lambda_http::http::HeaderValue;

    fn config() -> AuthConfig {
        AuthConfig {
            admin_email: "admin@example.com".into(),
            admin_password: "pw".into(),
            jwt_secret: "s3cret".into(),
        }
    }

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_str(&format!("Bearer {}", token)).unwrap());
        headers
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_token_round_trip() {
        let token = issue_token("s3cret", "admin@example.com", t0()).unwrap();
        let claims = verify_token("s3cret", &token).unwrap();
        assert_eq!(claims.email, "admin@example.com");
        assert!(claims.authenticated);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_tampered_or_foreign_tokens_rejected() {
        let token = issue_token("s3cret", "admin@example.com", t0()).unwrap();
        assert!(verify_token("other", &token).is_err());

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(r#"{"email":"x@y.z","authenticated":true,"iat":0,"exp":0}"#);
        parts[1] = &forged;
        assert!(verify_token("s3cret", &parts.join(".")).is_err());

        assert!(verify_token("s3cret", "a.b").is_err());
        assert!(verify_token("s3cret", "").is_err());
    }

    #[test]
    fn test_authorize_admin_enforces_session_expiry() {
        let token = issue_token("s3cret", "admin@example.com", t0()).unwrap();

        let fresh: Arc<dyn Clock> = Arc::new(FixedClock(t0() + Duration::days(6)));
        let user = authorize_admin(&config(), fresh, &headers_with(&token)).unwrap();
        assert_eq!(user.email, "admin@example.com");

        let stale: Arc<dyn Clock> = Arc::new(FixedClock(t0() + Duration::days(8)));
        let err = authorize_admin(&config(), stale, &headers_with(&token)).unwrap_err();
        assert!(matches!(err, FormsError::Unauthorized(_)));
    }

    #[test]
    fn test_authorize_admin_requires_header() {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(t0()));
        let err = authorize_admin(&config(), clock, &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, FormsError::Unauthorized(m) if m.contains("Missing")));
    }

    #[tokio::test]
    async fn test_login_success_and_failure() {
        let clock = FixedClock(t0());
        let ok = login(&config(), &clock, &Body::from(r#"{"email":"admin@example.com","password":"pw"}"#))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(ok.body()).unwrap();
        assert_eq!(json["success"], true);
        assert!(verify_token("s3cret", json["token"].as_str().unwrap()).is_ok());

        let bad = login(&config(), &clock, &Body::from(r#"{"email":"admin@example.com","password":"no"}"#))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);

        let garbage = login(&config(), &clock, &Body::from("nope")).await.unwrap();
        assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);
    }
}
