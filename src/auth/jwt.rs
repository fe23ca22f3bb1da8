use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::JwtConfig, state::AppState};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Reset,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

/// Every reset-token failure mode collapses into this one value so the
/// caller cannot distinguish forged from expired.
#[derive(Debug, thiserror::Error)]
#[error("invalid or expired reset token")]
pub struct InvalidResetToken;

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub reset_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
            refresh_ttl_minutes,
            reset_ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            access_ttl: Duration::from_secs((ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((refresh_ttl_minutes as u64) * 60),
            reset_ttl: Duration::from_secs((reset_ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    fn ttl_for(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::Reset => self.reset_ttl,
        }
    }

    fn sign_at(&self, user_id: Uuid, kind: TokenKind, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + TimeDuration::seconds(self.ttl_for(kind).as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    fn sign_with_kind(&self, user_id: Uuid, kind: TokenKind) -> anyhow::Result<String> {
        self.sign_at(user_id, kind, OffsetDateTime::now_utc())
    }

    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Refresh)
    }

    /// Issues a short-lived token proving the bearer requested a password
    /// reset for this account. Stateless: nothing is stored server-side.
    pub fn sign_reset(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Reset)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        Ok(claims)
    }

    /// Resolves a reset token back to the user it was issued for.
    /// Validated with zero leeway so expiry is exact to the second.
    pub fn verify_reset(&self, token: &str) -> Result<Uuid, InvalidResetToken> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|_| InvalidResetToken)?;
        if data.claims.kind != TokenKind::Reset {
            return Err(InvalidResetToken);
        }
        Ok(data.claims.sub)
    }
}

pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or((
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header".to_string(),
        ))?;

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired token");
                return Err((
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                ));
            }
        };

        if claims.kind != TokenKind::Access {
            return Err((
                StatusCode::UNAUTHORIZED,
                "Access token required".to_string(),
            ));
        }

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    fn tamper_last_char(token: &str) -> String {
        let mut chars: Vec<char> = token.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'A' { 'B' } else { 'A' };
        chars.into_iter().collect()
    }

    #[tokio::test]
    async fn sign_and_verify_access_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).expect("sign access");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[tokio::test]
    async fn sign_and_verify_refresh_token_and_verify_refresh() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_refresh(user_id).expect("sign refresh");
        let claims = keys.verify_refresh(&token).expect("verify refresh");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[tokio::test]
    async fn verify_refresh_rejects_access_token() {
        let keys = make_keys();
        let token = keys.sign_access(Uuid::new_v4()).expect("sign access");
        let err = keys.verify_refresh(&token).unwrap_err();
        assert!(err.to_string().contains("not a refresh token"));
    }

    #[tokio::test]
    async fn reset_token_resolves_issuing_user() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_reset(user_id).expect("sign reset");
        let resolved = keys.verify_reset(&token).expect("verify reset");
        assert_eq!(resolved, user_id);
    }

    #[tokio::test]
    async fn reset_token_verifies_repeatedly_within_window() {
        // Stateless by design: nothing marks a token consumed.
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_reset(user_id).expect("sign reset");
        assert_eq!(keys.verify_reset(&token).expect("first"), user_id);
        assert_eq!(keys.verify_reset(&token).expect("second"), user_id);
    }

    #[tokio::test]
    async fn reset_token_rejects_tampered_signature() {
        let keys = make_keys();
        let token = keys.sign_reset(Uuid::new_v4()).expect("sign reset");
        assert!(keys.verify_reset(&tamper_last_char(&token)).is_err());
    }

    #[tokio::test]
    async fn reset_token_rejects_garbage() {
        let keys = make_keys();
        assert!(keys.verify_reset("not-a-token").is_err());
        assert!(keys.verify_reset("").is_err());
    }

    #[tokio::test]
    async fn reset_verification_rejects_access_and_refresh_kinds() {
        let keys = make_keys();
        let access = keys.sign_access(Uuid::new_v4()).expect("sign access");
        let refresh = keys.sign_refresh(Uuid::new_v4()).expect("sign refresh");
        assert!(keys.verify_reset(&access).is_err());
        assert!(keys.verify_reset(&refresh).is_err());
    }

    #[tokio::test]
    async fn reset_token_valid_just_inside_window() {
        // fake() configures a 30 minute reset ttl; issue 29m59s in the past.
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let issued = OffsetDateTime::now_utc() - TimeDuration::seconds(29 * 60 + 59);
        let token = keys
            .sign_at(user_id, TokenKind::Reset, issued)
            .expect("sign at");
        assert_eq!(keys.verify_reset(&token).expect("still valid"), user_id);
    }

    #[tokio::test]
    async fn reset_token_invalid_just_past_window() {
        let keys = make_keys();
        let issued = OffsetDateTime::now_utc() - TimeDuration::seconds(30 * 60 + 1);
        let token = keys
            .sign_at(Uuid::new_v4(), TokenKind::Reset, issued)
            .expect("sign at");
        assert!(keys.verify_reset(&token).is_err());
    }

    #[tokio::test]
    async fn verify_rejects_token_from_other_secret() {
        let keys = make_keys();
        let mut other_state = AppState::fake();
        {
            let config = std::sync::Arc::make_mut(&mut other_state.config);
            config.jwt.secret = "another-secret".into();
        }
        let other = JwtKeys::from_ref(&other_state);
        let token = other.sign_reset(Uuid::new_v4()).expect("sign reset");
        assert!(keys.verify_reset(&token).is_err());
    }
}
