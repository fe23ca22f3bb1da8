use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{jwt::JwtKeys, password::hash_password, repo::User},
    error::{ApiError, ApiResult},
    mailer::send_best_effort,
    reset::dto::{PerformReset, ResetRequest},
    state::AppState,
    validate::{email_format, password_length, FieldValidation},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/password-reset", post(request_reset))
        .route("/auth/password-reset/:token", post(perform_reset))
}

fn reset_mail_body(base_url: &str, token: &str) -> String {
    format!(
        "To reset your password, visit the following link:\n\
         {base_url}/reset-password/{token}\n\n\
         If you did not request a password reset, ignore this mail and \
         nothing will change."
    )
}

/// Issues a reset token for the account and mails it out. The mail send is
/// fire-and-forget; transport failures are logged, never retried.
#[instrument(skip(state, payload))]
pub async fn request_reset(
    State(state): State<AppState>,
    Json(mut payload): Json<ResetRequest>,
) -> ApiResult<StatusCode> {
    payload.email = payload.email.trim().to_lowercase();
    FieldValidation::new()
        .check("email", &payload.email, &[email_format])
        .finish()?;

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "reset requested for unknown email");
            return Err(ApiError::validation("email", "no account with that email"));
        }
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_reset(user.id)?;

    info!(user_id = %user.id, "reset token issued");
    send_best_effort(
        state.mailer.clone(),
        user.email,
        "Password reset request".into(),
        reset_mail_body(&state.config.public_base_url, &token),
    );

    Ok(StatusCode::ACCEPTED)
}

/// Consumes a reset token by rotating the password hash. Forged, malformed
/// and expired tokens all get the same rejection; the token itself stays
/// verifiable until expiry since nothing is stored server-side.
#[instrument(skip(state, payload, token))]
pub async fn perform_reset(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<PerformReset>,
) -> ApiResult<StatusCode> {
    let keys = JwtKeys::from_ref(&state);
    let user_id = keys
        .verify_reset(&token)
        .map_err(|_| ApiError::Unauthorized("invalid or expired token".into()))?;

    FieldValidation::new()
        .check("password", &payload.password, &[password_length])
        .check_match("confirm_password", &payload.password, &payload.confirm_password)
        .finish()?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid or expired token".into()))?;

    let hash = hash_password(&payload.password)?;
    User::update_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password reset completed");
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mail_body_contains_reset_link() {
        let body = reset_mail_body("https://blog.example.com", "abc.def.ghi");
        assert!(body.contains("https://blog.example.com/reset-password/abc.def.ghi"));
        assert!(body.contains("ignore this mail"));
    }
}
