use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    account::dto::{AvatarResponse, UpdateAccountRequest},
    auth::{dto::PublicUser, jwt::AuthUser, repo::User},
    error::{ApiError, ApiResult},
    state::AppState,
    storage::random_image_key,
    validate::{email_format, username_length, FieldValidation},
};

const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_AVATAR: &str = "default.jpg";

/// The stock avatar is shared between users and must never be deleted;
/// anything else was uploaded and can go once replaced.
fn replaced_avatar_key(old: &str) -> Option<&str> {
    (old != DEFAULT_AVATAR).then_some(old)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/account", get(get_account))
        .route("/account", put(update_account))
        .route(
            "/account/avatar",
            post(upload_avatar).layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES)),
        )
}

#[instrument(skip(state))]
pub async fn get_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("user not found".into()))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(mut payload): Json<UpdateAccountRequest>,
) -> ApiResult<Json<PublicUser>> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    FieldValidation::new()
        .check("username", &payload.username, &[username_length])
        .check("email", &payload.email, &[email_format])
        .finish()?;

    // Uniqueness checks skip the caller's own record so an unchanged
    // username or email is not reported as taken.
    let mut taken = FieldValidation::new();
    if let Some(other) = User::find_by_username(&state.db, &payload.username).await? {
        if other.id != user_id {
            taken.fail("username", "is taken");
        }
    }
    if let Some(other) = User::find_by_email(&state.db, &payload.email).await? {
        if other.id != user_id {
            taken.fail("email", "is taken");
        }
    }
    taken.finish()?;

    let user = User::update_profile(&state.db, user_id, &payload.username, &payload.email).await?;
    info!(user_id = %user_id, "account updated");
    Ok(Json(user.into()))
}

/// Accepts a multipart field named "avatar", stores it under a random
/// filename and records that filename on the user.
#[instrument(skip(state, mp))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> ApiResult<Json<AvatarResponse>> {
    let mut upload: Option<(String, bytes::Bytes)> = None;
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() == Some("avatar") {
            let filename = field
                .file_name()
                .map(|s| s.to_string())
                .ok_or_else(|| ApiError::BadRequest("avatar filename missing".into()))?;
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            upload = Some((filename, data));
            break;
        }
    }

    let (filename, data) = upload
        .ok_or_else(|| ApiError::BadRequest("multipart field 'avatar' is required".into()))?;

    let key = random_image_key(&filename)
        .ok_or_else(|| ApiError::validation("avatar", "only jpg and png files are allowed"))?;

    let current = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("user not found".into()))?;

    state.storage.put_object(&key, data).await?;
    let user = User::update_avatar(&state.db, user_id, &key).await?;

    // The old file is orphaned once the record points elsewhere; removal
    // is best-effort.
    if let Some(old) = replaced_avatar_key(&current.avatar) {
        if let Err(e) = state.storage.delete_object(old).await {
            warn!(error = %e, avatar = %old, "old avatar cleanup failed");
        }
    }

    info!(user_id = %user_id, avatar = %user.avatar, "avatar updated");
    Ok(Json(AvatarResponse { avatar: user.avatar }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaced_avatar_is_cleaned_up() {
        assert_eq!(replaced_avatar_key("3f2a9c.png"), Some("3f2a9c.png"));
    }

    #[test]
    fn stock_avatar_is_never_deleted() {
        assert_eq!(replaced_avatar_key("default.jpg"), None);
    }
}
