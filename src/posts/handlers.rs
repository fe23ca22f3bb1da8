use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{jwt::AuthUser, repo::User},
    error::{ApiError, ApiResult},
    posts::dto::{CreatePostRequest, Pagination, PostResponse, UpdatePostRequest},
    posts::repo::Post,
    state::AppState,
    validate::FieldValidation,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/:id", get(get_post))
        .route("/users/:username/posts", get(list_user_posts))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/:id", put(update_post))
        .route("/posts/:id", delete(delete_post))
}

/// Only the recorded author may mutate a post.
fn ensure_author(post: &Post, user_id: Uuid) -> Result<(), ApiError> {
    if post.author_id == user_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden("not the author of this post".into()))
    }
}

fn validate_post_fields(title: &str, content: &str) -> Result<(), ApiError> {
    let mut validation = FieldValidation::new();
    if title.trim().is_empty() {
        validation.fail("title", "is required");
    }
    if content.trim().is_empty() {
        validation.fail("content", "is required");
    }
    validation.finish()
}

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let (limit, offset) = p.clamped();
    let posts = Post::list(&state.db, limit, offset).await?;
    Ok(Json(posts.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PostResponse>> {
    let post = Post::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("post not found".into()))?;
    Ok(Json(post.into()))
}

#[instrument(skip(state))]
pub async fn list_user_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(p): Query<Pagination>,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let user = User::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    let (limit, offset) = p.clamped();
    let posts = Post::list_by_author(&state.db, user.id, limit, offset).await?;
    Ok(Json(posts.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<PostResponse>)> {
    validate_post_fields(&payload.title, &payload.content)?;
    let post = Post::create(&state.db, user_id, &payload.title, &payload.content).await?;
    info!(post_id = %post.id, author_id = %user_id, "post created");
    Ok((StatusCode::CREATED, Json(post.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> ApiResult<Json<PostResponse>> {
    validate_post_fields(&payload.title, &payload.content)?;
    let post = Post::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("post not found".into()))?;
    ensure_author(&post, user_id)?;

    let updated = Post::update(&state.db, id, &payload.title, &payload.content).await?;
    info!(post_id = %id, author_id = %user_id, "post updated");
    Ok(Json(updated.into()))
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let post = Post::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("post not found".into()))?;
    ensure_author(&post, user_id)?;

    Post::delete(&state.db, id).await?;
    info!(post_id = %id, author_id = %user_id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample_post(author_id: Uuid) -> Post {
        Post {
            id: Uuid::new_v4(),
            author_id,
            title: "First post".into(),
            content: "Hello".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn author_may_mutate_own_post() {
        let author = Uuid::new_v4();
        assert!(ensure_author(&sample_post(author), author).is_ok());
    }

    #[test]
    fn non_author_is_rejected() {
        let post = sample_post(Uuid::new_v4());
        let err = ensure_author(&post, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn post_fields_must_be_non_empty() {
        assert!(validate_post_fields("Title", "Body").is_ok());
        assert!(validate_post_fields("", "Body").is_err());
        assert!(validate_post_fields("Title", "   ").is_err());
    }
}
