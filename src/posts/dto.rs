use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::posts::repo::Post;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: OffsetDateTime,
}

impl From<Post> for PostResponse {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            author_id: p.author_id,
            title: p.title,
            content: p.content,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

const MAX_LIMIT: i64 = 100;

impl Pagination {
    /// Bounds client-supplied values so they bind safely into SQL.
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_LIMIT), self.offset.max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.limit, 20);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn pagination_accepts_overrides() {
        let p: Pagination = serde_json::from_str(r#"{"limit": 5, "offset": 10}"#).unwrap();
        assert_eq!(p.clamped(), (5, 10));
    }

    #[test]
    fn pagination_clamps_out_of_range_values() {
        let p: Pagination = serde_json::from_str(r#"{"limit": -1, "offset": -5}"#).unwrap();
        assert_eq!(p.clamped(), (1, 0));

        let p: Pagination = serde_json::from_str(r#"{"limit": 5000, "offset": 3}"#).unwrap();
        assert_eq!(p.clamped(), (100, 3));
    }
}
