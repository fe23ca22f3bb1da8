use serde::{Deserialize, Serialize};

/// Request body for profile updates.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub username: String,
    pub email: String,
}

/// Returned after a successful avatar upload.
#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar: String,
}
