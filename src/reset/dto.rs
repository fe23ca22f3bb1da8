use serde::Deserialize;

/// Request body asking for a reset mail.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

/// Request body carrying the replacement password.
#[derive(Debug, Deserialize)]
pub struct PerformReset {
    pub password: String,
    pub confirm_password: String,
}
