use serde::{Deserialize, Serialize};

use rollcall_auth::{Credential, Role};
use rollcall_core::UserId;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Requested role names (`admin`, `mod`, anything else means user).
    #[serde(default)]
    pub role: Option<Vec<String>>,
}

impl SignupRequest {
    pub fn roles(&self) -> Vec<Role> {
        match &self.role {
            Some(names) if !names.is_empty() => names.iter().map(|n| Role::from_signup(n)).collect(),
            _ => vec![Role::User],
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub roles: Vec<Role>,
}

impl JwtResponse {
    pub fn new(token: String, credential: &Credential) -> Self {
        Self {
            token,
            token_type: "Bearer".to_string(),
            id: credential.id,
            username: credential.username.clone(),
            email: credential.email.clone(),
            roles: credential.roles.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub username: String,
    pub roles: Vec<Role>,
}
