//! User account models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::Role;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: String,
    pub first_name: String,
    pub second_name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub aspiration: Option<String>,
    pub photo: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Public view of a user. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserResponse {
    pub user_id: String,
    pub first_name: String,
    pub second_name: Option<String>,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub photo: Option<String>,
    pub gender: Option<String>,
    pub aspiration: Option<String>,
}

/// Public member-directory card.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberCard {
    pub user_id: String,
    pub first_name: String,
    pub second_name: Option<String>,
    pub photo: Option<String>,
    pub aspiration: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Fields an admin may change on a user record. Absent fields are left
/// untouched (sparse-update contract).
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub second_name: Option<String>,
    pub role: Option<Role>,
}

/// Everything needed to create an account after payment capture.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub second_name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub aspiration: Option<String>,
    pub photo: Option<String>,
}
