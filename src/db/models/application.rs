//! Program application models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const APPLICATION_STATUSES: [&str; 3] = ["pending", "approved", "rejected"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub photo: Option<String>,
    pub region: Option<String>,
    pub application_type: String,
    pub details: Option<String>,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationStatusRequest {
    pub status: String,
}
