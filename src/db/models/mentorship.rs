//! Mentorship program models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Mentee {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub field: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteMenteeRequest {
    pub id: Option<String>,
}
