//! Member suggestion models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Suggestion joined with its author's display fields.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SuggestionWithAuthor {
    pub id: String,
    pub message: String,
    pub created_at: String,
    pub user_id: String,
    pub first_name: String,
    pub second_name: Option<String>,
    pub role: String,
    pub is_read: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateSuggestionRequest {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSuggestionRequest {
    pub id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionIdRequest {
    pub id: Option<String>,
}
