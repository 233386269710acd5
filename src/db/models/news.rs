//! News and events models.

use serde::Serialize;
use sqlx::FromRow;

/// Listing view joined with the author's display fields.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NewsEventWithAuthor {
    pub event_id: String,
    pub title: String,
    pub description: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub post_type: String,
    pub image: Option<String>,
    pub video_url: Option<String>,
    pub event_date: Option<String>,
    pub created_at: String,
    pub first_name: Option<String>,
    pub second_name: Option<String>,
    pub role: Option<String>,
}
