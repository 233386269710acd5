//! Activity and activity-media models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: String,
    pub title: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub activity_type: String,
    pub description: String,
    pub event_date: Option<String>,
    pub created_by: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityMedia {
    pub id: String,
    pub activity_id: String,
    pub media_type: String,
    pub file_name: String,
}

/// Activity with its media rows aggregated, as the public listing returns it.
#[derive(Debug, Serialize)]
pub struct ActivityWithMedia {
    #[serde(flatten)]
    pub activity: Activity,
    pub media: Vec<MediaItem>,
}

#[derive(Debug, Serialize)]
pub struct MediaItem {
    pub id: String,
    pub media_type: String,
    pub file_name: String,
}
