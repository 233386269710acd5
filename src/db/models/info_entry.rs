//! Information-center models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InfoEntry {
    pub id: String,
    pub category: String,
    pub name: String,
    pub content: String,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub image: Option<String>,
    pub attachment: Option<String>,
    pub is_published: i64,
    pub slug: String,
    pub created_by: Option<String>,
    pub created_at: String,
}

/// Public listing view: published entries, summary fields only.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InfoEntrySummary {
    pub id: String,
    pub category: String,
    pub name: String,
    pub summary: Option<String>,
    pub image: Option<String>,
    pub slug: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateInfoEntryRequest {
    pub category: Option<String>,
    pub name: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub image: Option<String>,
    pub attachment: Option<String>,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

fn default_published() -> bool {
    true
}
