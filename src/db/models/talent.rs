//! Talent registry models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Talent {
    pub id: String,
    pub user_id: Option<String>,
    pub full_name: String,
    pub email: String,
    pub category: String,
    pub description: String,
    pub county: String,
    pub status: String,
    pub verified_by: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterTalentRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTalentStatusRequest {
    pub talent_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct TalentStatistics {
    pub total: i64,
    pub categories: Vec<CategoryCount>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// One cell of the category-by-county breakdown shown to partners.
#[derive(Debug, Serialize, FromRow)]
pub struct TalentInsight {
    pub category: String,
    pub county: String,
    pub count: i64,
}
