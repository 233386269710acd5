//! Talent registry endpoints.
//!
//! Registration is member-gated: the submitted email must belong to an
//! existing account. Submissions start as `pending` and become visible to
//! the public only once staff verify them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::auth::{authorize_fresh, require_role, CurrentUser, STAFF_ROLES};
use crate::api::crud::UpdateBuilder;
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation;
use crate::db::models::{
    CategoryCount, RegisterTalentRequest, Talent, TalentInsight, TalentStatistics,
    UpdateTalentStatusRequest,
};
use crate::db::{self, users};
use crate::AppState;

/// GET /api/talents: verified talents only.
pub async fn list_talents(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Talent>>, ApiError> {
    let talents = sqlx::query_as::<_, Talent>(
        "SELECT * FROM talents WHERE status = 'active' ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(talents))
}

/// GET /api/talents/statistics
pub async fn talent_statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TalentStatistics>, ApiError> {
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM talents WHERE status = 'active'")
        .fetch_one(&state.db)
        .await?;

    let categories = sqlx::query_as::<_, CategoryCount>(
        r#"
        SELECT category, COUNT(*) as count
        FROM talents
        WHERE status = 'active'
        GROUP BY category
        ORDER BY count DESC
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(TalentStatistics { total, categories }))
}

/// GET /api/talents/insights: verified talents broken down by category and
/// county, for staff preparing partner reports.
pub async fn talent_insights(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<TalentInsight>>, ApiError> {
    require_role(&session, STAFF_ROLES)?;

    let insights = sqlx::query_as::<_, TalentInsight>(
        r#"
        SELECT category, county, COUNT(*) as count
        FROM talents
        WHERE status = 'active'
        GROUP BY category, county
        ORDER BY count DESC
        "#,
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(insights))
}

/// POST /api/talents
pub async fn register_talent(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterTalentRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    let full_name = request.full_name.as_deref().unwrap_or("");
    let email = request.email.as_deref().unwrap_or("");
    let category = request.category.as_deref().unwrap_or("");
    let description = request.description.as_deref().unwrap_or("");
    let region = request.region.as_deref().unwrap_or("");

    if let Err(e) = validation::validate_name(full_name, "Full name") {
        errors.add("full_name", e);
    }
    if let Err(e) = validation::validate_email(email) {
        errors.add("email", e);
    }
    if let Err(e) = validation::validate_required_text(category, "Category", 100) {
        errors.add("category", e);
    }
    if let Err(e) = validation::validate_required_text(description, "Description", 2000) {
        errors.add("description", e);
    }
    if let Err(e) = validation::validate_required_text(region, "Region", 100) {
        errors.add("region", e);
    }
    errors.finish()?;

    // Membership gate: the talent registry is a member benefit.
    let account = users::find_by_email(&state.db, email).await?;
    let Some(account) = account else {
        return Err(ApiError::forbidden(
            "Talent registration is open to members only. Please register as a member first.",
        ));
    };

    if talent_email_exists(&state.db, email).await? {
        return Err(ApiError::conflict(
            "A talent profile with this email is already registered",
        ));
    }

    let id = Uuid::new_v4().to_string();
    let result = sqlx::query(
        r#"
        INSERT INTO talents (id, user_id, full_name, email, category, description, county, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(&id)
    .bind(&account.user_id)
    .bind(full_name.trim())
    .bind(users::normalize_email(email))
    .bind(category.trim())
    .bind(description.trim())
    .bind(region.trim())
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await;

    if let Err(e) = result {
        return Err(if db::is_unique_violation(&e) {
            ApiError::conflict("A talent profile with this email is already registered")
        } else {
            e.into()
        });
    }

    tracing::info!(talent_id = %id, "Talent registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "talentId": id })),
    ))
}

/// GET /api/talents/pending: staff review queue.
pub async fn pending_talents(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<Talent>>, ApiError> {
    require_role(&session, STAFF_ROLES)?;

    let talents = sqlx::query_as::<_, Talent>(
        "SELECT * FROM talents WHERE status = 'pending' ORDER BY created_at ASC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(talents))
}

/// PATCH /api/talents/status: verify or reject a pending talent.
pub async fn update_talent_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<UpdateTalentStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let reviewer = authorize_fresh(&state.db, &session, STAFF_ROLES).await?;

    if !matches!(request.status.as_str(), "active" | "rejected") {
        return Err(ApiError::validation_field(
            "status",
            "Status must be 'active' or 'rejected'",
        ));
    }

    let result = sqlx::query("UPDATE talents SET status = ?, verified_by = ? WHERE id = ?")
        .bind(&request.status)
        .bind(&reviewer.user_id)
        .bind(&request.talent_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Talent not found"));
    }

    tracing::info!(talent_id = %request.talent_id, status = %request.status, "Talent reviewed");
    Ok(Json(json!({ "success": true })))
}

/// PATCH /api/talents/:id: sparse edit of profile fields.
pub async fn update_talent(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<RegisterTalentRequest>,
) -> Result<Json<Value>, ApiError> {
    authorize_fresh(&state.db, &session, STAFF_ROLES).await?;

    let mut builder = UpdateBuilder::new("talents", "id");
    builder.set_if("full_name", request.full_name);
    builder.set_if("category", request.category);
    builder.set_if("description", request.description);
    builder.set_if("county", request.region);
    if builder.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    if builder.execute(&state.db, &id).await? == 0 {
        return Err(ApiError::not_found("Talent not found"));
    }
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/talents/:id
pub async fn delete_talent(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    authorize_fresh(&state.db, &session, STAFF_ROLES).await?;

    let result = sqlx::query("DELETE FROM talents WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Talent not found"));
    }
    Ok(Json(json!({ "success": true })))
}

async fn talent_email_exists(pool: &sqlx::SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM talents WHERE email = ? LIMIT 1")
        .bind(users::normalize_email(email))
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}
