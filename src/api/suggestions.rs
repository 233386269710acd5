//! Member suggestion box.
//!
//! Members submit and edit their own suggestions; staff read the box and
//! mark entries as handled. Marking your own suggestion read is forbidden,
//! so the flag always reflects a second pair of eyes.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::auth::{authorize_fresh, require_role, CurrentUser, STAFF_ROLES};
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation;
use crate::auth::Role;
use crate::db::models::{
    CreateSuggestionRequest, SuggestionIdRequest, SuggestionWithAuthor, UpdateSuggestionRequest,
};
use crate::AppState;

const LIST_SQL: &str = r#"
    SELECT s.id, s.message, s.created_at, s.user_id, s.is_read,
           u.first_name, u.second_name, u.role
    FROM suggestions s
    JOIN users u ON u.user_id = s.user_id
"#;

/// GET /api/suggestions: staff see the whole box, members their own.
pub async fn list_suggestions(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<SuggestionWithAuthor>>, ApiError> {
    let suggestions = if session.role == Role::Member {
        sqlx::query_as::<_, SuggestionWithAuthor>(&format!(
            "{} WHERE s.user_id = ? ORDER BY s.created_at DESC",
            LIST_SQL
        ))
        .bind(&session.user_id)
        .fetch_all(&state.db)
        .await?
    } else {
        sqlx::query_as::<_, SuggestionWithAuthor>(&format!(
            "{} ORDER BY s.created_at DESC",
            LIST_SQL
        ))
        .fetch_all(&state.db)
        .await?
    };
    Ok(Json(suggestions))
}

/// POST /api/suggestions
pub async fn create_suggestion(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<CreateSuggestionRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let message = request.message.as_deref().unwrap_or("");
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_required_text(message, "Message", 5000) {
        errors.add("message", e);
    }
    errors.finish()?;

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO suggestions (id, user_id, message, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&session.user_id)
    .bind(message.trim())
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "suggestionId": id })),
    ))
}

/// PATCH /api/suggestions: authors edit their own text.
pub async fn update_suggestion(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<UpdateSuggestionRequest>,
) -> Result<Json<Value>, ApiError> {
    let id = required_id(request.id.as_deref())?;
    let message = request.message.as_deref().unwrap_or("");
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_required_text(message, "Message", 5000) {
        errors.add("message", e);
    }
    errors.finish()?;

    let owner: Option<(String,)> = sqlx::query_as("SELECT user_id FROM suggestions WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;
    let Some((owner,)) = owner else {
        return Err(ApiError::not_found("Suggestion not found"));
    };
    if owner != session.user_id {
        return Err(ApiError::forbidden("You can only edit your own suggestions"));
    }

    sqlx::query("UPDATE suggestions SET message = ? WHERE id = ?")
        .bind(message.trim())
        .bind(&id)
        .execute(&state.db)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/suggestions/read
pub async fn mark_suggestion_read(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<SuggestionIdRequest>,
) -> Result<Json<Value>, ApiError> {
    require_role(&session, STAFF_ROLES)?;
    let id = required_id(request.id.as_deref())?;

    let owner: Option<(String,)> = sqlx::query_as("SELECT user_id FROM suggestions WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;
    let Some((owner,)) = owner else {
        return Err(ApiError::not_found("Suggestion not found"));
    };
    if owner == session.user_id {
        return Err(ApiError::forbidden(
            "You cannot mark your own suggestion as read",
        ));
    }

    sqlx::query("UPDATE suggestions SET is_read = 1 WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/suggestions
pub async fn delete_suggestion(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<SuggestionIdRequest>,
) -> Result<Json<Value>, ApiError> {
    authorize_fresh(&state.db, &session, STAFF_ROLES).await?;
    let id = required_id(request.id.as_deref())?;

    let result = sqlx::query("DELETE FROM suggestions WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Suggestion not found"));
    }
    Ok(Json(json!({ "success": true })))
}

fn required_id(id: Option<&str>) -> Result<String, ApiError> {
    id.map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("Suggestion id is required"))
}
