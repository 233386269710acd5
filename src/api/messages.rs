//! Public contact-form endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::auth::{require_role, CurrentUser, STAFF_ROLES};
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation;
use crate::db::models::{CreateMessageRequest, Message};
use crate::AppState;

/// POST /api/messages
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let name = request.name.as_deref().unwrap_or("");
    let email = request.email.as_deref().unwrap_or("");
    let subject = request.subject.as_deref().unwrap_or("");
    let message = request.message.as_deref().unwrap_or("");

    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_name(name, "Name") {
        errors.add("name", e);
    }
    if let Err(e) = validation::validate_email(email) {
        errors.add("email", e);
    }
    if let Err(e) = validation::validate_required_text(subject, "Subject", 200) {
        errors.add("subject", e);
    }
    if let Err(e) = validation::validate_required_text(message, "Message", 5000) {
        errors.add("message", e);
    }
    errors.finish()?;

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO messages (id, name, email, subject, message, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name.trim())
    .bind(email.trim())
    .bind(subject.trim())
    .bind(message.trim())
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

/// GET /api/messages: staff inbox.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<Message>>, ApiError> {
    require_role(&session, STAFF_ROLES)?;

    let messages =
        sqlx::query_as::<_, Message>("SELECT * FROM messages ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(messages))
}

#[cfg(test)]
mod tests {
    use crate::api::error::ValidationErrorBuilder;
    use crate::api::validation;

    #[test]
    fn test_contact_form_requires_all_fields() {
        let mut errors = ValidationErrorBuilder::new();
        if let Err(e) = validation::validate_name("", "Name") {
            errors.add("name", e);
        }
        if let Err(e) = validation::validate_email("bad") {
            errors.add("email", e);
        }
        if let Err(e) = validation::validate_required_text("", "Subject", 200) {
            errors.add("subject", e);
        }
        assert!(errors.finish().is_err());
    }
}
