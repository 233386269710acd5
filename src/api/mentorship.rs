//! Mentorship program endpoints.
//!
//! Enrollment follows the talent-registry rules: members only, one profile
//! per email.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::auth::{authorize_fresh, CurrentUser, STAFF_ROLES};
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation;
use crate::db::models::{DeleteMenteeRequest, Mentee};
use crate::db::{self, users};
use crate::storage::{self, MAX_UPLOAD_BYTES};
use crate::AppState;

/// GET /api/mentorship
pub async fn list_mentees(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Mentee>>, ApiError> {
    let mentees = sqlx::query_as::<_, Mentee>("SELECT * FROM mentorship ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(mentees))
}

#[derive(Debug, Default)]
struct MenteeForm {
    full_name: String,
    email: String,
    phone: String,
    field: String,
    image: Option<(String, Option<String>, Vec<u8>)>,
}

impl MenteeForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = MenteeForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == "image" {
                let filename = field.file_name().unwrap_or("image").to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read image: {e}")))?;
                if !bytes.is_empty() {
                    form.image = Some((filename, content_type, bytes.to_vec()));
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid field {name}: {e}")))?;
            match name.as_str() {
                "full_name" => form.full_name = value,
                "email" => form.email = value,
                "phone" => form.phone = value,
                "field" => form.field = value,
                _ => {}
            }
        }
        Ok(form)
    }

    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrorBuilder::new();

        if let Err(e) = validation::validate_name(&self.full_name, "Full name") {
            errors.add("full_name", e);
        }
        if let Err(e) = validation::validate_email(&self.email) {
            errors.add("email", e);
        }
        if let Some((filename, content_type, bytes)) = &self.image {
            if bytes.len() > MAX_UPLOAD_BYTES {
                errors.add("image", "Image must be 5MB or smaller");
            }
            if !storage::is_allowed_image(content_type.as_deref(), filename) {
                errors.add("image", "Image must be a JPEG, PNG, WebP or GIF image");
            }
        }

        errors.finish()
    }
}

/// POST /api/mentorship
pub async fn register_mentee(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let form = MenteeForm::from_multipart(multipart).await?;
    form.validate()?;

    if users::find_by_email(&state.db, &form.email).await?.is_none() {
        return Err(ApiError::forbidden(
            "Mentorship enrollment is open to members only. Please register as a member first.",
        ));
    }

    let exists: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM mentorship WHERE email = ? LIMIT 1")
            .bind(users::normalize_email(&form.email))
            .fetch_optional(&state.db)
            .await?;
    if exists.is_some() {
        return Err(ApiError::conflict(
            "This email is already enrolled in the mentorship program",
        ));
    }

    let image = match &form.image {
        Some((filename, _, bytes)) => Some(
            state
                .uploads
                .save("mentorship", filename, bytes)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to store image: {e}")))?,
        ),
        None => None,
    };

    let id = Uuid::new_v4().to_string();
    let result = sqlx::query(
        r#"
        INSERT INTO mentorship (id, full_name, email, phone, field, image, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(form.full_name.trim())
    .bind(users::normalize_email(&form.email))
    .bind(blank_to_null(&form.phone))
    .bind(blank_to_null(&form.field))
    .bind(&image)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await;

    if let Err(e) = result {
        if let Some(name) = &image {
            state.uploads.remove("mentorship", name).await;
        }
        return Err(if db::is_unique_violation(&e) {
            ApiError::conflict("This email is already enrolled in the mentorship program")
        } else {
            e.into()
        });
    }

    tracing::info!(mentee_id = %id, "Mentee enrolled");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "menteeId": id })),
    ))
}

/// DELETE /api/mentorship
pub async fn delete_mentee(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<DeleteMenteeRequest>,
) -> Result<Json<Value>, ApiError> {
    authorize_fresh(&state.db, &session, STAFF_ROLES).await?;

    let id = request
        .id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Mentee id is required"))?;

    let mentee: Option<(Option<String>,)> =
        sqlx::query_as("SELECT image FROM mentorship WHERE id = ?")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;
    let Some((image,)) = mentee else {
        return Err(ApiError::not_found("Mentee not found"));
    };

    sqlx::query("DELETE FROM mentorship WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    if let Some(image) = &image {
        state.uploads.remove("mentorship", image).await;
    }

    tracing::info!(mentee_id = %id, "Mentee removed");
    Ok(Json(json!({ "success": true })))
}

fn blank_to_null(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> MenteeForm {
        MenteeForm {
            full_name: "Zawadi N".to_string(),
            email: "zawadi@example.org".to_string(),
            phone: "+254 700 111222".to_string(),
            field: "Photography".to_string(),
            image: None,
        }
    }

    #[test]
    fn test_valid_mentee_passes() {
        assert!(valid_form().validate().is_ok());
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut form = valid_form();
        form.email = "nope".to_string();
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_non_image_upload_rejected() {
        let mut form = valid_form();
        form.image = Some((
            "cv.pdf".to_string(),
            Some("application/pdf".to_string()),
            vec![1],
        ));
        assert!(form.validate().is_err());
    }
}
