//! Program application endpoints.
//!
//! Anyone can apply; staff review the queue and move applications through
//! pending/approved/rejected.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::auth::{authorize_fresh, require_role, CurrentUser, STAFF_ROLES};
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation;
use crate::db::models::{Application, UpdateApplicationStatusRequest, APPLICATION_STATUSES};
use crate::storage::{self, MAX_UPLOAD_BYTES};
use crate::AppState;

#[derive(Debug, Default)]
struct ApplicationForm {
    full_name: String,
    email: String,
    phone: String,
    region: String,
    application_type: String,
    details: String,
    photo: Option<(String, Option<String>, Vec<u8>)>,
}

impl ApplicationForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = ApplicationForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == "photo" {
                let filename = field.file_name().unwrap_or("photo").to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read photo: {e}")))?;
                if !bytes.is_empty() {
                    form.photo = Some((filename, content_type, bytes.to_vec()));
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
                "region" => form.region = value,
                "application_type" => form.application_type = value,
                "details" => form.details = value,
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
        if !self.email.trim().is_empty() {
            if let Err(e) = validation::validate_email(&self.email) {
                errors.add("email", e);
            }
        }
        if let Err(e) =
            validation::validate_required_text(&self.application_type, "Application type", 100)
        {
            errors.add("application_type", e);
        }
        if let Some((filename, content_type, bytes)) = &self.photo {
            if bytes.len() > MAX_UPLOAD_BYTES {
                errors.add("photo", "Photo must be 5MB or smaller");
            }
            if !storage::is_allowed_image(content_type.as_deref(), filename) {
                errors.add("photo", "Photo must be a JPEG, PNG, WebP or GIF image");
            }
        }

        errors.finish()
    }
}

fn none_if_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// POST /api/applications
pub async fn create_application(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let form = ApplicationForm::from_multipart(multipart).await?;
    form.validate()?;

    let photo = match &form.photo {
        Some((filename, _, bytes)) => Some(
            state
                .uploads
                .save("applications", filename, bytes)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to store photo: {e}")))?,
        ),
        None => None,
    };

    let id = Uuid::new_v4().to_string();
    let result = sqlx::query(
        r#"
        INSERT INTO applications
            (id, full_name, email, phone, photo, region, application_type, details, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(&id)
    .bind(form.full_name.trim())
    .bind(none_if_blank(&form.email))
    .bind(none_if_blank(&form.phone))
    .bind(&photo)
    .bind(none_if_blank(&form.region))
    .bind(form.application_type.trim())
    .bind(none_if_blank(&form.details))
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await;

    if let Err(e) = result {
        if let Some(name) = &photo {
            state.uploads.remove("applications", name).await;
        }
        return Err(e.into());
    }

    tracing::info!(application_id = %id, "Application submitted");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "applicationId": id })),
    ))
}

/// GET /api/applications: staff review list.
pub async fn list_applications(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<Application>>, ApiError> {
    require_role(&session, STAFF_ROLES)?;

    let applications = sqlx::query_as::<_, Application>(
        "SELECT * FROM applications ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(applications))
}

/// PATCH /api/applications/:id/status
pub async fn update_application_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateApplicationStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    authorize_fresh(&state.db, &session, STAFF_ROLES).await?;

    if !APPLICATION_STATUSES.contains(&request.status.as_str()) {
        return Err(ApiError::validation_field(
            "status",
            format!("Status must be one of: {}", APPLICATION_STATUSES.join(", ")),
        ));
    }

    let result = sqlx::query("UPDATE applications SET status = ? WHERE id = ?")
        .bind(&request.status)
        .bind(&id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Application not found"));
    }

    tracing::info!(application_id = %id, status = %request.status, "Application reviewed");
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> ApplicationForm {
        ApplicationForm {
            full_name: "Kofi Mensah".to_string(),
            email: "kofi@example.org".to_string(),
            phone: "+233 20 000 0000".to_string(),
            region: "Accra".to_string(),
            application_type: "volunteer".to_string(),
            details: "I want to help".to_string(),
            photo: None,
        }
    }

    #[test]
    fn test_valid_application_passes() {
        assert!(valid_form().validate().is_ok());
    }

    #[test]
    fn test_email_is_optional_but_checked_when_present() {
        let mut form = valid_form();
        form.email = String::new();
        assert!(form.validate().is_ok());

        form.email = "not-an-email".to_string();
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_missing_type_rejected() {
        let mut form = valid_form();
        form.application_type = "  ".to_string();
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_oversized_photo_rejected() {
        let mut form = valid_form();
        form.photo = Some((
            "me.png".to_string(),
            Some("image/png".to_string()),
            vec![0u8; MAX_UPLOAD_BYTES + 1],
        ));
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_none_if_blank() {
        assert_eq!(none_if_blank("  "), None);
        assert_eq!(none_if_blank(" x "), Some("x"));
    }
}
