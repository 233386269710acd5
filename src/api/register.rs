//! Payment-gated member registration.
//!
//! Three steps, all driven by the browser: create a gateway order, capture
//! it after approval, then submit the registration form carrying the
//! captured order id. The capture step writes a pending-registration row
//! before any account exists, so a crash between payment and account
//! creation leaves a retryable order id rather than a lost fee.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::auth::hash_password;
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation;
use crate::auth::Role;
use crate::db::models::NewUser;
use crate::db::{self, registrations, users};
use crate::payment;
use crate::storage::{self, MAX_UPLOAD_BYTES};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub amount: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    #[serde(rename = "orderID")]
    pub order_id: Option<String>,
}

/// POST /api/payments/orders
///
/// The client echoes the fee it displayed; anything but the configured fee
/// is rejected before the gateway is contacted.
pub async fn create_payment_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<Value>, ApiError> {
    let fee = &state.config.paypal.registration_fee;
    match request.amount.as_deref() {
        Some(amount) if amount == fee => {}
        _ => {
            return Err(ApiError::validation_field(
                "amount",
                format!("Registration fee is {} {}", fee, state.config.paypal.currency),
            ))
        }
    }

    let description = request
        .description
        .as_deref()
        .unwrap_or("Membership registration fee");

    let order = state
        .gateway
        .create_order(fee, &state.config.paypal.currency, description)
        .await?;

    tracing::info!(
        order_id = order.get("id").and_then(|v| v.as_str()).unwrap_or("?"),
        "Created payment order"
    );
    Ok(Json(order))
}

/// POST /api/payments/capture
///
/// Only a capture that reaches the gateway's terminal-success status counts
/// as paid; anything else is surfaced as a rejection with the gateway body
/// attached so the widget can offer a retry.
pub async fn capture_payment_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CaptureRequest>,
) -> Result<Json<Value>, ApiError> {
    let order_id = match request.order_id.as_deref() {
        Some(id) if !id.trim().is_empty() => id.trim(),
        _ => return Err(ApiError::bad_request("orderID is required")),
    };

    let capture = state.gateway.capture_order(order_id).await?;

    if !payment::capture_completed(&capture) {
        let status = capture
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN");
        tracing::warn!(order_id, status, "Capture did not complete");
        return Err(ApiError::gateway_rejected(
            format!("Payment was not completed (status: {})", status),
            capture,
        ));
    }

    let (amount, currency) = captured_amount(&capture)
        .unwrap_or((state.config.paypal.registration_fee.clone(), state.config.paypal.currency.clone()));
    registrations::record_capture(&state.db, order_id, &amount, &currency).await?;

    tracing::info!(order_id, %amount, "Payment captured");
    Ok(Json(capture_response(&capture)))
}

/// The widget reads `status` (and the other capture fields) at the top
/// level, so the gateway's capture object is spread beside the success flag
/// rather than nested under a key.
fn capture_response(capture: &Value) -> Value {
    let mut body = serde_json::Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    if let Some(fields) = capture.as_object() {
        body.extend(fields.clone());
    }
    Value::Object(body)
}

/// Pull the captured amount out of the gateway response.
fn captured_amount(capture: &Value) -> Option<(String, String)> {
    let amount = capture
        .get("purchase_units")?
        .get(0)?
        .get("payments")?
        .get("captures")?
        .get(0)?
        .get("amount")?;
    Some((
        amount.get("value")?.as_str()?.to_string(),
        amount.get("currency_code")?.as_str()?.to_string(),
    ))
}

/// The registration form after multipart decoding.
#[derive(Debug, Default)]
struct RegistrationForm {
    first_name: String,
    second_name: Option<String>,
    email: String,
    password: String,
    password_confirm: String,
    phone: String,
    address: String,
    gender: String,
    aspiration: String,
    order_id: String,
    photo: Option<(String, Option<String>, Vec<u8>)>,
}

impl RegistrationForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = RegistrationForm::default();

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
                "first_name" => form.first_name = value,
                "second_name" => form.second_name = Some(value),
                "email" => form.email = value,
                "password" => form.password = value,
                "password_confirm" => form.password_confirm = value,
                "phone" => form.phone = value,
                "address" => form.address = value,
                "gender" => form.gender = value,
                "aspiration" => form.aspiration = value,
                "order_id" => form.order_id = value,
                _ => {}
            }
        }

        Ok(form)
    }

    /// All field checks, collected so the client gets every problem at once.
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrorBuilder::new();

        if let Err(e) = validation::validate_name(&self.first_name, "First name") {
            errors.add("first_name", e);
        }
        if let Err(e) = validation::validate_email(&self.email) {
            errors.add("email", e);
        }
        if let Err(e) = validation::validate_password(&self.password) {
            errors.add("password", e);
        }
        if let Err(e) =
            validation::validate_password_confirm(&self.password, &self.password_confirm)
        {
            errors.add("password_confirm", e);
        }
        if let Err(e) = validation::validate_phone(&self.phone) {
            errors.add("phone", e);
        }
        if let Err(e) = validation::validate_required_text(&self.address, "Address", 500) {
            errors.add("address", e);
        }
        if let Err(e) = validation::validate_gender(&self.gender) {
            errors.add("gender", e);
        }
        if let Err(e) = validation::validate_required_text(&self.aspiration, "Aspiration", 1000) {
            errors.add("aspiration", e);
        }
        if self.order_id.trim().is_empty() {
            errors.add("order_id", "Payment order id is required");
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

/// POST /api/auth/register
///
/// The captured order is claimed atomically before any account work, so of
/// any number of racing submissions citing the same order, exactly one can
/// create an account. A failed attempt releases the claim and the member
/// can retry with the same order id.
pub async fn register(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let form = RegistrationForm::from_multipart(multipart).await?;
    form.validate()?;

    let order_id = form.order_id.trim().to_string();
    if !registrations::consume(&state.db, &order_id).await? {
        return Err(ApiError::bad_request(
            "No completed payment found for this order. Please complete payment first.",
        ));
    }

    match create_member_account(&state, form).await {
        Ok(user) => {
            tracing::info!(user_id = %user.user_id, "Member registered");
            Ok((
                StatusCode::CREATED,
                Json(json!({ "success": true, "userId": user.user_id })),
            ))
        }
        Err(e) => {
            if let Err(release_err) = registrations::release(&state.db, &order_id).await {
                tracing::error!(
                    order_id = %order_id,
                    error = %release_err,
                    "Failed to release payment order after registration error"
                );
            }
            Err(e)
        }
    }
}

/// Everything between a claimed order and a live account. Errors here mean
/// no account row exists, so the caller releases the order claim.
async fn create_member_account(
    state: &AppState,
    form: RegistrationForm,
) -> Result<crate::db::models::User, ApiError> {
    if users::email_exists(&state.db, &form.email).await? {
        return Err(duplicate_email_conflict());
    }

    let photo = match &form.photo {
        Some((filename, _, bytes)) => Some(
            state
                .uploads
                .save("profile", filename, bytes)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to store photo: {e}")))?,
        ),
        None => None,
    };

    let password_hash = hash_password(&form.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;

    let new_user = NewUser {
        first_name: form.first_name,
        second_name: form.second_name.filter(|s| !s.trim().is_empty()),
        email: form.email,
        password_hash,
        role: Role::Member,
        phone: Some(form.phone),
        address: Some(form.address),
        gender: Some(form.gender.trim().to_lowercase()),
        aspiration: Some(form.aspiration),
        photo: photo.clone(),
    };

    match users::insert(&state.db, new_user).await {
        Ok(user) => Ok(user),
        Err(e) => {
            // The row never materialized; drop the blob it referenced.
            if let Some(name) = &photo {
                state.uploads.remove("profile", name).await;
            }
            Err(if db::is_unique_violation(&e) {
                duplicate_email_conflict()
            } else {
                e.into()
            })
        }
    }
}

/// The payment already went through when this fires, so the message must
/// steer the member to support instead of a second checkout.
fn duplicate_email_conflict() -> ApiError {
    ApiError::conflict(
        "An account with this email already exists. Your payment has been received; \
         please contact support to finish setting up your account.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RegistrationForm {
        RegistrationForm {
            first_name: "Amina".to_string(),
            second_name: Some("Okello".to_string()),
            email: "amina@example.org".to_string(),
            password: "secret123".to_string(),
            password_confirm: "secret123".to_string(),
            phone: "+254 700 123456".to_string(),
            address: "Nairobi".to_string(),
            gender: "female".to_string(),
            aspiration: "Music production".to_string(),
            order_id: "ORDER-1".to_string(),
            photo: None,
        }
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(valid_form().validate().is_ok());
    }

    #[test]
    fn test_short_password_rejected() {
        let mut form = valid_form();
        form.password = "five!".to_string();
        form.password_confirm = "five!".to_string();
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_password_mismatch_rejected() {
        let mut form = valid_form();
        form.password_confirm = "different1".to_string();
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_missing_order_id_rejected() {
        let mut form = valid_form();
        form.order_id = "  ".to_string();
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_oversized_photo_rejected() {
        let mut form = valid_form();
        form.photo = Some((
            "big.png".to_string(),
            Some("image/png".to_string()),
            vec![0u8; MAX_UPLOAD_BYTES + 1],
        ));
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_non_image_photo_rejected() {
        let mut form = valid_form();
        form.photo = Some((
            "resume.pdf".to_string(),
            Some("application/pdf".to_string()),
            vec![1, 2, 3],
        ));
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_capture_fields_are_spread_at_top_level() {
        let capture = json!({
            "id": "ORDER-1",
            "status": "COMPLETED",
            "purchase_units": []
        });
        let body = capture_response(&capture);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["status"], json!("COMPLETED"));
        assert_eq!(body["id"], json!("ORDER-1"));
        assert!(body.get("capture").is_none());
    }

    #[test]
    fn test_captured_amount_extraction() {
        let capture = json!({
            "status": "COMPLETED",
            "purchase_units": [{
                "payments": { "captures": [{ "amount": { "value": "10.00", "currency_code": "USD" } }] }
            }]
        });
        assert_eq!(
            captured_amount(&capture),
            Some(("10.00".to_string(), "USD".to_string()))
        );
        assert_eq!(captured_amount(&json!({"status": "COMPLETED"})), None);
    }
}
