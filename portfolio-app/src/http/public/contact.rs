use crate::controllers::contact::ContactMessage;
use crate::controllers::newsletter::normalize_email;
use crate::http::public::{param, HttpPublicExtensions};
use crate::http::{ApiError, JsonBody};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct ContactRequest {
    name: Option<String>,
    email: Option<String>,
    message: Option<String>,
    subject: Option<String>,
}

impl ContactRequest {
    fn into_message(self) -> Option<ContactMessage> {
        Some(ContactMessage {
            name: param(self.name)?,
            email: param(self.email)?,
            message: param(self.message)?,
            subject: param(self.subject),
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ContactResponse {
    message: String,
}

#[utoipa::path(
    post,
    path = "/api/contact",
    tag = "contact",
    request_body = ContactRequest,
    responses(
        (status = StatusCode::OK, body = ContactResponse),
        (status = StatusCode::BAD_REQUEST, description = "A required field is missing or the email is invalid"),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "The message could not be sent"),
    )
)]
pub(crate) async fn contact(
    Extension(ext): Extension<HttpPublicExtensions>,
    JsonBody(request): JsonBody<ContactRequest>,
) -> Result<Json<ContactResponse>, ApiError> {
    let mut message = request
        .into_message()
        .ok_or(ApiError::Validation("All fields are required"))?;
    message.email = normalize_email(&message.email)
        .ok_or(ApiError::Validation("Invalid email address"))?
        .to_string();
    let contact = ext.contact.ok_or(ApiError::Configuration)?;

    contact
        .submit(&message)
        .await
        .map_err(|_| ApiError::Upstream("Failed to send message. Please try again later."))?;

    Ok(Json(ContactResponse {
        message: "Message sent successfully".to_string(),
    }))
}
