use crate::controllers::newsletter::{normalize_email, NewsletterError};
use crate::http::public::HttpPublicExtensions;
use crate::http::{ApiError, JsonBody};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::Html;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct SubscribeRequest {
    email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct UnsubscribeRequest {
    token: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct TokenQuery {
    token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct SuccessResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn newsletter_error(e: NewsletterError, upstream_message: &'static str) -> ApiError {
    match e {
        NewsletterError::Throttled => ApiError::Throttled,
        NewsletterError::InvalidToken => ApiError::InvalidToken,
        NewsletterError::TokensNotConfigured => {
            warn!("PORTFOLIO_UNSUBSCRIBE_SECRET is not set, cannot verify unsubscribe tokens");
            ApiError::Configuration
        }
        NewsletterError::Mail(_) => ApiError::Upstream(upstream_message),
    }
}

#[utoipa::path(
    post,
    path = "/api/subscribe",
    tag = "newsletter",
    request_body = SubscribeRequest,
    responses(
        (status = StatusCode::OK, body = SuccessResponse, description = "Address added to the mailing list"),
        (status = StatusCode::BAD_REQUEST, description = "Missing or invalid email"),
        (status = StatusCode::TOO_MANY_REQUESTS, description = "Same address submitted within the last minute"),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "Mail provider failure or missing configuration"),
    )
)]
pub(crate) async fn subscribe(
    Extension(ext): Extension<HttpPublicExtensions>,
    JsonBody(request): JsonBody<SubscribeRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let raw = request.email.unwrap_or_default();
    if raw.trim().is_empty() {
        return Err(ApiError::Validation("Email is required"));
    }
    let email = normalize_email(&raw).ok_or(ApiError::Validation("Invalid email address"))?;
    let newsletter = ext.newsletter.ok_or(ApiError::Configuration)?;

    newsletter
        .subscribe(email)
        .await
        .map_err(|e| newsletter_error(e, "Failed to subscribe"))?;

    Ok(Json(SuccessResponse {
        success: true,
        message: Some("Successfully subscribed to newsletter".to_string()),
    }))
}

async fn unsubscribe_with(
    ext: HttpPublicExtensions,
    token: Option<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let token = token.unwrap_or_default();
    if token.trim().is_empty() {
        return Err(ApiError::Validation("Unsubscribe token is required"));
    }
    let newsletter = ext.newsletter.ok_or(ApiError::Configuration)?;

    newsletter
        .unsubscribe(&token)
        .await
        .map_err(|e| newsletter_error(e, "Failed to unsubscribe"))?;

    Ok(Json(SuccessResponse {
        success: true,
        message: None,
    }))
}

#[utoipa::path(
    post,
    path = "/api/unsubscribe",
    tag = "newsletter",
    request_body = UnsubscribeRequest,
    responses(
        (status = StatusCode::OK, body = SuccessResponse),
        (status = StatusCode::BAD_REQUEST, description = "Missing, invalid or expired token"),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "Mail provider failure or missing configuration"),
    )
)]
pub(crate) async fn unsubscribe(
    Extension(ext): Extension<HttpPublicExtensions>,
    JsonBody(request): JsonBody<UnsubscribeRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    unsubscribe_with(ext, request.token).await
}

/// One-click target of the `List-Unsubscribe` header (RFC 8058).
#[utoipa::path(
    post,
    path = "/api/list-unsubscribe",
    tag = "newsletter",
    params(TokenQuery),
    responses(
        (status = StatusCode::OK, body = SuccessResponse),
        (status = StatusCode::BAD_REQUEST, description = "Missing, invalid or expired token"),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "Mail provider failure or missing configuration"),
    )
)]
pub(crate) async fn list_unsubscribe(
    Extension(ext): Extension<HttpPublicExtensions>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<SuccessResponse>, ApiError> {
    unsubscribe_with(ext, query.token).await
}

/// Opening the link only asks for confirmation, so link scanners and
/// prefetchers cannot unsubscribe anyone.
#[utoipa::path(
    get,
    path = "/api/list-unsubscribe",
    tag = "newsletter",
    params(TokenQuery),
    responses(
        (status = StatusCode::OK, body = String, content_type = "text/html", description = "Confirmation form"),
        (status = StatusCode::BAD_REQUEST, description = "Missing, invalid or expired token"),
    )
)]
pub(crate) async fn list_unsubscribe_confirm(
    Extension(ext): Extension<HttpPublicExtensions>,
    Query(query): Query<TokenQuery>,
) -> Result<Html<String>, ApiError> {
    let token = query.token.unwrap_or_default();
    if token.trim().is_empty() {
        return Err(ApiError::Validation("Unsubscribe token is required"));
    }
    let newsletter = ext.newsletter.ok_or(ApiError::Configuration)?;
    newsletter
        .verify_token(&token)
        .map_err(|e| newsletter_error(e, "Failed to unsubscribe"))?;

    // form-urlencoding leaves nothing that needs HTML escaping
    let token: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: sans-serif;">
  <form method="post" action="/api/list-unsubscribe?token={token}">
    <p>Unsubscribe from the newsletter?</p>
    <button type="submit">Unsubscribe</button>
  </form>
</body>
</html>
"#
    )))
}

#[cfg(test)]
mod tests {
    use crate::http::testing::{send, TestApp};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use portfolio_core::mail::MailingList;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn subscribe_then_repeat_is_throttled() {
        let app = TestApp::new().await;

        let (status, body) = send(
            app.public_router(),
            Method::POST,
            "/api/subscribe",
            None,
            Some(json!({"email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"success": true, "message": "Successfully subscribed to newsletter"})
        );
        assert!(app.mailer.is_member("a@x.com"));

        let (status, body) = send(
            app.public_router(),
            Method::POST,
            "/api/subscribe",
            None,
            Some(json!({"email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            body,
            json!({"error": "Please wait a moment before trying again"})
        );

        app.clock.advance(61_000);
        let (status, _) = send(
            app.public_router(),
            Method::POST,
            "/api/subscribe",
            None,
            Some(json!({"email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn subscribe_requires_email() {
        let app = TestApp::new().await;

        let (status, body) = send(
            app.public_router(),
            Method::POST,
            "/api/subscribe",
            None,
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Email is required"}));

        let (status, body) = send(
            app.public_router(),
            Method::POST,
            "/api/subscribe",
            None,
            Some(json!({"email": "not-an-address"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid email address"}));
        assert!(app.mailer.members().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let app = TestApp::new().await;

        let (status, body) = send(
            app.public_router(),
            Method::POST,
            "/api/subscribe",
            None,
            Some(json!(["a@x.com"])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid request body"}));
    }

    #[tokio::test]
    async fn upstream_failure_is_generic_and_retryable() {
        let app = TestApp::new().await;
        app.mailer.fail_list(true);

        let (status, body) = send(
            app.public_router(),
            Method::POST,
            "/api/subscribe",
            None,
            Some(json!({"email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to subscribe"}));

        app.mailer.fail_list(false);
        let (status, _) = send(
            app.public_router(),
            Method::POST,
            "/api/subscribe",
            None,
            Some(json!({"email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_mail_configuration_is_reported() {
        let mut app = TestApp::new().await;
        app.public.newsletter = None;

        let (status, body) = send(
            app.public_router(),
            Method::POST,
            "/api/subscribe",
            None,
            Some(json!({"email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Server configuration error"}));
    }

    #[tokio::test]
    async fn unsubscribe_with_garbage_token() {
        let app = TestApp::new().await;

        let (status, body) = send(
            app.public_router(),
            Method::POST,
            "/api/unsubscribe",
            None,
            Some(json!({"token": "garbage"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid or expired unsubscribe token"}));

        let (status, body) = send(
            app.public_router(),
            Method::POST,
            "/api/unsubscribe",
            None,
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Unsubscribe token is required"}));
    }

    #[tokio::test]
    async fn unsubscribe_with_valid_token() {
        let app = TestApp::new().await;
        app.mailer.add_member("a@x.com").await.unwrap();
        let token = app.tokens.issue("a@x.com").encode();

        let (status, body) = send(
            app.public_router(),
            Method::POST,
            "/api/unsubscribe",
            None,
            Some(json!({"token": token})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));
        assert!(!app.mailer.is_member("a@x.com"));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let app = TestApp::new().await;
        let token = app.tokens.issue("a@x.com").encode();
        app.clock.advance(portfolio_core::token::DEFAULT_MAX_AGE_MS + 1);

        let (status, body) = send(
            app.public_router(),
            Method::POST,
            "/api/unsubscribe",
            None,
            Some(json!({"token": token})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid or expired unsubscribe token"}));
    }

    #[tokio::test]
    async fn one_click_unsubscribe_link_from_welcome_email() {
        let app = TestApp::new().await;

        send(
            app.public_router(),
            Method::POST,
            "/api/subscribe",
            None,
            Some(json!({"email": "a+b@x.com"})),
        )
        .await;

        let welcome = app.mailer.sent().remove(0);
        let header = welcome.get_header("List-Unsubscribe").unwrap().to_string();
        let link = header
            .split(", ")
            .find(|target| target.starts_with("<https://"))
            .unwrap()
            .trim_matches(|c| c == '<' || c == '>');
        let uri = link.trim_start_matches("https://example.com");

        let (status, _) = send(app.public_router(), Method::POST, uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!app.mailer.is_member("a+b@x.com"));
    }

    #[tokio::test]
    async fn unsubscribe_upstream_failure() {
        let app = TestApp::new().await;
        let token = app.tokens.issue("a@x.com").encode();
        app.mailer.fail_list(true);

        let (status, body) = send(
            app.public_router(),
            Method::POST,
            &format!("/api/list-unsubscribe?token={}", urlencode(&token)),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to unsubscribe"}));
    }

    #[tokio::test]
    async fn opening_the_link_keeps_the_subscription() {
        let app = TestApp::new().await;
        app.mailer.add_member("a@x.com").await.unwrap();
        let token = urlencode(&app.tokens.issue("a@x.com").encode());

        let request = Request::builder()
            .method(Method::GET)
            .uri(format!("/api/list-unsubscribe?token={token}"))
            .body(Body::empty())
            .unwrap();
        let response = app.public_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains(&format!(
            r#"method="post" action="/api/list-unsubscribe?token={token}""#
        )));
        assert!(app.mailer.is_member("a@x.com"));
        assert!(app.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn opening_the_link_with_a_bad_token() {
        let app = TestApp::new().await;

        let (status, body) = send(
            app.public_router(),
            Method::GET,
            "/api/list-unsubscribe?token=bm9wZQ%3D%3D",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid or expired unsubscribe token"}));
    }

    fn urlencode(value: &str) -> String {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }
}
