use crate::http::ApiError;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::typed_header::TypedHeaderRejection;
use axum_extra::TypedHeader;
use portfolio_core::http::AdminToken;
use std::sync::Arc;
use tracing::{debug, warn};

/// Lets the request through only with `Authorization: Bearer <admin token>`.
pub(crate) async fn authorize(
    Extension(admin_token): Extension<Option<Arc<AdminToken>>>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(admin_token) = admin_token else {
        warn!("PORTFOLIO_ADMIN_TOKEN is not set, refusing management API request");
        return Err(ApiError::Configuration);
    };

    match bearer {
        Ok(TypedHeader(auth)) if admin_token.matches(auth.token()) => Ok(next.run(request).await),
        _ => {
            debug!(path = %request.uri().path(), "Rejected management API request");
            Err(ApiError::Unauthorized)
        }
    }
}
