mod blog;
mod contact;
mod newsletter;
mod projects;

use crate::controllers::blog_category::BlogCategoryController;
use crate::controllers::blog_post::BlogPostController;
use crate::controllers::contact::ContactController;
use crate::controllers::newsletter::NewsletterController;
use crate::controllers::project::ProjectController;
use crate::controllers::project_category::ProjectCategoryController;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::error;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

const MAX_PAGE_SIZE: u64 = 100;

#[derive(Clone)]
pub(crate) struct HttpPublicExtensions {
    /// `None` when the mail provider is not configured.
    pub newsletter: Option<Arc<NewsletterController>>,
    /// `None` when the mail provider or the admin address is not configured.
    pub contact: Option<Arc<ContactController>>,
    pub blog_posts: Arc<BlogPostController>,
    pub blog_categories: Arc<BlogCategoryController>,
    pub projects: Arc<ProjectController>,
    pub project_categories: Arc<ProjectCategoryController>,
}

#[derive(OpenApi)]
#[openapi(info(
    title = "Portfolio Public API",
    description = "Newsletter, contact form and published content.",
    version = "0.1.0"
))]
struct ApiDoc;

pub(crate) fn get_router(ext: HttpPublicExtensions) -> Router {
    let router = OpenApiRouter::with_openapi(ApiDoc::openapi())
        // Newsletter
        .routes(routes!(newsletter::subscribe))
        .routes(routes!(newsletter::unsubscribe))
        .routes(routes!(newsletter::list_unsubscribe, newsletter::list_unsubscribe_confirm))
        // Contact form
        .routes(routes!(contact::contact))
        // Blog
        .routes(routes!(blog::list_posts))
        .routes(routes!(blog::recent_posts))
        .routes(routes!(blog::get_post))
        .routes(routes!(blog::categories))
        // Projects
        .routes(routes!(projects::list))
        .routes(routes!(projects::categories))
        .routes(routes!(projects::get))
        .layer(Extension(ext));

    let (router, api) = router.split_for_parts();
    router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
}

pub(crate) async fn start(
    bind: SocketAddr,
    ext: HttpPublicExtensions,
    metric_layer: Option<PrometheusMetricLayer<'static>>,
) -> anyhow::Result<()> {
    // Bind everything now to catch any errors before spinning up the coroutines
    let listener = TcpListener::bind(bind).await?;

    let mut app = get_router(ext);
    if let Some(layer) = metric_layer {
        app = app.layer(layer);
    }

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Public HTTP server stopped: {e}");
        }
    });
    Ok(())
}

/// Trimmed query value, `None` when blank.
fn param(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(value: Option<&str>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// 1-based page and a page size within `1..=MAX_PAGE_SIZE`.
fn pagination(page: Option<&str>, limit: Option<&str>, default_limit: u64) -> (u64, u64) {
    let page = parse_or(page, 1u64).max(1);
    let limit = parse_or(limit, default_limit).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_falls_back_and_clamps() {
        assert_eq!(pagination(None, None, 10), (1, 10));
        assert_eq!(pagination(Some("3"), Some("5"), 10), (3, 5));
        assert_eq!(pagination(Some("0"), Some("0"), 10), (1, 1));
        assert_eq!(pagination(Some("abc"), Some("1000"), 9), (1, 100));
        assert_eq!(pagination(Some("-2"), Some("-1"), 9), (1, 9));
    }

    #[test]
    fn blank_params_are_absent() {
        assert_eq!(param(Some("  rust ".to_string())), Some("rust".to_string()));
        assert_eq!(param(Some("   ".to_string())), None);
        assert_eq!(param(None), None);
    }
}
