mod api;
mod auth;

use crate::controllers::blog_category::BlogCategoryController;
use crate::controllers::blog_post::BlogPostController;
use crate::controllers::project::ProjectController;
use crate::controllers::project_category::ProjectCategoryController;
use axum::Router;
use portfolio_core::http::AdminToken;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::error;

#[derive(Clone)]
pub(crate) struct HttpManagementExtensions {
    /// `None` when no admin token is configured; every request is then refused.
    pub admin_token: Option<Arc<AdminToken>>,
    pub blog_posts: Arc<BlogPostController>,
    pub blog_categories: Arc<BlogCategoryController>,
    pub projects: Arc<ProjectController>,
    pub project_categories: Arc<ProjectCategoryController>,
}

pub(crate) fn get_router(ext: HttpManagementExtensions) -> Router {
    Router::new().nest("/api", api::get_router(ext))
}

pub(crate) async fn start(bind: SocketAddr, ext: HttpManagementExtensions) -> anyhow::Result<()> {
    // Bind everything now to catch any errors before spinning up the coroutines
    let listener = TcpListener::bind(bind).await?;
    let app = get_router(ext);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Management HTTP server stopped: {e}");
        }
    });
    Ok(())
}
