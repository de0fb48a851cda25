use crate::controllers::blog_category::CategoryWithCount;
use crate::controllers::blog_post::{CategoryFilter, PostFilter, PostPage, PublishedPost};
use crate::http::public::{pagination, param, parse_or, HttpPublicExtensions, MAX_PAGE_SIZE};
use crate::http::ApiError;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use utoipa::IntoParams;

const DEFAULT_PAGE_SIZE: u64 = 10;
const DEFAULT_RECENT: u64 = 3;

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct PostListParams {
    /// Category id or slug.
    category: Option<String>,
    tag: Option<String>,
    search: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct RecentParams {
    limit: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/blog/posts",
    tag = "blog",
    params(PostListParams),
    responses((status = StatusCode::OK, body = PostPage))
)]
pub(crate) async fn list_posts(
    Extension(ext): Extension<HttpPublicExtensions>,
    Query(params): Query<PostListParams>,
) -> Result<Json<PostPage>, ApiError> {
    let (page, limit) = pagination(
        params.page.as_deref(),
        params.limit.as_deref(),
        DEFAULT_PAGE_SIZE,
    );
    let filter = PostFilter {
        category: param(params.category).map(|c| CategoryFilter::from(c.as_str())),
        tag: param(params.tag),
        search: param(params.search),
    };

    Ok(Json(ext.blog_posts.published(&filter, page, limit).await?))
}

#[utoipa::path(
    get,
    path = "/api/blog/posts/recent",
    tag = "blog",
    params(RecentParams),
    responses((status = StatusCode::OK, body = [PublishedPost]))
)]
pub(crate) async fn recent_posts(
    Extension(ext): Extension<HttpPublicExtensions>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<PublishedPost>>, ApiError> {
    let limit = parse_or(params.limit.as_deref(), DEFAULT_RECENT).clamp(1, MAX_PAGE_SIZE);
    Ok(Json(ext.blog_posts.recent(limit).await?))
}

#[utoipa::path(
    get,
    path = "/api/blog/posts/{slug}",
    tag = "blog",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = StatusCode::OK, body = PublishedPost),
        (status = StatusCode::NOT_FOUND, description = "No published post with this slug"),
    )
)]
pub(crate) async fn get_post(
    Extension(ext): Extension<HttpPublicExtensions>,
    Path(slug): Path<String>,
) -> Result<Json<PublishedPost>, ApiError> {
    ext.blog_posts
        .published_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

#[utoipa::path(
    get,
    path = "/api/blog/categories",
    tag = "blog",
    responses((status = StatusCode::OK, body = [CategoryWithCount]))
)]
pub(crate) async fn categories(
    Extension(ext): Extension<HttpPublicExtensions>,
) -> Result<Json<Vec<CategoryWithCount>>, ApiError> {
    Ok(Json(ext.blog_categories.with_published_posts().await?))
}
