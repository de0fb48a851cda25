use crate::controllers::blog_post::{BlogPostController, BlogPostItem};
use crate::http::JsonBody;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use portfolio_core::http::admin::{
    AdminCrudError, AdminCrudTable, ItemWithId, ListQueryParams, RefineListQueryParams,
};
use std::sync::Arc;

#[utoipa::path(get, path = "/v1/posts", tag = "posts", params(RefineListQueryParams))]
pub async fn list(
    Query(params): Query<ListQueryParams>,
    Extension(controller): Extension<Arc<BlogPostController>>,
) -> Result<impl IntoResponse, AdminCrudError> {
    controller.list(params).await
}

#[utoipa::path(get, path = "/v1/posts/{id}", tag = "posts")]
pub async fn get(
    Path((id,)): Path<(i32,)>,
    Extension(controller): Extension<Arc<BlogPostController>>,
) -> Result<Json<ItemWithId<BlogPostItem>>, AdminCrudError> {
    let item = controller
        .get_by_id(id)
        .await?
        .ok_or(AdminCrudError::NotFound)?;
    Ok(Json(ItemWithId { id, item }))
}

#[utoipa::path(post, path = "/v1/posts", tag = "posts", request_body = BlogPostItem)]
pub async fn create(
    Extension(controller): Extension<Arc<BlogPostController>>,
    JsonBody(item): JsonBody<BlogPostItem>,
) -> Result<impl IntoResponse, AdminCrudError> {
    let result = controller.create(item).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(method(put, patch), path = "/v1/posts/{id}", tag = "posts", request_body = BlogPostItem)]
pub async fn update(
    Extension(controller): Extension<Arc<BlogPostController>>,
    Path((id,)): Path<(i32,)>,
    JsonBody(item): JsonBody<BlogPostItem>,
) -> Result<impl IntoResponse, AdminCrudError> {
    let result = controller.update(id, item).await?;
    Ok((StatusCode::ACCEPTED, Json(result)))
}

#[utoipa::path(delete, path = "/v1/posts/{id}", tag = "posts")]
pub async fn delete(
    Path((id,)): Path<(i32,)>,
    Extension(controller): Extension<Arc<BlogPostController>>,
) -> Result<StatusCode, AdminCrudError> {
    controller.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
