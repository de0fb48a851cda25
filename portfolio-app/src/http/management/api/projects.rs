use crate::controllers::project::{ProjectController, ProjectItem};
use crate::http::JsonBody;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use portfolio_core::http::admin::{
    AdminCrudError, AdminCrudTable, ItemWithId, ListQueryParams, RefineListQueryParams,
};
use std::sync::Arc;

#[utoipa::path(get, path = "/v1/projects", tag = "projects", params(RefineListQueryParams))]
pub async fn list(
    Query(params): Query<ListQueryParams>,
    Extension(controller): Extension<Arc<ProjectController>>,
) -> Result<impl IntoResponse, AdminCrudError> {
    controller.list(params).await
}

#[utoipa::path(get, path = "/v1/projects/{id}", tag = "projects")]
pub async fn get(
    Path((id,)): Path<(i32,)>,
    Extension(controller): Extension<Arc<ProjectController>>,
) -> Result<Json<ItemWithId<ProjectItem>>, AdminCrudError> {
    let item = controller
        .get_by_id(id)
        .await?
        .ok_or(AdminCrudError::NotFound)?;
    Ok(Json(ItemWithId { id, item }))
}

#[utoipa::path(post, path = "/v1/projects", tag = "projects", request_body = ProjectItem)]
pub async fn create(
    Extension(controller): Extension<Arc<ProjectController>>,
    JsonBody(item): JsonBody<ProjectItem>,
) -> Result<impl IntoResponse, AdminCrudError> {
    let result = controller.create(item).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(method(put, patch), path = "/v1/projects/{id}", tag = "projects", request_body = ProjectItem)]
pub async fn update(
    Extension(controller): Extension<Arc<ProjectController>>,
    Path((id,)): Path<(i32,)>,
    JsonBody(item): JsonBody<ProjectItem>,
) -> Result<impl IntoResponse, AdminCrudError> {
    let result = controller.update(id, item).await?;
    Ok((StatusCode::ACCEPTED, Json(result)))
}

#[utoipa::path(delete, path = "/v1/projects/{id}", tag = "projects")]
pub async fn delete(
    Path((id,)): Path<(i32,)>,
    Extension(controller): Extension<Arc<ProjectController>>,
) -> Result<StatusCode, AdminCrudError> {
    controller.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
