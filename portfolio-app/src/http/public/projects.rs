use crate::controllers::project::{ProjectFilter, ProjectPage, PublicProject};
use crate::controllers::project_category::ProjectCategoryItem;
use crate::http::public::{pagination, param, HttpPublicExtensions};
use crate::http::ApiError;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use portfolio_core::http::admin::ItemWithId;
use serde::Deserialize;
use utoipa::IntoParams;

const DEFAULT_PAGE_SIZE: u64 = 9;

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct ProjectListParams {
    /// `All` disables the filter.
    category: Option<String>,
    search: Option<String>,
    featured: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/projects",
    tag = "projects",
    params(ProjectListParams),
    responses((status = StatusCode::OK, body = ProjectPage))
)]
pub(crate) async fn list(
    Extension(ext): Extension<HttpPublicExtensions>,
    Query(params): Query<ProjectListParams>,
) -> Result<Json<ProjectPage>, ApiError> {
    let (page, limit) = pagination(
        params.page.as_deref(),
        params.limit.as_deref(),
        DEFAULT_PAGE_SIZE,
    );
    let filter = ProjectFilter {
        category: param(params.category),
        search: param(params.search),
        featured: param(params.featured).and_then(|f| f.parse().ok()),
    };

    Ok(Json(ext.projects.public_list(&filter, page, limit).await?))
}

#[utoipa::path(
    get,
    path = "/api/projects/categories",
    tag = "projects",
    responses((status = StatusCode::OK, body = [ItemWithId<ProjectCategoryItem>]))
)]
pub(crate) async fn categories(
    Extension(ext): Extension<HttpPublicExtensions>,
) -> Result<Json<Vec<ItemWithId<ProjectCategoryItem>>>, ApiError> {
    Ok(Json(ext.project_categories.all().await?))
}

#[utoipa::path(
    get,
    path = "/api/projects/{id}",
    tag = "projects",
    params(("id" = i32, Path, description = "Project id")),
    responses(
        (status = StatusCode::OK, body = PublicProject),
        (status = StatusCode::NOT_FOUND),
    )
)]
pub(crate) async fn get(
    Extension(ext): Extension<HttpPublicExtensions>,
    Path(id): Path<String>,
) -> Result<Json<PublicProject>, ApiError> {
    let id: i32 = id.parse().map_err(|_| ApiError::NotFound)?;
    ext.projects
        .public_by_id(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

#[cfg(test)]
mod tests {
    use crate::controllers::project::ProjectItem;
    use crate::controllers::project_category::ProjectCategoryItem;
    use crate::http::testing::{send, TestApp};
    use axum::http::{Method, StatusCode};
    use portfolio_core::http::admin::AdminCrudTable;
    use serde_json::Value;

    fn project(title: &str, category: &str, featured: bool) -> ProjectItem {
        ProjectItem {
            title: title.to_string(),
            description: format!("{title} description"),
            long_description: String::new(),
            technologies: vec!["Rust".to_string()],
            image_url: "/img.png".to_string(),
            github_url: None,
            live_url: Some("https://example.com".to_string()),
            featured,
            category: category.to_string(),
        }
    }

    async fn seed(app: &TestApp) -> i32 {
        let projects = &app.public.projects;
        let first = projects
            .create(project("Compiler", "Systems", true))
            .await
            .unwrap()
            .id;
        projects
            .create(project("Blog Engine", "Web", false))
            .await
            .unwrap();
        projects
            .create(project("Web Shop", "Web", true))
            .await
            .unwrap();
        first
    }

    fn titles(body: &Value) -> Vec<&str> {
        body["projects"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["title"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn lists_newest_first_with_filters() {
        let app = TestApp::new().await;
        seed(&app).await;

        let (status, body) =
            send(app.public_router(), Method::GET, "/api/projects", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&body), vec!["Web Shop", "Blog Engine", "Compiler"]);
        assert_eq!(body["total"], 3);
        assert_eq!(body["totalPages"], 1);
        assert_eq!(body["projects"][0]["technologies"], serde_json::json!(["Rust"]));

        let (_, body) = send(
            app.public_router(),
            Method::GET,
            "/api/projects?category=All",
            None,
            None,
        )
        .await;
        assert_eq!(body["total"], 3);

        let (_, body) = send(
            app.public_router(),
            Method::GET,
            "/api/projects?category=Web&featured=true",
            None,
            None,
        )
        .await;
        assert_eq!(titles(&body), vec!["Web Shop"]);

        let (_, body) = send(
            app.public_router(),
            Method::GET,
            "/api/projects?search=engine",
            None,
            None,
        )
        .await;
        assert_eq!(titles(&body), vec!["Blog Engine"]);
    }

    #[tokio::test]
    async fn get_by_id_and_missing() {
        let app = TestApp::new().await;
        let id = seed(&app).await;

        let (status, body) = send(
            app.public_router(),
            Method::GET,
            &format!("/api/projects/{id}"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Compiler");
        assert_eq!(body["id"], id);

        for uri in ["/api/projects/9999", "/api/projects/not-a-number"] {
            let (status, _) = send(app.public_router(), Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn categories_are_sorted_by_name() {
        let app = TestApp::new().await;
        for name in ["Web", "Systems"] {
            app.public
                .project_categories
                .create(ProjectCategoryItem {
                    name: name.to_string(),
                    slug: String::new(),
                })
                .await
                .unwrap();
        }

        let (status, body) = send(
            app.public_router(),
            Method::GET,
            "/api/projects/categories",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "Systems");
        assert_eq!(body[0]["slug"], "systems");
        assert_eq!(body[1]["name"], "Web");
    }
}
