use crate::http::management::auth::authorize;
use crate::http::management::HttpManagementExtensions;
use axum::{middleware, Extension, Router};
use tower_http::cors::CorsLayer;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::{Config, SwaggerUi};

mod categories;
mod posts;
mod project_categories;
mod projects;

#[derive(OpenApi)]
#[openapi(
    info(title = "Portfolio Management API", version = "0.1.0"),
    modifiers(&BearerAuth),
    security(("admin_token" = []))
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi
            .components
            .get_or_insert_with(Default::default)
            .add_security_scheme(
                "admin_token",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
    }
}

pub(crate) fn get_router(ext: HttpManagementExtensions) -> Router {
    let router = OpenApiRouter::with_openapi(ApiDoc::openapi())
        // Blog posts
        .routes(routes!(posts::list, posts::create))
        .routes(routes!(posts::get, posts::update, posts::delete))
        // Blog categories
        .routes(routes!(categories::list, categories::create))
        .routes(routes!(categories::get, categories::update, categories::delete))
        // Projects
        .routes(routes!(projects::list, projects::create))
        .routes(routes!(projects::get, projects::update, projects::delete))
        // Project categories
        .routes(routes!(project_categories::list, project_categories::create))
        .routes(routes!(
            project_categories::get,
            project_categories::update,
            project_categories::delete
        ))
        // Layers
        .layer(middleware::from_fn(authorize))
        .layer(Extension(ext.admin_token))
        .layer(Extension(ext.blog_posts))
        .layer(Extension(ext.blog_categories))
        .layer(Extension(ext.projects))
        .layer(Extension(ext.project_categories))
        .layer(CorsLayer::permissive());

    let (router, api) = router.split_for_parts();

    let config = Config::from("/api/api-docs/openapi.json");
    router.merge(
        SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", api)
            .config(config),
    )
}
