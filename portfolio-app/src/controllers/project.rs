use crate::controllers::{decode_list, encode_list, non_blank, now, search_pattern, total_pages};
use crate::entity;
use chrono::{DateTime, FixedOffset};
use portfolio_core::http::admin::{
    AdminCrudError, AdminCrudTable, ItemWithId, ListQueryParams, ListableTrait, PaginatedResult,
};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Category value that disables category filtering.
pub const ALL_CATEGORIES: &str = "All";

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ProjectItem {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub long_description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub live_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    pub category: String,
}

impl From<entity::project::Model> for ProjectItem {
    fn from(value: entity::project::Model) -> Self {
        Self {
            title: value.title,
            description: value.description,
            long_description: value.long_description,
            technologies: decode_list(&value.technologies),
            image_url: value.image_url,
            github_url: value.github_url,
            live_url: value.live_url,
            featured: value.featured,
            category: value.category,
        }
    }
}

impl ProjectItem {
    fn normalized(mut self) -> Result<Self, AdminCrudError> {
        self.title = self.title.trim().to_string();
        self.category = self.category.trim().to_string();
        if self.title.is_empty() {
            return Err(AdminCrudError::InvalidItem("title is required".into()));
        }
        if self.category.is_empty() {
            return Err(AdminCrudError::InvalidItem("category is required".into()));
        }
        self.github_url = non_blank(self.github_url);
        self.live_url = non_blank(self.live_url);
        Ok(self)
    }
}

#[derive(Clone, Debug, Serialize, ToSchema, PartialEq)]
pub struct PublicProject {
    pub id: i32,
    #[serde(flatten)]
    pub project: ProjectItem,
    pub created_at: DateTime<FixedOffset>,
}

impl From<entity::project::Model> for PublicProject {
    fn from(value: entity::project::Model) -> Self {
        Self {
            id: value.id,
            created_at: value.created_at,
            project: value.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPage {
    pub projects: Vec<PublicProject>,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Clone, Debug, Default)]
pub struct ProjectFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub featured: Option<bool>,
}

pub struct ProjectController {
    db: DatabaseConnection,
}

impl ProjectController {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Projects matching `filter`, newest first. `page` is 1-based.
    pub async fn public_list(
        &self,
        filter: &ProjectFilter,
        page: u64,
        limit: u64,
    ) -> Result<ProjectPage, DbErr> {
        use entity::project::{Column, Entity};

        let mut query = Entity::find()
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id);

        if let Some(category) = filter
            .category
            .as_deref()
            .filter(|c| *c != ALL_CATEGORIES)
        {
            query = query.filter(Column::Category.eq(category));
        }
        if let Some(featured) = filter.featured {
            query = query.filter(Column::Featured.eq(featured));
        }
        if let Some(search) = &filter.search {
            let pattern = search_pattern(search);
            query = query.filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(Column::Title))).like(pattern.clone()))
                    .add(
                        Expr::expr(Func::lower(Expr::col(Column::Description)))
                            .like(pattern.clone()),
                    ),
            );
        }

        let paginator = query.paginate(&self.db, limit);
        let total = paginator.num_items().await?;
        let projects = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(ProjectPage {
            projects: projects.into_iter().map(PublicProject::from).collect(),
            total,
            total_pages: total_pages(total, limit),
        })
    }

    pub async fn public_by_id(&self, id: i32) -> Result<Option<PublicProject>, DbErr> {
        let project = entity::project::Entity::find_by_id(id)
            .one(&self.db)
            .await?;
        Ok(project.map(PublicProject::from))
    }
}

impl AdminCrudTable for ProjectController {
    type Item = ProjectItem;

    async fn get_by_id(&self, id: i32) -> Result<Option<Self::Item>, AdminCrudError> {
        let query = entity::project::Entity::find_by_id(id)
            .one(&self.db)
            .await?;
        Ok(query.map(ProjectItem::from))
    }

    async fn list(
        &self,
        params: ListQueryParams,
    ) -> Result<PaginatedResult<ItemWithId<Self::Item>>, AdminCrudError> {
        let params = params.try_into()?;
        let query = entity::project::Entity::find()
            .apply_params(&params)?
            .all(&self.db)
            .await?;

        Ok(PaginatedResult {
            items: query
                .into_iter()
                .map(|m| ItemWithId {
                    id: m.id,
                    item: ProjectItem::from(m),
                })
                .collect(),
            total: entity::project::Entity::find()
                .apply_filter(&params)?
                .count(&self.db)
                .await?,
        })
    }

    async fn create(&self, item: Self::Item) -> Result<ItemWithId<Self::Item>, AdminCrudError> {
        let item = item.normalized()?;
        let now = now();

        let model = entity::project::ActiveModel {
            id: NotSet,
            title: Set(item.title),
            description: Set(item.description),
            long_description: Set(item.long_description),
            technologies: Set(encode_list(&item.technologies)),
            image_url: Set(item.image_url),
            github_url: Set(item.github_url),
            live_url: Set(item.live_url),
            featured: Set(item.featured),
            category: Set(item.category),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(ItemWithId {
            id: model.id,
            item: model.into(),
        })
    }

    async fn update(
        &self,
        id: i32,
        item: Self::Item,
    ) -> Result<ItemWithId<Self::Item>, AdminCrudError> {
        let item = item.normalized()?;

        let model = entity::project::ActiveModel {
            id: Set(id),
            title: Set(item.title),
            description: Set(item.description),
            long_description: Set(item.long_description),
            technologies: Set(encode_list(&item.technologies)),
            image_url: Set(item.image_url),
            github_url: Set(item.github_url),
            live_url: Set(item.live_url),
            featured: Set(item.featured),
            category: Set(item.category),
            created_at: NotSet,
            updated_at: Set(now()),
        }
        .update(&self.db)
        .await?;

        Ok(ItemWithId {
            id,
            item: model.into(),
        })
    }

    async fn delete(&self, id: i32) -> Result<(), AdminCrudError> {
        let result = entity::project::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AdminCrudError::NotFound);
        }
        Ok(())
    }
}
