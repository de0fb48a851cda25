use crate::controllers::{non_blank, now, slugify};
use crate::entity;
use crate::entity::blog_post::PostStatus;
use portfolio_core::http::admin::{
    AdminCrudError, AdminCrudTable, ItemWithId, ListQueryParams, ListableTrait, PaginatedResult,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct BlogCategoryItem {
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema, PartialEq)]
pub struct CategoryWithCount {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub post_count: u64,
}

impl From<entity::blog_category::Model> for BlogCategoryItem {
    fn from(value: entity::blog_category::Model) -> Self {
        Self {
            name: value.name,
            slug: value.slug,
            description: value.description,
        }
    }
}

impl BlogCategoryItem {
    fn normalized(mut self) -> Result<Self, AdminCrudError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(AdminCrudError::InvalidItem("name is required".into()));
        }
        self.slug = match self.slug.trim() {
            "" => slugify(&self.name),
            slug => slug.to_string(),
        };
        if self.slug.is_empty() {
            return Err(AdminCrudError::InvalidItem("slug is required".into()));
        }
        self.description = non_blank(self.description);
        Ok(self)
    }
}

pub struct BlogCategoryController {
    db: DatabaseConnection,
}

impl BlogCategoryController {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Categories that have at least one published post, sorted by name.
    pub async fn with_published_posts(&self) -> Result<Vec<CategoryWithCount>, DbErr> {
        let counts: Vec<(Option<i32>, i64)> = entity::blog_post::Entity::find()
            .select_only()
            .column(entity::blog_post::Column::CategoryId)
            .column_as(
                Expr::col((
                    entity::blog_post::Entity,
                    entity::blog_post::Column::Id,
                ))
                .count(),
                "post_count",
            )
            .filter(entity::blog_post::Column::Status.eq(PostStatus::Published))
            .group_by(entity::blog_post::Column::CategoryId)
            .into_tuple()
            .all(&self.db)
            .await?;

        let counts: HashMap<i32, u64> = counts
            .into_iter()
            .filter_map(|(id, count)| Some((id?, count.max(0) as u64)))
            .collect();

        let categories = entity::blog_category::Entity::find()
            .order_by_asc(entity::blog_category::Column::Name)
            .all(&self.db)
            .await?;

        Ok(categories
            .into_iter()
            .filter_map(|category| {
                let post_count = *counts.get(&category.id)?;
                (post_count > 0).then(|| CategoryWithCount {
                    id: category.id,
                    name: category.name,
                    slug: category.slug,
                    description: category.description,
                    post_count,
                })
            })
            .collect())
    }
}

impl AdminCrudTable for BlogCategoryController {
    type Item = BlogCategoryItem;

    async fn get_by_id(&self, id: i32) -> Result<Option<Self::Item>, AdminCrudError> {
        let query = entity::blog_category::Entity::find_by_id(id)
            .one(&self.db)
            .await?;
        Ok(query.map(BlogCategoryItem::from))
    }

    async fn list(
        &self,
        params: ListQueryParams,
    ) -> Result<PaginatedResult<ItemWithId<Self::Item>>, AdminCrudError> {
        let params = params.try_into()?;
        let query = entity::blog_category::Entity::find()
            .apply_params(&params)?
            .all(&self.db)
            .await?;

        Ok(PaginatedResult {
            items: query
                .into_iter()
                .map(|m| ItemWithId {
                    id: m.id,
                    item: BlogCategoryItem::from(m),
                })
                .collect(),
            total: entity::blog_category::Entity::find()
                .apply_filter(&params)?
                .count(&self.db)
                .await?,
        })
    }

    async fn create(&self, item: Self::Item) -> Result<ItemWithId<Self::Item>, AdminCrudError> {
        let item = item.normalized()?;
        let now = now();

        let model = entity::blog_category::ActiveModel {
            id: NotSet,
            name: Set(item.name),
            slug: Set(item.slug),
            description: Set(item.description),
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

        let model = entity::blog_category::ActiveModel {
            id: Set(id),
            name: Set(item.name),
            slug: Set(item.slug),
            description: Set(item.description),
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
        let result = entity::blog_category::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AdminCrudError::NotFound);
        }
        Ok(())
    }
}
