use crate::controllers::slugify;
use crate::entity;
use portfolio_core::http::admin::{
    AdminCrudError, AdminCrudTable, ItemWithId, ListQueryParams, ListableTrait, PaginatedResult,
};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, PaginatorTrait, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ProjectCategoryItem {
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

impl From<entity::project_category::Model> for ProjectCategoryItem {
    fn from(value: entity::project_category::Model) -> Self {
        Self {
            name: value.name,
            slug: value.slug,
        }
    }
}

impl ProjectCategoryItem {
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
        Ok(self)
    }
}

pub struct ProjectCategoryController {
    db: DatabaseConnection,
}

impl ProjectCategoryController {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn all(&self) -> Result<Vec<ItemWithId<ProjectCategoryItem>>, DbErr> {
        let categories = entity::project_category::Entity::find()
            .order_by_asc(entity::project_category::Column::Name)
            .all(&self.db)
            .await?;
        Ok(categories
            .into_iter()
            .map(|m| ItemWithId {
                id: m.id,
                item: m.into(),
            })
            .collect())
    }
}

impl AdminCrudTable for ProjectCategoryController {
    type Item = ProjectCategoryItem;

    async fn get_by_id(&self, id: i32) -> Result<Option<Self::Item>, AdminCrudError> {
        let query = entity::project_category::Entity::find_by_id(id)
            .one(&self.db)
            .await?;
        Ok(query.map(ProjectCategoryItem::from))
    }

    async fn list(
        &self,
        params: ListQueryParams,
    ) -> Result<PaginatedResult<ItemWithId<Self::Item>>, AdminCrudError> {
        let params = params.try_into()?;
        let query = entity::project_category::Entity::find()
            .apply_params(&params)?
            .all(&self.db)
            .await?;

        Ok(PaginatedResult {
            items: query
                .into_iter()
                .map(|m| ItemWithId {
                    id: m.id,
                    item: ProjectCategoryItem::from(m),
                })
                .collect(),
            total: entity::project_category::Entity::find()
                .apply_filter(&params)?
                .count(&self.db)
                .await?,
        })
    }

    async fn create(&self, item: Self::Item) -> Result<ItemWithId<Self::Item>, AdminCrudError> {
        let item = item.normalized()?;

        let model = entity::project_category::ActiveModel {
            id: NotSet,
            name: Set(item.name),
            slug: Set(item.slug),
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

        let model = entity::project_category::ActiveModel {
            id: Set(id),
            name: Set(item.name),
            slug: Set(item.slug),
        }
        .update(&self.db)
        .await?;

        Ok(ItemWithId {
            id,
            item: model.into(),
        })
    }

    async fn delete(&self, id: i32) -> Result<(), AdminCrudError> {
        let result = entity::project_category::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AdminCrudError::NotFound);
        }
        Ok(())
    }
}
