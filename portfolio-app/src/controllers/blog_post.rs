use crate::controllers::{
    decode_list, encode_list, list_element_pattern, non_blank, now, search_pattern, slugify,
    total_pages,
};
use crate::entity;
use crate::entity::blog_post::PostStatus;
use chrono::{DateTime, FixedOffset};
use portfolio_core::http::admin::{
    AdminCrudError, AdminCrudTable, ItemWithId, ListQueryParams, ListableTrait, PaginatedResult,
};
use sea_orm::sea_query::{Expr, Func, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const WORDS_PER_MINUTE: usize = 200;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct BlogPostItem {
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub content: String,
    #[serde(default)]
    pub published_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub reading_time: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub category_id: Option<i32>,
}

impl From<entity::blog_post::Model> for BlogPostItem {
    fn from(value: entity::blog_post::Model) -> Self {
        Self {
            title: value.title,
            slug: value.slug,
            excerpt: value.excerpt,
            content: value.content,
            published_at: value.published_at,
            reading_time: value.reading_time,
            tags: decode_list(&value.tags),
            author: value.author,
            featured_image: value.featured_image,
            status: value.status,
            category_id: value.category_id,
        }
    }
}

impl BlogPostItem {
    /// Fills in the derived fields of a post about to be saved.
    fn prepare(mut self, now: DateTime<FixedOffset>) -> Result<Self, AdminCrudError> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(AdminCrudError::InvalidItem("title is required".into()));
        }
        if self.content.trim().is_empty() {
            return Err(AdminCrudError::InvalidItem("content is required".into()));
        }

        self.slug = match self.slug.trim() {
            "" => slugify(&self.title),
            slug => slug.to_string(),
        };
        if self.slug.is_empty() {
            return Err(AdminCrudError::InvalidItem("slug is required".into()));
        }

        self.excerpt = non_blank(self.excerpt);
        self.featured_image = non_blank(self.featured_image);
        self.reading_time =
            non_blank(self.reading_time).or_else(|| Some(estimate_reading_time(&self.content)));
        self.tags = self
            .tags
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();

        if self.status == PostStatus::Published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
        Ok(self)
    }
}

/// `"N min read"`, counting words outside of markup tags.
pub fn estimate_reading_time(content: &str) -> String {
    let mut text = String::with_capacity(content.len());
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    let words = text.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    format!("{minutes} min read")
}

#[derive(Clone, Debug, Serialize, ToSchema, PartialEq)]
pub struct CategorySummary {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, Serialize, ToSchema, PartialEq)]
pub struct PublishedPost {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub reading_time: Option<String>,
    pub tags: Vec<String>,
    pub author: String,
    pub featured_image: Option<String>,
    pub category: Option<CategorySummary>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl PublishedPost {
    fn from_row(
        (post, category): (entity::blog_post::Model, Option<entity::blog_category::Model>),
    ) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            excerpt: post.excerpt,
            content: post.content,
            published_at: post.published_at,
            reading_time: post.reading_time,
            tags: decode_list(&post.tags),
            author: post.author,
            featured_image: post.featured_image,
            category: category.map(|c| CategorySummary {
                id: c.id,
                name: c.name,
                slug: c.slug,
            }),
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<PublishedPost>,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CategoryFilter {
    Id(i32),
    Slug(String),
}

impl From<&str> for CategoryFilter {
    fn from(value: &str) -> Self {
        match value.parse() {
            Ok(id) => CategoryFilter::Id(id),
            Err(_) => CategoryFilter::Slug(value.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PostFilter {
    pub category: Option<CategoryFilter>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

pub struct BlogPostController {
    db: DatabaseConnection,
}

impl BlogPostController {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn published_query() -> Select<entity::blog_post::Entity> {
        entity::blog_post::Entity::find()
            .filter(entity::blog_post::Column::Status.eq(PostStatus::Published))
            .order_by_desc(entity::blog_post::Column::PublishedAt)
            .order_by_desc(entity::blog_post::Column::Id)
    }

    /// Published posts matching `filter`, newest first. `page` is 1-based.
    pub async fn published(
        &self,
        filter: &PostFilter,
        page: u64,
        limit: u64,
    ) -> Result<PostPage, DbErr> {
        use entity::blog_post::{Column, Entity};

        let mut query = Self::published_query();

        match &filter.category {
            Some(CategoryFilter::Id(id)) => query = query.filter(Column::CategoryId.eq(*id)),
            Some(CategoryFilter::Slug(slug)) => {
                query = query.filter(
                    Column::CategoryId.in_subquery(
                        Query::select()
                            .column(entity::blog_category::Column::Id)
                            .from(entity::blog_category::Entity)
                            .and_where(entity::blog_category::Column::Slug.eq(slug.as_str()))
                            .to_owned(),
                    ),
                )
            }
            None => {}
        }

        if let Some(tag) = &filter.tag {
            query = query.filter(Column::Tags.like(list_element_pattern(tag)));
        }

        if let Some(search) = &filter.search {
            let pattern = search_pattern(search);
            let mut condition = Condition::any();
            for column in [Column::Title, Column::Excerpt, Column::Content] {
                condition = condition.add(
                    Expr::expr(Func::lower(Expr::col((Entity, column)))).like(pattern.clone()),
                );
            }
            query = query.filter(condition);
        }

        let paginator = query
            .find_also_related(entity::blog_category::Entity)
            .paginate(&self.db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(PostPage {
            posts: rows.into_iter().map(PublishedPost::from_row).collect(),
            total,
            total_pages: total_pages(total, limit),
        })
    }

    pub async fn recent(&self, limit: u64) -> Result<Vec<PublishedPost>, DbErr> {
        let rows = Self::published_query()
            .limit(limit)
            .find_also_related(entity::blog_category::Entity)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(PublishedPost::from_row).collect())
    }

    /// Drafts are not visible through this lookup.
    pub async fn published_by_slug(&self, slug: &str) -> Result<Option<PublishedPost>, DbErr> {
        let row = Self::published_query()
            .filter(entity::blog_post::Column::Slug.eq(slug))
            .find_also_related(entity::blog_category::Entity)
            .one(&self.db)
            .await?;
        Ok(row.map(PublishedPost::from_row))
    }
}

impl AdminCrudTable for BlogPostController {
    type Item = BlogPostItem;

    async fn get_by_id(&self, id: i32) -> Result<Option<Self::Item>, AdminCrudError> {
        let query = entity::blog_post::Entity::find_by_id(id)
            .one(&self.db)
            .await?;
        Ok(query.map(BlogPostItem::from))
    }

    async fn list(
        &self,
        params: ListQueryParams,
    ) -> Result<PaginatedResult<ItemWithId<Self::Item>>, AdminCrudError> {
        let params = params.try_into()?;
        let query = entity::blog_post::Entity::find()
            .apply_params(&params)?
            .all(&self.db)
            .await?;

        Ok(PaginatedResult {
            items: query
                .into_iter()
                .map(|m| ItemWithId {
                    id: m.id,
                    item: BlogPostItem::from(m),
                })
                .collect(),
            total: entity::blog_post::Entity::find()
                .apply_filter(&params)?
                .count(&self.db)
                .await?,
        })
    }

    async fn create(&self, item: Self::Item) -> Result<ItemWithId<Self::Item>, AdminCrudError> {
        let now = now();
        let item = item.prepare(now)?;

        let model = entity::blog_post::ActiveModel {
            id: NotSet,
            title: Set(item.title),
            slug: Set(item.slug),
            excerpt: Set(item.excerpt),
            content: Set(item.content),
            published_at: Set(item.published_at),
            reading_time: Set(item.reading_time),
            tags: Set(encode_list(&item.tags)),
            author: Set(item.author),
            featured_image: Set(item.featured_image),
            status: Set(item.status),
            category_id: Set(item.category_id),
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
        let now = now();
        let item = item.prepare(now)?;

        let model = entity::blog_post::ActiveModel {
            id: Set(id),
            title: Set(item.title),
            slug: Set(item.slug),
            excerpt: Set(item.excerpt),
            content: Set(item.content),
            published_at: Set(item.published_at),
            reading_time: Set(item.reading_time),
            tags: Set(encode_list(&item.tags)),
            author: Set(item.author),
            featured_image: Set(item.featured_image),
            status: Set(item.status),
            category_id: Set(item.category_id),
            created_at: NotSet,
            updated_at: Set(now),
        }
        .update(&self.db)
        .await?;

        Ok(ItemWithId {
            id,
            item: model.into(),
        })
    }

    async fn delete(&self, id: i32) -> Result<(), AdminCrudError> {
        let result = entity::blog_post::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AdminCrudError::NotFound);
        }
        Ok(())
    }
}
