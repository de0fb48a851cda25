use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BlogCategory::Table)
                    .if_not_exists()
                    .col(pk_auto(BlogCategory::Id))
                    .col(string(BlogCategory::Name))
                    .col(string_uniq(BlogCategory::Slug))
                    .col(text_null(BlogCategory::Description))
                    .col(timestamp_with_time_zone(BlogCategory::CreatedAt))
                    .col(timestamp_with_time_zone(BlogCategory::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BlogPost::Table)
                    .if_not_exists()
                    .col(pk_auto(BlogPost::Id))
                    .col(string(BlogPost::Title))
                    .col(string_uniq(BlogPost::Slug))
                    .col(text_null(BlogPost::Excerpt))
                    .col(text(BlogPost::Content))
                    .col(timestamp_with_time_zone_null(BlogPost::PublishedAt))
                    .col(string_null(BlogPost::ReadingTime))
                    .col(text(BlogPost::Tags).default("[]"))
                    .col(string(BlogPost::Author))
                    .col(string_null(BlogPost::FeaturedImage))
                    .col(string(BlogPost::Status).default("draft"))
                    .col(integer_null(BlogPost::CategoryId))
                    .col(timestamp_with_time_zone(BlogPost::CreatedAt))
                    .col(timestamp_with_time_zone(BlogPost::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(BlogPost::Table, BlogPost::CategoryId)
                            .to(BlogCategory::Table, BlogCategory::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(BlogPost::Table)
                    .name("idx_blog_post_status_published_at")
                    .col(BlogPost::Status)
                    .col(BlogPost::PublishedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BlogPost::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BlogCategory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BlogCategory {
    Table,
    Id,
    Name,
    Slug,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum BlogPost {
    Table,
    Id,
    Title,
    Slug,
    Excerpt,
    Content,
    PublishedAt,
    ReadingTime,
    Tags,
    Author,
    FeaturedImage,
    Status,
    CategoryId,
    CreatedAt,
    UpdatedAt,
}
