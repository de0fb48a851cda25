use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProjectCategory::Table)
                    .if_not_exists()
                    .col(pk_auto(ProjectCategory::Id))
                    .col(string(ProjectCategory::Name))
                    .col(string_uniq(ProjectCategory::Slug))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Project::Table)
                    .if_not_exists()
                    .col(pk_auto(Project::Id))
                    .col(string(Project::Title))
                    .col(text(Project::Description))
                    .col(text(Project::LongDescription))
                    .col(text(Project::Technologies).default("[]"))
                    .col(string(Project::ImageUrl))
                    .col(string_null(Project::GithubUrl))
                    .col(string_null(Project::LiveUrl))
                    .col(boolean(Project::Featured).default(false))
                    .col(string(Project::Category))
                    .col(timestamp_with_time_zone(Project::CreatedAt))
                    .col(timestamp_with_time_zone(Project::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Project::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectCategory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProjectCategory {
    Table,
    Id,
    Name,
    Slug,
}

#[derive(DeriveIden)]
enum Project {
    Table,
    Id,
    Title,
    Description,
    LongDescription,
    Technologies,
    ImageUrl,
    GithubUrl,
    LiveUrl,
    Featured,
    Category,
    CreatedAt,
    UpdatedAt,
}
