use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum UserMeta {
    Table,
    Id,
    UserId,
    MetaKey,
    MetaValue,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserMeta::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserMeta::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserMeta::UserId).big_integer().not_null())
                    .col(ColumnDef::new(UserMeta::MetaKey).string_len(255).not_null())
                    .col(ColumnDef::new(UserMeta::MetaValue).text().not_null())
                    .col(
                        ColumnDef::new(UserMeta::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // one value per (user_id, meta_key)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_user_meta_user_key")
                    .table(UserMeta::Table)
                    .col(UserMeta::UserId)
                    .col(UserMeta::MetaKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserMeta::Table).to_owned())
            .await?;
        Ok(())
    }
}
