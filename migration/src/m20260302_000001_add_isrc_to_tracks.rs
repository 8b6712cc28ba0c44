use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Stores created before the column existed get it here; fresh stores too.
        if manager.has_column("faixas", "isrc").await? {
            return Ok(());
        }

        manager
            .alter_table(
                Table::alter()
                    .table("faixas")
                    .add_column(ColumnDef::new("isrc").string_len(20).null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(Table::alter().table("faixas").drop_column("isrc").to_owned())
            .await?;

        Ok(())
    }
}
