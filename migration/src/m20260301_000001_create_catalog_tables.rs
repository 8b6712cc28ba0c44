use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Artists, labels (gravadoras) and imprints (etiquetas) share one shape
        for table in ["artistas", "gravadoras", "etiquetas"] {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new("id")
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new("nome")
                                .string_len(200)
                                .not_null()
                                .unique_key(),
                        )
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table("tapes")
                    .if_not_exists()
                    .col(
                        ColumnDef::new("id")
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new("titulo").string_len(300).not_null())
                    .col(ColumnDef::new("artista_id").integer().not_null())
                    .col(ColumnDef::new("gravadora_id").integer().not_null())
                    .col(ColumnDef::new("etiqueta_id").integer().not_null())
                    .col(
                        ColumnDef::new("numero_tape")
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new("produtor_musical").string_len(200).null())
                    .col(ColumnDef::new("data_cadastro").date_time().null())
                    .col(ColumnDef::new("codigo_barras").string_len(50).null())
                    .col(ColumnDef::new("quantidade").integer().null())
                    .col(ColumnDef::new("preco").string_len(20).null())
                    .col(ColumnDef::new("observacao").text().null())
                    .col(ColumnDef::new("subiu_streaming").boolean().default(false))
                    .col(ColumnDef::new("nao_pode_subir").boolean().default(false))
                    .col(ColumnDef::new("digitalizada").boolean().default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tapes_artista_id")
                            .from("tapes", "artista_id")
                            .to("artistas", "id"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tapes_gravadora_id")
                            .from("tapes", "gravadora_id")
                            .to("gravadoras", "id"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tapes_etiqueta_id")
                            .from("tapes", "etiqueta_id")
                            .to("etiquetas", "id"),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table("faixas")
                    .if_not_exists()
                    .col(
                        ColumnDef::new("id")
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new("tape_id").integer().not_null())
                    .col(ColumnDef::new("numero").string_len(10).not_null())
                    .col(ColumnDef::new("lado").string_len(5).null())
                    .col(ColumnDef::new("musica").string_len(300).not_null())
                    .col(ColumnDef::new("autor").string_len(500).null())
                    .col(ColumnDef::new("editora").string_len(200).null())
                    .col(ColumnDef::new("percentual").string_len(20).null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_faixas_tape_id")
                            .from("faixas", "tape_id")
                            .to("tapes", "id")
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // No two tracks of a tape share both number and title
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uix_faixa_tape")
                    .table("faixas")
                    .col("tape_id")
                    .col("numero")
                    .col("musica")
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tapes_artista_id")
                    .table("tapes")
                    .col("artista_id")
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order
        for table in ["faixas", "tapes", "etiquetas", "gravadoras", "artistas"] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }

        Ok(())
    }
}
