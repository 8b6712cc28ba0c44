use sea_orm::entity::prelude::*;

/// A cataloged physical recording. Column names follow the legacy schema.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tapes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_name = "titulo")]
    pub title: String,
    #[sea_orm(column_name = "artista_id")]
    pub artist_id: i32,
    #[sea_orm(column_name = "gravadora_id")]
    pub label_id: i32,
    #[sea_orm(column_name = "etiqueta_id")]
    pub imprint_id: i32,
    #[sea_orm(column_name = "numero_tape", unique)]
    pub catalog_number: String,
    #[sea_orm(column_name = "produtor_musical")]
    pub producer: Option<String>,
    #[sea_orm(column_name = "data_cadastro")]
    pub registered_at: Option<DateTime>,
    #[sea_orm(column_name = "codigo_barras")]
    pub barcode: Option<String>,
    #[sea_orm(column_name = "quantidade")]
    pub quantity: Option<i32>,
    /// Free-form price text, e.g. "R$ 25,00"
    #[sea_orm(column_name = "preco")]
    pub price: Option<String>,
    #[sea_orm(column_name = "observacao", column_type = "Text")]
    pub note: Option<String>,

    // Independent flags; nullable in legacy stores
    #[sea_orm(column_name = "subiu_streaming")]
    pub uploaded_to_streaming: Option<bool>,
    #[sea_orm(column_name = "nao_pode_subir")]
    pub blocked_from_upload: Option<bool>,
    #[sea_orm(column_name = "digitalizada")]
    pub digitized: Option<bool>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::artist::Entity",
        from = "Column::ArtistId",
        to = "super::artist::Column::Id"
    )]
    Artist,
    #[sea_orm(
        belongs_to = "super::label::Entity",
        from = "Column::LabelId",
        to = "super::label::Column::Id"
    )]
    Label,
    #[sea_orm(
        belongs_to = "super::imprint::Entity",
        from = "Column::ImprintId",
        to = "super::imprint::Column::Id"
    )]
    Imprint,
    #[sea_orm(has_many = "super::track::Entity")]
    Track,
}

impl Related<super::artist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Artist.def()
    }
}

impl Related<super::label::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Label.def()
    }
}

impl Related<super::imprint::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Imprint.def()
    }
}

impl Related<super::track::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Track.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
