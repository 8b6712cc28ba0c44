use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "faixas")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tape_id: i32,
    /// Track number, stored as text
    #[sea_orm(column_name = "numero")]
    pub number: String,
    #[sea_orm(column_name = "lado")]
    pub side: Option<String>,
    #[sea_orm(column_name = "musica")]
    pub title: String,
    #[sea_orm(column_name = "autor")]
    pub author: Option<String>,
    #[sea_orm(column_name = "editora")]
    pub publisher: Option<String>,
    #[sea_orm(column_name = "percentual")]
    pub percentage: Option<String>,
    pub isrc: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tape::Entity",
        from = "Column::TapeId",
        to = "super::tape::Column::Id",
        on_delete = "Cascade"
    )]
    Tape,
}

impl Related<super::tape::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tape.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
