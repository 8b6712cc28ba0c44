use std::sync::Arc;

use sea_orm::{
    ColumnTrait, EntityTrait, FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait,
};
use serde::Serialize;

use crate::database::Database;
use crate::entities::{artist, tape, track};
use crate::error::CatalogResult;

pub const DASHBOARD_LABELS: [&str; 4] = ["On Stream", "Not Stream", "Digitalizada", "Ainda não subiu"];
pub const TOP_ARTIST_LIMIT: u64 = 8;

/// Raw flag counts shown on the dashboard. Each count reads one flag on its
/// own, so a tape can land in several buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub on_stream: u64,
    /// Tapes blocked from upload
    pub not_stream: u64,
    pub digitalizada: u64,
    /// All three flags strictly false
    pub nao_subiu: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub labels: [&'static str; 4],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromQueryResult)]
pub struct ArtistTrackCount {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "qtd")]
    pub track_count: i64,
}

pub struct StatsService {
    db: Arc<Database>,
}

impl StatsService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn dashboard(&self) -> CatalogResult<Dashboard> {
        let conn = &self.db.conn;
        let count_where = move |column: tape::Column| {
            tape::Entity::find().filter(column.eq(true)).count(conn)
        };

        let stats = DashboardStats {
            on_stream: count_where(tape::Column::UploadedToStreaming).await?,
            not_stream: count_where(tape::Column::BlockedFromUpload).await?,
            digitalizada: count_where(tape::Column::Digitized).await?,
            nao_subiu: tape::Entity::find()
                .filter(tape::Column::UploadedToStreaming.eq(false))
                .filter(tape::Column::BlockedFromUpload.eq(false))
                .filter(tape::Column::Digitized.eq(false))
                .count(conn)
                .await?,
            total: tape::Entity::find().count(conn).await?,
        };

        Ok(Dashboard {
            stats,
            labels: DASHBOARD_LABELS,
        })
    }

    /// Artists with the most tracks across their tapes. Artists without
    /// tracks never appear.
    pub async fn top_artists_by_tracks(&self) -> CatalogResult<Vec<ArtistTrackCount>> {
        let rows = artist::Entity::find()
            .select_only()
            .column_as(artist::Column::Name, "name")
            .column_as(track::Column::Id.count(), "track_count")
            .join(JoinType::InnerJoin, artist::Relation::Tape.def())
            .join(JoinType::InnerJoin, tape::Relation::Track.def())
            .group_by(artist::Column::Id)
            .group_by(artist::Column::Name)
            .order_by_desc(track::Column::Id.count())
            .order_by_asc(artist::Column::Name)
            .limit(TOP_ARTIST_LIMIT)
            .into_model::<ArtistTrackCount>()
            .all(&self.db.conn)
            .await?;
        Ok(rows)
    }
}
