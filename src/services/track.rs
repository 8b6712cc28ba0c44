use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use super::{OwnerNames, Page, finish};
use crate::coerce::{self, optional_id, optional_text};
use crate::database::Database;
use crate::entities::{tape, track};
use crate::error::{CatalogError, CatalogResult};
use crate::http_server::query_builder::{TrackSearchParams, apply_pagination};

/// A track as sent by the tape editor or the track edit form.
///
/// Only present, non-null fields are applied.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TrackInput {
    #[serde(default, deserialize_with = "optional_id")]
    pub id: Option<i32>,
    /// Number or numeric string; checked when applied
    #[serde(rename = "numero", default)]
    pub number: Option<Value>,
    #[serde(rename = "lado")]
    pub side: Option<String>,
    #[serde(rename = "musica")]
    pub title: Option<String>,
    #[serde(rename = "autor")]
    pub author: Option<String>,
    pub isrc: Option<String>,
    #[serde(rename = "editora")]
    pub publisher: Option<String>,
    #[serde(rename = "percentual", default, deserialize_with = "optional_text")]
    pub percentage: Option<String>,
}

/// Integer track number stored back as text, so `"07"` becomes `"7"`.
pub(crate) fn track_number(value: &Value) -> Option<String> {
    coerce::integer(value).map(|n| n.to_string())
}

impl TrackInput {
    pub(crate) fn apply_to(
        &self,
        active: &mut track::ActiveModel,
        invalid_number: impl FnOnce() -> CatalogError,
    ) -> CatalogResult<()> {
        if let Some(number) = &self.number {
            active.number = Set(track_number(number).ok_or_else(invalid_number)?);
        }
        if let Some(side) = &self.side {
            active.side = Set(Some(side.clone()));
        }
        if let Some(title) = &self.title {
            active.title = Set(title.clone());
        }
        if let Some(author) = &self.author {
            active.author = Set(Some(author.clone()));
        }
        if let Some(isrc) = &self.isrc {
            active.isrc = Set(Some(isrc.clone()));
        }
        if let Some(publisher) = &self.publisher {
            active.publisher = Set(Some(publisher.clone()));
        }
        if let Some(percentage) = &self.percentage {
            active.percentage = Set(Some(percentage.clone()));
        }
        Ok(())
    }

    /// New track for `tape_id`; `position` is 1-indexed and used in errors.
    pub(crate) fn new_track(&self, tape_id: i32, position: usize) -> CatalogResult<track::ActiveModel> {
        let number = self.number.as_ref().ok_or_else(|| {
            CatalogError::validation(format!("Track number at position {position} is required"))
        })?;
        let number = track_number(number).ok_or_else(|| {
            CatalogError::validation(format!(
                "Track number at position {position} must be an integer"
            ))
        })?;
        let title = self
            .title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
            .ok_or_else(|| {
                CatalogError::validation(format!("Track title at position {position} is required"))
            })?;

        Ok(track::ActiveModel {
            tape_id: Set(tape_id),
            number: Set(number),
            side: Set(self.side.clone()),
            title: Set(title.to_string()),
            author: Set(self.author.clone()),
            publisher: Set(self.publisher.clone()),
            percentage: Set(self.percentage.clone()),
            isrc: Set(self.isrc.clone()),
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistName {
    #[serde(rename = "nome")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TapeRef {
    pub id: i32,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "numero_tape")]
    pub catalog_number: String,
}

/// Track listing row, with the owning tape repeated flat for the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackRow {
    pub id: i32,
    #[serde(rename = "musica")]
    pub title: String,
    #[serde(rename = "autor")]
    pub author: Option<String>,
    #[serde(rename = "lado")]
    pub side: Option<String>,
    #[serde(rename = "numero")]
    pub number: String,
    pub isrc: Option<String>,
    #[serde(rename = "artista")]
    pub artist: Option<ArtistName>,
    pub tape: Option<TapeRef>,
    pub numero_tape: Option<String>,
    pub tape_titulo: Option<String>,
}

impl TrackRow {
    fn new(track: track::Model, tape: Option<&tape::Model>, names: &OwnerNames) -> Self {
        let artist = tape
            .and_then(|tape| names.artist_name(tape.artist_id))
            .map(|name| ArtistName {
                name: name.to_string(),
            });

        Self {
            id: track.id,
            title: track.title,
            author: track.author,
            side: track.side,
            number: track.number,
            isrc: track.isrc,
            artist,
            tape: tape.map(|tape| TapeRef {
                id: tape.id,
                title: tape.title.clone(),
                catalog_number: tape.catalog_number.clone(),
            }),
            numero_tape: tape.map(|tape| tape.catalog_number.clone()),
            tape_titulo: tape.map(|tape| tape.title.clone()),
        }
    }

    /// Hydrate tracks with their tape and the tape's artist.
    pub(crate) async fn load<C: ConnectionTrait>(
        conn: &C,
        tracks: Vec<track::Model>,
    ) -> Result<Vec<Self>, DbErr> {
        let tape_ids: HashSet<i32> = tracks.iter().map(|t| t.tape_id).collect();
        let tapes = if tape_ids.is_empty() {
            Vec::new()
        } else {
            tape::Entity::find()
                .filter(tape::Column::Id.is_in(tape_ids))
                .all(conn)
                .await?
        };
        let names = OwnerNames::load(conn, &tapes).await?;
        let tapes: HashMap<i32, tape::Model> = tapes.into_iter().map(|t| (t.id, t)).collect();

        Ok(tracks
            .into_iter()
            .map(|track| {
                let tape = tapes.get(&track.tape_id);
                Self::new(track, tape, &names)
            })
            .collect())
    }
}

pub struct TrackService {
    db: Arc<Database>,
}

impl TrackService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn search_tracks(&self, params: &TrackSearchParams) -> CatalogResult<Page<TrackRow>> {
        let total = params.filtered_query().count(&self.db.conn).await?;
        let window = params.window(total);

        let tracks = apply_pagination(params.sorted_query(), &window)
            .all(&self.db.conn)
            .await?;
        let items = TrackRow::load(&self.db.conn, tracks).await?;

        Ok(Page { items, window })
    }

    pub async fn get_track(&self, track_id: i32) -> CatalogResult<TrackRow> {
        let track = track::Entity::find_by_id(track_id)
            .one(&self.db.conn)
            .await?
            .ok_or_else(|| CatalogError::not_found("Track", track_id))?;

        let mut rows = TrackRow::load(&self.db.conn, vec![track]).await?;
        rows.pop()
            .ok_or_else(|| CatalogError::not_found("Track", track_id))
    }

    /// Sparse update of one track. The id inside `input` is ignored.
    #[instrument(skip(self, input))]
    pub async fn update_track(&self, track_id: i32, input: &TrackInput) -> CatalogResult<TrackRow> {
        let txn = self.db.conn.begin().await?;
        let result = async {
            let track = track::Entity::find_by_id(track_id)
                .one(&txn)
                .await?
                .ok_or_else(|| CatalogError::not_found("Track", track_id))?;

            let mut active = track.into_active_model();
            input.apply_to(&mut active, || {
                CatalogError::validation("Track number must be an integer")
            })?;
            if active.is_changed() {
                active.update(&txn).await?;
            }
            Ok::<_, CatalogError>(())
        }
        .await;
        finish(txn, result).await?;

        log::info!("Updated track {track_id}");
        self.get_track(track_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_track(&self, track_id: i32) -> CatalogResult<()> {
        let result = track::Entity::delete_by_id(track_id)
            .exec(&self.db.conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(CatalogError::not_found("Track", track_id));
        }

        log::info!("Deleted track {track_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_server::query_builder::TrackSearchQuery;
    use crate::test_utils::{seed_owners, seed_tape, seed_track, test_db};
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> TrackSearchParams {
        let mut raw = TrackSearchQuery::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "termo" => raw.termo = value,
                "campo" => raw.campo = value,
                "page" => raw.page = value,
                "limit" => raw.limit = value,
                "sort" => raw.sort = value,
                "order" => raw.order = value,
                _ => unreachable!(),
            }
        }
        TrackSearchParams::from(&raw)
    }

    async fn seeded() -> (Arc<Database>, tape::Model) {
        let db = test_db().await;
        let owners = seed_owners(&db, "Banda Azul", "Gravadora X", "Etiqueta Y").await;
        let tape = seed_tape(&db, owners, "Ao Vivo", "T-100", (false, false, false)).await;
        seed_track(&db, tape.id, "1", "Abertura").await;
        seed_track(&db, tape.id, "2", "Balada").await;
        seed_track(&db, tape.id, "3", "Canção Final").await;
        (db, tape)
    }

    #[tokio::test]
    async fn test_default_order_is_descending_by_id() {
        let (db, _) = seeded().await;
        let service = TrackService::new(db);

        let page = service.search_tracks(&query(&[])).await.unwrap();
        let titles: Vec<_> = page.items.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Canção Final", "Balada", "Abertura"]);
        assert_eq!(page.window.total_items, 3);
    }

    #[tokio::test]
    async fn test_limit_zero_yields_single_item_pages() {
        let (db, _) = seeded().await;
        let service = TrackService::new(db);

        let page = service.search_tracks(&query(&[("limit", "0")])).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.window.page_size, 1);
        assert_eq!(page.window.total_pages, 3);
    }

    #[tokio::test]
    async fn test_huge_limit_is_capped() {
        let (db, _) = seeded().await;
        let service = TrackService::new(db);

        let page = service
            .search_tracks(&query(&[("limit", "9999")]))
            .await
            .unwrap();
        assert_eq!(page.window.page_size, 200);
        assert_eq!(page.items.len(), 3);
    }

    #[tokio::test]
    async fn test_page_beyond_last_returns_last_page() {
        let (db, _) = seeded().await;
        let service = TrackService::new(db);

        let page = service
            .search_tracks(&query(&[("limit", "2"), ("page", "40"), ("order", "asc")]))
            .await
            .unwrap();
        assert_eq!(page.window.page, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Canção Final");
    }

    #[tokio::test]
    async fn test_search_fields() {
        let (db, tape) = seeded().await;
        let other = seed_owners(&db, "Outro", "Outra", "Mais Uma").await;
        let other_tape = seed_tape(&db, other, "Estúdio", "T-200", (true, false, false)).await;
        let isrc_track = seed_track(&db, other_tape.id, "1", "Sem Nome").await;
        let mut active = isrc_track.into_active_model();
        active.isrc = Set(Some("BRABC2400001".to_string()));
        active.update(&db.conn).await.unwrap();
        let service = TrackService::new(db);

        let page = service
            .search_tracks(&query(&[("termo", "balada"), ("campo", "musica")]))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].tape_titulo.as_deref(), Some("Ao Vivo"));

        let page = service
            .search_tracks(&query(&[("termo", "brabc"), ("campo", "isrc")]))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Sem Nome");

        let page = service
            .search_tracks(&query(&[("termo", "T-100"), ("campo", "tape")]))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(page.items.iter().all(|t| t.tape.as_ref().unwrap().id == tape.id));

        let page = service
            .search_tracks(&query(&[("termo", "azul"), ("campo", "artista")]))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(
            page.items[0].artist,
            Some(ArtistName {
                name: "Banda Azul".to_string()
            })
        );

        // The artist name is not searched when the field is the title
        let page = service
            .search_tracks(&query(&[("termo", "azul"), ("campo", "musica")]))
            .await
            .unwrap();
        assert!(page.items.is_empty());

        let page = service
            .search_tracks(&query(&[("termo", "estúdio")]))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_sort_by_tape_title() {
        let (db, _) = seeded().await;
        let other = seed_owners(&db, "Outro", "Outra", "Mais Uma").await;
        let other_tape = seed_tape(&db, other, "Zebra", "T-300", (false, false, false)).await;
        seed_track(&db, other_tape.id, "1", "Última").await;
        let service = TrackService::new(db);

        let page = service
            .search_tracks(&query(&[("sort", "tape"), ("order", "desc")]))
            .await
            .unwrap();
        assert_eq!(page.items[0].tape_titulo.as_deref(), Some("Zebra"));
    }

    #[tokio::test]
    async fn test_get_update_delete() {
        let (db, tape) = seeded().await;
        let track = seed_track(&db, tape.id, "4", "Bônus").await;
        let service = TrackService::new(db);

        let row = service.get_track(track.id).await.unwrap();
        assert_eq!(row.numero_tape.as_deref(), Some("T-100"));

        let input: TrackInput =
            serde_json::from_value(json!({"numero": "05", "isrc": "BR123", "autor": null}))
                .unwrap();
        let row = service.update_track(track.id, &input).await.unwrap();
        assert_eq!(row.number, "5");
        assert_eq!(row.isrc.as_deref(), Some("BR123"));
        assert_eq!(row.title, "Bônus");

        let input: TrackInput = serde_json::from_value(json!({"numero": "cinco"})).unwrap();
        let err = service.update_track(track.id, &input).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        service.delete_track(track.id).await.unwrap();
        assert!(matches!(
            service.get_track(track.id).await,
            Err(CatalogError::NotFound { .. })
        ));
        assert!(matches!(
            service.delete_track(track.id).await,
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[test]
    fn test_new_track_validation() {
        let input: TrackInput = serde_json::from_value(json!({"musica": "X"})).unwrap();
        let err = input.new_track(1, 2).unwrap_err();
        assert_eq!(err.to_string(), "Track number at position 2 is required");

        let input: TrackInput =
            serde_json::from_value(json!({"numero": "abc", "musica": "X"})).unwrap();
        let err = input.new_track(1, 1).unwrap_err();
        assert_eq!(err.to_string(), "Track number at position 1 must be an integer");

        let input: TrackInput = serde_json::from_value(json!({"numero": 3, "musica": " "})).unwrap();
        let err = input.new_track(1, 4).unwrap_err();
        assert_eq!(err.to_string(), "Track title at position 4 is required");
    }
}
