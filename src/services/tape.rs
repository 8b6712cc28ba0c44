use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use super::{NamedRef, OwnerNames, Page, ensure_owners_exist, finish};
use super::track::TrackInput;
use crate::coerce::{FlexBool, optional_id, optional_int, optional_text};
use crate::database::Database;
use crate::entities::{tape, track};
use crate::error::{CatalogError, CatalogResult};
use crate::http_server::query_builder::{TapeSearchParams, apply_pagination};
use crate::tape_status::TapeStatus;

/// Body of a tape create or partial update. Absent and `null` fields are
/// both left alone.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TapePayload {
    #[serde(rename = "titulo", default, deserialize_with = "optional_text")]
    pub title: Option<String>,
    #[serde(rename = "numero_tape", default, deserialize_with = "optional_text")]
    pub catalog_number: Option<String>,
    #[serde(rename = "artista_id", default, deserialize_with = "optional_id")]
    pub artist_id: Option<i32>,
    #[serde(rename = "gravadora_id", default, deserialize_with = "optional_id")]
    pub label_id: Option<i32>,
    #[serde(rename = "etiqueta_id", default, deserialize_with = "optional_id")]
    pub imprint_id: Option<i32>,
    #[serde(rename = "produtor_musical", default, deserialize_with = "optional_text")]
    pub producer: Option<String>,
    #[serde(rename = "codigo_barras", default, deserialize_with = "optional_text")]
    pub barcode: Option<String>,
    #[serde(rename = "quantidade", default, deserialize_with = "optional_int")]
    pub quantity: Option<i32>,
    #[serde(rename = "preco", default, deserialize_with = "optional_text")]
    pub price: Option<String>,
    #[serde(rename = "observacao", default, deserialize_with = "optional_text")]
    pub note: Option<String>,

    // Three spellings of the streaming flag, checked in this order
    pub on_stream: Option<FlexBool>,
    pub subiu_streaming: Option<FlexBool>,
    pub stream: Option<FlexBool>,

    #[serde(rename = "digitalizada")]
    pub digitized: Option<FlexBool>,
    #[serde(rename = "nao_pode_subir")]
    pub blocked_from_upload: Option<FlexBool>,

    /// Full track list. On update a missing or `null` list is empty, so
    /// every track of the tape is removed.
    #[serde(rename = "faixas")]
    pub tracks: Option<Vec<TrackInput>>,
}

impl TapePayload {
    /// First present streaming alias, with the key it is reported under.
    fn stream_flag(&self) -> Option<(&'static str, bool)> {
        [
            ("subiu_streaming(from_on_stream)", self.on_stream),
            ("subiu_streaming", self.subiu_streaming),
            ("subiu_streaming(from_stream)", self.stream),
        ]
        .into_iter()
        .find_map(|(key, flag)| flag.map(|FlexBool(value)| (key, value)))
    }
}

/// Tape listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TapeRow {
    pub id: i32,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "numero_tape")]
    pub catalog_number: String,
    #[serde(rename = "artista")]
    pub artist: Option<NamedRef>,
    #[serde(rename = "gravadora")]
    pub label: Option<NamedRef>,
    /// Bare name, empty when unknown
    #[serde(rename = "etiqueta")]
    pub imprint: String,
    pub status: TapeStatus,
}

impl TapeRow {
    fn new(tape: tape::Model, names: &OwnerNames) -> Self {
        Self {
            artist: names.artist(tape.artist_id),
            label: names.label(tape.label_id),
            imprint: names.imprint_name(tape.imprint_id).unwrap_or_default().to_string(),
            status: TapeStatus::of(&tape),
            id: tape.id,
            title: tape.title,
            catalog_number: tape.catalog_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TapeTrack {
    pub id: i32,
    #[serde(rename = "faixa")]
    pub number: String,
    #[serde(rename = "lado")]
    pub side: Option<String>,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "autor")]
    pub author: Option<String>,
    pub isrc: Option<String>,
    #[serde(rename = "editora")]
    pub publisher: Option<String>,
    #[serde(rename = "percentual")]
    pub percentage: Option<String>,
}

impl From<track::Model> for TapeTrack {
    fn from(track: track::Model) -> Self {
        Self {
            id: track.id,
            number: track.number,
            side: track.side,
            title: track.title,
            author: track.author,
            isrc: track.isrc,
            publisher: track.publisher,
            percentage: track.percentage,
        }
    }
}

/// Everything the tape editor needs, raw flags included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TapeDetail {
    pub id: i32,
    pub titulo: String,
    pub numero_tape: String,
    pub artista_id: i32,
    pub gravadora_id: i32,
    pub etiqueta_id: i32,
    pub subiu_streaming: Option<bool>,
    pub digitalizada: Option<bool>,
    pub nao_pode_subir: Option<bool>,
    pub status: TapeStatus,
    pub produtor_musical: Option<String>,
    pub codigo_barras: Option<String>,
    pub quantidade: Option<i32>,
    pub preco: Option<String>,
    pub observacao: Option<String>,
    pub data_cadastro: Option<String>,
    pub faixas: Vec<TapeTrack>,
}

impl TapeDetail {
    fn new(tape: tape::Model, tracks: Vec<track::Model>) -> Self {
        Self {
            status: TapeStatus::of(&tape),
            id: tape.id,
            titulo: tape.title,
            numero_tape: tape.catalog_number,
            artista_id: tape.artist_id,
            gravadora_id: tape.label_id,
            etiqueta_id: tape.imprint_id,
            subiu_streaming: tape.uploaded_to_streaming,
            digitalizada: tape.digitized,
            nao_pode_subir: tape.blocked_from_upload,
            produtor_musical: tape.producer,
            codigo_barras: tape.barcode,
            quantidade: tape.quantity,
            preco: tape.price,
            observacao: tape.note,
            data_cadastro: tape
                .registered_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string()),
            faixas: tracks.into_iter().map(TapeTrack::from).collect(),
        }
    }
}

/// Outcome of a partial update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TapeUpdate {
    pub tape_id: i32,
    /// Wire field name to the value written
    pub applied: Map<String, Value>,
    pub subiu_streaming: Option<bool>,
}

fn required_text<'a>(value: Option<&'a str>, field: &str) -> CatalogResult<&'a str> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CatalogError::validation(format!("Field '{field}' is required")))
}

fn required_id(value: Option<i32>, field: &str) -> CatalogResult<i32> {
    value.ok_or_else(|| CatalogError::validation(format!("Field '{field}' is required")))
}

pub struct TapeService {
    db: Arc<Database>,
}

impl TapeService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn search_tapes(&self, params: &TapeSearchParams) -> CatalogResult<Page<TapeRow>> {
        let total = params.filtered_query().count(&self.db.conn).await?;
        let window = params.window(total);
        if window.is_past_end() {
            return Ok(Page::empty(window));
        }

        let tapes = apply_pagination(params.sorted_query(), &window)
            .all(&self.db.conn)
            .await?;
        let names = OwnerNames::load(&self.db.conn, &tapes).await?;
        let items = tapes
            .into_iter()
            .map(|tape| TapeRow::new(tape, &names))
            .collect();

        Ok(Page { items, window })
    }

    pub async fn get_tape(&self, tape_id: i32) -> CatalogResult<TapeDetail> {
        let tape = tape::Entity::find_by_id(tape_id)
            .one(&self.db.conn)
            .await?
            .ok_or_else(|| CatalogError::not_found("Tape", tape_id))?;

        let tracks = track::Entity::find()
            .filter(track::Column::TapeId.eq(tape_id))
            .order_by_asc(track::Column::Id)
            .all(&self.db.conn)
            .await?;

        Ok(TapeDetail::new(tape, tracks))
    }

    #[instrument(skip(self, payload))]
    pub async fn create_tape(&self, payload: &TapePayload) -> CatalogResult<TapeDetail> {
        let title = required_text(payload.title.as_deref(), "titulo")?;
        let catalog_number = required_text(payload.catalog_number.as_deref(), "numero_tape")?;
        let artist_id = required_id(payload.artist_id, "artista_id")?;
        let label_id = required_id(payload.label_id, "gravadora_id")?;
        let imprint_id = required_id(payload.imprint_id, "etiqueta_id")?;

        let txn = self.db.conn.begin().await?;
        let result = async {
            ensure_owners_exist(&txn, Some(artist_id), Some(label_id), Some(imprint_id)).await?;

            let tape = tape::ActiveModel {
                title: Set(title.to_string()),
                catalog_number: Set(catalog_number.to_string()),
                artist_id: Set(artist_id),
                label_id: Set(label_id),
                imprint_id: Set(imprint_id),
                producer: Set(payload.producer.clone()),
                registered_at: Set(Some(Utc::now().naive_utc())),
                barcode: Set(payload.barcode.clone()),
                quantity: Set(payload.quantity),
                price: Set(payload.price.clone()),
                note: Set(payload.note.clone()),
                uploaded_to_streaming: Set(Some(
                    payload.stream_flag().is_some_and(|(_, flag)| flag),
                )),
                blocked_from_upload: Set(Some(payload.blocked_from_upload.is_some_and(|f| f.0))),
                digitized: Set(Some(payload.digitized.is_some_and(|f| f.0))),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            for (index, input) in payload.tracks.iter().flatten().enumerate() {
                input.new_track(tape.id, index + 1)?.insert(&txn).await?;
            }
            Ok::<_, CatalogError>(tape.id)
        }
        .await;
        let tape_id = finish(txn, result).await?;

        log::info!("Created tape {tape_id} ({catalog_number})");
        self.get_tape(tape_id).await
    }

    /// Apply the present fields and reconcile the tape's tracks with
    /// `faixas`. Everything commits together or not at all.
    #[instrument(skip(self, payload))]
    pub async fn update_tape(&self, tape_id: i32, payload: &TapePayload) -> CatalogResult<TapeUpdate> {
        let txn = self.db.conn.begin().await?;
        let result = Self::apply_update(&txn, tape_id, payload).await;
        let update = finish(txn, result).await?;

        log::info!("Updated tape {tape_id}: applied {:?}", update.applied);
        Ok(update)
    }

    async fn apply_update(
        txn: &DatabaseTransaction,
        tape_id: i32,
        payload: &TapePayload,
    ) -> CatalogResult<TapeUpdate> {
        let tape = tape::Entity::find_by_id(tape_id)
            .one(txn)
            .await?
            .ok_or_else(|| CatalogError::not_found("Tape", tape_id))?;

        ensure_owners_exist(txn, payload.artist_id, payload.label_id, payload.imprint_id).await?;

        let mut uploaded = tape.uploaded_to_streaming;
        let mut applied = Map::new();
        let mut active = tape.into_active_model();

        if let Some(title) = &payload.title {
            active.title = Set(title.clone());
            applied.insert("titulo".into(), title.clone().into());
        }
        if let Some(catalog_number) = &payload.catalog_number {
            active.catalog_number = Set(catalog_number.clone());
            applied.insert("numero_tape".into(), catalog_number.clone().into());
        }
        if let Some(id) = payload.artist_id {
            active.artist_id = Set(id);
            applied.insert("artista_id".into(), id.into());
        }
        if let Some(id) = payload.label_id {
            active.label_id = Set(id);
            applied.insert("gravadora_id".into(), id.into());
        }
        if let Some(id) = payload.imprint_id {
            active.imprint_id = Set(id);
            applied.insert("etiqueta_id".into(), id.into());
        }
        if let Some(producer) = &payload.producer {
            active.producer = Set(Some(producer.clone()));
            applied.insert("produtor_musical".into(), producer.clone().into());
        }
        if let Some(barcode) = &payload.barcode {
            active.barcode = Set(Some(barcode.clone()));
            applied.insert("codigo_barras".into(), barcode.clone().into());
        }
        if let Some(quantity) = payload.quantity {
            active.quantity = Set(Some(quantity));
            applied.insert("quantidade".into(), quantity.into());
        }
        if let Some(price) = &payload.price {
            active.price = Set(Some(price.clone()));
            applied.insert("preco".into(), price.clone().into());
        }
        if let Some(note) = &payload.note {
            active.note = Set(Some(note.clone()));
            applied.insert("observacao".into(), note.clone().into());
        }
        if let Some((key, flag)) = payload.stream_flag() {
            active.uploaded_to_streaming = Set(Some(flag));
            uploaded = Some(flag);
            applied.insert(key.into(), flag.into());
        }
        if let Some(FlexBool(flag)) = payload.digitized {
            active.digitized = Set(Some(flag));
            applied.insert("digitalizada".into(), flag.into());
        }
        if let Some(FlexBool(flag)) = payload.blocked_from_upload {
            active.blocked_from_upload = Set(Some(flag));
            applied.insert("nao_pode_subir".into(), flag.into());
        }

        if active.is_changed() {
            active.update(txn).await?;
        }

        let tracks = payload.tracks.as_deref().unwrap_or_default();
        Self::reconcile_tracks(txn, tape_id, tracks).await?;

        Ok(TapeUpdate {
            tape_id,
            applied,
            subiu_streaming: uploaded,
        })
    }

    /// Make the tape's tracks match `inputs`: drop tracks not listed, update
    /// listed ones and insert the ones without an id.
    async fn reconcile_tracks(
        txn: &DatabaseTransaction,
        tape_id: i32,
        inputs: &[TrackInput],
    ) -> CatalogResult<()> {
        let keep: HashSet<i32> = inputs.iter().filter_map(|input| input.id).collect();

        let stale: Vec<i32> = track::Entity::find()
            .filter(track::Column::TapeId.eq(tape_id))
            .all(txn)
            .await?
            .into_iter()
            .filter(|track| !keep.contains(&track.id))
            .map(|track| track.id)
            .collect();
        if !stale.is_empty() {
            log::debug!("Removing tracks {stale:?} from tape {tape_id}");
            track::Entity::delete_many()
                .filter(track::Column::Id.is_in(stale))
                .exec(txn)
                .await?;
        }

        for (index, input) in inputs.iter().enumerate() {
            let position = index + 1;

            let Some(track_id) = input.id else {
                input.new_track(tape_id, position)?.insert(txn).await?;
                continue;
            };

            let Some(track) = track::Entity::find_by_id(track_id).one(txn).await? else {
                log::warn!("Ignoring unknown track {track_id} in update of tape {tape_id}");
                continue;
            };
            if track.tape_id != tape_id {
                return Err(CatalogError::validation(format!(
                    "Track {track_id} does not belong to tape {tape_id}"
                )));
            }

            let mut active = track.into_active_model();
            input.apply_to(&mut active, || {
                CatalogError::validation(format!(
                    "Track number at position {position} must be an integer"
                ))
            })?;
            if active.is_changed() {
                active.update(txn).await?;
            }
        }

        Ok(())
    }

    /// Delete the tape together with its tracks.
    #[instrument(skip(self))]
    pub async fn delete_tape(&self, tape_id: i32) -> CatalogResult<()> {
        let txn = self.db.conn.begin().await?;
        let result = async {
            if tape::Entity::find_by_id(tape_id).one(&txn).await?.is_none() {
                return Err(CatalogError::not_found("Tape", tape_id));
            }
            let removed = track::Entity::delete_many()
                .filter(track::Column::TapeId.eq(tape_id))
                .exec(&txn)
                .await?;
            tape::Entity::delete_by_id(tape_id).exec(&txn).await?;
            Ok::<_, CatalogError>(removed.rows_affected)
        }
        .await;
        let removed = finish(txn, result).await?;

        log::info!("Deleted tape {tape_id} and {removed} track(s)");
        Ok(())
    }
}
