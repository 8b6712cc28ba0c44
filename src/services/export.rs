use std::collections::HashMap;
use std::sync::Arc;

use color_eyre::eyre::{WrapErr, eyre};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use tracing::instrument;

use super::OwnerNames;
use super::track::TrackRow;
use crate::database::Database;
use crate::entities::{tape, track};
use crate::error::CatalogResult;

pub const TAPE_EXPORT_FILENAME: &str = "tapes_export.csv";
pub const TRACK_EXPORT_FILENAME: &str = "musicas.csv";

const TAPE_HEADER: [&str; 18] = [
    "TapeID",
    "TituloTape",
    "NumeroTape",
    "Artista",
    "Gravadora",
    "Etiqueta",
    "Produtor",
    "StatusOnStream",
    "StatusNotStream",
    "Digitalizada",
    "CodigoBarras",
    "Quantidade",
    "Preco",
    "Observacao",
    "Faixa#",
    "Lado",
    "Música",
    "Autor",
];

const TRACK_HEADER: [&str; 10] = [
    "id",
    "musica",
    "autor",
    "lado",
    "numero",
    "isrc",
    "tape_id",
    "tape_titulo",
    "numero_tape",
    "artista",
];

/// Query string of `GET /api/export/tapes`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TapeExportQuery {
    pub ids: Option<String>,
    pub export_all: Option<String>,
}

/// Which tapes go into the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapeSelection {
    All,
    Ids(Vec<i32>),
}

impl From<&TapeExportQuery> for TapeSelection {
    fn from(query: &TapeExportQuery) -> Self {
        let export_all = query
            .export_all
            .as_deref()
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"));
        let ids = query.ids.as_deref().map(str::trim).unwrap_or_default();
        if export_all || ids.is_empty() {
            return Self::All;
        }

        // Entries that are not plain digits are dropped
        Self::Ids(
            ids.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
                .filter_map(|id| id.parse().ok())
                .collect(),
        )
    }
}

fn flag(value: Option<bool>) -> &'static str {
    if value.unwrap_or(false) { "True" } else { "False" }
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

pub struct ExportService {
    db: Arc<Database>,
}

impl ExportService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// One row per track, or one row with empty track columns for a tape
    /// without tracks. Tapes are ordered by title.
    #[instrument(skip(self))]
    pub async fn export_tapes(&self, selection: &TapeSelection) -> CatalogResult<Vec<u8>> {
        let mut select = tape::Entity::find()
            .order_by_asc(tape::Column::Title)
            .order_by_asc(tape::Column::Id);
        if let TapeSelection::Ids(ids) = selection {
            select = select.filter(tape::Column::Id.is_in(ids.iter().copied()));
        }
        let tapes = select.all(&self.db.conn).await?;

        let names = OwnerNames::load(&self.db.conn, &tapes).await?;
        let mut tracks_by_tape: HashMap<i32, Vec<track::Model>> = HashMap::new();
        if !tapes.is_empty() {
            let tracks = track::Entity::find()
                .filter(track::Column::TapeId.is_in(tapes.iter().map(|t| t.id)))
                .order_by_asc(track::Column::Id)
                .all(&self.db.conn)
                .await?;
            for track in tracks {
                tracks_by_tape.entry(track.tape_id).or_default().push(track);
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer
            .write_record(TAPE_HEADER)
            .wrap_err("Failed to write tape export header")?;

        for tape in &tapes {
            let id = tape.id.to_string();
            let quantity = tape
                .quantity
                .filter(|quantity| *quantity != 0)
                .map(|quantity| quantity.to_string())
                .unwrap_or_default();
            let base = [
                id.as_str(),
                tape.title.as_str(),
                tape.catalog_number.as_str(),
                names.artist_name(tape.artist_id).unwrap_or_default(),
                names.label_name(tape.label_id).unwrap_or_default(),
                names.imprint_name(tape.imprint_id).unwrap_or_default(),
                text(&tape.producer),
                flag(tape.uploaded_to_streaming),
                flag(tape.blocked_from_upload),
                flag(tape.digitized),
                text(&tape.barcode),
                quantity.as_str(),
                text(&tape.price),
                text(&tape.note),
            ];

            match tracks_by_tape.get(&tape.id) {
                Some(tracks) => {
                    for track in tracks {
                        let row = base.iter().copied().chain([
                            track.number.as_str(),
                            text(&track.side),
                            track.title.as_str(),
                            text(&track.author),
                        ]);
                        writer
                            .write_record(row)
                            .wrap_err("Failed to write tape export row")?;
                    }
                }
                None => {
                    let row = base.iter().copied().chain(["", "", "", ""]);
                    writer
                        .write_record(row)
                        .wrap_err("Failed to write tape export row")?;
                }
            }
        }

        log::info!("Exported {} tape(s) to CSV", tapes.len());
        let bytes = writer
            .into_inner()
            .map_err(|err| eyre!("Failed to finish tape export: {}", err.error()))?;
        Ok(bytes)
    }

    /// Every track by id, `;`-separated with CRLF line endings.
    #[instrument(skip(self))]
    pub async fn export_tracks(&self) -> CatalogResult<Vec<u8>> {
        let tracks = track::Entity::find()
            .order_by_asc(track::Column::Id)
            .all(&self.db.conn)
            .await?;
        let tape_ids: HashMap<i32, i32> = tracks.iter().map(|t| (t.id, t.tape_id)).collect();
        let rows = TrackRow::load(&self.db.conn, tracks).await?;

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());
        writer
            .write_record(TRACK_HEADER)
            .wrap_err("Failed to write track export header")?;

        for row in &rows {
            let tape_id = tape_ids
                .get(&row.id)
                .map(|id| id.to_string())
                .unwrap_or_default();
            writer
                .write_record([
                    row.id.to_string().as_str(),
                    row.title.as_str(),
                    text(&row.author),
                    text(&row.side),
                    row.number.as_str(),
                    text(&row.isrc),
                    tape_id.as_str(),
                    text(&row.tape_titulo),
                    text(&row.numero_tape),
                    row.artist.as_ref().map(|a| a.name.as_str()).unwrap_or_default(),
                ])
                .wrap_err("Failed to write track export row")?;
        }

        log::info!("Exported {} track(s) to CSV", rows.len());
        let bytes = writer
            .into_inner()
            .map_err(|err| eyre!("Failed to finish track export: {}", err.error()))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seed_owners, seed_tape, seed_track, test_db};
    use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};

    fn selection(ids: Option<&str>, export_all: Option<&str>) -> TapeSelection {
        TapeSelection::from(&TapeExportQuery {
            ids: ids.map(str::to_string),
            export_all: export_all.map(str::to_string),
        })
    }

    fn read_rows(bytes: &[u8], delimiter: u8) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .from_reader(bytes)
            .records()
            .map(|record| record.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_selection_parsing() {
        assert_eq!(selection(None, None), TapeSelection::All);
        assert_eq!(selection(Some("  "), None), TapeSelection::All);
        assert_eq!(
            selection(Some("3, x,7,-1,"), Some("false")),
            TapeSelection::Ids(vec![3, 7])
        );
        assert_eq!(selection(Some("3,7"), Some("TRUE")), TapeSelection::All);
        assert_eq!(selection(Some("abc"), None), TapeSelection::Ids(vec![]));
    }

    #[tokio::test]
    async fn test_trackless_tape_exports_one_row() {
        let db = test_db().await;
        let owners = seed_owners(&db, "Artista", "Gravadora", "Etiqueta").await;
        let tape = seed_tape(&db, owners, "Vazia", "V1", (true, false, false)).await;
        let service = ExportService::new(db);

        let bytes = service.export_tapes(&selection(None, Some("true"))).await.unwrap();
        let csv_text = String::from_utf8(bytes.clone()).unwrap();
        assert!(csv_text.starts_with("TapeID,TituloTape,NumeroTape,"));
        assert!(!csv_text.contains('\r'));

        let rows = read_rows(&bytes, b',');
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 18);
        let row = &rows[1];
        assert_eq!(row[0], tape.id.to_string());
        assert_eq!(row[3], "Artista");
        assert_eq!(&row[7..10], ["True", "False", "False"]);
        assert_eq!(row[11], "");
        assert_eq!(&row[14..], ["", "", "", ""]);
    }

    #[tokio::test]
    async fn test_tape_export_rows_per_track_in_title_order() {
        let db = test_db().await;
        let owners = seed_owners(&db, "Artista", "Gravadora", "Etiqueta").await;
        let zeta = seed_tape(&db, owners, "Zeta", "Z1", (false, false, false)).await;
        let alfa = seed_tape(&db, owners, "Alfa", "A1", (false, true, true)).await;
        seed_track(&db, zeta.id, "1", "Primeira").await;
        seed_track(&db, zeta.id, "2", "Segunda").await;
        let mut active = alfa.clone().into_active_model();
        active.quantity = Set(Some(12));
        active.price = Set(Some("R$ 30,00".to_string()));
        active.update(&db.conn).await.unwrap();
        let service = ExportService::new(db);

        let rows = read_rows(&service.export_tapes(&TapeSelection::All).await.unwrap(), b',');
        let titles: Vec<_> = rows[1..].iter().map(|r| r[1].as_str()).collect();
        assert_eq!(titles, vec!["Alfa", "Zeta", "Zeta"]);
        assert_eq!(rows[1][11], "12");
        assert_eq!(rows[1][12], "R$ 30,00");
        assert_eq!(&rows[3][14..], ["2", "A", "Segunda", ""]);

        let only_zeta = selection(Some(&format!("{},x", zeta.id)), None);
        let rows = read_rows(&service.export_tapes(&only_zeta).await.unwrap(), b',');
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn test_track_export_format() {
        let db = test_db().await;
        let owners = seed_owners(&db, "Cantora", "Gravadora", "Etiqueta").await;
        let tape = seed_tape(&db, owners, "Fita; Especial", "E1", (false, false, false)).await;
        seed_track(&db, tape.id, "1", "Abertura").await;
        let service = ExportService::new(db);

        let bytes = service.export_tracks().await.unwrap();
        let csv_text = String::from_utf8(bytes.clone()).unwrap();
        assert!(csv_text.starts_with(
            "id;musica;autor;lado;numero;isrc;tape_id;tape_titulo;numero_tape;artista\r\n"
        ));

        let rows = read_rows(&bytes, b';');
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1][1..],
            [
                "Abertura".to_string(),
                String::new(),
                "A".to_string(),
                "1".to_string(),
                String::new(),
                tape.id.to_string(),
                "Fita; Especial".to_string(),
                "E1".to_string(),
                "Cantora".to_string(),
            ]
        );
    }
}
