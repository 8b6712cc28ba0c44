use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ConnectOptions, Database as SeaDatabase, Set};

use crate::database::Database;
use crate::entities::{artist, imprint, label, tape, track};

/// Fresh in-memory store with the full schema applied.
pub async fn test_db() -> Arc<Database> {
    // A single connection keeps every query on the same in-memory database
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let conn = SeaDatabase::connect(opt).await.unwrap();
    Arc::new(Database::from_connection(conn).await.unwrap())
}

/// Artist, label and imprint ids used by seeded tapes.
#[derive(Debug, Clone, Copy)]
pub struct Owners {
    pub artist_id: i32,
    pub label_id: i32,
    pub imprint_id: i32,
}

pub async fn seed_owners(db: &Database, artist: &str, label: &str, imprint: &str) -> Owners {
    let artist = artist::ActiveModel {
        name: Set(artist.to_string()),
        ..Default::default()
    }
    .insert(&db.conn)
    .await
    .unwrap();
    let label = label::ActiveModel {
        name: Set(label.to_string()),
        ..Default::default()
    }
    .insert(&db.conn)
    .await
    .unwrap();
    let imprint = imprint::ActiveModel {
        name: Set(imprint.to_string()),
        ..Default::default()
    }
    .insert(&db.conn)
    .await
    .unwrap();

    Owners {
        artist_id: artist.id,
        label_id: label.id,
        imprint_id: imprint.id,
    }
}

/// Inserts a tape with the given flags (uploaded, blocked, digitized).
pub async fn seed_tape(
    db: &Database,
    owners: Owners,
    title: &str,
    catalog_number: &str,
    flags: (bool, bool, bool),
) -> tape::Model {
    tape::ActiveModel {
        title: Set(title.to_string()),
        catalog_number: Set(catalog_number.to_string()),
        artist_id: Set(owners.artist_id),
        label_id: Set(owners.label_id),
        imprint_id: Set(owners.imprint_id),
        uploaded_to_streaming: Set(Some(flags.0)),
        blocked_from_upload: Set(Some(flags.1)),
        digitized: Set(Some(flags.2)),
        ..Default::default()
    }
    .insert(&db.conn)
    .await
    .unwrap()
}

pub async fn seed_track(db: &Database, tape_id: i32, number: &str, title: &str) -> track::Model {
    track::ActiveModel {
        tape_id: Set(tape_id),
        number: Set(number.to_string()),
        title: Set(title.to_string()),
        side: Set(Some("A".to_string())),
        ..Default::default()
    }
    .insert(&db.conn)
    .await
    .unwrap()
}
