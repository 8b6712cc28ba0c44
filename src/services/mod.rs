use std::collections::{HashMap, HashSet};

use color_eyre::eyre::WrapErr;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait, QueryFilter};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::entities::{self, artist, imprint, label};
use crate::error::{CatalogError, CatalogResult};
use crate::http_server::query_builder::PageWindow;

pub mod export;
pub mod lookup;
pub mod stats;
pub mod tape;
pub mod track;

/// One page of a listing plus its paging metadata.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

impl<T> Page<T> {
    /// No rows, only the paging metadata.
    pub fn empty(window: PageWindow) -> Self {
        Self {
            items: Vec::new(),
            window,
        }
    }
}

impl<T: Serialize> Page<T> {
    /// Listing body: the items under `key` beside `total_paginas`,
    /// `pagina_atual` and `total_registros`.
    pub fn into_listing(self, key: &str) -> CatalogResult<Value> {
        let items = serde_json::to_value(self.items).wrap_err("Failed to serialize listing")?;

        let mut body = Map::new();
        body.insert(key.to_string(), items);
        body.insert("total_paginas".into(), self.window.total_pages.into());
        body.insert("pagina_atual".into(), self.window.page.into());
        body.insert("total_registros".into(), self.window.total_items.into());
        Ok(Value::Object(body))
    }
}

/// Commit on success. Otherwise roll back and return the original error.
pub(crate) async fn finish<T>(
    txn: DatabaseTransaction,
    result: CatalogResult<T>,
) -> CatalogResult<T> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                log::error!("Failed to roll back transaction: {rollback_err}");
            }
            Err(err)
        }
    }
}

/// Fail with NotFound unless every referenced artist, label and imprint exists.
pub(crate) async fn ensure_owners_exist<C: ConnectionTrait>(
    conn: &C,
    artist_id: Option<i32>,
    label_id: Option<i32>,
    imprint_id: Option<i32>,
) -> CatalogResult<()> {
    if let Some(id) = artist_id
        && artist::Entity::find_by_id(id).one(conn).await?.is_none()
    {
        return Err(CatalogError::not_found("Artist", id));
    }
    if let Some(id) = label_id
        && label::Entity::find_by_id(id).one(conn).await?.is_none()
    {
        return Err(CatalogError::not_found("Label", id));
    }
    if let Some(id) = imprint_id
        && imprint::Entity::find_by_id(id).one(conn).await?.is_none()
    {
        return Err(CatalogError::not_found("Imprint", id));
    }
    Ok(())
}

/// `{id, nome}` reference to a lookup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedRef {
    pub id: i32,
    #[serde(rename = "nome")]
    pub name: String,
}

/// Artist, label and imprint names for a batch of tapes, keyed by id.
#[derive(Debug, Default)]
pub(crate) struct OwnerNames {
    artists: HashMap<i32, String>,
    labels: HashMap<i32, String>,
    imprints: HashMap<i32, String>,
}

impl OwnerNames {
    pub async fn load<C: ConnectionTrait>(conn: &C, tapes: &[entities::tape::Model]) -> Result<Self, DbErr> {
        if tapes.is_empty() {
            return Ok(Self::default());
        }

        let artist_ids: HashSet<i32> = tapes.iter().map(|t| t.artist_id).collect();
        let label_ids: HashSet<i32> = tapes.iter().map(|t| t.label_id).collect();
        let imprint_ids: HashSet<i32> = tapes.iter().map(|t| t.imprint_id).collect();

        let artists = artist::Entity::find()
            .filter(artist::Column::Id.is_in(artist_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect();
        let labels = label::Entity::find()
            .filter(label::Column::Id.is_in(label_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|l| (l.id, l.name))
            .collect();
        let imprints = imprint::Entity::find()
            .filter(imprint::Column::Id.is_in(imprint_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|i| (i.id, i.name))
            .collect();

        Ok(Self {
            artists,
            labels,
            imprints,
        })
    }

    pub fn artist(&self, id: i32) -> Option<NamedRef> {
        self.artists.get(&id).map(|name| NamedRef {
            id,
            name: name.clone(),
        })
    }

    pub fn label(&self, id: i32) -> Option<NamedRef> {
        self.labels.get(&id).map(|name| NamedRef {
            id,
            name: name.clone(),
        })
    }

    pub fn artist_name(&self, id: i32) -> Option<&str> {
        self.artists.get(&id).map(String::as_str)
    }

    pub fn label_name(&self, id: i32) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    pub fn imprint_name(&self, id: i32) -> Option<&str> {
        self.imprints.get(&id).map(String::as_str)
    }
}
