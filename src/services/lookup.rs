use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use tracing::instrument;

use super::{NamedRef, Page};
use crate::database::Database;
use crate::entities::{artist, tape};
use crate::error::{CatalogError, CatalogResult};
use crate::http_server::query_builder::{
    PageWindow, apply_pagination, contains_ci, int_param, search_term,
};

pub const DEFAULT_ARTIST_PAGE_SIZE: u64 = 30;

/// The name-only entities a tape points at.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LookupKind {
    Artist,
    Label,
    Imprint,
}

impl LookupKind {
    pub fn entity_name(self) -> &'static str {
        match self {
            Self::Artist => "Artist",
            Self::Label => "Label",
            Self::Imprint => "Imprint",
        }
    }

    fn tape_column(self) -> tape::Column {
        match self {
            Self::Artist => tape::Column::ArtistId,
            Self::Label => tape::Column::LabelId,
            Self::Imprint => tape::Column::ImprintId,
        }
    }
}

/// Runs `$body` with `$entity` bound to the entity module of `$kind`.
macro_rules! with_entity {
    ($kind:expr, $entity:ident => $body:expr) => {
        match $kind {
            LookupKind::Artist => {
                use crate::entities::artist as $entity;
                $body
            }
            LookupKind::Label => {
                use crate::entities::label as $entity;
                $body
            }
            LookupKind::Imprint => {
                use crate::entities::imprint as $entity;
                $body
            }
        }
    };
}

/// Body of a lookup create or rename.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct NamePayload {
    pub nome: Option<String>,
}

impl NamePayload {
    fn name(&self) -> CatalogResult<String> {
        self.nome
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| CatalogError::validation("Field 'nome' is required"))
    }
}

/// Query string of `GET /api/artistas`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ArtistSearchQuery {
    pub termo: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

pub struct LookupService {
    db: Arc<Database>,
}

impl LookupService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Every row of `kind`, by id.
    pub async fn list(&self, kind: LookupKind) -> CatalogResult<Vec<NamedRef>> {
        let records: Vec<NamedRef> = with_entity!(kind, entity => entity::Entity::find()
            .order_by_asc(entity::Column::Id)
            .all(&self.db.conn)
            .await?
            .into_iter()
            .map(|model| NamedRef { id: model.id, name: model.name })
            .collect());
        Ok(records)
    }

    /// Artists by name, optionally filtered. A page past the end is empty.
    pub async fn search_artists(&self, query: &ArtistSearchQuery) -> CatalogResult<Page<NamedRef>> {
        let page = int_param(query.page.as_deref()).unwrap_or(1).max(1) as u64;
        let page_size = int_param(query.limit.as_deref())
            .filter(|limit| *limit >= 1)
            .map(|limit| limit as u64)
            .unwrap_or(DEFAULT_ARTIST_PAGE_SIZE);

        let mut select = artist::Entity::find();
        if let Some(term) = search_term(query.termo.as_deref()) {
            select = select.filter(contains_ci(artist::Column::Name, &term));
        }

        let total = select.clone().count(&self.db.conn).await?;
        let window = PageWindow::unclamped(total, page, page_size);
        if window.is_past_end() {
            return Ok(Page::empty(window));
        }

        let items = apply_pagination(
            select
                .order_by_asc(artist::Column::Name)
                .order_by_asc(artist::Column::Id),
            &window,
        )
        .all(&self.db.conn)
        .await?
        .into_iter()
        .map(|model| NamedRef {
            id: model.id,
            name: model.name,
        })
        .collect();

        Ok(Page { items, window })
    }

    #[instrument(skip(self, payload))]
    pub async fn create(&self, kind: LookupKind, payload: &NamePayload) -> CatalogResult<NamedRef> {
        let name = payload.name()?;
        let record = with_entity!(kind, entity => {
            let model = entity::ActiveModel {
                name: Set(name),
                ..Default::default()
            }
            .insert(&self.db.conn)
            .await?;
            NamedRef { id: model.id, name: model.name }
        });

        log::info!("Created {} {}: {}", kind.entity_name(), record.id, record.name);
        Ok(record)
    }

    #[instrument(skip(self, payload))]
    pub async fn rename(
        &self,
        kind: LookupKind,
        id: i32,
        payload: &NamePayload,
    ) -> CatalogResult<NamedRef> {
        let name = payload.name()?;
        let record = with_entity!(kind, entity => {
            let model = entity::Entity::find_by_id(id)
                .one(&self.db.conn)
                .await?
                .ok_or_else(|| CatalogError::not_found(kind.entity_name(), id))?;
            let mut active = model.into_active_model();
            active.name = Set(name);
            let model = active.update(&self.db.conn).await?;
            NamedRef { id: model.id, name: model.name }
        });

        log::info!("Renamed {} {} to {}", kind.entity_name(), id, record.name);
        Ok(record)
    }

    /// Delete a row no tape references; referenced rows are a conflict.
    #[instrument(skip(self))]
    pub async fn delete(&self, kind: LookupKind, id: i32) -> CatalogResult<()> {
        let exists = with_entity!(kind, entity => entity::Entity::find_by_id(id)
            .one(&self.db.conn)
            .await?
            .is_some());
        if !exists {
            return Err(CatalogError::not_found(kind.entity_name(), id));
        }

        let references = tape::Entity::find()
            .filter(kind.tape_column().eq(id))
            .count(&self.db.conn)
            .await?;
        if references > 0 {
            return Err(CatalogError::Conflict(format!(
                "{} {} is still referenced by {} tape(s)",
                kind.entity_name(),
                id,
                references
            )));
        }

        with_entity!(kind, entity => entity::Entity::delete_by_id(id)
            .exec(&self.db.conn)
            .await?);

        log::info!("Deleted {} {}", kind.entity_name(), id);
        Ok(())
    }
}
