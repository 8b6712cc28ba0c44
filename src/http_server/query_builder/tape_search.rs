use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Select,
};
use serde::Deserialize;

use super::{
    PageWindow, SortOrder, SortableField, contains_any, contains_ci, int_param, normalize_param,
    search_term,
};
use crate::entities::{artist, label, tape};

pub const DEFAULT_TAPE_PAGE_SIZE: u64 = 30;

/// Rank used by the `status` sort. Unlike the derived status, a tape blocked
/// from upload ranks above the plain "not on stream" bucket.
fn status_rank() -> Expr {
    Expr::case(tape::Column::UploadedToStreaming.eq(true), 3)
        .case(tape::Column::Digitized.eq(true), 2)
        .case(tape::Column::BlockedFromUpload.eq(true), 1)
        .finally(0)
        .into()
}

/// Raw query string of `GET /api/search_tapes`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TapeSearchQuery {
    pub termo: Option<String>,
    pub filtro: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Status filter over the raw flags, not the derived status.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TapeStatusFilter {
    OnStream,
    Digitized,
    BlockedFromUpload,
    NotOnStream,
    All,
}

impl TapeStatusFilter {
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(normalize_param).as_deref() {
            Some("on_stream") => Self::OnStream,
            Some("digitalizada" | "digitized") => Self::Digitized,
            Some("nao_pode_subir" | "blocked_from_upload") => Self::BlockedFromUpload,
            Some("not_stream" | "not_on_stream") => Self::NotOnStream,
            _ => Self::All,
        }
    }

    pub fn condition(self) -> Option<Condition> {
        let condition = match self {
            Self::OnStream => Condition::all().add(tape::Column::UploadedToStreaming.eq(true)),
            Self::Digitized => Condition::all().add(tape::Column::Digitized.eq(true)),
            Self::BlockedFromUpload => {
                Condition::all().add(tape::Column::BlockedFromUpload.eq(true))
            }
            // Anything not strictly true, NULL included
            Self::NotOnStream => Condition::any()
                .add(tape::Column::UploadedToStreaming.ne(true))
                .add(tape::Column::UploadedToStreaming.is_null()),
            Self::All => return None,
        };
        Some(condition)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TapeSortField {
    Id,
    Title,
    CatalogNumber,
    ArtistName,
    LabelName,
    Status,
}

impl SortableField for TapeSortField {
    type Entity = tape::Entity;

    fn from_param(value: &str) -> Option<Self> {
        match value {
            "id" => Some(Self::Id),
            "titulo" | "title" => Some(Self::Title),
            "numero_tape" | "catalog_number" => Some(Self::CatalogNumber),
            "artista" | "artist" => Some(Self::ArtistName),
            "gravadora" | "label" => Some(Self::LabelName),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    fn default_field() -> Self {
        Self::Id
    }

    /// Expects the artist and label joins from [`TapeSearchParams::filtered_query`].
    fn apply(self, query: Select<tape::Entity>, order: SortOrder) -> Select<tape::Entity> {
        let query = match self {
            Self::Id => return query.order_by(tape::Column::Id, order.into()),
            Self::Title => query.order_by(tape::Column::Title, order.into()),
            Self::CatalogNumber => query.order_by(tape::Column::CatalogNumber, order.into()),
            Self::ArtistName => query.order_by(artist::Column::Name, order.into()),
            Self::LabelName => query.order_by(label::Column::Name, order.into()),
            Self::Status => query.order_by(status_rank(), order.into()),
        };
        // Stable pages when the sort key repeats
        query.order_by_asc(tape::Column::Id)
    }
}

/// Normalized tape search parameters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TapeSearchParams {
    pub term: Option<String>,
    pub filter: TapeStatusFilter,
    pub page: u64,
    pub page_size: u64,
    pub sort: TapeSortField,
    pub order: SortOrder,
}

impl From<&TapeSearchQuery> for TapeSearchParams {
    fn from(raw: &TapeSearchQuery) -> Self {
        let page = int_param(raw.page.as_deref()).unwrap_or(1).max(1) as u64;
        let page_size = int_param(raw.limit.as_deref())
            .filter(|limit| *limit >= 1)
            .map(|limit| limit as u64)
            .unwrap_or(DEFAULT_TAPE_PAGE_SIZE);

        Self {
            term: search_term(raw.termo.as_deref()),
            filter: TapeStatusFilter::from_param(raw.filtro.as_deref()),
            page,
            page_size,
            sort: TapeSortField::parse_or_default(raw.sort.as_deref()),
            order: SortOrder::ascending_unless_desc(raw.order.as_deref()),
        }
    }
}

impl TapeSearchParams {
    /// Tapes left-joined to artist and label, filtered by status and term.
    pub fn filtered_query(&self) -> Select<tape::Entity> {
        let mut query = tape::Entity::find()
            .join(JoinType::LeftJoin, tape::Relation::Artist.def())
            .join(JoinType::LeftJoin, tape::Relation::Label.def());

        if let Some(condition) = self.filter.condition() {
            query = query.filter(condition);
        }

        if let Some(term) = &self.term {
            query = query.filter(
                contains_any([tape::Column::Title, tape::Column::CatalogNumber], term)
                    .add(contains_ci(artist::Column::Name, term))
                    .add(contains_ci(label::Column::Name, term)),
            );
        }

        log::debug!(
            "Tape search: term={:?} filter={:?} sort={:?} {:?}",
            self.term,
            self.filter,
            self.sort,
            self.order
        );
        query
    }

    pub fn sorted_query(&self) -> Select<tape::Entity> {
        self.sort.apply(self.filtered_query(), self.order)
    }

    /// Page past the end is kept and yields no rows.
    pub fn window(&self, total_items: u64) -> PageWindow {
        PageWindow::unclamped(total_items, self.page, self.page_size)
    }
}
