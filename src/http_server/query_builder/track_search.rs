use sea_orm::{
    Condition, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
};
use serde::Deserialize;

use super::{
    PageWindow, SortOrder, SortableField, contains_any, contains_ci, int_param, normalize_param,
    search_term,
};
use crate::entities::{artist, tape, track};

pub const DEFAULT_TRACK_PAGE_SIZE: u64 = 25;
pub const MAX_TRACK_PAGE_SIZE: u64 = 200;

/// Raw query string of `GET /api/search_musicas`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TrackSearchQuery {
    pub termo: Option<String>,
    pub campo: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Which columns the search term is matched against.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TrackSearchField {
    /// Track title and author
    Title,
    Isrc,
    /// Owning tape's title and catalog number
    Tape,
    /// Owning tape's artist name
    Artist,
    All,
}

impl TrackSearchField {
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(normalize_param).as_deref() {
            Some("musica" | "title") => Self::Title,
            Some("isrc") => Self::Isrc,
            Some("tape") => Self::Tape,
            Some("artista" | "artist") => Self::Artist,
            _ => Self::All,
        }
    }

    pub fn condition(self, term: &str) -> Condition {
        let title = contains_any([track::Column::Title, track::Column::Author], term);
        let tape = contains_any([tape::Column::Title, tape::Column::CatalogNumber], term);
        let isrc = contains_ci(track::Column::Isrc, term);
        let artist = contains_ci(artist::Column::Name, term);

        match self {
            Self::Title => title,
            Self::Isrc => Condition::any().add(isrc),
            Self::Tape => tape,
            Self::Artist => Condition::any().add(artist),
            Self::All => Condition::any().add(title).add(isrc).add(tape).add(artist),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TrackSortField {
    Id,
    Title,
    ArtistName,
    TapeTitle,
    Side,
    Number,
    Isrc,
}

impl SortableField for TrackSortField {
    type Entity = track::Entity;

    fn from_param(value: &str) -> Option<Self> {
        match value {
            "id" => Some(Self::Id),
            "musica" | "title" => Some(Self::Title),
            "artista" | "artist" => Some(Self::ArtistName),
            "tape" => Some(Self::TapeTitle),
            "lado" | "side" => Some(Self::Side),
            "numero" | "number" => Some(Self::Number),
            "isrc" => Some(Self::Isrc),
            _ => None,
        }
    }

    fn default_field() -> Self {
        Self::Id
    }

    /// Expects the tape and artist joins from [`TrackSearchParams::filtered_query`].
    fn apply(self, query: Select<track::Entity>, order: SortOrder) -> Select<track::Entity> {
        let query = match self {
            Self::Id => return query.order_by(track::Column::Id, order.into()),
            Self::Title => query.order_by(track::Column::Title, order.into()),
            Self::ArtistName => query.order_by(artist::Column::Name, order.into()),
            Self::TapeTitle => query.order_by(tape::Column::Title, order.into()),
            Self::Side => query.order_by(track::Column::Side, order.into()),
            Self::Number => query.order_by(track::Column::Number, order.into()),
            Self::Isrc => query.order_by(track::Column::Isrc, order.into()),
        };
        query.order_by_asc(track::Column::Id)
    }
}

/// Normalized track search parameters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrackSearchParams {
    pub term: Option<String>,
    pub field: TrackSearchField,
    pub page: u64,
    pub page_size: u64,
    pub sort: TrackSortField,
    pub order: SortOrder,
}

impl From<&TrackSearchQuery> for TrackSearchParams {
    fn from(raw: &TrackSearchQuery) -> Self {
        let page = int_param(raw.page.as_deref()).unwrap_or(1).max(1) as u64;
        let page_size = int_param(raw.limit.as_deref())
            .map(|limit| limit.clamp(1, MAX_TRACK_PAGE_SIZE as i64) as u64)
            .unwrap_or(DEFAULT_TRACK_PAGE_SIZE);

        Self {
            term: search_term(raw.termo.as_deref()),
            field: TrackSearchField::from_param(raw.campo.as_deref()),
            page,
            page_size,
            sort: TrackSortField::parse_or_default(raw.sort.as_deref()),
            order: SortOrder::descending_unless_asc(raw.order.as_deref()),
        }
    }
}

impl TrackSearchParams {
    /// Tracks joined to their tape and left-joined to the tape's artist.
    pub fn filtered_query(&self) -> Select<track::Entity> {
        let mut query = track::Entity::find()
            .join(JoinType::InnerJoin, track::Relation::Tape.def())
            .join(JoinType::LeftJoin, tape::Relation::Artist.def());

        if let Some(term) = &self.term {
            query = query.filter(self.field.condition(term));
        }

        log::debug!(
            "Track search: term={:?} field={:?} sort={:?} {:?}",
            self.term,
            self.field,
            self.sort,
            self.order
        );
        query
    }

    pub fn sorted_query(&self) -> Select<track::Entity> {
        self.sort.apply(self.filtered_query(), self.order)
    }

    /// Page past the end is pulled back to the last page.
    pub fn window(&self, total_items: u64) -> PageWindow {
        PageWindow::clamped_to_last(total_items, self.page, self.page_size)
    }
}
