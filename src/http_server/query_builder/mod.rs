use sea_orm::sea_query::{Expr, ExprTrait, Func};
use sea_orm::{ColumnTrait, Condition, EntityTrait, Order, QuerySelect, Select};

pub mod tape_search;
pub mod track_search;
pub use tape_search::*;
pub use track_search::*;

// ============================================================================
// Sort Order
// ============================================================================

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Ascending unless the parameter is exactly `desc`.
    pub fn ascending_unless_desc(value: Option<&str>) -> Self {
        match value.map(normalize_param).as_deref() {
            Some("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    /// Descending unless the parameter is exactly `asc`.
    pub fn descending_unless_asc(value: Option<&str>) -> Self {
        match value.map(normalize_param).as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

// ============================================================================
// Trait for Type-Safe Sort Fields
// ============================================================================

pub trait SortableField: Sized + Copy {
    type Entity: EntityTrait;

    /// Map a query-string value (already trimmed and lowercased) to a field
    fn from_param(value: &str) -> Option<Self>;

    /// Field used when the parameter is absent or unknown
    fn default_field() -> Self;

    /// Add this field's ordering to the query
    fn apply(self, query: Select<Self::Entity>, order: SortOrder) -> Select<Self::Entity>;

    fn parse_or_default(value: Option<&str>) -> Self {
        value
            .map(normalize_param)
            .and_then(|value| Self::from_param(&value))
            .unwrap_or_else(Self::default_field)
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Resolved page of a listing: which slice to fetch plus metadata for the client.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PageWindow {
    /// 1-indexed page number
    pub page: u64,
    pub page_size: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl PageWindow {
    /// Keeps the requested page even past the end, which then yields no rows.
    /// An empty listing has zero pages.
    pub fn unclamped(total_items: u64, page: u64, page_size: u64) -> Self {
        let page_size = Ord::max(page_size, 1);
        Self {
            page: Ord::max(page, 1),
            page_size,
            total_items,
            total_pages: total_items.div_ceil(page_size),
        }
    }

    /// Pulls a page past the end back to the last page. There is always at
    /// least one page, possibly empty.
    pub fn clamped_to_last(total_items: u64, page: u64, page_size: u64) -> Self {
        let page_size = Ord::max(page_size, 1);
        let total_pages = Ord::max(total_items.div_ceil(page_size), 1);
        Self {
            page: page.clamp(1, total_pages),
            page_size,
            total_items,
            total_pages,
        }
    }

    /// True when the requested page starts after the last row.
    pub fn is_past_end(&self) -> bool {
        self.page > self.total_pages
    }

    /// Row offset of the page, saturating at the largest offset the store accepts.
    pub fn offset(&self) -> u64 {
        (self.page - 1)
            .checked_mul(self.page_size)
            .map_or(MAX_OFFSET, |offset| Ord::min(offset, MAX_OFFSET))
    }
}

/// Store drivers bind LIMIT/OFFSET as signed 64-bit integers.
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Apply a resolved page window as LIMIT/OFFSET
pub fn apply_pagination<T: EntityTrait>(query: Select<T>, window: &PageWindow) -> Select<T> {
    query.limit(window.page_size).offset(window.offset())
}

// ============================================================================
// Parameter Helpers
// ============================================================================

pub fn normalize_param(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Trimmed search term, or `None` when blank (which disables filtering).
pub fn search_term(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
}

/// Parse an integer query parameter, treating blanks and garbage as absent.
pub fn int_param(value: Option<&str>) -> Option<i64> {
    value.and_then(|value| value.trim().parse::<i64>().ok())
}

/// Case-insensitive substring match on one column.
///
/// Both sides are lowercased so the match does not depend on how the backend's
/// LIKE treats case (Postgres is case-sensitive).
pub fn contains_ci<C: ColumnTrait>(column: C, term: &str) -> Expr {
    Expr::expr(Func::lower(Expr::col(column.as_column_ref())))
        .like(format!("%{}%", term.to_lowercase()))
}

/// Case-insensitive substring match on any of the columns (OR condition).
pub fn contains_any<C, I>(columns: I, term: &str) -> Condition
where
    C: ColumnTrait,
    I: IntoIterator<Item = C>,
{
    columns
        .into_iter()
        .fold(Condition::any(), |condition, column| {
            condition.add(contains_ci(column, term))
        })
}

// ============================================================================
// Tests
// ============================================================================
