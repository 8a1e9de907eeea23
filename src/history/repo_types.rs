use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

/// One history row joined with its route name.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct HistoryRow {
    pub id_ruta: i32,
    pub nombre_ruta: String,
    #[serde(with = "time::serde::rfc3339")]
    pub fecha: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub id_usuarios: i32,
    pub id_ruta: i32,
    pub fecha: OffsetDateTime,
}

/// Sort direction on `fecha`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// `desc` in any case is descending; any other value is ascending.
    pub fn from_param(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub const fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A resolved date-range page: both bounds are inclusive calendar days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateQuery {
    pub id_usuarios: i32,
    pub start: Date,
    pub end: Date,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}
