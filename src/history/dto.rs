use serde::{Deserialize, Deserializer, Serialize};
use time::{
    format_description::FormatItem, macros::format_description, Date, Duration, OffsetDateTime,
};

use crate::{
    error::{AppError, AppResult},
    history::repo_types::{DateQuery, SortOrder},
};

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Query string of the date-range listing. Empty values count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct DateFilter {
    #[serde(default, deserialize_with = "empty_date_as_none")]
    pub fecha_inicio: Option<Date>,
    #[serde(default, deserialize_with = "empty_date_as_none")]
    pub fecha_fin: Option<Date>,
    #[serde(default)]
    pub ordenar: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

fn empty_date_as_none<'de, D>(de: D) -> Result<Option<Date>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Date::parse(s, DATE_FORMAT)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl DateFilter {
    /// Fills in defaults relative to `today`: the last 30 days, newest first,
    /// page 1 of 10.
    pub fn resolve(self, id_usuarios: i32, today: Date) -> AppResult<DateQuery> {
        let start = self
            .fecha_inicio
            .unwrap_or_else(|| today - Duration::days(DEFAULT_WINDOW_DAYS));
        let end = self.fecha_fin.unwrap_or(today);
        if start > end {
            return Err(AppError::validation(
                "fecha_inicio must not be after fecha_fin",
            ));
        }

        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::validation("page must be at least 1"));
        }
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size < 1 {
            return Err(AppError::validation("page_size must be at least 1"));
        }
        if page_size > MAX_PAGE_SIZE {
            return Err(AppError::validation(format!(
                "page_size must be at most {MAX_PAGE_SIZE}"
            )));
        }
        let offset = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| AppError::validation("page out of range"))?;

        Ok(DateQuery {
            id_usuarios,
            start,
            end,
            order: self
                .ordenar
                .as_deref()
                .map(SortOrder::from_param)
                .unwrap_or_default(),
            limit: page_size,
            offset,
        })
    }
}

/// Body of a new history entry; the user comes from the token.
#[derive(Debug, Deserialize)]
pub struct CreateHistoryRequest {
    pub id_ruta: i32,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub fecha: Option<OffsetDateTime>, // defaults to now
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CreatedHistoryResponse {
    pub message: &'static str,
}
