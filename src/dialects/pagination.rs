use serde::{Deserialize, Serialize};

/// Bound used for the row limit when a query asks for an offset but no maximum
pub const UNBOUNDED_ROWS: u32 = i32::MAX as u32;

/// Requested window of rows. An empty spec means no limiting is needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitSpec {
    /// Number of rows to skip; `None` starts from the first row
    pub first_row: Option<u32>,
    /// Maximum number of rows to return; `None` is unbounded
    pub max_rows: Option<u32>,
}

impl LimitSpec {
    pub fn new(first_row: Option<u32>, max_rows: Option<u32>) -> Self {
        Self { first_row, max_rows }
    }

    pub fn max_rows(max_rows: u32) -> Self {
        Self::new(None, Some(max_rows))
    }

    pub fn window(first_row: u32, max_rows: u32) -> Self {
        Self::new(Some(first_row), Some(max_rows))
    }

    pub fn is_empty(&self) -> bool {
        !self.has_first_row() && self.max_rows.is_none()
    }

    /// An offset only counts when it actually skips rows
    pub fn has_first_row(&self) -> bool {
        self.first_row.is_some_and(|n| n > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("The '{0}' limit handler cannot skip rows (requested offset {1})")]
    UnsupportedOffset(&'static str, u32),

    #[error("No SELECT keyword found in statement: {0}")]
    NoSelectClause(String),

    #[error("max_rows must be positive")]
    InvalidMaxRows,
}

/// Where the limit parameters sit relative to the statement's own parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOrder {
    BeforeStatement,
    AfterStatement,
}

/// The closed set of pagination syntaxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitHandler {
    /// Limiting is left to the driver; the statement is never rewritten
    None,
    /// `select TOP ?`, no offset support
    Top,
    /// `select TOP ?` or `select %ROWOFFSET ? %ROWLIMIT ?`
    TopRowOffset,
    /// `limit ?` / `limit ? offset ?` appended
    LimitOffset,
    /// `limit ?` / `limit ?, ?` appended, offset first
    LimitCommaOffset,
    /// `fetch first ? rows only` / `offset ? rows fetch next ? rows only` appended
    #[default]
    OffsetFetch,
}

impl LimitHandler {
    pub fn name(&self) -> &'static str {
        match self {
            LimitHandler::None => "none",
            LimitHandler::Top => "top",
            LimitHandler::TopRowOffset => "top_row_offset",
            LimitHandler::LimitOffset => "limit_offset",
            LimitHandler::LimitCommaOffset => "limit_comma_offset",
            LimitHandler::OffsetFetch => "offset_fetch",
        }
    }

    pub fn supports_limit(&self) -> bool {
        !matches!(self, LimitHandler::None)
    }

    pub fn supports_limit_offset(&self) -> bool {
        !matches!(self, LimitHandler::None | LimitHandler::Top)
    }

    pub fn bind_order(&self) -> BindOrder {
        match self {
            LimitHandler::Top | LimitHandler::TopRowOffset => BindOrder::BeforeStatement,
            _ => BindOrder::AfterStatement,
        }
    }

    /// Rewrite `sql` so that it only returns the rows described by `limit`
    pub fn process_sql(&self, sql: &str, limit: &LimitSpec) -> Result<String, PaginationError> {
        if limit.max_rows == Some(0) {
            return Err(PaginationError::InvalidMaxRows);
        }
        if limit.is_empty() {
            return Ok(sql.to_string());
        }
        if limit.has_first_row() && !self.supports_limit_offset() {
            return Err(PaginationError::UnsupportedOffset(
                self.name(),
                limit.first_row.unwrap_or_default(),
            ));
        }

        let has_offset = limit.has_first_row();
        let rewritten = match self {
            LimitHandler::None => sql.to_string(),
            LimitHandler::Top => insert_after_select(sql, " TOP ?", true)?,
            LimitHandler::TopRowOffset => {
                if has_offset {
                    insert_after_select(sql, " %ROWOFFSET ? %ROWLIMIT ?", false)?
                } else {
                    insert_after_select(sql, " TOP ?", true)?
                }
            }
            LimitHandler::LimitOffset => {
                let clause = if has_offset { " limit ? offset ?" } else { " limit ?" };
                format!("{}{}", sql, clause)
            }
            LimitHandler::LimitCommaOffset => {
                let clause = if has_offset { " limit ?, ?" } else { " limit ?" };
                format!("{}{}", sql, clause)
            }
            LimitHandler::OffsetFetch => {
                let clause = if has_offset {
                    " offset ? rows fetch next ? rows only"
                } else {
                    " fetch first ? rows only"
                };
                format!("{}{}", sql, clause)
            }
        };

        Ok(rewritten)
    }

    /// Values for the limit parameters, in the order their markers appear.
    /// With max-rows semantics the limit is the highest row number, not a count.
    pub fn bind_values(&self, limit: &LimitSpec, uses_max_rows: bool) -> Vec<u32> {
        if limit.is_empty() || !self.supports_limit() {
            return Vec::new();
        }

        let offset = if limit.has_first_row() {
            limit.first_row.unwrap_or_default()
        } else {
            0
        };
        let rows = limit.max_rows.unwrap_or(UNBOUNDED_ROWS);
        let bound = if uses_max_rows {
            offset.saturating_add(rows).min(UNBOUNDED_ROWS)
        } else {
            rows
        };

        if !limit.has_first_row() {
            return vec![bound];
        }
        match self {
            LimitHandler::LimitOffset => vec![bound, offset],
            _ => vec![offset, bound],
        }
    }
}

/// Insert `clause` directly after the first `select` keyword. When
/// `after_distinct` is set and `select distinct` starts at the same place, the
/// clause goes after `distinct` instead.
///
/// Purely textual: a `select` inside a string literal or a subquery ahead of
/// the main one will be matched first.
fn insert_after_select(sql: &str, clause: &str, after_distinct: bool) -> Result<String, PaginationError> {
    // ASCII lowering keeps byte offsets aligned with `sql`
    let lower = sql.to_ascii_lowercase();
    let select_index = lower
        .find("select")
        .ok_or_else(|| PaginationError::NoSelectClause(sql.to_string()))?;

    let insertion_point = if after_distinct && lower[select_index..].starts_with("select distinct") {
        select_index + "select distinct".len()
    } else {
        select_index + "select".len()
    };

    let mut rewritten = String::with_capacity(sql.len() + clause.len());
    rewritten.push_str(&sql[..insertion_point]);
    rewritten.push_str(clause);
    rewritten.push_str(&sql[insertion_point..]);
    Ok(rewritten)
}
