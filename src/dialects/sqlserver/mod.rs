use crate::dialects::base::{DialectFactory, DialectHeader};
use std::sync::OnceLock;

const DEFINITION: &str = include_str!("dialect.toml");

static HEADER: OnceLock<DialectHeader> = OnceLock::new();

/// SQL Server. `TOP` before 2012 (11.0), `offset ... fetch` from then on.
pub struct SqlServerDialect {
    header: &'static DialectHeader,
}

impl SqlServerDialect {
    pub fn new() -> Self {
        let header = HEADER.get_or_init(|| {
            toml::from_str(DEFINITION).expect("Failed to parse SQL Server dialect definition")
        });

        Self { header }
    }
}

impl Default for SqlServerDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectFactory for SqlServerDialect {
    fn header(&self) -> &DialectHeader {
        self.header
    }

    fn definition(&self) -> &'static str {
        DEFINITION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialects::base::DialectError;
    use crate::dialects::pagination::{LimitHandler, LimitSpec, PaginationError};
    use crate::dialects::version::DatabaseVersion;

    #[test]
    fn test_legacy_versions_use_top() {
        let dialect = SqlServerDialect::new().build(DatabaseVersion::new(10, 50)).unwrap();
        assert_eq!(dialect.limit_handler(), LimitHandler::Top);
        assert_eq!(
            dialect.process_sql("select distinct a from t", &LimitSpec::max_rows(3)).unwrap(),
            "select distinct TOP ? a from t"
        );
        assert!(matches!(
            dialect.process_sql("select a from t", &LimitSpec::window(5, 3)),
            Err(DialectError::Pagination(PaginationError::UnsupportedOffset(_, 5)))
        ));
        assert!(!dialect.supports_sequences());
    }

    #[test]
    fn test_2012_and_later_use_offset_fetch() {
        let dialect = SqlServerDialect::new().build(DatabaseVersion::new(11, 0)).unwrap();
        assert_eq!(dialect.limit_handler(), LimitHandler::OffsetFetch);
        assert_eq!(
            dialect.process_sql("select a from t order by a", &LimitSpec::window(5, 3)).unwrap(),
            "select a from t order by a offset ? rows fetch next ? rows only"
        );
        assert_eq!(
            dialect.sequence_next_value_sql("order_seq").unwrap(),
            "select next value for order_seq"
        );
    }
}
