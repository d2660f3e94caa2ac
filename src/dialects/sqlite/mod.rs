use crate::dialects::base::{DialectFactory, DialectHeader};
use std::sync::OnceLock;

const DEFINITION: &str = include_str!("dialect.toml");

static HEADER: OnceLock<DialectHeader> = OnceLock::new();

pub struct SqliteDialect {
    header: &'static DialectHeader,
}

impl SqliteDialect {
    pub fn new() -> Self {
        let header = HEADER.get_or_init(|| {
            toml::from_str(DEFINITION).expect("Failed to parse SQLite dialect definition")
        });

        Self { header }
    }
}

impl Default for SqliteDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectFactory for SqliteDialect {
    fn header(&self) -> &DialectHeader {
        self.header
    }

    fn definition(&self) -> &'static str {
        DEFINITION
    }
}
