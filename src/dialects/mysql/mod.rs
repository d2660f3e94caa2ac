use crate::dialects::base::{DialectFactory, DialectHeader};
use std::sync::OnceLock;

const DEFINITION: &str = include_str!("dialect.toml");

static HEADER: OnceLock<DialectHeader> = OnceLock::new();

pub struct MysqlDialect {
    header: &'static DialectHeader,
}

impl MysqlDialect {
    pub fn new() -> Self {
        let header = HEADER.get_or_init(|| {
            toml::from_str(DEFINITION).expect("Failed to parse MySQL dialect definition")
        });

        Self { header }
    }
}

impl Default for MysqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectFactory for MysqlDialect {
    fn header(&self) -> &DialectHeader {
        self.header
    }

    fn definition(&self) -> &'static str {
        DEFINITION
    }
}
