use crate::dialects::base::{DialectFactory, DialectHeader};
use std::sync::OnceLock;

const DEFINITION: &str = include_str!("dialect.toml");

static HEADER: OnceLock<DialectHeader> = OnceLock::new();

/// InterSystems IRIS: `TOP`/`%ROWOFFSET` pagination, version-column locking
pub struct InterSystemsDialect {
    header: &'static DialectHeader,
}

impl InterSystemsDialect {
    pub fn new() -> Self {
        let header = HEADER.get_or_init(|| {
            toml::from_str(DEFINITION).expect("Failed to parse InterSystems IRIS dialect definition")
        });

        Self { header }
    }
}

impl Default for InterSystemsDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectFactory for InterSystemsDialect {
    fn header(&self) -> &DialectHeader {
        self.header
    }

    fn definition(&self) -> &'static str {
        DEFINITION
    }
}
