use crate::dialects::base::{DetectionResult, DialectFactory, DialectHeader};
use std::sync::OnceLock;

const DEFINITION: &str = include_str!("dialect.toml");

static HEADER: OnceLock<DialectHeader> = OnceLock::new();

pub struct GenericDialect {
    header: &'static DialectHeader,
}

impl GenericDialect {
    pub fn new() -> Self {
        let header = HEADER.get_or_init(|| {
            toml::from_str(DEFINITION).expect("Failed to parse Generic dialect definition")
        });

        Self { header }
    }
}

impl Default for GenericDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectFactory for GenericDialect {
    fn header(&self) -> &DialectHeader {
        self.header
    }

    /// The base definition needs no further layer
    fn definition(&self) -> &'static str {
        ""
    }

    fn detect(&self, _input: &str) -> Option<DetectionResult> {
        // Generic dialect always matches with very low confidence as fallback
        Some(DetectionResult {
            dialect_name: self.name().to_string(),
            confidence: 0.1,
            matched_pattern: "fallback".to_string(),
        })
    }
}
