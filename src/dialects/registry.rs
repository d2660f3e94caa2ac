use crate::dialects::base::{DetectionResult, DialectError, DialectFactory};
use crate::dialects::dialect::{Dialect, DialectBuilder};
use crate::dialects::version::{DatabaseVersion, DialectResolutionInfo};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use toml::Table;

/// Central catalogue of all available database dialects
pub struct DialectRegistry {
    factories: HashMap<String, Arc<dyn DialectFactory>>,
    aliases: HashMap<String, String>, // alias -> dialect_name mapping
}

impl DialectRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Register a dialect factory. Names and aliases are matched case-insensitively.
    pub fn register(&mut self, factory: Arc<dyn DialectFactory>) {
        let name = factory.name().to_lowercase();
        debug!("Registering dialect: {}", name);

        for alias in factory.aliases() {
            self.aliases.insert(alias.to_lowercase(), name.clone());
        }

        self.factories.insert(name, factory);
    }

    /// Get a dialect factory by name (including aliases)
    pub fn get(&self, name: &str) -> Option<Arc<dyn DialectFactory>> {
        let key = name.to_lowercase();
        if let Some(factory) = self.factories.get(&key) {
            return Some(factory.clone());
        }

        self.aliases
            .get(&key)
            .and_then(|dialect_name| self.factories.get(dialect_name))
            .cloned()
    }

    /// Build the named dialect, at its default version unless one is given
    pub fn build(&self, name: &str, version: Option<DatabaseVersion>) -> Result<Dialect, DialectError> {
        self.build_patched(name, version, Vec::new())
    }

    /// Build the named dialect with caller patches layered over its definition
    pub fn build_patched(
        &self,
        name: &str,
        version: Option<DatabaseVersion>,
        patches: Vec<Table>,
    ) -> Result<Dialect, DialectError> {
        let factory = self
            .get(name)
            .ok_or_else(|| DialectError::NotFound(name.to_string()))?;
        let version = version.unwrap_or_else(|| factory.default_version());
        debug!(
            "Building dialect {} at version {} with {} patch(es)",
            factory.name(),
            version,
            patches.len()
        );

        let mut builder = DialectBuilder::new(version)?.layer(factory.definition())?;
        for patch in patches {
            builder = builder.patch(patch)?;
        }
        builder.build()
    }

    /// Detect a dialect from a connection string or product name
    pub fn detect(&self, input: &str) -> Result<Arc<dyn DialectFactory>, DialectError> {
        let mut candidates: Vec<(Arc<dyn DialectFactory>, DetectionResult)> = Vec::new();

        debug!("Detecting dialect for input (length: {})", input.len());

        for factory in self.factories.values() {
            if let Some(result) = factory.detect(input) {
                debug!(
                    "Dialect '{}' matched with confidence {}",
                    result.dialect_name, result.confidence
                );
                candidates.push((factory.clone(), result));
            }
        }

        if candidates.is_empty() {
            warn!("No dialect detected for input");
            return Err(DialectError::NotFound("No matching dialect found".to_string()));
        }

        // Highest confidence first
        candidates.sort_by(|a, b| {
            b.1.confidence
                .partial_cmp(&a.1.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Multiple high-confidence matches are ambiguous
        if candidates.len() > 1 && (candidates[0].1.confidence - candidates[1].1.confidence).abs() < 0.1 {
            let mut names: Vec<String> = candidates
                .iter()
                .filter(|(_, r)| (candidates[0].1.confidence - r.confidence).abs() < 0.1)
                .map(|(f, _)| f.name().to_string())
                .collect();
            names.sort();
            return Err(DialectError::Ambiguous(names));
        }

        let selected = &candidates[0];
        debug!(
            "Selected dialect: {} (confidence: {}, pattern: {})",
            selected.0.name(),
            selected.1.confidence,
            selected.1.matched_pattern
        );

        Ok(selected.0.clone())
    }

    /// Build the dialect matching what a live connection reports
    pub fn resolve(&self, info: &dyn DialectResolutionInfo) -> Result<Dialect, DialectError> {
        let factory = match self.get(info.database_name()) {
            Some(factory) => factory,
            None => self.detect(info.database_name())?,
        };
        info!(
            "Resolved '{}' {} to dialect {}",
            info.database_name(),
            info.database_version(),
            factory.name()
        );
        factory.build_from_info(info)
    }

    /// List all registered dialect names, sorted
    pub fn list_dialects(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get all aliases for a dialect
    pub fn get_aliases(&self, dialect_name: &str) -> Vec<String> {
        let target = dialect_name.to_lowercase();
        let mut aliases: Vec<String> = self
            .aliases
            .iter()
            .filter(|(_, name)| **name == target)
            .map(|(alias, _)| alias.clone())
            .collect();
        aliases.sort();
        aliases
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global registry instance; immutable once built
static GLOBAL_REGISTRY: OnceLock<DialectRegistry> = OnceLock::new();

/// Get the global dialect registry (initialized lazily)
pub fn get_registry() -> &'static DialectRegistry {
    GLOBAL_REGISTRY.get_or_init(create_default_registry)
}

/// Create registry with all built-in dialects
fn create_default_registry() -> DialectRegistry {
    let mut registry = DialectRegistry::new();

    registry.register(Arc::new(crate::dialects::generic::GenericDialect::new()));
    registry.register(Arc::new(crate::dialects::intersystems::InterSystemsDialect::new()));
    registry.register(Arc::new(crate::dialects::postgres::PostgresDialect::new()));
    registry.register(Arc::new(crate::dialects::mysql::MysqlDialect::new()));
    registry.register(Arc::new(crate::dialects::sqlite::SqliteDialect::new()));
    registry.register(Arc::new(crate::dialects::sqlserver::SqlServerDialect::new()));

    registry
}
