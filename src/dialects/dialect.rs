use crate::dialects::base::{DefaultProperties, DialectConfig, DialectError, FeatureConfig};
use crate::dialects::exceptions::{
    ClassifiedFailure, ClassifierChain, ClassifyNativeError, ErrorClassifier, NativeError,
    SqlStateClassifier,
};
use crate::dialects::functions::{FunctionDescriptor, FunctionRegistry, SqlArgument};
use crate::dialects::locking::{LockMode, LockSyntax, LockTarget, LockingPolicy, LockingStrategy};
use crate::dialects::ordering::{render_order_by_element, NullPrecedence, SortOrder};
use crate::dialects::pagination::{BindOrder, LimitHandler, LimitSpec};
use crate::dialects::types::{ColumnSize, ColumnTypeRegistry, GenericType};
use crate::dialects::version::{DatabaseVersion, DialectResolutionInfo};
use log::{debug, info};
use serde::Deserialize;
use toml::{Table, Value};

/// Definition every dialect is layered on top of
const BASE_DEFINITION: &str = include_str!("generic/dialect.toml");

/// A fully resolved, immutable dialect for one backend version
#[derive(Debug, Clone)]
pub struct Dialect {
    version: DatabaseVersion,
    config: DialectConfig,
    column_types: ColumnTypeRegistry,
    functions: FunctionRegistry,
    classifier: ErrorClassifier,
    lock_syntax: LockSyntax,
}

impl Dialect {
    pub fn name(&self) -> &str {
        &self.config.metadata.name
    }

    pub fn description(&self) -> &str {
        &self.config.metadata.description
    }

    pub fn version(&self) -> DatabaseVersion {
        self.version
    }

    /// The merged definition this dialect was built from
    pub fn config(&self) -> &DialectConfig {
        &self.config
    }

    pub fn features(&self) -> &FeatureConfig {
        &self.config.features
    }

    pub fn default_properties(&self) -> &DefaultProperties {
        &self.config.properties
    }

    // Column types

    pub fn column_types(&self) -> &ColumnTypeRegistry {
        &self.column_types
    }

    pub fn column_type(&self, generic_type: GenericType, size: ColumnSize) -> Result<String, DialectError> {
        Ok(self.column_types.resolve(generic_type, size)?)
    }

    // Functions

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn render_function(&self, name: &str, args: &[SqlArgument]) -> Result<String, DialectError> {
        Ok(self.functions.render(name, args)?)
    }

    // Pagination

    pub fn limit_handler(&self) -> LimitHandler {
        self.config.limit.handler
    }

    pub fn supports_limit(&self) -> bool {
        self.limit_handler().supports_limit()
    }

    pub fn supports_limit_offset(&self) -> bool {
        self.limit_handler().supports_limit_offset()
    }

    pub fn supports_variable_limit(&self) -> bool {
        self.config.limit.variable_limit
    }

    pub fn bind_limit_parameters_first(&self) -> bool {
        self.limit_handler().bind_order() == BindOrder::BeforeStatement
    }

    /// Whether the limit parameter is the last row number instead of a row count
    pub fn uses_max_rows(&self) -> bool {
        self.config.limit.uses_max_rows
    }

    pub fn process_sql(&self, sql: &str, limit: &LimitSpec) -> Result<String, DialectError> {
        Ok(self.limit_handler().process_sql(sql, limit)?)
    }

    /// Values for the limit markers added by `process_sql`, in marker order
    pub fn limit_bind_values(&self, limit: &LimitSpec) -> Vec<u32> {
        self.limit_handler().bind_values(limit, self.uses_max_rows())
    }

    // Locking

    pub fn locking_policy(&self) -> LockingPolicy {
        self.config.locking.policy
    }

    pub fn locking_strategy(&self, mode: LockMode, has_version_column: bool) -> LockingStrategy {
        self.locking_policy().select_strategy(mode, has_version_column)
    }

    /// Statement acquiring `mode` on `target`, if one is issued up front
    pub fn lock_sql(&self, mode: LockMode, target: &LockTarget) -> Result<Option<String>, DialectError> {
        let strategy = self.locking_strategy(mode, target.is_versioned());
        debug!(
            "Lock mode {} on '{}' uses strategy {:?}",
            mode,
            target.table,
            strategy.kind()
        );
        Ok(strategy.lock_sql(target, &self.lock_syntax)?)
    }

    pub fn for_update_string(&self) -> &str {
        &self.lock_syntax.for_update
    }

    pub fn read_lock_string(&self) -> &str {
        &self.lock_syntax.read_lock
    }

    // Errors

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Classify with this dialect first, then each fallback, then by SQL state
    pub fn classify_with(&self, error: &NativeError, fallbacks: &[&dyn ClassifyNativeError]) -> ClassifiedFailure {
        let last_resort = SqlStateClassifier;
        let mut chain = ClassifierChain::new(&self.classifier);
        for fallback in fallbacks {
            chain = chain.then(*fallback);
        }
        chain.then(&last_resort).classify(error)
    }

    pub fn extract_constraint_name(&self, message: &str) -> Option<String> {
        self.classifier.extractor().extract(message)
    }

    // Identity and sequences

    pub fn supports_identity_columns(&self) -> bool {
        self.config.identity.supported
    }

    pub fn identity_column_string(&self) -> Result<&str, DialectError> {
        self.require_identity()?;
        Ok(&self.config.identity.column)
    }

    pub fn identity_select_string(&self) -> Result<&str, DialectError> {
        self.require_identity()?;
        Ok(&self.config.identity.select)
    }

    pub fn has_data_type_in_identity_column(&self) -> bool {
        self.config.identity.data_type_in_identity_column
    }

    fn require_identity(&self) -> Result<(), DialectError> {
        if self.supports_identity_columns() {
            Ok(())
        } else {
            Err(DialectError::UnsupportedFeature(format!(
                "{} does not support identity columns",
                self.name()
            )))
        }
    }

    pub fn supports_sequences(&self) -> bool {
        self.config.sequences.supported
    }

    pub fn sequence_next_value_sql(&self, sequence: &str) -> Result<String, DialectError> {
        match (&self.config.sequences.next_value, self.supports_sequences()) {
            (Some(template), true) => Ok(template.replace("{name}", sequence)),
            _ => Err(DialectError::UnsupportedFeature(format!(
                "{} does not support sequences",
                self.name()
            ))),
        }
    }

    // DDL

    pub fn add_foreign_key_constraint(
        &self,
        constraint: &str,
        columns: &[&str],
        referenced_table: &str,
        referenced_columns: &[&str],
        references_primary_key: bool,
    ) -> String {
        let sql = &self.config.sql;
        let referenced = if sql.always_reference_columns || !references_primary_key {
            format!(" ({})", referenced_columns.join(", "))
        } else {
            String::new()
        };
        sql.foreign_key
            .replace("{constraint}", constraint)
            .replace("{columns}", &columns.join(", "))
            .replace("{table}", referenced_table)
            .replace("{referenced}", &referenced)
    }

    pub fn add_column_string(&self) -> &str {
        &self.config.sql.add_column
    }

    pub fn no_columns_insert_string(&self) -> &str {
        &self.config.sql.no_columns_insert
    }

    pub fn cascade_constraints_string(&self) -> &str {
        &self.config.sql.cascade_constraints
    }

    pub fn null_column_string(&self) -> &str {
        &self.config.sql.null_column
    }

    pub fn current_timestamp(&self) -> &str {
        &self.config.sql.current_timestamp
    }

    pub fn lowercase_function(&self) -> &str {
        &self.config.sql.lowercase_function
    }

    pub fn quote_identifier(&self, identifier: &str) -> String {
        let quote = &self.config.sql.quote_identifier;
        let escaped = identifier.replace(quote.as_str(), &self.config.sql.escape_identifier);
        format!("{}{}{}", quote, escaped, quote)
    }

    pub fn render_order_by_element(
        &self,
        expression: &str,
        collation: Option<&str>,
        order: Option<SortOrder>,
        nulls: NullPrecedence,
    ) -> String {
        render_order_by_element(
            self.config.features.null_ordering,
            expression,
            collation,
            order,
            nulls,
        )
    }
}

impl ClassifyNativeError for Dialect {
    fn classify(&self, error: &NativeError) -> ClassifiedFailure {
        self.classifier.classify(error)
    }
}

/// A `[[since]]` entry: a patch applied when the target version is at least `version`
#[derive(Debug, Deserialize)]
struct VersionPatch {
    version: DatabaseVersion,
    #[serde(default)]
    patch: Table,
}

/// Assembles a [`Dialect`] from the generic base definition plus ordered patches
pub struct DialectBuilder {
    version: DatabaseVersion,
    table: Table,
    column_types: Vec<(GenericType, String)>,
    functions: Vec<(String, FunctionDescriptor)>,
    aliases: Vec<(String, String)>,
}

impl DialectBuilder {
    pub fn new(version: DatabaseVersion) -> Result<Self, DialectError> {
        let builder = Self {
            version,
            table: Table::new(),
            column_types: Vec::new(),
            functions: Vec::new(),
            aliases: Vec::new(),
        };
        builder.layer(BASE_DEFINITION)
    }

    pub fn from_info(info: &dyn DialectResolutionInfo) -> Result<Self, DialectError> {
        Self::new(info.database_version())
    }

    /// Merge a TOML definition, including its applicable `[[since]]` patches
    pub fn layer(self, definition: &str) -> Result<Self, DialectError> {
        let table: Table = toml::from_str(definition)
            .map_err(|e| DialectError::ConfigError(format!("Invalid dialect definition: {}", e)))?;
        self.patch(table)
    }

    /// Merge an already parsed patch table
    pub fn patch(mut self, mut patch: Table) -> Result<Self, DialectError> {
        let since = patch.remove("since");
        merge_table(&mut self.table, patch);

        if let Some(since) = since {
            let mut patches: Vec<VersionPatch> = since
                .try_into()
                .map_err(|e| DialectError::ConfigError(format!("Invalid [[since]] patch: {}", e)))?;
            patches.sort_by_key(|p| p.version);
            for gated in patches {
                if self.version.is_same_or_after(&gated.version) {
                    debug!("Applying patch for version {} (target {})", gated.version, self.version);
                    merge_table(&mut self.table, gated.patch);
                }
            }
        }
        Ok(self)
    }

    pub fn column_type(mut self, generic_type: GenericType, template: impl Into<String>) -> Self {
        self.column_types.push((generic_type, template.into()));
        self
    }

    /// Register or replace a function after the definitions are applied
    pub fn function(mut self, name: impl Into<String>, descriptor: FunctionDescriptor) -> Self {
        self.functions.push((name.into(), descriptor));
        self
    }

    pub fn alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), canonical.into()));
        self
    }

    pub fn build(self) -> Result<Dialect, DialectError> {
        let config: DialectConfig = Value::Table(self.table)
            .try_into()
            .map_err(|e| DialectError::ConfigError(format!("Invalid dialect definition: {}", e)))?;

        if let Some(minimum) = config.metadata.min_version {
            if self.version.is_before(&minimum) {
                return Err(DialectError::UnsupportedVersion {
                    dialect: config.metadata.name.clone(),
                    version: self.version,
                    minimum,
                });
            }
        }

        let mut column_types = ColumnTypeRegistry::new();
        for (code, template) in &config.column_types {
            column_types.register(code.parse::<GenericType>()?, template.clone());
        }
        for (generic_type, template) in self.column_types {
            column_types.register(generic_type, template);
        }

        let mut functions = FunctionRegistry::new();
        for (name, spec) in &config.functions {
            functions.register(name, spec.to_descriptor(name)?)?;
        }
        for (name, spec) in &config.functions {
            for alias in &spec.aliases {
                functions.register_alternate_key(alias, name)?;
            }
        }
        for (name, descriptor) in self.functions {
            functions.register_override(&name, descriptor);
        }
        for (alias, canonical) in self.aliases {
            functions.register_alternate_key(&alias, &canonical)?;
        }

        let classifier = ErrorClassifier::new(
            config.errors.integrity_codes.iter().copied(),
            config.errors.data_error_classes.iter().cloned(),
            config.errors.constraint_name.clone(),
        );
        let lock_syntax = LockSyntax {
            for_update: config.sql.for_update.clone(),
            read_lock: config.sql.read_lock.clone(),
        };

        info!(
            "Built dialect {} {} ({} column types, {} functions)",
            config.metadata.name,
            self.version,
            column_types.len(),
            functions.len()
        );

        Ok(Dialect {
            version: self.version,
            config,
            column_types,
            functions,
            classifier,
            lock_syntax,
        })
    }
}

/// Deep-merge `patch` into `base`. Entries of a `functions` table are replaced whole.
fn merge_table(base: &mut Table, patch: Table) {
    for (key, value) in patch {
        match value {
            Value::Table(incoming) => {
                if let Some(Value::Table(existing)) = base.get_mut(&key) {
                    if key == "functions" {
                        for (name, entry) in incoming {
                            existing.insert(name, entry);
                        }
                    } else {
                        merge_table(existing, incoming);
                    }
                    continue;
                }
                base.insert(key, Value::Table(incoming));
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}
