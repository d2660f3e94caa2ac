use crate::dialects::dialect::{Dialect, DialectBuilder};
use crate::dialects::exceptions::ConstraintNameExtractor;
use crate::dialects::functions::{FunctionError, FunctionSpec};
use crate::dialects::locking::{LockingError, LockingPolicy};
use crate::dialects::ordering::NullOrdering;
use crate::dialects::pagination::{LimitHandler, PaginationError};
use crate::dialects::types::ColumnTypeError;
use crate::dialects::version::{DatabaseVersion, DialectResolutionInfo};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fully merged definition of a database dialect
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DialectConfig {
    pub metadata: DialectMetadata,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    pub sql: SqlConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub sequences: SequenceConfig,
    #[serde(default)]
    pub limit: LimitConfig,
    #[serde(default)]
    pub locking: LockingConfig,
    #[serde(default)]
    pub errors: ErrorConfig,
    #[serde(default)]
    pub properties: DefaultProperties,
    #[serde(default)]
    pub column_types: BTreeMap<String, String>,
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionSpec>,
}

/// Name and detection data of a dialect definition, readable without merging
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DialectHeader {
    pub metadata: DialectMetadata,
    #[serde(default)]
    pub detection: DetectionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DialectMetadata {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub min_version: Option<DatabaseVersion>,
    /// Version assumed when a dialect is requested by name only
    #[serde(default)]
    pub default_version: DatabaseVersion,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DetectionConfig {
    #[serde(default)]
    pub connection_patterns: Vec<String>,
    #[serde(default)]
    pub product_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub has_alter_table: bool,
    pub qualify_index_name: bool,
    pub drop_constraints: bool,
    pub supports_check: bool,
    pub supports_column_check: bool,
    pub supports_cascade_delete: bool,
    pub has_self_referential_foreign_key_bug: bool,
    pub supports_empty_in_list: bool,
    pub string_comparisons_case_insensitive: bool,
    pub supports_tuple_distinct_counts: bool,
    pub supports_tuples_in_subqueries: bool,
    pub supports_exists_in_select: bool,
    pub supports_outer_join_for_update: bool,
    pub null_ordering: NullOrdering,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            has_alter_table: true,
            qualify_index_name: true,
            drop_constraints: true,
            supports_check: true,
            supports_column_check: true,
            supports_cascade_delete: true,
            has_self_referential_foreign_key_bug: false,
            supports_empty_in_list: true,
            string_comparisons_case_insensitive: false,
            supports_tuple_distinct_counts: true,
            supports_tuples_in_subqueries: true,
            supports_exists_in_select: true,
            supports_outer_join_for_update: true,
            null_ordering: NullOrdering::Native,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqlConfig {
    pub quote_identifier: String,
    pub escape_identifier: String,
    pub current_timestamp: String,
    #[serde(default = "default_lowercase_function")]
    pub lowercase_function: String,
    #[serde(default = "default_add_column")]
    pub add_column: String,
    #[serde(default = "default_no_columns_insert")]
    pub no_columns_insert: String,
    #[serde(default)]
    pub cascade_constraints: String,
    #[serde(default)]
    pub null_column: String,
    #[serde(default)]
    pub for_update: String,
    #[serde(default)]
    pub read_lock: String,
    /// Uses `{constraint}`, `{columns}`, `{table}` and `{referenced}`
    #[serde(default = "default_foreign_key")]
    pub foreign_key: String,
    /// List referenced columns even when they are the primary key
    #[serde(default)]
    pub always_reference_columns: bool,
}

fn default_lowercase_function() -> String {
    "lower".to_string()
}
fn default_add_column() -> String {
    "add column".to_string()
}
fn default_no_columns_insert() -> String {
    "values ( )".to_string()
}
fn default_foreign_key() -> String {
    " add constraint {constraint} foreign key ({columns}) references {table}{referenced}".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub supported: bool,
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub select: String,
    #[serde(default = "default_true")]
    pub data_type_in_identity_column: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SequenceConfig {
    #[serde(default)]
    pub supported: bool,
    /// Uses `{name}`
    pub next_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitConfig {
    #[serde(default)]
    pub handler: LimitHandler,
    /// The limit parameter is the highest row number rather than a row count
    #[serde(default)]
    pub uses_max_rows: bool,
    #[serde(default = "default_true")]
    pub variable_limit: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            supported: false,
            column: String::new(),
            select: String::new(),
            data_type_in_identity_column: true,
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            handler: LimitHandler::default(),
            uses_max_rows: false,
            variable_limit: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LockingConfig {
    #[serde(default)]
    pub policy: LockingPolicy,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ErrorConfig {
    #[serde(default)]
    pub integrity_codes: Vec<i32>,
    #[serde(default)]
    pub data_error_classes: Vec<String>,
    #[serde(default)]
    pub constraint_name: ConstraintNameExtractor,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultProperties {
    pub use_sql_comments: bool,
    pub statement_batch_size: u32,
    pub use_streams_for_binary: bool,
}

impl Default for DefaultProperties {
    fn default() -> Self {
        Self {
            use_sql_comments: false,
            statement_batch_size: 15,
            use_streams_for_binary: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Result of dialect detection
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub dialect_name: String,
    pub confidence: f32,
    pub matched_pattern: String,
}

/// A built-in backend that knows how to produce its dialect
pub trait DialectFactory: Send + Sync {
    fn header(&self) -> &DialectHeader;

    /// TOML layered over the generic base definition
    fn definition(&self) -> &'static str;

    fn name(&self) -> &str {
        &self.header().metadata.name
    }

    fn aliases(&self) -> &[String] {
        &self.header().metadata.aliases
    }

    fn default_version(&self) -> DatabaseVersion {
        self.header().metadata.default_version
    }

    /// Detect if this dialect matches a connection URL or product name
    fn detect(&self, input: &str) -> Option<DetectionResult> {
        let detection = &self.header().detection;
        let lower = input.to_lowercase();
        let mut confidence = 0.0f32;
        let mut matched_pattern = String::new();

        for pattern in &detection.connection_patterns {
            if let Ok(re) = Regex::new(pattern) {
                if re.is_match(&lower) {
                    confidence = 0.9;
                    matched_pattern = pattern.clone();
                    break;
                }
            }
        }

        if confidence == 0.0 {
            for pattern in &detection.product_patterns {
                if let Ok(re) = Regex::new(pattern) {
                    if re.is_match(input) {
                        confidence = 0.8;
                        matched_pattern = pattern.clone();
                        break;
                    }
                }
            }
        }

        if confidence > 0.0 {
            Some(DetectionResult {
                dialect_name: self.name().to_string(),
                confidence,
                matched_pattern,
            })
        } else {
            None
        }
    }

    /// Build the dialect for an explicit backend version
    fn build(&self, version: DatabaseVersion) -> Result<Dialect, DialectError> {
        DialectBuilder::new(version)?.layer(self.definition())?.build()
    }

    /// Build the dialect for whatever version a connection reports
    fn build_from_info(&self, info: &dyn DialectResolutionInfo) -> Result<Dialect, DialectError> {
        self.build(info.database_version())
    }
}

/// Error types for dialect operations
#[derive(Debug, thiserror::Error)]
pub enum DialectError {
    #[error("Dialect not found: {0}")]
    NotFound(String),

    #[error("Multiple dialects detected: {0:?}")]
    Ambiguous(Vec<String>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Feature not supported: {0}")]
    UnsupportedFeature(String),

    #[error("Dialect '{dialect}' requires version {minimum} or later, got {version}")]
    UnsupportedVersion {
        dialect: String,
        version: DatabaseVersion,
        minimum: DatabaseVersion,
    },

    #[error(transparent)]
    ColumnType(#[from] ColumnTypeError),

    #[error(transparent)]
    Function(#[from] FunctionError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error(transparent)]
    Locking(#[from] LockingError),
}
