//! SQL dialect layer for dialect-rs
//!
//! A [`Dialect`] bundles everything that differs between database backends:
//! column type names, native functions, pagination syntax, row locking and
//! native error classification. Dialects are described by TOML definitions
//! layered over the generic base and are immutable once built.

pub mod base;
pub mod dialect;
pub mod exceptions;
pub mod functions;
pub mod locking;
pub mod ordering;
pub mod pagination;
pub mod registry;
pub mod types;
pub mod version;

// Built-in backends
pub mod generic;
pub mod intersystems;
pub mod mysql;
pub mod postgres;
pub mod sqlite;
pub mod sqlserver;

// Re-export main types
pub use base::{DialectConfig, DialectError, DialectFactory};
pub use dialect::{Dialect, DialectBuilder};
pub use exceptions::{ClassifiedFailure, ClassifyNativeError, NativeError};
pub use functions::{ArgCategory, FunctionDescriptor, SqlArgument};
pub use locking::{LockMode, LockTarget, LockingStrategy};
pub use ordering::{NullPrecedence, SortOrder};
pub use pagination::LimitSpec;
pub use registry::get_registry;
pub use types::{ColumnSize, GenericType};
pub use version::{ConnectionMetadata, DatabaseVersion, DialectResolutionInfo};

use std::sync::Arc;

/// Get a dialect factory by name or alias
pub fn get_dialect(name: &str) -> Option<Arc<dyn DialectFactory>> {
    get_registry().get(name)
}

/// Build a dialect, preferring an explicit name over the configured one and
/// falling back to the generic dialect
pub fn build_dialect(
    explicit_name: Option<&str>,
    config_dialect: Option<&str>,
    version: Option<DatabaseVersion>,
    patches: Vec<toml::Table>,
) -> Result<Dialect, DialectError> {
    let name = explicit_name.or(config_dialect).unwrap_or("generic");
    get_registry().build_patched(name, version, patches)
}

/// Build the dialect for a live connection's metadata
pub fn resolve_dialect(info: &dyn DialectResolutionInfo) -> Result<Dialect, DialectError> {
    get_registry().resolve(info)
}

/// List all available dialect names
pub fn list_dialects() -> Vec<String> {
    get_registry().list_dialects()
}
