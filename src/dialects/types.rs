use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const DEFAULT_LENGTH: u32 = 255;
const DEFAULT_PRECISION: u32 = 19;
const DEFAULT_SCALE: u32 = 2;

/// Backend-agnostic SQL type codes requested by the schema layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenericType {
    Bit,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    LongVarchar,
    Clob,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    LongVarBinary,
    Blob,
}

impl GenericType {
    pub const ALL: [GenericType; 22] = [
        GenericType::Bit,
        GenericType::Boolean,
        GenericType::TinyInt,
        GenericType::SmallInt,
        GenericType::Integer,
        GenericType::BigInt,
        GenericType::Real,
        GenericType::Float,
        GenericType::Double,
        GenericType::Numeric,
        GenericType::Decimal,
        GenericType::Char,
        GenericType::Varchar,
        GenericType::LongVarchar,
        GenericType::Clob,
        GenericType::Date,
        GenericType::Time,
        GenericType::Timestamp,
        GenericType::Binary,
        GenericType::VarBinary,
        GenericType::LongVarBinary,
        GenericType::Blob,
    ];

    /// The snake_case code used in dialect definitions
    pub fn code(&self) -> &'static str {
        match self {
            GenericType::Bit => "bit",
            GenericType::Boolean => "boolean",
            GenericType::TinyInt => "tiny_int",
            GenericType::SmallInt => "small_int",
            GenericType::Integer => "integer",
            GenericType::BigInt => "big_int",
            GenericType::Real => "real",
            GenericType::Float => "float",
            GenericType::Double => "double",
            GenericType::Numeric => "numeric",
            GenericType::Decimal => "decimal",
            GenericType::Char => "char",
            GenericType::Varchar => "varchar",
            GenericType::LongVarchar => "long_varchar",
            GenericType::Clob => "clob",
            GenericType::Date => "date",
            GenericType::Time => "time",
            GenericType::Timestamp => "timestamp",
            GenericType::Binary => "binary",
            GenericType::VarBinary => "var_binary",
            GenericType::LongVarBinary => "long_var_binary",
            GenericType::Blob => "blob",
        }
    }
}

impl fmt::Display for GenericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for GenericType {
    type Err = ColumnTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        GenericType::ALL
            .iter()
            .copied()
            .find(|t| t.code() == wanted || t.code().replace('_', "") == wanted)
            .ok_or_else(|| ColumnTypeError::UnknownTypeCode(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColumnTypeError {
    #[error("No column type registered for generic type '{0}'")]
    UnmappedType(GenericType),

    #[error("Unknown generic type code: {0}")]
    UnknownTypeCode(String),
}

/// Size arguments for a column type lookup. Missing values fall back to the
/// registry defaults when the template asks for them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnSize {
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl ColumnSize {
    pub fn length(length: u32) -> Self {
        Self {
            length: Some(length),
            ..Self::default()
        }
    }

    pub fn precision_scale(precision: u32, scale: u32) -> Self {
        Self {
            precision: Some(precision),
            scale: Some(scale),
            ..Self::default()
        }
    }
}

/// Maps generic type codes to DDL templates using `$l`, `$p` and `$s` placeholders
#[derive(Debug, Clone, Default)]
pub struct ColumnTypeRegistry {
    templates: HashMap<GenericType, String>,
}

impl ColumnTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template. A later registration for the same type replaces the earlier one.
    pub fn register(&mut self, generic_type: GenericType, template: impl Into<String>) {
        let template = template.into();
        if let Some(previous) = self.templates.insert(generic_type, template.clone()) {
            debug!(
                "Column type '{}' remapped from '{}' to '{}'",
                generic_type, previous, template
            );
        }
    }

    pub fn template(&self, generic_type: GenericType) -> Option<&str> {
        self.templates.get(&generic_type).map(String::as_str)
    }

    pub fn is_registered(&self, generic_type: GenericType) -> bool {
        self.templates.contains_key(&generic_type)
    }

    /// Render the DDL type literal for `generic_type`
    pub fn resolve(&self, generic_type: GenericType, size: ColumnSize) -> Result<String, ColumnTypeError> {
        let template = self
            .templates
            .get(&generic_type)
            .ok_or(ColumnTypeError::UnmappedType(generic_type))?;

        Ok(substitute(template, size))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn substitute(template: &str, size: ColumnSize) -> String {
    let mut out = String::with_capacity(template.len() + 8);
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let value = match chars.peek() {
            Some('l') => size.length.unwrap_or(DEFAULT_LENGTH),
            Some('p') => size.precision.unwrap_or(DEFAULT_PRECISION),
            Some('s') => size.scale.unwrap_or(DEFAULT_SCALE),
            _ => {
                out.push(c);
                continue;
            }
        };
        chars.next();
        out.push_str(&value.to_string());
    }

    out
}
