use crate::dialects::types::GenericType;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Coarse category of a rendered argument, used for per-position validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgCategory {
    #[default]
    Any,
    String,
    Numeric,
    Temporal,
    Boolean,
    Binary,
}

impl fmt::Display for ArgCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgCategory::Any => "any",
            ArgCategory::String => "string",
            ArgCategory::Numeric => "numeric",
            ArgCategory::Temporal => "temporal",
            ArgCategory::Boolean => "boolean",
            ArgCategory::Binary => "binary",
        };
        f.write_str(name)
    }
}

/// An already-rendered SQL expression passed as a function argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlArgument {
    pub sql: String,
    pub category: ArgCategory,
}

impl SqlArgument {
    pub fn new(sql: impl Into<String>, category: ArgCategory) -> Self {
        Self {
            sql: sql.into(),
            category,
        }
    }

    pub fn any(sql: impl Into<String>) -> Self {
        Self::new(sql, ArgCategory::Any)
    }
}

impl From<&str> for SqlArgument {
    fn from(sql: &str) -> Self {
        SqlArgument::any(sql)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FunctionError {
    #[error("Function not found: {0}")]
    NotFound(String),

    #[error("Function '{0}' is already registered")]
    DuplicateFunction(String),

    #[error("Alias '{alias}' targets unknown function '{target}'")]
    UnknownCanonicalTarget { alias: String, target: String },

    #[error("Invalid call to '{function}': argument {position}: {reason}")]
    ArgumentMismatch {
        function: String,
        position: usize,
        reason: String,
    },

    #[error("Invalid definition for function '{function}': {reason}")]
    InvalidDefinition { function: String, reason: String },
}

/// How a function call is emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionRender {
    /// `name(a, b)`
    Standard { name: String },
    /// `name` or `name()`, never takes arguments
    NoArgs { name: String, parens: bool },
    /// `name` without arguments, `name(a, b)` with them
    ConditionalParens { name: String },
    /// `prefix` + args joined by `separator` + `suffix`
    VarArgs {
        prefix: String,
        separator: String,
        suffix: String,
    },
    /// Positional template with `?1`, `?2`, ... markers
    Pattern { template: String },
}

impl FunctionRender {
    fn emit(&self, args: &[SqlArgument]) -> String {
        match self {
            FunctionRender::Standard { name } => format!("{}({})", name, join_args(args, ", ")),
            FunctionRender::NoArgs { name, parens } => {
                if *parens {
                    format!("{}()", name)
                } else {
                    name.clone()
                }
            }
            FunctionRender::ConditionalParens { name } => {
                if args.is_empty() {
                    name.clone()
                } else {
                    format!("{}({})", name, join_args(args, ", "))
                }
            }
            FunctionRender::VarArgs {
                prefix,
                separator,
                suffix,
            } => format!("{}{}{}", prefix, join_args(args, separator), suffix),
            FunctionRender::Pattern { template } => fill_pattern(template, args),
        }
    }
}

fn join_args(args: &[SqlArgument], separator: &str) -> String {
    args.iter()
        .map(|a| a.sql.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Highest `?N` marker in a pattern template
fn pattern_arity(template: &str) -> usize {
    let bytes = template.as_bytes();
    let mut highest = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'?' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > start {
                if let Ok(n) = template[start..end].parse::<usize>() {
                    highest = highest.max(n);
                }
            }
            i = end;
        } else {
            i += 1;
        }
    }
    highest
}

fn fill_pattern(template: &str, args: &[SqlArgument]) -> String {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len() + 16);
    let mut last = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'?' {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let arg = template[start..end]
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|n| args.get(n));
        if let Some(arg) = arg {
            out.push_str(&template[last..i]);
            out.push_str(&arg.sql);
            last = end;
        }
        i = end.max(i + 1);
    }
    out.push_str(&template[last..]);
    out
}

/// Describes one native function for one backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    render: FunctionRender,
    return_type: Option<GenericType>,
    min_args: usize,
    max_args: Option<usize>,
    arg_types: Vec<ArgCategory>,
    jdbc_escape: bool,
}

impl FunctionDescriptor {
    fn with_render(render: FunctionRender, min_args: usize, max_args: Option<usize>) -> Self {
        Self {
            render,
            return_type: None,
            min_args,
            max_args,
            arg_types: Vec::new(),
            jdbc_escape: false,
        }
    }

    pub fn standard(name: impl Into<String>) -> Self {
        Self::with_render(FunctionRender::Standard { name: name.into() }, 0, None)
    }

    pub fn no_args(name: impl Into<String>, parens: bool) -> Self {
        Self::with_render(
            FunctionRender::NoArgs {
                name: name.into(),
                parens,
            },
            0,
            Some(0),
        )
    }

    pub fn conditional_parens(name: impl Into<String>) -> Self {
        Self::with_render(FunctionRender::ConditionalParens { name: name.into() }, 0, None)
    }

    pub fn var_args(
        prefix: impl Into<String>,
        separator: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self::with_render(
            FunctionRender::VarArgs {
                prefix: prefix.into(),
                separator: separator.into(),
                suffix: suffix.into(),
            },
            0,
            None,
        )
    }

    /// A positional template; arity is fixed to the highest `?N` marker
    pub fn pattern(template: impl Into<String>) -> Self {
        let template = template.into();
        let arity = pattern_arity(&template);
        Self::with_render(FunctionRender::Pattern { template }, arity, Some(arity))
    }

    pub fn returns(mut self, return_type: GenericType) -> Self {
        self.return_type = Some(return_type);
        self
    }

    pub fn arity(mut self, min_args: usize, max_args: Option<usize>) -> Self {
        self.min_args = min_args;
        self.max_args = max_args;
        self
    }

    pub fn arg_types(mut self, arg_types: Vec<ArgCategory>) -> Self {
        self.arg_types = arg_types;
        self
    }

    /// Wrap the rendered call in a JDBC escape: `{fn ...}`
    pub fn jdbc_escape(mut self) -> Self {
        self.jdbc_escape = true;
        self
    }

    pub fn render_style(&self) -> &FunctionRender {
        &self.render
    }

    /// Declared return type; `None` means the type is inferred from context
    pub fn return_type(&self) -> Option<GenericType> {
        self.return_type
    }

    pub fn min_args(&self) -> usize {
        self.min_args
    }

    pub fn max_args(&self) -> Option<usize> {
        self.max_args
    }

    pub fn is_jdbc_escaped(&self) -> bool {
        self.jdbc_escape
    }

    /// Check the argument shape against this descriptor
    pub fn validate(&self, function: &str, args: &[SqlArgument]) -> Result<(), FunctionError> {
        let mismatch = |position: usize, reason: String| FunctionError::ArgumentMismatch {
            function: function.to_string(),
            position,
            reason,
        };

        if args.len() < self.min_args {
            return Err(mismatch(
                args.len() + 1,
                format!("missing argument, expects at least {}", self.min_args),
            ));
        }
        if let Some(max) = self.max_args {
            if args.len() > max {
                return Err(mismatch(
                    max + 1,
                    format!("unexpected argument, expects at most {}", max),
                ));
            }
        }

        for (index, (arg, expected)) in args.iter().zip(&self.arg_types).enumerate() {
            if *expected != ArgCategory::Any
                && arg.category != ArgCategory::Any
                && arg.category != *expected
            {
                return Err(mismatch(
                    index + 1,
                    format!("expected {} argument, found {}", expected, arg.category),
                ));
            }
        }

        Ok(())
    }

    /// Validate and emit the call text
    pub fn render(&self, function: &str, args: &[SqlArgument]) -> Result<String, FunctionError> {
        self.validate(function, args)?;
        let call = self.render.emit(args);
        if self.jdbc_escape {
            Ok(format!("{{fn {}}}", call))
        } else {
            Ok(call)
        }
    }
}

/// Canonical name and aliases to function descriptors, looked up case-insensitively
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    descriptors: HashMap<String, FunctionDescriptor>,
    aliases: HashMap<String, String>, // alias -> canonical name
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new canonical function; fails if the name is taken
    pub fn register(&mut self, name: &str, descriptor: FunctionDescriptor) -> Result<(), FunctionError> {
        let key = name.to_lowercase();
        if self.descriptors.contains_key(&key) || self.aliases.contains_key(&key) {
            return Err(FunctionError::DuplicateFunction(key));
        }
        debug!("Registering function: {}", key);
        self.descriptors.insert(key, descriptor);
        Ok(())
    }

    /// Register a canonical function, replacing any previous entry of that name
    pub fn register_override(&mut self, name: &str, descriptor: FunctionDescriptor) {
        let key = name.to_lowercase();
        if self.aliases.remove(&key).is_some() {
            debug!("Function '{}' now shadows an alias of the same name", key);
        }
        if self.descriptors.insert(key.clone(), descriptor).is_some() {
            debug!("Overriding function: {}", key);
        }
    }

    /// Make `alias` resolve to the already-registered `canonical` function
    pub fn register_alternate_key(&mut self, alias: &str, canonical: &str) -> Result<(), FunctionError> {
        let alias_key = alias.to_lowercase();
        let target = canonical.to_lowercase();

        if !self.descriptors.contains_key(&target) {
            warn!("Rejecting alias '{}': no function named '{}'", alias_key, target);
            return Err(FunctionError::UnknownCanonicalTarget {
                alias: alias_key,
                target,
            });
        }
        if self.descriptors.contains_key(&alias_key) {
            return Err(FunctionError::DuplicateFunction(alias_key));
        }

        debug!("Registering function alias: {} -> {}", alias_key, target);
        self.aliases.insert(alias_key, target);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&FunctionDescriptor, FunctionError> {
        let key = name.to_lowercase();
        if let Some(descriptor) = self.descriptors.get(&key) {
            return Ok(descriptor);
        }
        self.aliases
            .get(&key)
            .and_then(|canonical| self.descriptors.get(canonical))
            .ok_or_else(|| FunctionError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    /// Resolve `name` and render a call with `args`
    pub fn render(&self, name: &str, args: &[SqlArgument]) -> Result<String, FunctionError> {
        self.resolve(name)?.render(name, args)
    }

    /// Canonical names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.descriptors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn aliases_of(&self, canonical: &str) -> Vec<&str> {
        let target = canonical.to_lowercase();
        let mut aliases: Vec<&str> = self
            .aliases
            .iter()
            .filter(|(_, name)| **name == target)
            .map(|(alias, _)| alias.as_str())
            .collect();
        aliases.sort_unstable();
        aliases
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderKind {
    #[default]
    Standard,
    NoArgs,
    ConditionalParens,
    VarArgs,
    Pattern,
}

/// A `[functions.<name>]` entry in a dialect definition
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FunctionSpec {
    #[serde(default)]
    pub render: RenderKind,
    /// Name emitted in SQL when it differs from the registered name
    pub sql_name: Option<String>,
    #[serde(default)]
    pub parens: bool,
    pub prefix: Option<String>,
    pub separator: Option<String>,
    pub suffix: Option<String>,
    pub pattern: Option<String>,
    pub returns: Option<String>,
    pub min_args: Option<usize>,
    pub max_args: Option<usize>,
    #[serde(default)]
    pub arg_types: Vec<ArgCategory>,
    #[serde(default)]
    pub jdbc_escape: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl FunctionSpec {
    /// Build the runtime descriptor for the function registered as `name`
    pub fn to_descriptor(&self, name: &str) -> Result<FunctionDescriptor, FunctionError> {
        let invalid = |reason: &str| FunctionError::InvalidDefinition {
            function: name.to_string(),
            reason: reason.to_string(),
        };
        let sql_name = self.sql_name.clone().unwrap_or_else(|| name.to_string());

        let mut descriptor = match self.render {
            RenderKind::Standard => FunctionDescriptor::standard(sql_name),
            RenderKind::NoArgs => FunctionDescriptor::no_args(sql_name, self.parens),
            RenderKind::ConditionalParens => FunctionDescriptor::conditional_parens(sql_name),
            RenderKind::VarArgs => FunctionDescriptor::var_args(
                self.prefix.clone().unwrap_or_else(|| format!("{}(", sql_name)),
                self.separator.clone().unwrap_or_else(|| ",".to_string()),
                self.suffix.clone().unwrap_or_else(|| ")".to_string()),
            ),
            RenderKind::Pattern => {
                let template = self
                    .pattern
                    .as_ref()
                    .ok_or_else(|| invalid("pattern rendering requires a 'pattern'"))?;
                FunctionDescriptor::pattern(template.clone())
            }
        };

        if let Some(returns) = &self.returns {
            let return_type = returns
                .parse::<GenericType>()
                .map_err(|e| invalid(&e.to_string()))?;
            descriptor = descriptor.returns(return_type);
        }

        if self.min_args.is_some() || self.max_args.is_some() {
            let min = self.min_args.unwrap_or(descriptor.min_args);
            let max = self.max_args.or(descriptor.max_args);
            if let Some(max) = max {
                if min > max {
                    return Err(invalid("min_args is greater than max_args"));
                }
            }
            // every ?N marker must be filled or it ends up in the SQL
            if let FunctionRender::Pattern { template } = &descriptor.render {
                let arity = pattern_arity(template);
                if min != arity || max != Some(arity) {
                    return Err(invalid(&format!("pattern takes exactly {} argument(s)", arity)));
                }
            }
            descriptor = descriptor.arity(min, max);
        }

        if !self.arg_types.is_empty() {
            descriptor = descriptor.arg_types(self.arg_types.clone());
        }
        if self.jdbc_escape {
            descriptor = descriptor.jdbc_escape();
        }

        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(sqls: &[&str]) -> Vec<SqlArgument> {
        sqls.iter().map(|s| SqlArgument::any(*s)).collect()
    }

    #[test]
    fn test_alias_resolves_case_insensitively() {
        let mut registry = FunctionRegistry::new();
        let lower = FunctionDescriptor::standard("lower").returns(GenericType::Varchar);
        registry.register("lower", lower.clone()).unwrap();
        registry.register_alternate_key("lcase", "lower").unwrap();

        assert_eq!(registry.resolve("LCASE").unwrap(), &lower);
        assert_eq!(registry.resolve("Lower").unwrap(), &lower);
        assert_eq!(registry.aliases_of("lower"), vec!["lcase"]);
    }

    #[test]
    fn test_alias_to_unknown_target_leaves_registry_unchanged() {
        let mut registry = FunctionRegistry::new();
        registry.register("upper", FunctionDescriptor::standard("upper")).unwrap();

        let err = registry.register_alternate_key("ucase", "toupper").unwrap_err();
        assert!(matches!(err, FunctionError::UnknownCanonicalTarget { .. }));
        assert!(registry.resolve("ucase").is_err());
        assert_eq!(registry.names(), vec!["upper"]);
        assert!(registry.aliases_of("toupper").is_empty());
    }

    #[test]
    fn test_alias_is_one_hop_only() {
        let mut registry = FunctionRegistry::new();
        registry.register("lower", FunctionDescriptor::standard("lower")).unwrap();
        registry.register_alternate_key("lcase", "lower").unwrap();

        let err = registry.register_alternate_key("lc", "lcase").unwrap_err();
        assert!(matches!(err, FunctionError::UnknownCanonicalTarget { .. }));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = FunctionRegistry::new();
        registry.register("abs", FunctionDescriptor::standard("abs")).unwrap();
        let err = registry.register("ABS", FunctionDescriptor::standard("abs")).unwrap_err();
        assert_eq!(err, FunctionError::DuplicateFunction("abs".to_string()));

        registry.register_override("abs", FunctionDescriptor::standard("fabs"));
        assert_eq!(registry.render("abs", &args(&["x"])).unwrap(), "fabs(x)");
    }

    #[test]
    fn test_render_styles() {
        let standard = FunctionDescriptor::standard("mod");
        assert_eq!(standard.render("mod", &args(&["a", "b"])).unwrap(), "mod(a, b)");

        let no_args = FunctionDescriptor::no_args("current_date", false);
        assert_eq!(no_args.render("current_date", &[]).unwrap(), "current_date");

        let with_parens = FunctionDescriptor::no_args("getdate", true);
        assert_eq!(with_parens.render("getdate", &[]).unwrap(), "getdate()");

        let conditional = FunctionDescriptor::conditional_parens("current_timestamp");
        assert_eq!(conditional.render("current_timestamp", &[]).unwrap(), "current_timestamp");
        assert_eq!(
            conditional.render("current_timestamp", &args(&["3"])).unwrap(),
            "current_timestamp(3)"
        );

        let position = FunctionDescriptor::var_args("position(", " in ", ")");
        assert_eq!(
            position.render("position", &args(&["'a'", "name"])).unwrap(),
            "position('a' in name)"
        );

        let bit_length = FunctionDescriptor::pattern("($length(?1)*8)");
        assert_eq!(bit_length.render("bit_length", &args(&["name"])).unwrap(), "($length(name)*8)");
    }

    #[test]
    fn test_pattern_reuses_markers() {
        let descriptor = FunctionDescriptor::pattern("case when ?1 is null then ?2 else ?1 end");
        assert_eq!(descriptor.min_args(), 2);
        assert_eq!(
            descriptor.render("nvl2", &args(&["a", "b"])).unwrap(),
            "case when a is null then b else a end"
        );
    }

    #[test]
    fn test_jdbc_escape_wraps_call() {
        let descriptor = FunctionDescriptor::standard("acos").jdbc_escape();
        assert_eq!(descriptor.render("acos", &args(&["x"])).unwrap(), "{fn acos(x)}");
    }

    #[test]
    fn test_arity_errors_name_position() {
        let descriptor = FunctionDescriptor::standard("left").arity(2, Some(2));

        match descriptor.render("left", &args(&["a"])).unwrap_err() {
            FunctionError::ArgumentMismatch { position, .. } => assert_eq!(position, 2),
            other => panic!("unexpected error: {:?}", other),
        }
        match descriptor.render("left", &args(&["a", "b", "c"])).unwrap_err() {
            FunctionError::ArgumentMismatch { position, .. } => assert_eq!(position, 3),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_argument_category_errors_name_position() {
        let descriptor = FunctionDescriptor::standard("left")
            .arity(2, Some(2))
            .arg_types(vec![ArgCategory::String, ArgCategory::Numeric]);

        let ok = [
            SqlArgument::new("name", ArgCategory::String),
            SqlArgument::new("3", ArgCategory::Numeric),
        ];
        assert_eq!(descriptor.render("left", &ok).unwrap(), "left(name, 3)");

        let bad = [
            SqlArgument::new("name", ArgCategory::String),
            SqlArgument::new("'x'", ArgCategory::String),
        ];
        let err = descriptor.render("left", &bad).unwrap_err();
        assert_eq!(
            err,
            FunctionError::ArgumentMismatch {
                function: "left".to_string(),
                position: 2,
                reason: "expected numeric argument, found string".to_string(),
            }
        );
    }

    #[test]
    fn test_spec_builds_descriptor() {
        let spec: FunctionSpec = toml::from_str(
            r#"
render = "var_args"
prefix = "coalesce("
min_args = 1
returns = "varchar"
"#,
        )
        .unwrap();
        let descriptor = spec.to_descriptor("coalesce").unwrap();
        assert_eq!(descriptor.return_type(), Some(GenericType::Varchar));
        assert_eq!(descriptor.render("coalesce", &args(&["a", "b"])).unwrap(), "coalesce(a,b)");
        assert!(descriptor.render("coalesce", &[]).is_err());
    }

    #[test]
    fn test_spec_pattern_arity_must_match_markers() {
        let spec: FunctionSpec = toml::from_str(
            r#"
render = "pattern"
pattern = "substring(?1, ?2, ?3)"
max_args = 2
"#,
        )
        .unwrap();
        assert_eq!(
            spec.to_descriptor("substr").unwrap_err(),
            FunctionError::InvalidDefinition {
                function: "substr".to_string(),
                reason: "pattern takes exactly 3 argument(s)".to_string(),
            }
        );

        let loose = FunctionSpec {
            min_args: Some(1),
            max_args: None,
            ..spec.clone()
        };
        assert!(loose.to_descriptor("substr").is_err());

        let exact = FunctionSpec {
            min_args: Some(3),
            max_args: Some(3),
            ..spec
        };
        let descriptor = exact.to_descriptor("substr").unwrap();
        assert_eq!(
            descriptor.render("substr", &args(&["s", "1", "2"])).unwrap(),
            "substring(s, 1, 2)"
        );
    }

    #[test]
    fn test_spec_pattern_requires_template() {
        let spec = FunctionSpec {
            render: RenderKind::Pattern,
            ..FunctionSpec::default()
        };
        assert!(matches!(
            spec.to_descriptor("str"),
            Err(FunctionError::InvalidDefinition { .. })
        ));
    }
}
