use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// An error reported by the backend while executing generated SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    /// Five-character SQL state, when the driver reports one
    pub sql_state: Option<String>,
    pub vendor_code: i32,
    pub message: String,
}

impl NativeError {
    pub fn new(sql_state: Option<&str>, vendor_code: i32, message: impl Into<String>) -> Self {
        Self {
            sql_state: sql_state.map(str::to_string),
            vendor_code,
            message: message.into(),
        }
    }

    /// The two-character class prefix of the SQL state
    pub fn state_class(&self) -> Option<&str> {
        let state = self.sql_state.as_deref()?;
        if state.len() >= 2 && state.is_char_boundary(2) {
            Some(&state[..2])
        } else {
            None
        }
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql_state {
            Some(state) => write!(f, "[{}] ({}) {}", state, self.vendor_code, self.message),
            None => write!(f, "({}) {}", self.vendor_code, self.message),
        }
    }
}

/// Semantic kind of a native error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedFailure {
    ConstraintViolation { constraint_name: Option<String> },
    DataError,
    SqlGrammar,
    Connection,
    LockAcquisition,
    /// Not recognized here; the next classifier in the chain should try
    Unclassified,
}

impl ClassifiedFailure {
    pub fn is_classified(&self) -> bool {
        !matches!(self, ClassifiedFailure::Unclassified)
    }
}

impl fmt::Display for ClassifiedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifiedFailure::ConstraintViolation {
                constraint_name: Some(name),
            } => write!(f, "constraint violation ({})", name),
            ClassifiedFailure::ConstraintViolation { constraint_name: None } => {
                f.write_str("constraint violation")
            }
            ClassifiedFailure::DataError => f.write_str("data error"),
            ClassifiedFailure::SqlGrammar => f.write_str("sql grammar error"),
            ClassifiedFailure::Connection => f.write_str("connection error"),
            ClassifiedFailure::LockAcquisition => f.write_str("lock acquisition error"),
            ClassifiedFailure::Unclassified => f.write_str("unclassified"),
        }
    }
}

/// Anything that can try to classify a native error
pub trait ClassifyNativeError: Send + Sync {
    fn classify(&self, error: &NativeError) -> ClassifiedFailure;
}

/// Returns the text between `start` and `end` in `message`, or `None` when
/// either marker is missing
pub fn extract_between(start: &str, end: &str, message: &str) -> Option<String> {
    let from = message.find(start)? + start.len();
    let len = message[from..].find(end)?;
    Some(message[from..from + len].to_string())
}

/// Pulls the violated constraint name out of an error message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConstraintNameExtractor {
    pub start: String,
    pub end: String,
}

impl ConstraintNameExtractor {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn extract(&self, message: &str) -> Option<String> {
        if self.start.is_empty() || self.end.is_empty() {
            return None;
        }
        extract_between(&self.start, &self.end, message)
    }
}

/// Vendor-code driven classifier configured per dialect
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorClassifier {
    integrity_codes: HashSet<i32>,
    data_error_classes: HashSet<String>,
    extractor: ConstraintNameExtractor,
}

impl ErrorClassifier {
    pub fn new(
        integrity_codes: impl IntoIterator<Item = i32>,
        data_error_classes: impl IntoIterator<Item = String>,
        extractor: ConstraintNameExtractor,
    ) -> Self {
        Self {
            integrity_codes: integrity_codes.into_iter().collect(),
            data_error_classes: data_error_classes.into_iter().collect(),
            extractor,
        }
    }

    pub fn extractor(&self) -> &ConstraintNameExtractor {
        &self.extractor
    }

    pub fn is_integrity_code(&self, vendor_code: i32) -> bool {
        self.integrity_codes.contains(&vendor_code)
    }
}

impl ClassifyNativeError for ErrorClassifier {
    fn classify(&self, error: &NativeError) -> ClassifiedFailure {
        if self.integrity_codes.contains(&error.vendor_code) {
            let constraint_name = self.extractor.extract(&error.message);
            debug!(
                "Vendor code {} is an integrity violation (constraint: {:?})",
                error.vendor_code, constraint_name
            );
            return ClassifiedFailure::ConstraintViolation { constraint_name };
        }

        if let Some(class) = error.state_class() {
            if self.data_error_classes.contains(class) {
                return ClassifiedFailure::DataError;
            }
        }

        ClassifiedFailure::Unclassified
    }
}

/// Classification by standard SQL state class, used as the last resort
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlStateClassifier;

impl ClassifyNativeError for SqlStateClassifier {
    fn classify(&self, error: &NativeError) -> ClassifiedFailure {
        match error.state_class() {
            Some("23") => ClassifiedFailure::ConstraintViolation { constraint_name: None },
            Some("22") => ClassifiedFailure::DataError,
            Some("42") | Some("37") => ClassifiedFailure::SqlGrammar,
            Some("08") => ClassifiedFailure::Connection,
            Some("40") => ClassifiedFailure::LockAcquisition,
            _ => ClassifiedFailure::Unclassified,
        }
    }
}

/// Classifiers tried in order until one recognizes the error
pub struct ClassifierChain<'a> {
    links: Vec<&'a dyn ClassifyNativeError>,
}

impl<'a> ClassifierChain<'a> {
    pub fn new(first: &'a dyn ClassifyNativeError) -> Self {
        Self { links: vec![first] }
    }

    pub fn then(mut self, next: &'a dyn ClassifyNativeError) -> Self {
        self.links.push(next);
        self
    }

    pub fn classify(&self, error: &NativeError) -> ClassifiedFailure {
        for link in &self.links {
            let failure = link.classify(error);
            if failure.is_classified() {
                return failure;
            }
        }
        debug!("No classifier recognized native error: {}", error);
        ClassifiedFailure::Unclassified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iris_classifier() -> ErrorClassifier {
        ErrorClassifier::new(
            [119, 120, 121, 122, 123, 124, 125, 127],
            ["22", "21", "02"].map(String::from),
            ConstraintNameExtractor::new("constraint (", ") violated"),
        )
    }

    #[test]
    fn test_integrity_code_extracts_constraint_name() {
        let error = NativeError::new(
            Some("23000"),
            119,
            "UNIQUE or PRIMARY KEY constraint (FOO) violated",
        );
        assert_eq!(
            iris_classifier().classify(&error),
            ClassifiedFailure::ConstraintViolation {
                constraint_name: Some("FOO".to_string())
            }
        );
    }

    #[test]
    fn test_missing_markers_fail_soft() {
        let error = NativeError::new(None, 121, "foreign key check failed");
        assert_eq!(
            iris_classifier().classify(&error),
            ClassifiedFailure::ConstraintViolation { constraint_name: None }
        );
    }

    #[test]
    fn test_data_error_class() {
        let error = NativeError::new(Some("22003"), 400, "numeric value out of range");
        assert_eq!(iris_classifier().classify(&error), ClassifiedFailure::DataError);
    }

    #[test]
    fn test_integrity_code_wins_over_data_class() {
        let error = NativeError::new(Some("22001"), 120, "constraint (BAR) violated");
        assert!(matches!(
            iris_classifier().classify(&error),
            ClassifiedFailure::ConstraintViolation { .. }
        ));
    }

    #[test]
    fn test_unknown_error_is_unclassified() {
        let error = NativeError::new(Some("42000"), 1, "syntax error");
        assert_eq!(iris_classifier().classify(&error), ClassifiedFailure::Unclassified);

        let no_state = NativeError::new(None, 1, "boom");
        assert_eq!(iris_classifier().classify(&no_state), ClassifiedFailure::Unclassified);
    }

    #[test]
    fn test_chain_defers_to_fallback() {
        let classifier = iris_classifier();
        let fallback = SqlStateClassifier;
        let chain = ClassifierChain::new(&classifier).then(&fallback);

        let grammar = NativeError::new(Some("42000"), 1, "syntax error");
        assert_eq!(chain.classify(&grammar), ClassifiedFailure::SqlGrammar);

        let data = NativeError::new(Some("22003"), 400, "overflow");
        assert_eq!(chain.classify(&data), ClassifiedFailure::DataError);

        let unknown = NativeError::new(Some("HY000"), 5, "general error");
        assert_eq!(chain.classify(&unknown), ClassifiedFailure::Unclassified);
    }

    #[test]
    fn test_extract_between() {
        assert_eq!(
            extract_between("constraint (", ") violated", "x constraint (PK_T) violated y"),
            Some("PK_T".to_string())
        );
        assert_eq!(extract_between("constraint (", ") violated", "constraint (PK_T"), None);
        assert_eq!(extract_between("[", "]", "no markers"), None);
    }

    #[test]
    fn test_short_sql_state_has_no_class() {
        assert_eq!(NativeError::new(Some("2"), 0, "").state_class(), None);
        assert_eq!(NativeError::new(Some("23505"), 0, "").state_class(), Some("23"));
    }
}
