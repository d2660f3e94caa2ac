use crate::dialects::base::DialectError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Backend version a dialect is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DatabaseVersion {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
}

impl DatabaseVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            micro: 0,
        }
    }

    pub const fn with_micro(major: u32, minor: u32, micro: u32) -> Self {
        Self { major, minor, micro }
    }

    pub fn is_same_or_after(&self, other: &DatabaseVersion) -> bool {
        self >= other
    }

    pub fn is_before(&self, other: &DatabaseVersion) -> bool {
        self < other
    }
}

impl fmt::Display for DatabaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if self.micro > 0 {
            write!(f, ".{}", self.micro)?;
        }
        Ok(())
    }
}

impl FromStr for DatabaseVersion {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let mut next = |required: bool| -> Result<u32, DialectError> {
            match parts.next() {
                Some(part) => part
                    .parse::<u32>()
                    .map_err(|_| DialectError::ConfigError(format!("Invalid database version: {}", s))),
                None if required => Err(DialectError::ConfigError(format!(
                    "Invalid database version: {}",
                    s
                ))),
                None => Ok(0),
            }
        };

        let major = next(true)?;
        let minor = next(false)?;
        let micro = next(false)?;
        if parts.next().is_some() {
            return Err(DialectError::ConfigError(format!("Invalid database version: {}", s)));
        }
        Ok(Self::with_micro(major, minor, micro))
    }
}

impl Serialize for DatabaseVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DatabaseVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// What a live connection reports about the backend it talks to
pub trait DialectResolutionInfo {
    fn database_name(&self) -> &str;
    fn database_major_version(&self) -> u32;
    fn database_minor_version(&self) -> u32;

    fn database_micro_version(&self) -> u32 {
        0
    }

    fn database_version(&self) -> DatabaseVersion {
        DatabaseVersion::with_micro(
            self.database_major_version(),
            self.database_minor_version(),
            self.database_micro_version(),
        )
    }
}

/// Connection metadata captured from a driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMetadata {
    pub database_name: String,
    pub version: DatabaseVersion,
    pub url: Option<String>,
}

impl ConnectionMetadata {
    pub fn new(database_name: impl Into<String>, version: DatabaseVersion) -> Self {
        Self {
            database_name: database_name.into(),
            version,
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

impl DialectResolutionInfo for ConnectionMetadata {
    fn database_name(&self) -> &str {
        &self.database_name
    }

    fn database_major_version(&self) -> u32 {
        self.version.major
    }

    fn database_minor_version(&self) -> u32 {
        self.version.minor
    }

    fn database_micro_version(&self) -> u32 {
        self.version.micro
    }
}
