use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Requested concurrency-control strength for a row fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// No lock, not even a read of the current state
    None,
    /// Plain read at the connection's isolation level
    Read,
    /// Version check deferred to write time
    Optimistic,
    /// Version check plus a forced version bump at write time
    OptimisticForceIncrement,
    /// Implied write lock for rows the session is updating
    Write,
    /// Legacy exclusive lock request (`select ... for update`)
    Upgrade,
    PessimisticRead,
    PessimisticWrite,
    PessimisticForceIncrement,
}

impl LockMode {
    pub const ALL: [LockMode; 9] = [
        LockMode::None,
        LockMode::Read,
        LockMode::Optimistic,
        LockMode::OptimisticForceIncrement,
        LockMode::Write,
        LockMode::Upgrade,
        LockMode::PessimisticRead,
        LockMode::PessimisticWrite,
        LockMode::PessimisticForceIncrement,
    ];

    /// Strength of the mode; higher is stronger
    pub fn level(&self) -> u8 {
        match self {
            LockMode::None => 0,
            LockMode::Read => 5,
            LockMode::Optimistic => 6,
            LockMode::OptimisticForceIncrement => 7,
            LockMode::Write | LockMode::Upgrade => 10,
            LockMode::PessimisticRead => 12,
            LockMode::PessimisticWrite => 13,
            LockMode::PessimisticForceIncrement => 17,
        }
    }

    pub fn greater_than(&self, other: LockMode) -> bool {
        self.level() > other.level()
    }

    pub fn less_than(&self, other: LockMode) -> bool {
        self.level() < other.level()
    }

    pub fn name(&self) -> &'static str {
        match self {
            LockMode::None => "none",
            LockMode::Read => "read",
            LockMode::Optimistic => "optimistic",
            LockMode::OptimisticForceIncrement => "optimistic_force_increment",
            LockMode::Write => "write",
            LockMode::Upgrade => "upgrade",
            LockMode::PessimisticRead => "pessimistic_read",
            LockMode::PessimisticWrite => "pessimistic_write",
            LockMode::PessimisticForceIncrement => "pessimistic_force_increment",
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LockMode {
    type Err = LockingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        LockMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.name() == wanted)
            .ok_or_else(|| LockingError::UnknownMode(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockingError {
    #[error("Lock mode '{0}' requires a version column on table '{1}'")]
    NotVersioned(LockMode, String),

    #[error("Unknown lock mode: {0}")]
    UnknownMode(String),
}

/// How a dialect maps lock modes to strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockingPolicy {
    /// The backend understands `select ... for update`
    #[default]
    SelectForUpdate,
    /// No `for update` support: pessimistic locks on versioned rows are taken
    /// by updating the version column instead
    VersionUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockingStrategyKind {
    Select,
    PessimisticReadSelect,
    PessimisticWriteSelect,
    PessimisticReadUpdate,
    PessimisticWriteUpdate,
    PessimisticForceIncrement,
    Optimistic,
    OptimisticForceIncrement,
    Update,
}

/// Lock hints appended to select-based lock statements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockSyntax {
    pub for_update: String,
    pub read_lock: String,
}

/// The row being locked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTarget {
    pub table: String,
    pub id_column: String,
    pub version_column: Option<String>,
}

impl LockTarget {
    pub fn new(table: impl Into<String>, id_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            id_column: id_column.into(),
            version_column: None,
        }
    }

    pub fn versioned(mut self, version_column: impl Into<String>) -> Self {
        self.version_column = Some(version_column.into());
        self
    }

    pub fn is_versioned(&self) -> bool {
        self.version_column.is_some()
    }
}

/// A strategy bound to the lock mode it was selected for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockingStrategy {
    kind: LockingStrategyKind,
    mode: LockMode,
}

impl LockingStrategy {
    pub fn kind(&self) -> LockingStrategyKind {
        self.kind
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Optimistic strategies issue no statement when the lock is requested
    pub fn is_deferred(&self) -> bool {
        matches!(
            self.kind,
            LockingStrategyKind::Optimistic | LockingStrategyKind::OptimisticForceIncrement
        )
    }

    /// The statement that acquires the lock, or `None` when nothing is issued up front
    pub fn lock_sql(&self, target: &LockTarget, syntax: &LockSyntax) -> Result<Option<String>, LockingError> {
        match self.kind {
            LockingStrategyKind::Select => {
                let hint = if self.mode.greater_than(LockMode::Read) {
                    syntax.for_update.as_str()
                } else {
                    ""
                };
                Ok(Some(select_sql(target, hint)))
            }
            LockingStrategyKind::PessimisticReadSelect => {
                let hint = if syntax.read_lock.is_empty() {
                    &syntax.for_update
                } else {
                    &syntax.read_lock
                };
                Ok(Some(select_sql(target, hint)))
            }
            LockingStrategyKind::PessimisticWriteSelect => Ok(Some(select_sql(target, &syntax.for_update))),
            LockingStrategyKind::PessimisticReadUpdate
            | LockingStrategyKind::PessimisticWriteUpdate
            | LockingStrategyKind::PessimisticForceIncrement => match update_sql(target) {
                Some(sql) => Ok(Some(sql)),
                None => Err(LockingError::NotVersioned(self.mode, target.table.clone())),
            },
            LockingStrategyKind::Update => {
                let sql = update_sql(target);
                if sql.is_none() {
                    warn!(
                        "Write locks via update are not supported for non-versioned table '{}'",
                        target.table
                    );
                }
                Ok(sql)
            }
            LockingStrategyKind::Optimistic | LockingStrategyKind::OptimisticForceIncrement => Ok(None),
        }
    }
}

fn select_sql(target: &LockTarget, hint: &str) -> String {
    let mut sql = format!(
        "select {id} from {table} where {id} = ?",
        id = target.id_column,
        table = target.table
    );
    if let Some(version) = &target.version_column {
        sql.push_str(&format!(" and {} = ?", version));
    }
    sql.push_str(hint);
    sql
}

fn update_sql(target: &LockTarget) -> Option<String> {
    let version = target.version_column.as_ref()?;
    Some(format!(
        "update {table} set {version} = ? where {id} = ? and {version} = ?",
        table = target.table,
        version = version,
        id = target.id_column
    ))
}

impl LockingPolicy {
    /// Pick the strategy for `mode`. Total over every mode and version flag.
    pub fn select_strategy(&self, mode: LockMode, has_version_column: bool) -> LockingStrategy {
        let kind = match self {
            LockingPolicy::VersionUpdate => version_update_kind(mode, has_version_column),
            LockingPolicy::SelectForUpdate => select_for_update_kind(mode),
        };
        LockingStrategy { kind, mode }
    }
}

fn version_update_kind(mode: LockMode, versioned: bool) -> LockingStrategyKind {
    use LockingStrategyKind::*;

    match mode {
        // best effort only, there is no exclusive row lock behind it
        LockMode::Upgrade => Select,
        LockMode::PessimisticForceIncrement => PessimisticForceIncrement,
        LockMode::PessimisticWrite if versioned => PessimisticWriteUpdate,
        LockMode::PessimisticWrite => PessimisticWriteSelect,
        LockMode::PessimisticRead if versioned => PessimisticReadUpdate,
        LockMode::PessimisticRead => PessimisticReadSelect,
        LockMode::Optimistic => Optimistic,
        LockMode::OptimisticForceIncrement => OptimisticForceIncrement,
        other if other.greater_than(LockMode::Read) => Update,
        _ => Select,
    }
}

fn select_for_update_kind(mode: LockMode) -> LockingStrategyKind {
    use LockingStrategyKind::*;

    match mode {
        LockMode::PessimisticForceIncrement => PessimisticForceIncrement,
        LockMode::PessimisticWrite => PessimisticWriteSelect,
        LockMode::PessimisticRead => PessimisticReadSelect,
        LockMode::Optimistic => Optimistic,
        LockMode::OptimisticForceIncrement => OptimisticForceIncrement,
        _ => Select,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax() -> LockSyntax {
        LockSyntax {
            for_update: " for update".to_string(),
            read_lock: " for share".to_string(),
        }
    }

    #[test]
    fn test_version_update_mapping() {
        let policy = LockingPolicy::VersionUpdate;
        let cases = [
            (LockMode::Upgrade, true, LockingStrategyKind::Select),
            (LockMode::PessimisticForceIncrement, false, LockingStrategyKind::PessimisticForceIncrement),
            (LockMode::PessimisticWrite, true, LockingStrategyKind::PessimisticWriteUpdate),
            (LockMode::PessimisticWrite, false, LockingStrategyKind::PessimisticWriteSelect),
            (LockMode::PessimisticRead, true, LockingStrategyKind::PessimisticReadUpdate),
            (LockMode::PessimisticRead, false, LockingStrategyKind::PessimisticReadSelect),
            (LockMode::Optimistic, true, LockingStrategyKind::Optimistic),
            (LockMode::OptimisticForceIncrement, true, LockingStrategyKind::OptimisticForceIncrement),
            (LockMode::Write, true, LockingStrategyKind::Update),
            (LockMode::Read, true, LockingStrategyKind::Select),
            (LockMode::None, false, LockingStrategyKind::Select),
        ];

        for (mode, versioned, expected) in cases {
            let strategy = policy.select_strategy(mode, versioned);
            assert_eq!(strategy.kind(), expected, "mode {} versioned {}", mode, versioned);
            assert_eq!(strategy.mode(), mode);
        }
    }

    #[test]
    fn test_selection_is_total() {
        for policy in [LockingPolicy::VersionUpdate, LockingPolicy::SelectForUpdate] {
            for mode in LockMode::ALL {
                for versioned in [true, false] {
                    let strategy = policy.select_strategy(mode, versioned);
                    assert_eq!(strategy.mode(), mode);
                }
            }
        }
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(LockMode::PessimisticWrite.greater_than(LockMode::PessimisticRead));
        assert!(LockMode::Optimistic.greater_than(LockMode::Read));
        assert!(LockMode::None.less_than(LockMode::Read));
        assert!(!LockMode::Upgrade.greater_than(LockMode::Write));
    }

    #[test]
    fn test_select_lock_sql() {
        let target = LockTarget::new("orders", "id").versioned("version");
        let strategy = LockingPolicy::SelectForUpdate.select_strategy(LockMode::PessimisticWrite, true);
        assert_eq!(
            strategy.lock_sql(&target, &syntax()).unwrap().unwrap(),
            "select id from orders where id = ? and version = ? for update"
        );

        let read = LockingPolicy::SelectForUpdate.select_strategy(LockMode::PessimisticRead, false);
        assert_eq!(
            read.lock_sql(&LockTarget::new("orders", "id"), &syntax()).unwrap().unwrap(),
            "select id from orders where id = ? for share"
        );

        let plain = LockingPolicy::SelectForUpdate.select_strategy(LockMode::Read, false);
        assert_eq!(
            plain.lock_sql(&LockTarget::new("orders", "id"), &syntax()).unwrap().unwrap(),
            "select id from orders where id = ?"
        );
    }

    #[test]
    fn test_read_lock_falls_back_to_for_update() {
        let syntax = LockSyntax {
            for_update: " with (updlock)".to_string(),
            read_lock: String::new(),
        };
        let strategy = LockingPolicy::SelectForUpdate.select_strategy(LockMode::PessimisticRead, false);
        assert_eq!(
            strategy.lock_sql(&LockTarget::new("t", "id"), &syntax).unwrap().unwrap(),
            "select id from t where id = ? with (updlock)"
        );
    }

    #[test]
    fn test_update_lock_sql_requires_version() {
        let policy = LockingPolicy::VersionUpdate;
        let versioned = LockTarget::new("orders", "id").versioned("version");
        let strategy = policy.select_strategy(LockMode::PessimisticWrite, true);
        assert_eq!(
            strategy.lock_sql(&versioned, &LockSyntax::default()).unwrap().unwrap(),
            "update orders set version = ? where id = ? and version = ?"
        );

        let force = policy.select_strategy(LockMode::PessimisticForceIncrement, false);
        assert_eq!(
            force.lock_sql(&LockTarget::new("orders", "id"), &LockSyntax::default()),
            Err(LockingError::NotVersioned(
                LockMode::PessimisticForceIncrement,
                "orders".to_string()
            ))
        );

        let update = policy.select_strategy(LockMode::Write, false);
        assert_eq!(
            update.lock_sql(&LockTarget::new("orders", "id"), &LockSyntax::default()),
            Ok(None)
        );
    }

    #[test]
    fn test_optimistic_strategies_are_deferred() {
        let target = LockTarget::new("orders", "id").versioned("version");
        for mode in [LockMode::Optimistic, LockMode::OptimisticForceIncrement] {
            let strategy = LockingPolicy::VersionUpdate.select_strategy(mode, true);
            assert!(strategy.is_deferred());
            assert_eq!(strategy.lock_sql(&target, &syntax()), Ok(None));
        }
    }

    #[test]
    fn test_parse_lock_mode() {
        assert_eq!("pessimistic-write".parse::<LockMode>().unwrap(), LockMode::PessimisticWrite);
        assert_eq!("UPGRADE".parse::<LockMode>().unwrap(), LockMode::Upgrade);
        assert!("exclusive".parse::<LockMode>().is_err());
    }
}
