use clap::{Parser, Subcommand};

/// CLI entry point for dialect-rs
#[derive(Parser, Debug)]
#[command(
    name = "dialect_rs",
    version,
    about = "Inspect how SQL dialects render types, functions, pagination, locks and errors"
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Environment (loads config/{env}.toml)
    #[arg(long, global = true)]
    pub env: Option<String>,

    /// Dialect name or alias (overrides the config file)
    #[arg(long, short = 'd', global = true)]
    pub dialect: Option<String>,

    /// Backend version, e.g. 2022.1 (overrides the config file)
    #[arg(long = "db-version", global = true)]
    pub db_version: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the built-in dialects
    Dialects,

    /// Show the resolved dialect's capabilities
    Show,

    /// Detect a dialect from a connection string or product name
    Detect {
        /// Connection string or database product name
        input: String,
    },

    /// Render the DDL type for a generic type code
    ColumnType {
        /// Generic type code, e.g. varchar, big_int, numeric
        type_code: String,

        #[arg(long)]
        length: Option<u32>,

        #[arg(long)]
        precision: Option<u32>,

        #[arg(long)]
        scale: Option<u32>,
    },

    /// Render a function call
    Function {
        /// Function name or alias
        name: String,

        /// Already-rendered SQL arguments
        args: Vec<String>,
    },

    /// Apply row limiting to a SELECT statement
    Paginate {
        /// The SELECT statement
        sql: String,

        /// Rows to skip
        #[arg(long)]
        offset: Option<u32>,

        /// Maximum rows to return
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Show the strategy and SQL used to acquire a row lock
    Lock {
        /// Lock mode, e.g. pessimistic_write
        mode: String,

        #[arg(long)]
        table: String,

        #[arg(long, default_value = "id")]
        id_column: String,

        /// Optimistic version column, if the row has one
        #[arg(long)]
        version_column: Option<String>,
    },

    /// Classify a native database error
    Classify {
        /// Vendor error code
        #[arg(long, allow_negative_numbers = true)]
        code: i32,

        /// Five-character SQL state
        #[arg(long)]
        sql_state: Option<String>,

        /// Error message
        #[arg(long, default_value = "")]
        message: String,
    },

    /// Generate configuration file
    Config {
        /// Output path for config file
        #[arg(long, default_value = "config.toml")]
        output: String,

        /// Create environment-specific config
        #[arg(long = "for-env")]
        for_env: Option<String>,
    },
}
