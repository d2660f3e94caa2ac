use crate::cli::args::{Cli, Commands};
use dialect_rs::dialects::{
    self, get_registry, ColumnSize, Dialect, DialectError, GenericType, LimitSpec, LockMode,
    DatabaseVersion, LockTarget, NativeError, SqlArgument,
};
use dialect_rs::logger::setup_logger;
use dialect_rs::model::Config;
use log::{debug, error, info};

pub fn handle(cli: Cli) {
    // Load configuration
    let config = match Config::load(cli.config.as_deref(), cli.env.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            setup_logger("info", true);
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    setup_logger(level, config.logging.colored);
    debug!("Loaded configuration: {:?}", config);

    match cli.command {
        Commands::Dialects => {
            let registry = get_registry();
            for name in registry.list_dialects() {
                let description = registry
                    .get(&name)
                    .map(|f| f.header().metadata.description.clone())
                    .unwrap_or_default();
                let aliases = registry.get_aliases(&name);
                if aliases.is_empty() {
                    println!("{:<14} {}", name, description);
                } else {
                    println!("{:<14} {} (aliases: {})", name, description, aliases.join(", "));
                }
            }
        }

        Commands::Detect { input } => match get_registry().detect(&input) {
            Ok(factory) => println!("{}", factory.name()),
            Err(e) => fail("Detection failed", e),
        },

        Commands::Config { output, for_env } => {
            info!("Running CONFIG command");
            debug!("Output path: {}", output);

            match Config::generate_default_config(&output) {
                Ok(()) => {
                    info!("Generated default configuration file: {}", output);
                    if let Some(env_name) = for_env {
                        let env_path = format!("config/{}.toml", env_name);
                        match std::fs::create_dir_all("config") {
                            Ok(()) => match Config::generate_default_config(&env_path) {
                                Ok(()) => info!("Generated environment configuration file: {}", env_path),
                                Err(e) => error!("Failed to create environment config: {}", e),
                            },
                            Err(e) => error!("Failed to create config directory: {}", e),
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to generate configuration file: {}", e);
                    std::process::exit(1);
                }
            }
        }

        command => {
            let dialect = resolve(&cli.dialect, &cli.db_version, &config);
            debug!("Using dialect {} {}", dialect.name(), dialect.version());
            run_dialect_command(&dialect, command);
        }
    }
}

/// Build the dialect selected by flags, falling back to the config file
fn resolve(name: &Option<String>, version: &Option<String>, config: &Config) -> Dialect {
    let version = match version {
        Some(raw) => raw.parse::<DatabaseVersion>().map(Some),
        None => config
            .dialect
            .parsed_version()
            .map_err(|e| DialectError::ConfigError(e.to_string())),
    };
    let version = version.unwrap_or_else(|e| fail("Invalid database version", e));

    let patches = config.dialect_patches().unwrap_or_else(|e| {
        error!("Failed to load dialect patches: {}", e);
        std::process::exit(1);
    });

    dialects::build_dialect(name.as_deref(), Some(&config.dialect.name), version, patches)
        .unwrap_or_else(|e| fail("Failed to build dialect", e))
}

fn run_dialect_command(dialect: &Dialect, command: Commands) {
    match command {
        Commands::Show => show(dialect),

        Commands::ColumnType {
            type_code,
            length,
            precision,
            scale,
        } => {
            let generic_type = type_code
                .parse::<GenericType>()
                .unwrap_or_else(|e| fail("Invalid type code", DialectError::from(e)));
            let size = ColumnSize {
                length,
                precision,
                scale,
            };
            match dialect.column_type(generic_type, size) {
                Ok(ddl) => println!("{}", ddl),
                Err(e) => fail("Column type lookup failed", e),
            }
        }

        Commands::Function { name, args } => {
            let args: Vec<SqlArgument> = args.iter().map(|a| SqlArgument::any(a.as_str())).collect();
            match dialect.render_function(&name, &args) {
                Ok(sql) => println!("{}", sql),
                Err(e) => fail("Function rendering failed", e),
            }
        }

        Commands::Paginate { sql, offset, limit } => {
            let spec = LimitSpec::new(offset, limit);
            match dialect.process_sql(&sql, &spec) {
                Ok(rewritten) => {
                    println!("{}", rewritten);
                    let values = dialect.limit_bind_values(&spec);
                    if !values.is_empty() {
                        let position = if dialect.bind_limit_parameters_first() {
                            "before"
                        } else {
                            "after"
                        };
                        let values: Vec<String> = values.iter().map(u32::to_string).collect();
                        println!("-- limit parameters ({} statement parameters): {}", position, values.join(", "));
                    }
                }
                Err(e) => fail("Pagination failed", e),
            }
        }

        Commands::Lock {
            mode,
            table,
            id_column,
            version_column,
        } => {
            let mode = mode
                .parse::<LockMode>()
                .unwrap_or_else(|e| fail("Invalid lock mode", DialectError::from(e)));
            let mut target = LockTarget::new(table, id_column);
            if let Some(column) = version_column {
                target = target.versioned(column);
            }

            let strategy = dialect.locking_strategy(mode, target.is_versioned());
            println!("strategy: {:?}", strategy.kind());
            match dialect.lock_sql(mode, &target) {
                Ok(Some(sql)) => println!("{}", sql),
                Ok(None) => println!("-- no statement issued when the lock is acquired"),
                Err(e) => fail("Lock rendering failed", e),
            }
        }

        Commands::Classify {
            code,
            sql_state,
            message,
        } => {
            let native = NativeError::new(sql_state.as_deref(), code, message);
            debug!("Classifying {}", native);
            println!("{}", dialect.classify_with(&native, &[]));
        }

        Commands::Dialects | Commands::Detect { .. } | Commands::Config { .. } => {
            unreachable!("handled before a dialect is resolved")
        }
    }
}

fn show(dialect: &Dialect) {
    let features = dialect.features();
    let properties = dialect.default_properties();

    println!("dialect: {} {}", dialect.name(), dialect.version());
    println!("description: {}", dialect.description());
    println!("limit handler: {}", dialect.limit_handler().name());
    println!("  supports offset: {}", dialect.supports_limit_offset());
    println!("  binds limit first: {}", dialect.bind_limit_parameters_first());
    println!("  uses max rows: {}", dialect.uses_max_rows());
    println!("locking policy: {:?}", dialect.locking_policy());
    println!("identity columns: {}", dialect.supports_identity_columns());
    println!("sequences: {}", dialect.supports_sequences());
    println!("null ordering: {:?}", features.null_ordering);
    println!("column types: {}", dialect.column_types().len());
    println!("functions: {}", dialect.functions().len());
    println!(
        "properties: use_sql_comments={} statement_batch_size={} use_streams_for_binary={}",
        properties.use_sql_comments, properties.statement_batch_size, properties.use_streams_for_binary
    );
}

fn fail(context: &str, e: DialectError) -> ! {
    error!("{}: {}", context, e);
    std::process::exit(1);
}
