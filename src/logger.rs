use env_logger::{Builder, Target};
use log::{Level, LevelFilter};
use std::env;
use std::io::Write;

/// Map a configured level name to a filter, defaulting to info
pub fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::Info)
}

pub fn setup_logger(level: &str, colored: bool) {
    let mut builder = Builder::new();
    builder.filter(None, parse_level(level));
    builder.target(Target::Stdout);

    builder.format(move |buf, record| {
        let prefix = match (record.level(), colored) {
            (Level::Error, true) => "❌ ",
            (Level::Warn, true) => "⚠️  ",
            (Level::Error, false) => "error: ",
            (Level::Warn, false) => "warning: ",
            _ => "",
        };
        writeln!(buf, "{}{}", prefix, record.args())
    });

    if env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    }

    // A second init (tests, embedding) keeps the first logger
    let _ = builder.try_init();
}
