use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::{self, Write};

/// When set, log records go to this file instead of stderr.
pub const LOG_FILE_ENV: &str = "LAZYTAB_LOG_FILE";

/// Initialize the global logger for the CLI.
///
/// `RUST_LOG` still overrides the level chosen by `debug`.
pub fn init_logger(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    if let Ok(path) = std::env::var(LOG_FILE_ENV) {
        if let Err(err) = init_file_logger(&path, level) {
            eprintln!("Failed to initialize file logger at '{path}': {err}");
            init_stderr_logger(level);
        }
    } else {
        init_stderr_logger(level);
    }
}

fn init_stderr_logger(level: LevelFilter) {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn init_file_logger(path: &str, level: LevelFilter) -> io::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} {} [{}] - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(file)))
        .filter_level(level)
        .parse_default_env()
        .init();

    log::info!("Logger initialized - writing to {path}");
    Ok(())
}
