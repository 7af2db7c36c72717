use crate::config::Config;
use crate::error::{Error, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};

/// Installs the global `tracing` subscriber.
///
/// `loglevel` from the config is the default directive, `RUST_LOG` still
/// overrides it. Lines go to `logfile` (appending) when one is configured and
/// to stdout otherwise.
pub fn init(cfg: &Config) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(cfg.loglevel).into())
        .from_env_lossy();

    let writer = match &cfg.logfile {
        Some(path) => {
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .map_err(|e| Error::Logging(format!("open {}: {}", path.display(), e)))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(cfg.logfile.is_none())
        .with_writer(writer)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
