use std::{fs::OpenOptions, path::Path, sync::Mutex};

use color_eyre::{Result, eyre::WrapErr};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub enum Sink<'a> {
    Stderr,
    /// The terminal UI owns the screen, so logs are appended to a file.
    File(&'a Path),
}

/// `RUST_LOG` wins; otherwise each `-v` raises the level one step from warn.
pub fn filter(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level(verbose)))
}

fn level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn init(verbose: u8, sink: Sink<'_>) -> Result<()> {
    let registry = tracing_subscriber::registry()
        .with(filter(verbose))
        .with(ErrorLayer::default());
    match sink {
        Sink::Stderr => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .wrap_err("failed to install log subscriber")?,
        Sink::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .wrap_err_with(|| format!("failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .wrap_err_with(|| format!("failed to open log file {}", path.display()))?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()
                .wrap_err("failed to install log subscriber")?
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::level;

    #[test]
    fn verbosity_steps() {
        assert_eq!(level(0), "warn");
        assert_eq!(level(1), "info");
        assert_eq!(level(2), "debug");
        assert_eq!(level(9), "trace");
    }
}
