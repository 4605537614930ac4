//! The global tracing subscriber of the executable.
//!
//! Events are filtered with an [`EnvFilter`] directive string (the `--log`
//! option) and written to stdout either as human readable text or as one JSON
//! object per line.

use anyhow::Context;
use anyhow::Result;
use tracing::Subscriber;
use tracing::subscriber::set_global_default;
use tracing_subscriber::EnvFilter;

/// How log lines are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Build a subscriber for `directives`, without installing it.
pub fn build(directives: &str, format: LogFormat) -> Result<Box<dyn Subscriber + Send + Sync>> {
    let builder = tracing_subscriber::fmt::fmt().with_env_filter(
        EnvFilter::try_new(directives).context("could not parse log configuration")?,
    );
    Ok(match format {
        LogFormat::Text => Box::new(builder.finish()),
        LogFormat::Json => Box::new(builder.json().finish()),
    })
}

/// Install the global subscriber. Fails if one is already set.
pub fn init(directives: &str, format: LogFormat) -> Result<()> {
    set_global_default(build(directives, format)?).context("could not set global subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_level_and_target_directives() {
        assert!(build("info", LogFormat::Text).is_ok());
        assert!(build("graphql_route=debug,tower_http=warn", LogFormat::Json).is_ok());
    }

    #[test]
    fn rejects_malformed_directives() {
        let err = build("graphql_route=loud", LogFormat::Text).err().unwrap();
        assert_eq!(err.to_string(), "could not parse log configuration");
    }
}
