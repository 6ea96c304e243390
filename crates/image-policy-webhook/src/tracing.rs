use anyhow::{anyhow, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use crate::cli::LOG_LEVELS;

/// Handle over the log filter of the running subscriber, used to change the
/// log level at runtime.
#[derive(Clone)]
pub struct LogLevelHandle(reload::Handle<EnvFilter, Registry>);

impl LogLevelHandle {
    pub fn set_level(&self, log_level: &str) -> Result<()> {
        let filter = build_filter(log_level)?;
        self.0
            .reload(filter)
            .map_err(|e| anyhow!("cannot change log level: {e}"))
    }
}

fn build_filter(log_level: &str) -> Result<EnvFilter> {
    if !LOG_LEVELS.contains(&log_level) {
        return Err(anyhow!(
            "unknown log level '{log_level}', allowed values are: {}",
            LOG_LEVELS.join(", ")
        ));
    }

    // some of our dependencies generate trace events too, but we don't care about them ->
    // let's filter them
    let filter = EnvFilter::new(log_level)
        .add_directive("h2=off".parse()?)
        .add_directive("hyper=off".parse()?)
        .add_directive("hyper_util=off".parse()?)
        .add_directive("rustls=off".parse()?);

    Ok(filter)
}

/// Build a reloadable log filter together with the handle that controls it.
pub fn reloadable_filter(
    log_level: &str,
) -> Result<(reload::Layer<EnvFilter, Registry>, LogLevelHandle)> {
    let (layer, handle) = reload::Layer::new(build_filter(log_level)?);
    Ok((layer, LogLevelHandle(handle)))
}

// Setup the tracing system. This MUST be done inside of a tokio Runtime
// because some collectors rely on it and would panic otherwise.
pub fn setup_tracing(log_level: &str, log_fmt: &str, log_no_color: bool) -> Result<LogLevelHandle> {
    let (filter_layer, handle) = reloadable_filter(log_level)?;

    match log_fmt {
        "json" => tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt::layer().json())
            .try_init()?,
        "text" => {
            let fmt_layer = fmt::layer().with_ansi(!log_no_color);

            tracing_subscriber::registry()
                .with(filter_layer)
                .with(fmt_layer)
                .try_init()?
        }
        _ => return Err(anyhow!("Unknown log message format")),
    };

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("trace")]
    #[case("debug")]
    #[case("info")]
    #[case("warn")]
    #[case("error")]
    fn known_levels(#[case] level: &str) {
        let (_layer, handle) = reloadable_filter("info").unwrap();

        assert!(build_filter(level).is_ok());
        // the layer is alive, reloading must work
        assert!(handle.set_level(level).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("verbose")]
    #[case("INFO")]
    #[case("hyper=debug")]
    fn unknown_levels(#[case] level: &str) {
        assert!(reloadable_filter(level).is_err());

        let (_layer, handle) = reloadable_filter("info").unwrap();
        assert!(handle.set_level(level).is_err());
    }

    #[test]
    fn unknown_format() {
        assert!(setup_tracing("info", "otlp", false).is_err());
    }
}
