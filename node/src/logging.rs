//! # Structured Logging
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` overrides the filter
//! passed in by the caller; `--log-format` picks pretty or JSON lines.
//!
//! Logs go to stderr. Stdout belongs to command output such as the key id
//! printed by `keygen`, which stays parseable with logging enabled.

use std::io;

use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Colored, multi-field output for a terminal.
    Pretty,
    /// One JSON object per line for log shippers.
    Json,
}

impl LogFormat {
    /// `"json"` in any case selects [`LogFormat::Json`]; anything else is
    /// [`LogFormat::Pretty`].
    pub fn from_str_lossy(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Filter from `RUST_LOG`, or `default_directives` when it is unset or
/// unparseable.
fn build_filter(default_directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives))
}

/// Subscriber applying `filter` and writing to `writer` in `format`.
fn build_subscriber<W>(
    filter: EnvFilter,
    format: LogFormat,
    writer: W,
) -> Box<dyn tracing::Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => Box::new(
            registry.with(
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_line_number(true),
            ),
        ),
        LogFormat::Json => Box::new(
            registry.with(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_current_span(false),
            ),
        ),
    }
}

/// Install the global subscriber, writing to stderr. Call once, early in
/// `main()`.
///
/// Typical `default_directives`: `"info"` or
/// `"zkbalance_node=debug,zkbalance_protocol=info,tower_http=debug"`.
pub fn init_logging(default_directives: &str, format: LogFormat) {
    build_subscriber(build_filter(default_directives), format, io::stderr).init();
    tracing::debug!(?format, "logging initialized");
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::from_str_lossy("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str_lossy("yaml"), LogFormat::Pretty);
    }

    /// In-memory sink standing in for stderr.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    #[test]
    fn events_go_to_the_configured_writer() {
        let sink = Capture::default();
        let writer = sink.clone();
        let subscriber =
            build_subscriber(EnvFilter::new("info"), LogFormat::Pretty, move || {
                writer.clone()
            });

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(key_id = "abc", "key pair ready");
        });

        let text = sink.text();
        assert!(text.contains("key pair ready"));
        assert!(text.contains("abc"));
    }

    #[test]
    fn json_format_emits_one_object_per_line() {
        let sink = Capture::default();
        let writer = sink.clone();
        let subscriber =
            build_subscriber(EnvFilter::new("info"), LogFormat::Json, move || {
                writer.clone()
            });

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(threshold = 150, "proof issued");
            tracing::debug!("filtered out");
        });

        let lines: Vec<serde_json::Value> = sink
            .text()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["fields"]["message"], "proof issued");
        assert_eq!(lines[0]["fields"]["threshold"], 150);
    }
}
