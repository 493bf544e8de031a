//! Optional log output for applications embedding the client.
//!
//! The library only emits `tracing` events under the `zoekt_client` target;
//! it never installs a subscriber. What the layer surfaces:
//!
//! - the `search` / `list_repositories` spans with their `query` / `filter`
//!   fields, closed with their busy and idle time;
//! - retry warnings (attempt, delay, error) from inside those spans;
//! - per-request `debug!` lines from the transports (endpoint, status, bytes).
//!
//! Binaries compose [`layer`] into their own registry:
//!
//! ```no_run
//! use tracing::Level;
//! use tracing_subscriber::prelude::*;
//!
//! tracing_subscriber::registry()
//!     .with(zoekt_client::telemetry::env_filter_with_level("warn", Level::DEBUG))
//!     .with(zoekt_client::telemetry::layer())
//!     .init();
//! ```

use std::io::{self, IsTerminal};

use tracing::{Level, Subscriber};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::fmt::format::{FmtSpan, Writer};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter};

/// Target prefix of every event emitted by this crate.
pub const TARGET_PREFIX: &str = "zoekt_client";

/// RFC 3339 UTC timestamps with millisecond precision, e.g.
/// `2025-09-12T10:20:30.125Z`.
#[derive(Clone, Copy, Debug, Default)]
struct UtcMillis;

impl FormatTime for UtcMillis {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
    }
}

/// Compact stdout layer limited to this crate's events.
///
/// ANSI colors are used only when stdout is a terminal.
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    client_layer(io::stdout, io::stdout().is_terminal())
}

/// Same as [`layer`], writing to `writer` without ANSI colors (log files,
/// captured output).
pub fn layer_with_writer<S, W>(writer: W) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    client_layer(writer, false)
}

fn client_layer<S, W>(writer: W, ansi: bool) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let client_events = filter::filter_fn(|meta| meta.target().starts_with(TARGET_PREFIX));

    // The timer must be set on the event format itself: `event_format`
    // replaces whatever the layer builder configured before it.
    let format = fmt::format()
        .compact()
        .with_timer(UtcMillis)
        .with_level(true)
        .with_target(true);

    fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_span_events(FmtSpan::CLOSE)
        .event_format(format)
        .with_filter(client_events)
}

/// `zoekt_client=<level>` directive.
pub fn level_directive(level: Level) -> Directive {
    format!("{TARGET_PREFIX}={}", level.as_str().to_lowercase())
        .parse()
        .unwrap_or_else(|_| Directive::from(LevelFilter::from_level(level)))
}

/// `RUST_LOG` (or `default` when unset/invalid) plus a per-crate level for
/// this library.
pub fn env_filter_with_level(default: &str, level: Level) -> EnvFilter {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    base.add_directive(level_directive(level))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::prelude::*;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[test]
    fn directive_targets_this_crate() {
        assert_eq!(level_directive(Level::DEBUG).to_string(), "zoekt_client=debug");
    }

    #[test]
    fn events_render_with_rfc3339_utc_timestamp() {
        let out = Captured::default();
        let sink = out.clone();
        let subscriber =
            tracing_subscriber::registry().with(layer_with_writer(move || sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "zoekt_client::retry", attempt = 1, "attempt failed");
            tracing::warn!(target: "hyper::proto", "not ours");
        });

        let lines = out.lines();
        assert_eq!(lines.len(), 1, "{lines:?}");
        let line = &lines[0];
        let stamp = line.split_whitespace().next().unwrap();
        let parsed = chrono::DateTime::parse_from_rfc3339(stamp).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
        assert!(stamp.ends_with('Z'), "{stamp}");
        assert!(line.contains("WARN"));
        assert!(line.contains("zoekt_client::retry"));
        assert!(line.contains("attempt failed"));
    }

    #[test]
    fn search_span_fields_are_surfaced() {
        let out = Captured::default();
        let sink = out.clone();
        let subscriber =
            tracing_subscriber::registry().with(layer_with_writer(move || sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!(target: "zoekt_client::client", "search", query = "def main");
            let _entered = span.enter();
            tracing::info!(target: "zoekt_client::retry", "succeeded after retries");
        });

        let text = out.lines().join("\n");
        assert!(text.contains("def main"), "{text}");
        assert!(text.contains("succeeded after retries"), "{text}");
    }
}
