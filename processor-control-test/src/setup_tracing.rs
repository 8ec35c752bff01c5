use once_cell::sync::Lazy;
use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Set to any value to print test traces to stdout.
pub const TEST_LOG_VAR: &str = "TEST_LOG";

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_TEST_FILTER: &str = "info,processor_control=debug";

/// Installs the global test subscriber once per test binary. Bunyan JSON goes to stdout when
/// [`TEST_LOG_VAR`] is set and is discarded otherwise.
pub static TEST_TRACING: Lazy<()> = Lazy::new(|| {
    let writer = if std::env::var_os(TEST_LOG_VAR).is_some() {
        BoxMakeWriter::new(std::io::stdout)
    } else {
        BoxMakeWriter::new(std::io::sink)
    };

    install(bunyan_subscriber("processor_control_test", writer));
});

/// Bunyan-formatted subscriber writing to `writer`, filtered by `RUST_LOG` or
/// [`DEFAULT_TEST_FILTER`].
pub fn bunyan_subscriber(
    name: impl Into<String>,
    writer: BoxMakeWriter,
) -> impl Subscriber + Send + Sync {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_FILTER));

    Registry::default()
        .with(filter)
        .with(JsonStorageLayer)
        .with(BunyanFormattingLayer::new(name.into(), writer))
}

fn install(subscriber: impl Subscriber + Send + Sync) {
    LogTracer::init().expect("log records already routed elsewhere");
    tracing::subscriber::set_global_default(subscriber)
        .expect("global tracing subscriber already installed");
}
