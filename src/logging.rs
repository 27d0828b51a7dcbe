//! Log output setup, for binaries. The library itself only emits events.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a plain-text subscriber on stderr.
///
/// `RUST_LOG` wins if it's set, otherwise `default_level` is used as the
/// filter directive (for example `"info"` or `"info,pngstrip=debug"`). A bad
/// directive falls back to `info`.
///
/// Should be called once at startup. Later calls do nothing.
pub fn init_tracing(default_level: &str) {
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(default_level))
    .unwrap_or_else(|_| EnvFilter::new("info"));

  let _ = tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(std::io::stderr).with_thread_names(true))
    .try_init();
}
