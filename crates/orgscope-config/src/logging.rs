// ── Tracing subscriber setup ──
//
// Libraries only emit `tracing` events; binaries call one of these once
// at startup. `RUST_LOG` always overrides the verbosity flag.

use tracing_subscriber::EnvFilter;

/// Map a `-v` count to a default filter directive.
pub fn verbosity_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn env_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity_filter(verbosity)))
}

/// Install a human-readable subscriber. A second call is a no-op.
pub fn init_tracing(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_target(false)
        .try_init();
}

/// Install a newline-delimited JSON subscriber. A second call is a no-op.
pub fn init_json_tracing(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(verbosity))
        .with_current_span(false)
        .try_init();
}
