use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive, e.g. `lensgraph=trace`.
pub const LOG_ENV: &str = "LENSGRAPH_LOG";

/// Installs a subscriber writing to stderr; stdout stays free for replies.
pub fn init(verbose: bool, quiet: bool) {
    let fallback = match (quiet, verbose) {
        (true, _) => "error",
        (false, true) => "info",
        (false, false) => "warn",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
