// common/src/utils.rs
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Setup tracing for consistent logging across crates.
///
/// Unknown level names fall back to `info`.
pub fn setup_tracing(level: &str) {
    let max_level = Level::from_str(level).unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(max_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Current unix time in seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
