use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;

/// Logs go to a daily file next to the config; stdout belongs to the state feed.
/// Keep the guard alive for as long as logs should be flushed.
pub fn init(dir: &Path, level: Level) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(dir, "motif.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .init();

    guard
}

/// `log_level` from the config, falling back to info on junk.
pub fn parse_level(value: &str) -> Level {
    value.parse().unwrap_or_else(|_| {
        eprintln!("unknown log level `{value}`, using info");
        Level::INFO
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("loud"), Level::INFO);
    }
}
