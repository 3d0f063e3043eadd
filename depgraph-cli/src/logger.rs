//! Logging setup for the `depgraph` binary.
//!
//! Verbosity is chosen in this order:
//! 1. `--verbose`: DEBUG for the depgraph crates
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`
//! 4. INFO for the depgraph crates

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "depgraph_core=debug,depgraph=debug";
const QUIET_FILTER: &str = "depgraph_core=error,depgraph=error";
const DEFAULT_FILTER: &str = "depgraph_core=info,depgraph=info";

fn filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install the global subscriber. Call once, before anything logs.
///
/// Logs go to stderr so that graph output on stdout stays clean.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter(verbose, quiet))
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_wins_over_quiet() {
        assert_eq!(filter(true, true).to_string(), EnvFilter::new(VERBOSE_FILTER).to_string());
    }

    #[test]
    fn quiet_filter() {
        assert_eq!(filter(false, true).to_string(), EnvFilter::new(QUIET_FILTER).to_string());
    }
}
