//! `tracing` subscriber setup for binaries and foreign hosts.
//!
//! Library code only emits events; nothing is printed until a host calls
//! [`init_logging`].  Output goes to stderr so stdout stays free for
//! command output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "storyvoice=info,warn";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set.  Returns `false` if a
/// subscriber was already installed; the existing one is kept.
pub fn init_logging(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(filter = default_filter, "logging initialised");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_a_no_op() {
        // Another test may have installed a subscriber first; either way the
        // second call must not replace it.
        let _ = init_logging(DEFAULT_FILTER);
        assert!(!init_logging("trace"));
    }
}
