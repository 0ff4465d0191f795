//! Tracing initialization hooks.

use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,board_client=debug";

/// Registry with env filter and a fmt layer.
///
/// Events print their span context, so a log line inside a turn action
/// shows that action's `action` id. Closed action spans are logged with
/// their busy/idle time. Use RUST_LOG to configure, e.g.:
/// RUST_LOG=debug,reqwest=info
pub fn subscriber() -> impl Subscriber + Send + Sync {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry().with(filter).with(fmt_layer)
}

/// Install [`subscriber`] as the global default.
pub fn init() {
    subscriber().init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{info, info_span};

    #[test]
    fn action_spans_nest_under_the_subscriber() {
        tracing::subscriber::with_default(subscriber(), || {
            let span = info_span!("roll_dice", action = "01ABCDEFGH");
            let _entered = span.enter();
            info!("inside an action");
            assert!(!span.is_disabled());
        });
    }
}
