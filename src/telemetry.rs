use std::sync::Once;

use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIRECTIVE: &str = "loan_ledger_rs=info";

/// Install the global fmt subscriber, filtered by `RUST_LOG` on top of the crate default.
///
/// Safe to call repeatedly; only the first call has an effect. A subscriber installed
/// elsewhere is left in place.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = DEFAULT_DIRECTIVE.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }

        let _ = fmt().with_env_filter(filter).try_init();
        tracing::info!("loan ledger tracing initialized");
    });
}
