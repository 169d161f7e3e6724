//! Tracing subscriber setup for hosts and tests.

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a global tracing subscriber, once per process.
///
/// Does nothing unless `RUST_LOG` is set, so embedding hosts that bring
/// their own subscriber are not affected. `DWS_LOG_TREE` switches the flat
/// formatter for an indented call-tree view, which reads better when
/// following nested script calls.
///
/// ```text
/// RUST_LOG=dws_eval=debug DWS_LOG_TREE=1 my-host script.dws
/// ```
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        if std::env::var("DWS_LOG_TREE").is_ok() {
            tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .with(filter)
                .init();
        } else {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
