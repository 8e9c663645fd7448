//! Logging setup
//!
//! A `tracing` subscriber is installed at load time when the `TABPREP_DEBUG`
//! environment variable is set. Unset, empty, `0` or `false` leaves logging off.
//!
//! ```sh
//! export TABPREP_DEBUG=true
//! ```

use ctor::ctor;
use tracing::Level;

fn logging_enabled(value: Option<&str>) -> bool {
    !matches!(value, None | Some("") | Some("0") | Some("false"))
}

#[ctor]
fn init_debug_logging() {
    let value = std::env::var("TABPREP_DEBUG").ok();
    if logging_enabled(value.as_deref()) {
        // try_init: another subscriber may already be installed by the host.
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();
    }
}
