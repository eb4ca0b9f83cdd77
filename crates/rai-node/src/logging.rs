// Ambient logging facade (spec §7): the logging surface itself (where
// lines end up — file, syslog, journald) is an external concern; this
// crate only ever reaches for `log`'s macros and wires a default
// `env_logger` backend so the facade has somewhere to go during tests and
// standalone runs.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install an `env_logger` backend at `level` if one hasn't been installed
/// yet in this process. Safe to call more than once — only the first call
/// takes effect, matching `env_logger::Builder::try_init`'s semantics
/// without surfacing the "already initialized" error to callers that don't
/// care (multiple `Node`s in one test process, for instance).
pub fn init(level: &str) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder.parse_filters(level);
        let _ = builder.try_init();
    });
}
