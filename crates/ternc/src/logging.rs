//! Logging setup for `ternc`.
//!
//! The compiler crates log through the `log` facade:
//!
//! - `debug!` - declarations checked and emitted
//! - `trace!` - instantiations, constraint objects, single functions
//!
//! `RUST_LOG` is honoured when no `-v` flag is given:
//!
//! ```bash
//! RUST_LOG=tern_typeck=debug ternc build main.tern.json
//! ```

use std::io::Write;
use std::sync::Once;

use env_logger::Builder;
use log::LevelFilter;

static INIT: Once = Once::new();

/// Warnings only. Later calls are no-ops.
pub fn init() {
    init_with_level(LevelFilter::Warn);
}

/// Log at `level` and above. Later calls are no-ops.
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{:5}] {} - {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .init();
    });
}

/// Filter from `RUST_LOG`, defaulting to warnings. Later calls are no-ops.
pub fn init_from_env() {
    INIT.call_once(|| {
        Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    });
}

/// The level for a `-v` count: none defers to the environment.
pub fn level_for(verbose: u8) -> Option<LevelFilter> {
    match verbose {
        0 => None,
        1 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    }
}
