//! One monitoring pass and the run modes built on it.
mod alerts;
mod checks;
mod delivery;
mod pass;
mod startup;

pub use alerts::{bootstrap_alert, watchdog_check, WatchdogOutcome};
pub use checks::should_run;
pub use delivery::{DeliveryOutcome, Dispatcher};
pub use pass::{Monitor, PassReport};
pub use startup::{print_digest, run_once, watch, watch_until, RuntimeExit};
