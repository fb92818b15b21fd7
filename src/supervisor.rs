//! # Task Supervisor
//!
//! Runs a unit of periodic work forever: tick, wait the unit's interval, tick
//! again. A failed tick is logged with its whole cause chain and the unit is
//! restarted after [`RESTART_DELAY`]. There is no retry limit and no backoff;
//! one unit failing never stops another.
//!
//! Shutdown is cooperative: the shared running flag is checked before every
//! tick.

use std::error::Error;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

/// Fixed delay before a failed unit is restarted
pub const RESTART_DELAY: Duration = Duration::from_secs(5);

/// A periodically ticked piece of work.
#[allow(async_fn_in_trait)]
pub trait Unit {
    type Error: Error;

    /// Name used in log lines
    fn name(&self) -> &str;

    /// Pause between two successful ticks
    fn interval(&self) -> Duration;

    async fn tick(&mut self) -> Result<(), Self::Error>;
}

/// `outer: inner: innermost`
pub fn error_chain(err: &dyn Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(chain, ": {cause}");
        source = cause.source();
    }
    chain
}

/// Tick `unit` until `running` is cleared, restarting it after failures.
pub async fn supervise<U: Unit>(unit: &mut U, running: &AtomicBool, restart_delay: Duration) {
    info!(unit = unit.name(), interval = ?unit.interval(), "Starting unit");

    while running.load(Ordering::SeqCst) {
        match unit.tick().await {
            Ok(()) => sleep(unit.interval()).await,
            Err(err) => {
                error!(
                    unit = unit.name(),
                    error = %error_chain(&err),
                    "Unit failed, restarting in {:?}",
                    restart_delay
                );
                sleep(restart_delay).await;
                info!(unit = unit.name(), "Restarting unit");
            }
        }
    }

    info!(unit = unit.name(), "Unit stopped");
}
