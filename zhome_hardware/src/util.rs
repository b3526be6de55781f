use std::time::Duration;

use zhome_traits::Clock;

use crate::error::{HwError, Result};

/// Poll `triggered` until it reports true or `timeout` expires on `clock`.
/// Sleeps `poll_interval` between polls so a real clock does not spin.
pub fn wait_until_triggered(
    mut triggered: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
    clock: &impl Clock,
) -> Result<()> {
    let start = clock.now();
    let deadline = start + timeout;
    while !triggered() {
        if clock.now() >= deadline {
            return Err(HwError::EndstopTimeout(clock.ms_since(start)));
        }
        clock.sleep(poll_interval);
    }
    Ok(())
}
