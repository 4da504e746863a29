//! Poll schedule for report retrieval.
//!
//! The delay grows quadratically from one second and flattens at twenty
//! seconds from the fifteenth attempt on, so fast scans are noticed quickly
//! while a slow one costs at most about ten minutes of polling.

use std::time::Duration;

/// Number of result requests made before a wait gives up.
pub const MAX_ATTEMPTS: u32 = 30;

const BASE_MS: u64 = 1_000;
const STEP_MS: u64 = 100;
const CEILING_MS: u64 = 20_000;

/// Delay after the 0-based `attempt`: `min(attempt² * 100 + 1000, 20000)` ms.
pub fn backoff(attempt: u32) -> Duration {
    let attempt = u64::from(attempt);
    let millis = attempt
        .saturating_mul(attempt)
        .saturating_mul(STEP_MS)
        .saturating_add(BASE_MS)
        .min(CEILING_MS);
    Duration::from_millis(millis)
}

/// Total time slept by a wait that sees `attempts` not-ready responses and
/// no sleep after the last one.
pub fn total_sleep(attempts: u32) -> Duration {
    (0..attempts.saturating_sub(1)).map(backoff).sum()
}
