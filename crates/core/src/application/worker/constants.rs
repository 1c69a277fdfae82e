// Worker constants (no magic values)
use std::time::Duration;

/// Sleep duration when no pending registration is claimable (500ms)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(500);

/// Sleep duration after a repository error before polling again (2s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(2);

/// Default number of concurrent workers in the daemon
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Default minimum parsing confidence accepted by review
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.8;
