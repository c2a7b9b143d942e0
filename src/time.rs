use std::time::Duration;

/// Yield to the scheduler for `ms` milliseconds.
///
/// `timeout(0)` is a bare reschedule: every task that is currently runnable
/// gets a chance to run before the caller resumes.
pub async fn timeout(ms: u64) {
    if ms == 0 {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
