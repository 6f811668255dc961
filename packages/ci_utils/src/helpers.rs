use std::time::Duration;

/// Sleep for `ms` milliseconds on the tokio timer.
pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
