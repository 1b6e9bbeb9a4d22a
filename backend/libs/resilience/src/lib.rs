/// Resilience patterns shared by Nova services
///
/// - **Retry**: bounded exponential backoff with jitter and an optional
///   per-attempt timeout, used to wait for dependencies at startup.
///
/// # Example: waiting for a dependency
///
/// ```rust,no_run
/// use resilience::{with_retry, RetryConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let config = RetryConfig {
///         max_retries: 10,
///         attempt_timeout: Some(Duration::from_secs(5)),
///         ..Default::default()
///     };
///
///     let result = with_retry("elasticsearch ping", &config, || async {
///         // Your probe here
///         Ok::<_, String>(())
///     })
///     .await;
/// }
/// ```

pub mod retry;

pub use retry::{with_retry, RetryConfig, RetryError};
