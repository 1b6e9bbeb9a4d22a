/// Integration tests for resilience library
use resilience::{with_retry, RetryConfig, RetryError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ==================== Retry Tests ====================

#[tokio::test(start_paused = true)]
async fn test_dependency_becomes_ready_mid_retry() {
    let config = RetryConfig {
        max_retries: 5,
        initial_backoff: Duration::from_millis(100),
        jitter: false,
        attempt_timeout: Some(Duration::from_secs(1)),
        ..Default::default()
    };
    let probes = Arc::new(AtomicU32::new(0));
    let probes_clone = probes.clone();

    let start = tokio::time::Instant::now();
    let result = with_retry("dependency", &config, move || {
        let seen = probes_clone.fetch_add(1, Ordering::SeqCst);
        async move {
            if seen < 3 {
                Err(format!("connection refused ({seen})"))
            } else {
                Ok("ready")
            }
        }
    })
    .await;

    assert_eq!(result.unwrap(), "ready");
    assert_eq!(probes.load(Ordering::SeqCst), 4);
    // 100ms + 200ms + 400ms of backoff before the fourth probe
    assert!(start.elapsed() >= Duration::from_millis(700));
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_means_single_attempt() {
    let config = RetryConfig {
        max_retries: 0,
        jitter: false,
        ..Default::default()
    };
    let probes = Arc::new(AtomicU32::new(0));
    let probes_clone = probes.clone();

    let result = with_retry("single", &config, move || {
        probes_clone.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>("down") }
    })
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.attempts(), 1);
    assert!(matches!(err, RetryError::Exhausted { .. }));
    assert_eq!(probes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_is_capped() {
    let config = RetryConfig {
        max_retries: 4,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_millis(150),
        backoff_multiplier: 10.0,
        jitter: false,
        attempt_timeout: None,
    };

    let start = tokio::time::Instant::now();
    let result = with_retry("capped", &config, || async { Err::<(), _>("down") }).await;

    assert!(result.is_err());
    // 100 + 150 + 150 + 150
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(550));
    assert!(elapsed < Duration::from_millis(1000));
}

#[test]
fn test_error_message_mentions_attempts() {
    let err: RetryError<String> = RetryError::Exhausted {
        attempts: 4,
        last_error: "broker unreachable".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "gave up after 4 attempts: broker unreachable"
    );
}
