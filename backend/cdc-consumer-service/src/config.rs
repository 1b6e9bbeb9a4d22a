/// Configuration management for the CDC consumer
///
/// Every setting comes from an environment variable and falls back to a
/// local-development default, so the service starts with no configuration.
/// Unparseable numbers fall back to the default as well.
use resilience::RetryConfig;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub kafka: KafkaConfig,
    pub elasticsearch: ElasticsearchConfig,
    pub telemetry: TelemetryConfig,
    pub readiness: ReadinessConfig,
    pub log_format: LogFormat,
}

/// Kafka configuration
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Comma-separated bootstrap servers
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
    pub client_id: String,
}

#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub index: String,
}

/// Metrics and health HTTP listener
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub port: u16,
}

/// Startup probe of Kafka and Elasticsearch
#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub attempt_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl ReadinessConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_backoff: self.initial_backoff,
            max_backoff: self.max_backoff,
            backoff_multiplier: 2.0,
            jitter: true,
            attempt_timeout: Some(self.attempt_timeout),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let millis = |key: &str, default: u64| {
            Duration::from_millis(
                lookup(key)
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or(default),
            )
        };

        Config {
            kafka: KafkaConfig {
                brokers: string("KAFKA_BROKER", "localhost:9092"),
                topic: string("KAFKA_TOPIC", "cdc-events"),
                group_id: string("KAFKA_GROUP_ID", "cdc-consumer-group"),
                client_id: string("KAFKA_CLIENT_ID", "cdc-consumer"),
            },
            elasticsearch: ElasticsearchConfig {
                url: string("ELASTICSEARCH_URL", "http://localhost:9200"),
                index: string("ELASTICSEARCH_INDEX", "cdc-events"),
            },
            telemetry: TelemetryConfig {
                port: lookup("PROMETHEUS_PORT")
                    .and_then(|p| p.trim().parse().ok())
                    .unwrap_or(8080),
            },
            readiness: ReadinessConfig {
                max_retries: lookup("READINESS_MAX_RETRIES")
                    .and_then(|n| n.trim().parse().ok())
                    .unwrap_or(10),
                initial_backoff: millis("READINESS_INITIAL_BACKOFF_MS", 500),
                max_backoff: millis("READINESS_MAX_BACKOFF_MS", 10_000),
                attempt_timeout: millis("READINESS_ATTEMPT_TIMEOUT_MS", 5_000),
            },
            log_format: match lookup("LOG_FORMAT").as_deref().map(str::trim) {
                Some(f) if f.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
                _ => LogFormat::Json,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_target_local_services() {
        let config = config_with(&[]);

        assert_eq!(config.kafka.brokers, "localhost:9092");
        assert_eq!(config.kafka.topic, "cdc-events");
        assert_eq!(config.kafka.group_id, "cdc-consumer-group");
        assert_eq!(config.kafka.client_id, "cdc-consumer");
        assert_eq!(config.elasticsearch.url, "http://localhost:9200");
        assert_eq!(config.elasticsearch.index, "cdc-events");
        assert_eq!(config.telemetry.port, 8080);
        assert_eq!(config.readiness.max_retries, 10);
        assert_eq!(config.readiness.initial_backoff, Duration::from_millis(500));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_environment_overrides() {
        let config = config_with(&[
            ("KAFKA_BROKER", "kafka-1:9092,kafka-2:9092"),
            ("ELASTICSEARCH_URL", "http://es:9200"),
            ("PROMETHEUS_PORT", "9100"),
            ("READINESS_MAX_RETRIES", "3"),
            ("LOG_FORMAT", "Pretty"),
        ]);

        assert_eq!(config.kafka.brokers, "kafka-1:9092,kafka-2:9092");
        assert_eq!(config.elasticsearch.url, "http://es:9200");
        assert_eq!(config.telemetry.port, 9100);
        assert_eq!(config.readiness.max_retries, 3);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_malformed_values_fall_back_to_defaults() {
        let config = config_with(&[
            ("PROMETHEUS_PORT", "eighty"),
            ("READINESS_ATTEMPT_TIMEOUT_MS", "-1"),
            ("KAFKA_TOPIC", "   "),
        ]);

        assert_eq!(config.telemetry.port, 8080);
        assert_eq!(config.readiness.attempt_timeout, Duration::from_secs(5));
        assert_eq!(config.kafka.topic, "cdc-events");
    }

    #[test]
    fn test_retry_config_bounds_each_attempt() {
        let retry = config_with(&[]).readiness.retry_config();
        assert_eq!(retry.max_retries, 10);
        assert_eq!(retry.attempt_timeout, Some(Duration::from_secs(5)));
        assert_eq!(retry.max_backoff, Duration::from_secs(10));
    }
}
