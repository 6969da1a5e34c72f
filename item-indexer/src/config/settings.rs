//! Settings read from the environment.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::config::connection::RetryPolicy;
use crate::orchestrator::AckMode;
use crate::processor::TransformPolicy;
use crate::IndexingError;
use item_indexer_repository::opensearch::DEFAULT_INDEX_NAME;
use item_indexer_repository::BulkIndexerConfig;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default RabbitMQ host.
const DEFAULT_RABBITMQ_HOST: &str = "localhost";

/// Default RabbitMQ port.
const DEFAULT_RABBITMQ_PORT: u16 = 5672;

/// Default number of connection attempts, for both backends.
const DEFAULT_CONNECTION_ATTEMPTS: u32 = 5;

/// Default delay between connection attempts in seconds.
const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// RabbitMQ connection and subscription settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Virtual host; empty selects the broker's default one.
    pub vhost: String,
    /// Connection name and consumer tag prefix.
    pub app_id: String,
    pub prefetch_count: u16,
    pub queue_name: String,
    pub connection: RetryPolicy,
}

/// OpenSearch connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub index_name: String,
    pub connection: RetryPolicy,
}

/// All settings of the item indexer.
#[derive(Debug, Clone)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub search: SearchSettings,
    pub indexer: BulkIndexerConfig,
    pub ack_mode: AckMode,
    /// Requeue messages whose document could not be written instead of rejecting them.
    pub requeue_on_write_failure: bool,
    pub transform_policy: TransformPolicy,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `RABBITMQ_HOST` / `RABBITMQ_PORT`: Broker address (default: localhost:5672)
    /// - `RABBITMQ_USERNAME` / `RABBITMQ_PASSWORD` / `RABBITMQ_VHOST` / `RABBITMQ_APP_ID`
    /// - `RABBITMQ_CONNECTION_ATTEMPTS` / `RABBITMQ_RETRY_DELAY_SECS` (default: 5 / 5)
    /// - `PREFETCH_COUNT`: Unacknowledged deliveries in flight (default: 1)
    /// - `CONSUMER_QUEUE_NAME`: Queue to consume (required)
    /// - `OPENSEARCH_URLS`: Comma-separated node URLs (default: http://localhost:9200)
    /// - `OPENSEARCH_USERNAME` / `OPENSEARCH_PASSWORD`: Basic auth (default: none)
    /// - `OPENSEARCH_CONNECTION_ATTEMPTS` / `OPENSEARCH_RETRY_DELAY_SECS` (default: 5 / 5)
    /// - `OPENSEARCH_MAX_RETRIES`: Retries of a failed bulk write (default: 3)
    /// - `OPENSEARCH_INDEX_NAME`: Target index (default: items)
    /// - `INDEXER_WORKERS`: Concurrent bulk requests (default: available parallelism)
    /// - `INDEXER_FLUSH_BYTES`: Buffered bytes that trigger a flush (default: 5000000)
    /// - `INDEXER_FLUSH_INTERVAL`: Seconds between time-based flushes (default: 30)
    /// - `INDEXER_QUEUE_CAPACITY`: Submission queue size (default: 1000)
    /// - `ACK_MODE`: "submit" or "flush" (default: submit)
    /// - `REQUEUE_ON_WRITE_FAILURE`: Requeue instead of reject on write failures (default: false)
    /// - `TRANSFORM_POLICY`: "strict" or "lenient" (default: strict)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Lookup(lookup);

        let queue_name = vars
            .string("CONSUMER_QUEUE_NAME")
            .ok_or_else(|| IndexingError::config("CONSUMER_QUEUE_NAME is required"))?;

        let broker = BrokerSettings {
            host: vars.string_or("RABBITMQ_HOST", DEFAULT_RABBITMQ_HOST),
            port: vars.parse_or("RABBITMQ_PORT", DEFAULT_RABBITMQ_PORT)?,
            username: vars.string_or("RABBITMQ_USERNAME", ""),
            password: vars.string_or("RABBITMQ_PASSWORD", ""),
            vhost: vars.string_or("RABBITMQ_VHOST", ""),
            app_id: vars.string_or("RABBITMQ_APP_ID", ""),
            prefetch_count: vars.parse_or("PREFETCH_COUNT", 1)?,
            queue_name,
            connection: RetryPolicy::new(
                vars.parse_or("RABBITMQ_CONNECTION_ATTEMPTS", DEFAULT_CONNECTION_ATTEMPTS)?,
                Duration::from_secs(vars.parse_or("RABBITMQ_RETRY_DELAY_SECS", DEFAULT_RETRY_DELAY_SECS)?),
            ),
        };
        if broker.prefetch_count == 0 {
            return Err(IndexingError::config("PREFETCH_COUNT must be at least 1"));
        }

        let urls: Vec<String> = vars
            .string_or("OPENSEARCH_URLS", DEFAULT_OPENSEARCH_URL)
            .split(',')
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        if urls.is_empty() {
            return Err(IndexingError::config("OPENSEARCH_URLS contains no URL"));
        }

        let search = SearchSettings {
            urls,
            username: vars.string("OPENSEARCH_USERNAME"),
            password: vars.string("OPENSEARCH_PASSWORD"),
            index_name: vars.string_or("OPENSEARCH_INDEX_NAME", DEFAULT_INDEX_NAME),
            connection: RetryPolicy::new(
                vars.parse_or("OPENSEARCH_CONNECTION_ATTEMPTS", DEFAULT_CONNECTION_ATTEMPTS)?,
                Duration::from_secs(vars.parse_or("OPENSEARCH_RETRY_DELAY_SECS", DEFAULT_RETRY_DELAY_SECS)?),
            ),
        };

        let defaults = BulkIndexerConfig::default();
        let indexer = BulkIndexerConfig {
            num_workers: vars.parse_or("INDEXER_WORKERS", defaults.num_workers)?,
            flush_bytes: vars.parse_or("INDEXER_FLUSH_BYTES", defaults.flush_bytes)?,
            flush_interval: Duration::from_secs(
                vars.parse_or("INDEXER_FLUSH_INTERVAL", defaults.flush_interval.as_secs())?,
            ),
            queue_capacity: vars.parse_or("INDEXER_QUEUE_CAPACITY", defaults.queue_capacity)?,
            max_retries: vars.parse_or("OPENSEARCH_MAX_RETRIES", defaults.max_retries)?,
            retry_backoff: defaults.retry_backoff,
        };
        if indexer.num_workers == 0 {
            return Err(IndexingError::config("INDEXER_WORKERS must be at least 1"));
        }

        Ok(Self {
            broker,
            search,
            indexer,
            ack_mode: vars.parse_or("ACK_MODE", AckMode::default())?,
            requeue_on_write_failure: vars.parse_or("REQUEUE_ON_WRITE_FAILURE", false)?,
            transform_policy: vars.parse_or("TRANSFORM_POLICY", TransformPolicy::default())?,
        })
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty value of a variable.
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.string(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, IndexingError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.string(key) {
            Some(value) => value.parse().map_err(|e| {
                IndexingError::config(format!("Invalid {} '{}': {}", key, value, e))
            }),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, IndexingError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[("CONSUMER_QUEUE_NAME", "items")]).unwrap();

        assert_eq!(settings.broker.host, "localhost");
        assert_eq!(settings.broker.port, 5672);
        assert_eq!(settings.broker.prefetch_count, 1);
        assert_eq!(settings.broker.queue_name, "items");
        assert_eq!(
            settings.broker.connection,
            RetryPolicy::new(5, Duration::from_secs(5))
        );
        assert_eq!(settings.search.urls, vec!["http://localhost:9200".to_string()]);
        assert_eq!(settings.search.username, None);
        assert_eq!(settings.search.index_name, "items");
        assert_eq!(settings.indexer.flush_bytes, 5_000_000);
        assert_eq!(settings.indexer.flush_interval, Duration::from_secs(30));
        assert_eq!(settings.indexer.max_retries, 3);
        assert_eq!(settings.ack_mode, AckMode::OnSubmit);
        assert!(!settings.requeue_on_write_failure);
        assert_eq!(settings.transform_policy, TransformPolicy::Strict);
    }

    #[test]
    fn test_queue_name_is_required() {
        let result = settings(&[("RABBITMQ_HOST", "rabbit")]);
        assert!(matches!(result, Err(IndexingError::ConfigError(_))));

        let result = settings(&[("CONSUMER_QUEUE_NAME", "  ")]);
        assert!(matches!(result, Err(IndexingError::ConfigError(_))));
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            ("CONSUMER_QUEUE_NAME", "catalog"),
            ("RABBITMQ_HOST", "rabbit"),
            ("RABBITMQ_PORT", "5673"),
            ("RABBITMQ_VHOST", "/"),
            ("PREFETCH_COUNT", "50"),
            ("RABBITMQ_CONNECTION_ATTEMPTS", "2"),
            ("OPENSEARCH_URLS", "http://os1:9200, http://os2:9200,"),
            ("OPENSEARCH_USERNAME", "admin"),
            ("OPENSEARCH_PASSWORD", "secret"),
            ("OPENSEARCH_INDEX_NAME", "products"),
            ("OPENSEARCH_MAX_RETRIES", "5"),
            ("INDEXER_WORKERS", "4"),
            ("INDEXER_FLUSH_BYTES", "1000"),
            ("INDEXER_FLUSH_INTERVAL", "2"),
            ("ACK_MODE", "flush"),
            ("REQUEUE_ON_WRITE_FAILURE", "true"),
            ("TRANSFORM_POLICY", "lenient"),
        ])
        .unwrap();

        assert_eq!(settings.broker.host, "rabbit");
        assert_eq!(settings.broker.port, 5673);
        assert_eq!(settings.broker.vhost, "/");
        assert_eq!(settings.broker.prefetch_count, 50);
        assert_eq!(settings.broker.connection.attempts, 2);
        assert_eq!(
            settings.search.urls,
            vec!["http://os1:9200".to_string(), "http://os2:9200".to_string()]
        );
        assert_eq!(settings.search.username.as_deref(), Some("admin"));
        assert_eq!(settings.search.index_name, "products");
        assert_eq!(settings.indexer.max_retries, 5);
        assert_eq!(settings.indexer.num_workers, 4);
        assert_eq!(settings.indexer.flush_bytes, 1000);
        assert_eq!(settings.indexer.flush_interval, Duration::from_secs(2));
        assert_eq!(settings.ack_mode, AckMode::OnFlush);
        assert!(settings.requeue_on_write_failure);
        assert_eq!(settings.transform_policy, TransformPolicy::Lenient);
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        for (key, value) in [
            ("RABBITMQ_PORT", "not-a-port"),
            ("PREFETCH_COUNT", "-1"),
            ("PREFETCH_COUNT", "0"),
            ("INDEXER_FLUSH_BYTES", "5MB"),
            ("INDEXER_WORKERS", "0"),
            ("ACK_MODE", "later"),
            ("REQUEUE_ON_WRITE_FAILURE", "yes"),
            ("TRANSFORM_POLICY", "loose"),
            ("OPENSEARCH_URLS", " , "),
        ] {
            let result = settings(&[("CONSUMER_QUEUE_NAME", "items"), (key, value)]);
            assert!(
                matches!(result, Err(IndexingError::ConfigError(_))),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }
}
