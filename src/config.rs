use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Port the embedding HTTP server binds the admission API to.
    pub server_port: u16,

    /// Base URL of the ticketing API the bots run their protocol against.
    pub ticketing_api_url: String,

    /// Base URL of the stats collector that receives run summaries.
    pub stats_server_url: String,

    /// Process-wide bot-slot pool size.
    ///
    /// Admission acquires `bot_count` slots up front and releases them at
    /// cleanup, so this bounds the number of concurrently live bot tasks.
    pub max_concurrent_bots: usize,

    /// Minimum admission-to-start gap.
    ///
    /// Guarantees the layout fetch, cohort generation and seat planning all
    /// finish before the scheduled instant fires. Tune, do not remove.
    pub admission_grace: Duration,

    /// Environment name; "production" switches logging to JSON.
    pub environment: String,

    /// Default log level when RUST_LOG is unset.
    pub log_level: String,

    pub object_store: ObjectStoreConfig,
    pub event_stream: EventStreamConfig,
}

/// Connection settings for the bucket that holds `halls/{hallId}/layout.json`.
#[derive(Clone, Debug)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub use_ssl: bool,
}

/// Consumer-group settings for the queue-release event topic.
#[derive(Clone, Debug)]
pub struct EventStreamConfig {
    pub brokers: Vec<String>,
    pub group_id: String,
    pub topic: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server_port: env_parse("SERVER_PORT", 8080),
            ticketing_api_url: env_or("TICKETING_API_URL", "http://localhost:3000"),
            stats_server_url: env_or("STATS_SERVER_URL", "http://localhost:4000"),
            max_concurrent_bots: env_parse("MAX_CONCURRENT_BOTS", 50_000),
            admission_grace: Duration::from_secs(env_parse("ADMISSION_GRACE_SECS", 10)),
            environment: env_or("ENVIRONMENT", "development"),
            log_level: env_or("LOG_LEVEL", "info"),
            object_store: ObjectStoreConfig {
                endpoint: env_or("MINIO_ENDPOINT", "localhost:9000"),
                access_key: env_or("MINIO_ACCESS_KEY", ""),
                secret_key: env_or("MINIO_SECRET_KEY", ""),
                bucket: env_or("MINIO_BUCKET", "halls"),
                use_ssl: env_parse("MINIO_USE_SSL", false),
            },
            event_stream: EventStreamConfig {
                brokers: env_or("KAFKA_BROKERS", "localhost:9092")
                    .split(',')
                    .map(|b| b.trim().to_string())
                    .filter(|b| !b.is_empty())
                    .collect(),
                group_id: env_or("KAFKA_GROUP_ID", "bot-server"),
                topic: env_or("KAFKA_TOPIC", "bot-dequeued"),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
