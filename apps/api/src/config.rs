use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
///
/// All scoring policy knobs live here as named parameters — in particular
/// `must_have_weight`, which controls how much harder must-have requirements
/// count in the overall score blend. Never hardcode that weight inline.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub embeddings_api_url: String,
    pub embeddings_api_key: String,
    pub embeddings_model: String,
    pub port: u16,
    pub rust_log: String,
    /// Upper bound on concurrent PostgreSQL connections.
    pub database_max_connections: u32,

    /// Minimum cosine similarity for a claim to count as a requirement match.
    pub match_threshold: f32,
    /// Minimum cosine similarity for evidence-driven claim retrieval.
    pub retrieval_threshold: f32,
    /// Cap on claims returned per nearest-neighbor query.
    pub retrieval_max_per_query: u32,
    /// Weight of the must-have score in the overall blend (nice-to-have gets
    /// the complement).
    pub must_have_weight: f64,
    /// Minimum number of embedded claims before cluster projection runs.
    pub min_cluster_embeddings: usize,
    /// Rate limiter: max requests per caller per window.
    pub rate_limit_max_requests: u32,
    /// Rate limiter: window length in seconds.
    pub rate_limit_window_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            embeddings_api_url: require_env("EMBEDDINGS_API_URL")?,
            embeddings_api_key: require_env("EMBEDDINGS_API_KEY")?,
            embeddings_model: env_or("EMBEDDINGS_MODEL", "text-embedding-3-small"),
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
            match_threshold: parse_env("MATCH_THRESHOLD", 0.5)?,
            retrieval_threshold: parse_env("RETRIEVAL_THRESHOLD", 0.5)?,
            retrieval_max_per_query: parse_env("RETRIEVAL_MAX_PER_QUERY", 25)?,
            must_have_weight: parse_env("MUST_HAVE_WEIGHT", 0.7)?,
            min_cluster_embeddings: parse_env("MIN_CLUSTER_EMBEDDINGS", 3)?,
            rate_limit_max_requests: parse_env("RATE_LIMIT_MAX_REQUESTS", 60)?,
            rate_limit_window_secs: parse_env("RATE_LIMIT_WINDOW_SECS", 60)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        Err(_) => Ok(default),
    }
}
