use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

// 10 MB in bytes
const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Default workbook source (raw file URL or local path) used when a
    /// request names none.
    pub dataset_url: Option<String>,
    pub max_file_size: usize,
    /// Service-wide default for the stricter null-rate insight mode.
    pub strict_null_insights: bool,
    pub cache_ttl_secs: u64,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let dataset_url = std::env::var("DATASET_URL").ok().filter(|s| !s.is_empty());

        let max_file_size = std::env::var("MAX_FILE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_FILE_SIZE);

        let strict_null_insights = std::env::var("INSIGHT_STRICT_NULLS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let cache_ttl_secs = std::env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);

        Ok(Config {
            dataset_url,
            max_file_size,
            strict_null_insights,
            cache_ttl_secs,
        })
    }
}
