use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub fetch: FetchConfig,
    pub output: OutputConfig,
    pub refresh: RefreshConfig,
}

/// Base URLs of the upstream services. Individual endpoints are derived from
/// these in [`crate::endpoints::Endpoints`].
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub server_url: String,
    pub datasets_url: String,
    pub yields_url: String,
    pub bridges_url: String,
    pub nft_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// When set, responses are cached on disk here and reused while fresh
    #[serde(default)]
    pub cache_dir: Option<String>,
    pub cache_ttl_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    pub protocols_url: String,
    pub chains_url: String,
    /// Staleness window for the served snapshot
    pub ttl_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server_url: "https://api.llama.fi".to_string(),
            datasets_url: "https://defillama-datasets.llama.fi".to_string(),
            yields_url: "https://yields.llama.fi".to_string(),
            bridges_url: "https://bridges.llama.fi".to_string(),
            nft_url: "https://nft.llama.fi".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 120,
            cache_dir: None,
            cache_ttl_seconds: 3600,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "./metadata".to_string(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            protocols_url: "https://api.llama.fi/config/smol/appMetadata-protocols.json"
                .to_string(),
            chains_url: "https://api.llama.fi/config/smol/appMetadata-chains.json".to_string(),
            ttl_seconds: 3600,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let api = ApiConfig::default();
        let fetch = FetchConfig::default();
        let output = OutputConfig::default();
        let refresh = RefreshConfig::default();

        let config = Config::builder()
            // Upstream services
            .set_default("api.server_url", api.server_url)?
            .set_default("api.datasets_url", api.datasets_url)?
            .set_default("api.yields_url", api.yields_url)?
            .set_default("api.bridges_url", api.bridges_url)?
            .set_default("api.nft_url", api.nft_url)?
            // Fetch layer
            .set_default("fetch.timeout_seconds", fetch.timeout_seconds as i64)?
            .set_default("fetch.cache_ttl_seconds", fetch.cache_ttl_seconds as i64)?
            // Snapshot output
            .set_default("output.dir", output.dir)?
            // Runtime refresh
            .set_default("refresh.protocols_url", refresh.protocols_url)?
            .set_default("refresh.chains_url", refresh.chains_url)?
            .set_default("refresh.ttl_seconds", refresh.ttl_seconds as i64)?
            // Load from config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (LLAMA_METADATA__API__SERVER_URL, etc.)
            .add_source(
                Environment::with_prefix("LLAMA_METADATA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
