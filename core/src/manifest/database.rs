use serde::{Deserialize, Serialize};

fn default_url_env() -> String {
    "DATABASE_URL".to_string()
}

fn default_max_pool_size() -> u32 {
    10
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DatabaseDetails {
    /// Name of the environment variable holding the connection string.
    #[serde(default = "default_url_env")]
    pub url_env: String,

    #[serde(default)]
    pub disable_ssl: bool,

    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for DatabaseDetails {
    fn default() -> Self {
        Self {
            url_env: default_url_env(),
            disable_ssl: false,
            max_pool_size: default_max_pool_size(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}
