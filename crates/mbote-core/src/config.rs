use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::MboteError;

/// Top-level Mbote configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppSettings,
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// General service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Country prefix applied to local-format numbers, e.g. "+242".
    #[serde(default = "default_country_prefix")]
    pub default_country_prefix: String,
    /// Reply used when the LLM collaborator fails or returns nothing.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            default_country_prefix: default_country_prefix(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

/// Webhook HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Token echoed back during the provider's GET verification handshake.
    #[serde(default)]
    pub verify_token: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            verify_token: String::new(),
        }
    }
}

/// LLM provider settings (OpenAI-compatible endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// LLM request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// WhatsApp Business Cloud API settings.
///
/// These seed the `whatsapp_configs` table on startup; runtime resolution
/// goes through the record store so the dashboard can rotate credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppSettings {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub phone_number_id: String,
    #[serde(default)]
    pub business_account_id: Option<String>,
    #[serde(default = "default_graph_url")]
    pub api_base_url: String,
    /// Media reachability probe timeout in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// Send call timeout in seconds.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
    /// Base inter-message pacing for batch sends, in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl Default for WhatsAppSettings {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            business_account_id: None,
            api_base_url: default_graph_url(),
            probe_timeout_secs: default_probe_timeout(),
            send_timeout_secs: default_send_timeout(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

// --- Default value functions ---

fn default_name() -> String {
    "Mbote".to_string()
}
fn default_data_dir() -> String {
    "~/.mbote".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_country_prefix() -> String {
    "+242".to_string()
}
fn default_fallback_reply() -> String {
    "D\u{e9}sol\u{e9}, je rencontre un probl\u{e8}me technique. Veuillez r\u{e9}essayer dans quelques instants.".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_llm_timeout() -> u64 {
    30
}
fn default_graph_url() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}
fn default_probe_timeout() -> u64 {
    10
}
fn default_send_timeout() -> u64 {
    30
}
fn default_pacing_ms() -> u64 {
    1000
}
fn default_db_path() -> String {
    "~/.mbote/mbote.db".to_string()
}

/// Expand `~` to the home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file, with env-var fallbacks for
/// secrets (`MBOTE_OPENAI_API_KEY`, `MBOTE_WHATSAPP_TOKEN`,
/// `MBOTE_VERIFY_TOKEN`). A missing file yields the defaults.
pub fn load(path: &str) -> Result<Config, MboteError> {
    let expanded = shellexpand(path);
    let mut config: Config = match std::fs::read_to_string(&expanded) {
        Ok(text) => toml::from_str(&text)
            .map_err(|e| MboteError::Config(format!("failed to parse {expanded}: {e}")))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("no config file at {expanded}, using defaults");
            Config::default()
        }
        Err(e) => return Err(MboteError::Config(format!("failed to read {expanded}: {e}"))),
    };

    if config.provider.api_key.is_empty() {
        if let Ok(key) = std::env::var("MBOTE_OPENAI_API_KEY") {
            config.provider.api_key = key;
        }
    }
    if config.whatsapp.access_token.is_empty() {
        if let Ok(token) = std::env::var("MBOTE_WHATSAPP_TOKEN") {
            config.whatsapp.access_token = token;
        }
    }
    if config.server.verify_token.is_empty() {
        if let Ok(token) = std::env::var("MBOTE_VERIFY_TOKEN") {
            config.server.verify_token = token;
        }
    }

    Ok(config)
}
