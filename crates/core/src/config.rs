use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub chat: ChatConfig,
    pub agents: AgentsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub reply_temperature: f32,
    pub routing_temperature: f32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Context window sizes for the dispatch protocol and the greeting returned
/// on connect and on history clear.
#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub router_history_turns: usize,
    pub responder_history_turns: usize,
    pub welcome_message: String,
}

/// Enablement and routing hints per responder identity. The keyword lists
/// feed only the router's classification prompt.
#[derive(Clone, Debug)]
pub struct AgentsConfig {
    pub product_details: AgentProfile,
    pub reviews: AgentProfile,
    pub orders: AgentProfile,
}

#[derive(Clone, Debug)]
pub struct AgentProfile {
    pub enabled: bool,
    pub keywords: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const DEFAULT_WELCOME: &str = "Welcome to Sleep Better! I'm Frodo, your personal \
sleep consultant. How may I assist you today?";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://snoozy.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o".to_string(),
                timeout_secs: 60,
                reply_temperature: 0.7,
                routing_temperature: 0.1,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            chat: ChatConfig {
                router_history_turns: 3,
                responder_history_turns: 5,
                welcome_message: DEFAULT_WELCOME.to_string(),
            },
            agents: AgentsConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        let keywords = |list: &[&str]| list.iter().map(|word| (*word).to_string()).collect();
        Self {
            product_details: AgentProfile {
                enabled: true,
                keywords: keywords(&[
                    "features", "specs", "compare", "difference", "price", "size", "material",
                ]),
            },
            reviews: AgentProfile {
                enabled: true,
                keywords: keywords(&[
                    "reviews",
                    "ratings",
                    "feedback",
                    "customers say",
                    "experience",
                    "recommend",
                ]),
            },
            orders: AgentProfile {
                enabled: true,
                keywords: keywords(&[
                    "buy", "order", "purchase", "delivery", "shipping", "payment", "track",
                ]),
            },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("snoozy.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(reply_temperature) = llm.reply_temperature {
                self.llm.reply_temperature = reply_temperature;
            }
            if let Some(routing_temperature) = llm.routing_temperature {
                self.llm.routing_temperature = routing_temperature;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(router_history_turns) = chat.router_history_turns {
                self.chat.router_history_turns = router_history_turns;
            }
            if let Some(responder_history_turns) = chat.responder_history_turns {
                self.chat.responder_history_turns = responder_history_turns;
            }
            if let Some(welcome_message) = chat.welcome_message {
                self.chat.welcome_message = welcome_message;
            }
        }

        if let Some(agents) = patch.agents {
            apply_profile_patch(&mut self.agents.product_details, agents.product_details);
            apply_profile_patch(&mut self.agents.reviews, agents.reviews);
            apply_profile_patch(&mut self.agents.orders, agents.orders);
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SNOOZY_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SNOOZY_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("SNOOZY_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SNOOZY_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SNOOZY_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SNOOZY_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SNOOZY_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("SNOOZY_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SNOOZY_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SNOOZY_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SNOOZY_LLM_REPLY_TEMPERATURE") {
            self.llm.reply_temperature = parse_f32("SNOOZY_LLM_REPLY_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("SNOOZY_LLM_ROUTING_TEMPERATURE") {
            self.llm.routing_temperature = parse_f32("SNOOZY_LLM_ROUTING_TEMPERATURE", &value)?;
        }

        if let Some(value) = read_env("SNOOZY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SNOOZY_SERVER_PORT") {
            self.server.port = parse_u16("SNOOZY_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SNOOZY_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SNOOZY_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("SNOOZY_CHAT_ROUTER_HISTORY_TURNS") {
            self.chat.router_history_turns =
                parse_usize("SNOOZY_CHAT_ROUTER_HISTORY_TURNS", &value)?;
        }
        if let Some(value) = read_env("SNOOZY_CHAT_RESPONDER_HISTORY_TURNS") {
            self.chat.responder_history_turns =
                parse_usize("SNOOZY_CHAT_RESPONDER_HISTORY_TURNS", &value)?;
        }

        if let Some(value) = read_env("SNOOZY_AGENTS_PRODUCT_DETAILS_ENABLED") {
            self.agents.product_details.enabled =
                parse_bool("SNOOZY_AGENTS_PRODUCT_DETAILS_ENABLED", &value)?;
        }
        if let Some(value) = read_env("SNOOZY_AGENTS_REVIEWS_ENABLED") {
            self.agents.reviews.enabled = parse_bool("SNOOZY_AGENTS_REVIEWS_ENABLED", &value)?;
        }
        if let Some(value) = read_env("SNOOZY_AGENTS_ORDERS_ENABLED") {
            self.agents.orders.enabled = parse_bool("SNOOZY_AGENTS_ORDERS_ENABLED", &value)?;
        }

        let log_level = read_env("SNOOZY_LOGGING_LEVEL").or_else(|| read_env("SNOOZY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SNOOZY_LOGGING_FORMAT").or_else(|| read_env("SNOOZY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_chat(&self.chat)?;
        validate_agents(&self.agents)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn apply_profile_patch(profile: &mut AgentProfile, patch: Option<AgentProfilePatch>) {
    let Some(patch) = patch else {
        return;
    };
    if let Some(enabled) = patch.enabled {
        profile.enabled = enabled;
    }
    if let Some(keywords) = patch.keywords {
        profile.keywords = keywords;
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("snoozy.toml"), PathBuf::from("config/snoozy.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    let missing =
        llm.api_key.as_ref().map(|value| value.expose_secret().trim().is_empty()).unwrap_or(true);
    if missing {
        return Err(ConfigError::Validation(
            "llm.api_key is required. Set it in snoozy.toml or via SNOOZY_LLM_API_KEY".to_string(),
        ));
    }

    if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    for (name, value) in [
        ("llm.reply_temperature", llm.reply_temperature),
        ("llm.routing_temperature", llm.routing_temperature),
    ] {
        if !(0.0..=2.0).contains(&value) {
            return Err(ConfigError::Validation(format!("{name} must be in range 0.0..=2.0")));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation(
            "server.port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if chat.router_history_turns == 0 || chat.responder_history_turns == 0 {
        return Err(ConfigError::Validation(
            "chat history windows must be at least one turn".to_string(),
        ));
    }

    if chat.router_history_turns > chat.responder_history_turns {
        return Err(ConfigError::Validation(
            "chat.router_history_turns cannot exceed chat.responder_history_turns".to_string(),
        ));
    }

    Ok(())
}

fn validate_agents(agents: &AgentsConfig) -> Result<(), ConfigError> {
    let any_enabled =
        agents.product_details.enabled || agents.reviews.enabled || agents.orders.enabled;
    if !any_enabled {
        return Err(ConfigError::Validation(
            "at least one responder must be enabled under [agents]".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    chat: Option<ChatPatch>,
    agents: Option<AgentsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    reply_temperature: Option<f32>,
    routing_temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    router_history_turns: Option<usize>,
    responder_history_turns: Option<usize>,
    welcome_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentsPatch {
    product_details: Option<AgentProfilePatch>,
    reviews: Option<AgentProfilePatch>,
    orders: Option<AgentProfilePatch>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentProfilePatch {
    enabled: Option<bool>,
    keywords: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SNOOZY_API_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("snoozy.toml");
            fs::write(
                &path,
                r#"
[llm]
api_key = "${TEST_SNOOZY_API_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let api_key = config.llm.api_key.as_ref().ok_or("api key should be set")?;
            ensure(
                api_key.expose_secret() == "sk-from-env",
                "api key should be loaded from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_SNOOZY_API_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SNOOZY_LLM_API_KEY", "sk-test");
        env::set_var("SNOOZY_LOG_LEVEL", "warn");
        env::set_var("SNOOZY_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["SNOOZY_LLM_API_KEY", "SNOOZY_LOG_LEVEL", "SNOOZY_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SNOOZY_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("SNOOZY_LLM_API_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("snoozy.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[llm]
api_key = "sk-from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            let api_key = config.llm.api_key.as_ref().ok_or("api key should be set")?;
            ensure(
                api_key.expose_secret() == "sk-from-env",
                "env api key should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["SNOOZY_DATABASE_URL", "SNOOZY_LLM_API_KEY"]);
        result
    }

    #[test]
    fn missing_api_key_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["SNOOZY_LLM_API_KEY"]);

        let error = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("llm.api_key")
        );
        ensure(has_message, "validation failure should mention llm.api_key")
    }

    #[test]
    fn router_window_cannot_exceed_responder_window() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SNOOZY_LLM_API_KEY", "sk-test");
        env::set_var("SNOOZY_CHAT_ROUTER_HISTORY_TURNS", "9");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected validation failure".to_string()),
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("router_history_turns")
            );
            ensure(has_message, "validation failure should mention the history windows")
        })();

        clear_vars(&["SNOOZY_LLM_API_KEY", "SNOOZY_CHAT_ROUTER_HISTORY_TURNS"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SNOOZY_LLM_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["SNOOZY_LLM_API_KEY"]);
        result
    }

    #[test]
    fn agent_profiles_can_be_disabled_from_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SNOOZY_LLM_API_KEY", "sk-test");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("snoozy.toml");
            fs::write(
                &path,
                r#"
[agents.reviews]
enabled = false

[agents.orders]
keywords = ["checkout", "invoice"]
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(!config.agents.reviews.enabled, "reviews should be disabled by the file")?;
            ensure(config.agents.product_details.enabled, "product details stays enabled")?;
            ensure(
                config.agents.orders.keywords == vec!["checkout", "invoice"],
                "orders keywords should be replaced by the file",
            )?;
            Ok(())
        })();

        clear_vars(&["SNOOZY_LLM_API_KEY"]);
        result
    }
}
