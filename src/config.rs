use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub recv_window_ms: u64,
}

#[derive(Clone, Debug)]
pub struct EndpointConfig {
    pub xt_base_url: String,
    pub bybit_base_url: String,
    pub binance_base_url: String,
    pub kucoin_base_url: String,
    pub bitget_base_url: String,
}

#[derive(Clone, Debug)]
pub struct AiConfig {
    pub gemini_base_url: String,
    pub gemini_api_key: Option<String>,
    pub chaingpt_base_url: String,
    pub chaingpt_api_key: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub endpoints: EndpointConfig,
    pub ai: AiConfig,
}

#[derive(Clone, Debug, Deserialize)]
struct ServerConfigFile {
    bind_addr: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct HttpConfigFile {
    timeout_secs: Option<u64>,
    recv_window_ms: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
struct EndpointConfigFile {
    xt_base_url: Option<String>,
    bybit_base_url: Option<String>,
    binance_base_url: Option<String>,
    kucoin_base_url: Option<String>,
    bitget_base_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct AiConfigFile {
    gemini_base_url: Option<String>,
    gemini_api_key: Option<String>,
    chaingpt_base_url: Option<String>,
    chaingpt_api_key: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct ConfigFile {
    server: Option<ServerConfigFile>,
    http: Option<HttpConfigFile>,
    endpoints: Option<EndpointConfigFile>,
    ai: Option<AiConfigFile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "127.0.0.1:8080".to_string(),
            },
            http: HttpConfig {
                timeout_secs: 10,
                recv_window_ms: 5_000,
            },
            endpoints: EndpointConfig {
                xt_base_url: "https://sapi.xt.com".to_string(),
                bybit_base_url: "https://api.bybit.com".to_string(),
                binance_base_url: "https://api.binance.com".to_string(),
                kucoin_base_url: "https://api.kucoin.com".to_string(),
                bitget_base_url: "https://api.bitget.com".to_string(),
            },
            ai: AiConfig {
                gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
                gemini_api_key: None,
                chaingpt_base_url: "https://api.chaingpt.org".to_string(),
                chaingpt_api_key: None,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|err| Error::new(format!("failed to read config: {err}")))?;
        let file: ConfigFile = toml::from_str(&content)
            .map_err(|err| Error::new(format!("failed to parse config: {err}")))?;
        let mut config = Config::from_file(file);
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    // Missing file is not an error: the gateway runs from defaults plus env.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            return Config::load(path);
        }
        let mut config = Config::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(file: ConfigFile) -> Self {
        let mut config = Config::default();

        if let Some(server) = file.server {
            if let Some(value) = server.bind_addr {
                config.server.bind_addr = value;
            }
        }

        if let Some(http) = file.http {
            if let Some(value) = http.timeout_secs {
                config.http.timeout_secs = value;
            }
            if let Some(value) = http.recv_window_ms {
                config.http.recv_window_ms = value;
            }
        }

        if let Some(endpoints) = file.endpoints {
            if let Some(value) = endpoints.xt_base_url {
                config.endpoints.xt_base_url = value;
            }
            if let Some(value) = endpoints.bybit_base_url {
                config.endpoints.bybit_base_url = value;
            }
            if let Some(value) = endpoints.binance_base_url {
                config.endpoints.binance_base_url = value;
            }
            if let Some(value) = endpoints.kucoin_base_url {
                config.endpoints.kucoin_base_url = value;
            }
            if let Some(value) = endpoints.bitget_base_url {
                config.endpoints.bitget_base_url = value;
            }
        }

        if let Some(ai) = file.ai {
            if let Some(value) = ai.gemini_base_url {
                config.ai.gemini_base_url = value;
            }
            if let Some(value) = ai.gemini_api_key {
                config.ai.gemini_api_key = Some(value);
            }
            if let Some(value) = ai.chaingpt_base_url {
                config.ai.chaingpt_base_url = value;
            }
            if let Some(value) = ai.chaingpt_api_key {
                config.ai.chaingpt_api_key = Some(value);
            }
        }

        config
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = read_string_env("TRADEGATE_BIND_ADDR")? {
            self.server.bind_addr = value;
        }

        if let Some(value) = read_u64_env("TRADEGATE_HTTP_TIMEOUT_SECS")? {
            self.http.timeout_secs = value;
        }
        if let Some(value) = read_u64_env("TRADEGATE_RECV_WINDOW_MS")? {
            self.http.recv_window_ms = value;
        }

        if let Some(value) = read_string_env("TRADEGATE_XT_BASE_URL")? {
            self.endpoints.xt_base_url = value;
        }
        if let Some(value) = read_string_env("TRADEGATE_BYBIT_BASE_URL")? {
            self.endpoints.bybit_base_url = value;
        }
        if let Some(value) = read_string_env("TRADEGATE_BINANCE_BASE_URL")? {
            self.endpoints.binance_base_url = value;
        }
        if let Some(value) = read_string_env("TRADEGATE_KUCOIN_BASE_URL")? {
            self.endpoints.kucoin_base_url = value;
        }
        if let Some(value) = read_string_env("TRADEGATE_BITGET_BASE_URL")? {
            self.endpoints.bitget_base_url = value;
        }

        if let Some(value) = read_string_env("TRADEGATE_GEMINI_BASE_URL")? {
            self.ai.gemini_base_url = value;
        }
        if let Some(value) = read_string_env("TRADEGATE_GEMINI_API_KEY")? {
            self.ai.gemini_api_key = Some(value);
        }
        if let Some(value) = read_string_env("TRADEGATE_CHAINGPT_BASE_URL")? {
            self.ai.chaingpt_base_url = value;
        }
        if let Some(value) = read_string_env("TRADEGATE_CHAINGPT_API_KEY")? {
            self.ai.chaingpt_api_key = Some(value);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.bind_addr.trim().is_empty() {
            return Err(Error::new("server.bind_addr must be set"));
        }
        if self.http.timeout_secs == 0 {
            return Err(Error::new("http.timeout_secs must be positive"));
        }
        if self.http.recv_window_ms == 0 {
            return Err(Error::new("http.recv_window_ms must be positive"));
        }

        for (name, url) in [
            ("endpoints.xt_base_url", &self.endpoints.xt_base_url),
            ("endpoints.bybit_base_url", &self.endpoints.bybit_base_url),
            (
                "endpoints.binance_base_url",
                &self.endpoints.binance_base_url,
            ),
            ("endpoints.kucoin_base_url", &self.endpoints.kucoin_base_url),
            ("endpoints.bitget_base_url", &self.endpoints.bitget_base_url),
            ("ai.gemini_base_url", &self.ai.gemini_base_url),
            ("ai.chaingpt_base_url", &self.ai.chaingpt_base_url),
        ] {
            if url.trim().is_empty() {
                return Err(Error::new(format!("{name} must be set")));
            }
            if url.ends_with('/') {
                return Err(Error::new(format!("{name} must not end with a slash")));
            }
        }

        for (name, key) in [
            ("ai.gemini_api_key", &self.ai.gemini_api_key),
            ("ai.chaingpt_api_key", &self.ai.chaingpt_api_key),
        ] {
            if let Some(key) = key {
                if key.trim().is_empty() {
                    return Err(Error::new(format!("{name} must be non-empty when set")));
                }
            }
        }

        Ok(())
    }
}

fn read_string_env(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(Error::new(format!("failed to read {key}: {err}"))),
    }
}

fn read_u64_env(key: &str) -> Result<Option<u64>> {
    match env::var(key) {
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|err| Error::new(format!("{key} must be u64: {err}"))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(Error::new(format!("failed to read {key}: {err}"))),
    }
}
