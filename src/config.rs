use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "devnode.toml";
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;
const RESERVED_PATHS: [&str; 4] = ["/", "/health", "/ready", "/openapi.json"];

/// Top-level application configuration loaded from file + environment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub service: ServiceSection,
    pub cors: CorsSection,
    pub hosts: HostsSection,
    pub readiness: ReadinessSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from disk and the process environment.
    pub fn load() -> Result<Self> {
        Self::load_from(env::vars().collect())
    }

    /// Load configuration using `vars` in place of the process environment.
    ///
    /// Precedence, lowest first: defaults, the TOML file named by
    /// `DEVNODE_CONFIG`, `DEVNODE__SECTION__KEY` variables, and finally the
    /// flat `APP_HOST` / `APP_PORT` / `DEBUG` variables.
    pub fn load_from(vars: HashMap<String, String>) -> Result<Self> {
        let config_path = vars
            .get("DEVNODE_CONFIG")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let mut builder = config::Config::builder();

        if Path::new(&config_path).exists() {
            builder = builder.add_source(config::File::from(PathBuf::from(&config_path)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DEVNODE")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins")
                .with_list_parse_key("hosts.allowed")
                .try_parsing(true)
                .source(Some(vars.clone())),
        );

        let settings = builder.build()?;
        let mut config: Self = settings.try_deserialize()?;

        config.apply_env_overrides(&vars)?;

        if config.logging.level.trim().is_empty() {
            config.logging.level = "info".to_string();
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self, vars: &HashMap<String, String>) -> Result<()> {
        if let Some(host) = vars.get("APP_HOST") {
            self.server.host = host.clone();
        }
        if let Some(port) = vars.get("APP_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid APP_PORT: {:?}", port))?;
        }
        if let Some(debug) = vars.get("DEBUG") {
            self.server.debug = debug.trim().eq_ignore_ascii_case("true");
        }
        Ok(())
    }

    /// Reject settings the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            bail!("server.host must not be empty");
        }
        if self.hosts.allowed.iter().all(|h| h.trim().is_empty()) {
            bail!("hosts.allowed must contain at least one pattern");
        }
        for origin in &self.cors.allowed_origins {
            if !(origin.starts_with("http://") || origin.starts_with("https://")) {
                bail!("cors.allowed_origins entry {:?} is not an http(s) origin", origin);
            }
        }
        for (key, url) in [
            ("service.docs_url", &self.service.docs_url),
            ("service.redoc_url", &self.service.redoc_url),
        ] {
            if url.is_empty() {
                continue;
            }
            if !url.starts_with('/') || RESERVED_PATHS.contains(&url.as_str()) {
                bail!("{} {:?} must be an unused absolute path", key, url);
            }
            if url.ends_with('/') || url.contains([':', '*', '{', '}']) {
                bail!("{} {:?} must be a plain path without a trailing slash", key, url);
            }
        }
        let (docs, redoc) = (&self.service.docs_url, &self.service.redoc_url);
        if !docs.is_empty()
            && !redoc.is_empty()
            && (docs == redoc || redoc.starts_with(&format!("{}/", docs)))
        {
            bail!(
                "service.redoc_url {:?} collides with the Swagger UI mounted at {:?}",
                redoc,
                docs
            );
        }
        if self.readiness.probe_timeout_ms == 0 {
            bail!("readiness.probe_timeout_ms must be greater than zero");
        }
        Ok(())
    }

    /// Tracing filter directive; `DEBUG=true` forces debug verbosity.
    pub fn log_filter(&self) -> String {
        if self.server.debug {
            "debug".to_string()
        } else {
            self.logging.level.clone()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            debug: false,
        }
    }
}

/// Identity reported by the banner, health and docs endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    pub name: String,
    pub description: String,
    pub version: String,
    /// Empty disables the page.
    pub docs_url: String,
    /// Empty disables the page.
    pub redoc_url: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: "Dev-PyNode API".to_string(),
            description: "AI-powered development platform backend".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            docs_url: "/docs".to_string(),
            redoc_url: "/redoc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsSection {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsSection {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3001".to_string(),
                "http://localhost:3000".to_string(),
            ],
            allow_credentials: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostsSection {
    pub allowed: Vec<String>,
}

impl Default for HostsSection {
    fn default() -> Self {
        Self {
            allowed: vec![
                "localhost".to_string(),
                "127.0.0.1".to_string(),
                "*.local".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReadinessSection {
    pub probe_timeout_ms: u64,
}

impl Default for ReadinessSection {
    fn default() -> Self {
        Self {
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Text,
}
