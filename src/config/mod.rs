//! Bridge configuration (`bridge.toml`) and endpoint resolution.
//!
//! Three connection modes decide how the endpoint URL is built:
//!
//! | mode     | url                                     |
//! |----------|-----------------------------------------|
//! | `local`  | `http://127.0.0.1:{local.port}`         |
//! | `docker` | `http://{docker.host}:{docker.port}`    |
//! | `remote` | `remote.url` verbatim (required)        |
//!
//! All sections are optional in the file — defaults apply when absent.
//! Loading is an explicit async step behind [`ConfigSource`]; an `Endpoint`
//! is only ever constructed from a fully loaded configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 7658;
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 10;

// ─── Errors ───────────────────────────────────────────────────────────────────

/// Fatal configuration errors — these abort a connect attempt and leave the
/// session disconnected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("remote.url must be configured for remote mode")]
    MissingRemoteUrl,

    #[error("invalid mode: {0}")]
    InvalidMode(String),

    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

// ─── Endpoint ─────────────────────────────────────────────────────────────────

/// Authentication applied to outbound HTTP requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    None,
    #[default]
    ApiKey,
    Jwt,
}

/// Immutable connection target, constructed once per connection attempt.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: String,
    pub auth: AuthType,
    /// Bearer credential for api-key / jwt auth. None = no header.
    pub credential: Option<String>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

// ─── Config sections ──────────────────────────────────────────────────────────

/// `[local]` — server running on this machine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Port the local server listens on. Default: 7658.
    pub port: u16,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// `[docker]` — server in a container, possibly on another host.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Hostname of the container host. Default: "localhost".
    pub host: String,
    /// Published port. Default: 7658.
    pub port: u16,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// `[remote]` — fully specified remote endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Full endpoint URL. Required in remote mode.
    pub url: String,
    /// Auth scheme for the endpoint. Default: api_key.
    pub auth_type: AuthType,
    /// Credential sent as `Authorization: Bearer`. None = no header.
    pub api_key: Option<String>,
}

/// `[reconnect]` — policy read by the lifecycle controller. The RPC client
/// itself never retries.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Allow automatic reconnects on configuration changes. Default: true.
    pub enabled: bool,
    /// Cap on consecutive failed automatic reconnect attempts. Default: 10.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

// ─── BridgeConfig ─────────────────────────────────────────────────────────────

/// Root configuration for the bridge.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Connection mode: "local" | "docker" | "remote". Default: "local".
    pub mode: String,
    /// Request timeout in milliseconds. Default: 30000.
    pub timeout_ms: u64,
    pub local: LocalConfig,
    pub docker: DockerConfig,
    pub remote: RemoteConfig,
    pub reconnect: ReconnectConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mode: "local".to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            local: LocalConfig::default(),
            docker: DockerConfig::default(),
            remote: RemoteConfig::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Resolve the immutable [`Endpoint`] for the configured mode.
    ///
    /// Remote mode without a url and unrecognized mode strings are fatal —
    /// the connect attempt must not proceed on a half-valid configuration.
    pub fn resolve_endpoint(&self) -> Result<Endpoint, ConfigError> {
        let (base_url, auth, credential) = match self.mode.as_str() {
            "local" => (
                format!("http://127.0.0.1:{}", self.local.port),
                AuthType::None,
                None,
            ),
            "docker" => (
                format!("http://{}:{}", self.docker.host, self.docker.port),
                AuthType::None,
                None,
            ),
            "remote" => {
                if self.remote.url.is_empty() {
                    return Err(ConfigError::MissingRemoteUrl);
                }
                (
                    self.remote.url.clone(),
                    self.remote.auth_type,
                    self.remote.api_key.clone(),
                )
            }
            other => return Err(ConfigError::InvalidMode(other.to_string())),
        };

        Ok(Endpoint {
            base_url,
            auth,
            credential,
            timeout_ms: self.timeout_ms,
        })
    }
}

// ─── Config sources ───────────────────────────────────────────────────────────

/// Where configuration comes from. Loading is fully awaited by the session
/// before any endpoint is constructed.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load(&self) -> Result<BridgeConfig, ConfigError>;
}

/// TOML file source. A missing file yields defaults; a file that exists but
/// does not parse is an error the operator needs to see.
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn load(&self) -> Result<BridgeConfig, ConfigError> {
        if !self.path.exists() {
            return Ok(BridgeConfig::default());
        }
        let contents = tokio::fs::read_to_string(&self.path).await?;
        Ok(toml::from_str(&contents)?)
    }
}

/// Fixed in-memory configuration, mainly for tests and embedding hosts that
/// manage settings themselves.
pub struct StaticConfigSource {
    config: BridgeConfig,
}

impl StaticConfigSource {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn load(&self) -> Result<BridgeConfig, ConfigError> {
        Ok(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_to_local() {
        let ep = BridgeConfig::default().resolve_endpoint().unwrap();
        assert_eq!(ep.base_url, "http://127.0.0.1:7658");
        assert_eq!(ep.auth, AuthType::None);
        assert_eq!(ep.timeout_ms, 30_000);
    }

    #[test]
    fn docker_mode_uses_host_and_port() {
        let config: BridgeConfig = toml::from_str(
            r#"
            mode = "docker"

            [docker]
            host = "devbox"
            port = 9000
            "#,
        )
        .unwrap();
        let ep = config.resolve_endpoint().unwrap();
        assert_eq!(ep.base_url, "http://devbox:9000");
    }

    #[test]
    fn remote_mode_requires_url() {
        let config: BridgeConfig = toml::from_str(r#"mode = "remote""#).unwrap();
        assert!(matches!(
            config.resolve_endpoint(),
            Err(ConfigError::MissingRemoteUrl)
        ));
    }

    #[test]
    fn remote_mode_carries_credential() {
        let config: BridgeConfig = toml::from_str(
            r#"
            mode = "remote"

            [remote]
            url = "https://api.example.com/rpc"
            auth_type = "api_key"
            api_key = "sekrit"
            "#,
        )
        .unwrap();
        let ep = config.resolve_endpoint().unwrap();
        assert_eq!(ep.base_url, "https://api.example.com/rpc");
        assert_eq!(ep.auth, AuthType::ApiKey);
        assert_eq!(ep.credential.as_deref(), Some("sekrit"));
    }

    #[test]
    fn unknown_mode_is_fatal() {
        let config: BridgeConfig = toml::from_str(r#"mode = "carrier-pigeon""#).unwrap();
        assert!(matches!(
            config.resolve_endpoint(),
            Err(ConfigError::InvalidMode(m)) if m == "carrier-pigeon"
        ));
    }

    #[tokio::test]
    async fn file_source_reads_toml_and_surfaces_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");

        tokio::fs::write(&path, "mode = \"docker\"\n\n[docker]\nhost = \"box\"\n")
            .await
            .unwrap();
        let config = FileConfigSource::new(&path).load().await.unwrap();
        assert_eq!(config.mode, "docker");
        assert_eq!(config.docker.host, "box");
        // Unspecified sections keep their defaults.
        assert_eq!(config.docker.port, 7658);
        assert_eq!(config.reconnect.max_attempts, 10);

        tokio::fs::write(&path, "mode = [broken").await.unwrap();
        assert!(matches!(
            FileConfigSource::new(&path).load().await,
            Err(ConfigError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let source = FileConfigSource::new("/nonexistent/bridge.toml");
        let config = source.load().await.unwrap();
        assert_eq!(config.mode, "local");
        assert!(config.reconnect.enabled);
    }
}
