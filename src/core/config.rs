use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENDPOINT: &str = "https://pubsub.googleapis.com";
const DEFAULT_CONFIG_PATH: &str = "config/pubsub.toml";
const MAX_PULL_MESSAGES: u32 = 1_000;

/// Client configuration for the `pubsub` CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub project_id: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bearer token sent with every request. Unset for emulators.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub pull: PullConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullConfig {
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,
    /// Acknowledge pulled messages immediately after printing them.
    #[serde(default = "default_auto_ack")]
    pub auto_ack: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            endpoint: default_endpoint(),
            access_token: None,
            request_timeout_ms: default_request_timeout_ms(),
            pull: PullConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            auto_ack: default_auto_ack(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl ClientConfig {
    /// Resolve configuration for a CLI invocation.
    ///
    /// An explicit path, or one named by `PUBSUB_CONFIG`, must exist.
    /// `config/pubsub.toml` is read when present and defaults are used when
    /// not. Environment overrides are applied last.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| env_value("PUBSUB_CONFIG").map(PathBuf::from));
        let mut cfg = match explicit {
            Some(path) => Self::load(&path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::load(path)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Load configuration from a specific file (TOML or JSON based on extension).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let data = fs::read_to_string(path_ref)
            .with_context(|| format!("unable to read config {}", path_ref.display()))?;
        if is_json(path_ref) {
            Ok(serde_json::from_str(&data)
                .with_context(|| format!("invalid JSON config {}", path_ref.display()))?)
        } else {
            Ok(toml::from_str(&data)
                .with_context(|| format!("invalid TOML config {}", path_ref.display()))?)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            bail!("project_id must be set (config, PUBSUB_PROJECT_ID or --project)");
        }
        if self.project_id.contains('/') {
            bail!("project_id {} must not contain '/'", self.project_id);
        }
        let endpoint = url::Url::parse(&self.endpoint)
            .with_context(|| format!("invalid endpoint {}", self.endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            bail!("endpoint {} must use http or https", self.endpoint);
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be > 0");
        }
        if self.pull.max_messages == 0 || self.pull.max_messages > MAX_PULL_MESSAGES {
            bail!("pull.max_messages must be within 1..={MAX_PULL_MESSAGES}");
        }
        Ok(())
    }

    /// Point the client at a local emulator; emulators take no credentials.
    pub fn use_emulator(&mut self, host: &str) {
        self.endpoint = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("http://{host}")
        };
        self.access_token = None;
    }

    fn apply_env_overrides(&mut self) {
        let project =
            env_value("PUBSUB_PROJECT_ID").or_else(|| env_value("GOOGLE_CLOUD_PROJECT"));
        if let Some(project) = project {
            self.project_id = project;
        }
        if let Some(endpoint) = env_value("PUBSUB_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(token) = env_value("PUBSUB_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
        if let Some(host) = env_value("PUBSUB_EMULATOR_HOST") {
            self.use_emulator(&host);
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn is_json(path: &Path) -> bool {
    matches!(path.extension().and_then(|s| s.to_str()), Some("json"))
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_messages() -> u32 {
    10
}

fn default_auto_ack() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    // Environment variables are process-wide; serialize tests touching them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn write_config(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn toml_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "pubsub.toml", "project_id = \"demo\"\n");
        let cfg = ClientConfig::load(&path).unwrap();
        assert_eq!(cfg.project_id, "demo");
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.request_timeout_ms, 30_000);
        assert_eq!(cfg.pull.max_messages, 10);
        assert!(cfg.pull.auto_ack);
        assert_eq!(cfg.logging.level, "warn");
        cfg.validate().unwrap();
    }

    #[test]
    fn json_config_by_extension() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "pubsub.json",
            r#"{"project_id":"demo","pull":{"max_messages":50,"auto_ack":false}}"#,
        );
        let cfg = ClientConfig::load(&path).unwrap();
        assert_eq!(cfg.pull.max_messages, 50);
        assert!(!cfg.pull.auto_ack);
    }

    #[test]
    fn validation_rejects_missing_project() {
        let err = ClientConfig::default().validate().unwrap_err();
        assert!(format!("{err:?}").contains("project_id must be set"));
    }

    #[test]
    fn validation_rejects_bad_endpoint_and_limits() {
        let mut cfg = ClientConfig {
            project_id: "demo".into(),
            ..Default::default()
        };
        cfg.endpoint = "ftp://pubsub.local".into();
        assert!(cfg.validate().is_err());

        cfg.endpoint = DEFAULT_ENDPOINT.into();
        cfg.pull.max_messages = 0;
        assert!(cfg.validate().is_err());

        cfg.pull.max_messages = 10;
        cfg.request_timeout_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn emulator_host_switches_endpoint_and_drops_token() {
        let mut cfg = ClientConfig {
            project_id: "demo".into(),
            access_token: Some("secret".into()),
            ..Default::default()
        };
        cfg.use_emulator("localhost:8085");
        assert_eq!(cfg.endpoint, "http://localhost:8085");
        assert!(cfg.access_token.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn env_overrides_apply_after_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "pubsub.toml",
            "project_id = \"from-file\"\naccess_token = \"file-token\"\n",
        );
        std::env::set_var("PUBSUB_PROJECT_ID", "from-env");
        std::env::set_var("PUBSUB_EMULATOR_HOST", "127.0.0.1:8681");
        let cfg = ClientConfig::resolve(Some(path.as_path()));
        std::env::remove_var("PUBSUB_PROJECT_ID");
        std::env::remove_var("PUBSUB_EMULATOR_HOST");
        let cfg = cfg.unwrap();
        assert_eq!(cfg.project_id, "from-env");
        assert_eq!(cfg.endpoint, "http://127.0.0.1:8681");
        assert!(cfg.access_token.is_none());
    }

    #[test]
    fn missing_env_config_file_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        std::env::set_var("PUBSUB_CONFIG", &missing);
        let result = ClientConfig::resolve(None);
        std::env::remove_var("PUBSUB_CONFIG");
        let err = result.unwrap_err();
        assert!(format!("{err:?}").contains("unable to read config"));
    }

    #[test]
    fn env_config_file_is_loaded() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "pubsub.json", r#"{"project_id":"from-env-file"}"#);
        std::env::set_var("PUBSUB_CONFIG", &path);
        let result = ClientConfig::resolve(None);
        std::env::remove_var("PUBSUB_CONFIG");
        assert_eq!(result.unwrap().project_id, "from-env-file");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = ClientConfig::resolve(Some(dir.path().join("absent.toml").as_path())).unwrap_err();
        assert!(format!("{err:?}").contains("unable to read config"));
    }
}
