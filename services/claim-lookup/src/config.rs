use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Config: read once at startup, immutable afterwards
//
// Daemon credentials come from lbrycrd.conf (same file the daemon reads);
// env vars override individual values. A missing conf file is not an
// error: the daemon's stock credentials apply.
// ---------------------------------------------------------------------------

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9245;
pub const DEFAULT_RPC_USER: &str = "lbry";
pub const DEFAULT_RPC_PASSWORD: &str = "lbry";
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{key}: invalid value {value:?}")]
    Invalid { key: String, value: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct RpcConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.into(),
            port: DEFAULT_RPC_PORT,
            user: DEFAULT_RPC_USER.into(),
            password: DEFAULT_RPC_PASSWORD.into(),
            timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for RpcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RpcConfig {
    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }

    /// Apply `key=value` lines from an lbrycrd.conf body.
    pub fn apply_conf(&mut self, text: &str) -> Result<(), ConfigError> {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "rpcuser" => self.user = value.to_string(),
                "rpcpassword" => self.password = value.to_string(),
                "rpcport" => self.port = parse("rpcport", value)?,
                "rpcconnect" => self.host = value.to_string(),
                _ => {}
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub rpc: RpcConfig,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            bind_addr: DEFAULT_BIND_ADDR.into(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (env in production).
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();

        let conf_path = var("LBRYCRD_CONF")
            .map(PathBuf::from)
            .or_else(default_conf_path);
        if let Some(path) = conf_path {
            cfg.load_conf_file(&path)?;
        }

        if let Some(host) = var("LBRYCRD_RPC_HOST") {
            cfg.rpc.host = host;
        }
        if let Some(port) = var("LBRYCRD_RPC_PORT") {
            cfg.rpc.port = parse("LBRYCRD_RPC_PORT", &port)?;
        }
        if let Some(user) = var("LBRYCRD_RPC_USER") {
            cfg.rpc.user = user;
        }
        if let Some(password) = var("LBRYCRD_RPC_PASSWORD") {
            cfg.rpc.password = password;
        }
        if let Some(secs) = var("RPC_TIMEOUT_SECS") {
            cfg.rpc.timeout = Duration::from_secs(parse("RPC_TIMEOUT_SECS", &secs)?);
        }
        if let Some(addr) = var("BIND_ADDR") {
            cfg.bind_addr = addr;
        }
        Ok(cfg)
    }

    fn load_conf_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                tracing::info!(path = %path.display(), "lbrycrd.conf loaded");
                self.rpc.apply_conf(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "lbrycrd.conf not found, using default credentials");
                Ok(())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

fn default_conf_path() -> Option<PathBuf> {
    let base_dirs = directories::BaseDirs::new()?;
    Some(base_dirs.home_dir().join(".lbrycrd").join("lbrycrd.conf"))
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}
