//! Run options and per-environment runtime configuration
//!
//! Run options come from the command line (or are built directly in tests).
//! The environment file `<config_dir>/<env>.yaml` supplies tenant URLs and
//! credentials:
//!
//! ```yaml
//! password: secret
//! password_crm: crm-secret
//! centroid:
//!   main:
//!     base_url: https://sit.example.com
//!     credentials:
//!       user: trader@example.com
//! metatrader:
//!   lirunex:
//!     base_url: https://mt.example.com
//!     credentials:
//!       mt5:
//!         live: "1234567"
//!         demo: "7654321"
//! ```

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Clients served by more than one order management system
pub const MULTI_OMS: &[&str] = &["lirunex", "transactcloudmt5"];

/// Back-office flavour behind the tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Centroid,
    Metatrader,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Centroid => "centroid",
            Source::Metatrader => "metatrader",
        }
    }

    fn default_client(&self) -> &'static str {
        match self {
            Source::Centroid => "main",
            Source::Metatrader => "lirunex",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the UI under test runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    #[default]
    Web,
    WebApp,
    Ios,
    Android,
}

/// Options accepted by every test run
#[derive(Args, Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Environment name, selects `<env>.yaml`
    #[arg(long, default_value = "sit")]
    pub env: String,

    /// Back-office source
    #[arg(long, value_enum, default_value_t = Source::Centroid)]
    pub source: Source,

    /// Client (tenant) to test
    #[arg(long, default_value = "")]
    pub client: String,

    /// Specific server when source is metatrader
    #[arg(long, default_value = "mt5")]
    pub server: String,

    /// Account type (live, demo, crm)
    #[arg(long, default_value = "live")]
    pub account: String,

    /// User to log in with
    #[arg(long, default_value = "")]
    pub user: String,

    /// Password of the user
    #[arg(long, default_value = "")]
    pub password: String,

    /// Custom URL of the tenant to test
    #[arg(long, default_value = "")]
    pub url: String,

    /// Enable debug logging
    #[arg(long)]
    pub debuglog: bool,

    /// Running on CD infrastructure (remote grid)
    #[arg(long)]
    pub cd: bool,

    /// Browser to drive (chrome, firefox, safari)
    #[arg(long, default_value = "chrome")]
    pub browser: String,

    /// Run the browser headless
    #[arg(long)]
    pub headless: bool,

    /// Platform under test
    #[arg(long, value_enum, default_value_t = Platform::Web)]
    pub platform: Platform,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            env: "sit".to_string(),
            source: Source::Centroid,
            client: String::new(),
            server: "mt5".to_string(),
            account: "live".to_string(),
            user: String::new(),
            password: String::new(),
            url: String::new(),
            debuglog: false,
            cd: false,
            browser: "chrome".to_string(),
            headless: false,
            platform: Platform::Web,
        }
    }
}

/// Raw shape of an environment YAML file
#[derive(Debug, Default, Deserialize)]
struct EnvFile {
    #[serde(default)]
    password: String,
    #[serde(default)]
    password_crm: String,
    #[serde(default)]
    centroid: HashMap<String, ClientEntry>,
    #[serde(default)]
    metatrader: HashMap<String, ClientEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ClientEntry {
    #[serde(default)]
    base_url: String,
    #[serde(default)]
    app_package: String,
    #[serde(default)]
    app_bundle: String,
    #[serde(default)]
    credentials: serde_yaml::Value,
}

/// Resolved configuration for one test session
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    pub env: String,
    pub source: Source,
    pub client: String,
    pub base_url: String,
    pub app_package: String,
    pub app_bundle: String,
    pub user: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl RuntimeConfig {
    /// Load `<config_dir>/<env>.yaml` and merge it with the run options.
    pub fn load(options: &RunOptions, config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(format!("{}.yaml", options.env));
        if !path.exists() {
            return Err(Error::ConfigNotFound(path));
        }
        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_yaml(options, &content).map_err(|e| match e {
            Error::Yaml { source, .. } => Error::Yaml { path: path.clone(), source },
            other => other,
        })?;
        debug!("Loaded runtime config from {}", path.display());
        Ok(config)
    }

    /// Resolve configuration from YAML text.
    pub fn from_yaml(options: &RunOptions, yaml: &str) -> Result<Self> {
        let file: EnvFile = serde_yaml::from_str(yaml).map_err(|source| Error::Yaml {
            path: PathBuf::from("<inline>"),
            source,
        })?;

        let client = if options.client.is_empty() {
            options.source.default_client().to_string()
        } else {
            options.client.clone()
        };

        let clients = match options.source {
            Source::Centroid => &file.centroid,
            Source::Metatrader => &file.metatrader,
        };
        let empty = ClientEntry::default();
        let entry = clients.get(&client).unwrap_or(&empty);

        let mut config = RuntimeConfig {
            env: options.env.clone(),
            source: options.source,
            client,
            base_url: if options.url.is_empty() {
                entry.base_url.clone()
            } else {
                options.url.clone()
            },
            app_package: entry.app_package.clone(),
            app_bundle: entry.app_bundle.clone(),
            ..Default::default()
        };

        if !options.user.is_empty() {
            config.user = options.user.clone();
            config.password = options.password.clone();
            return Ok(config);
        }

        match options.source {
            Source::Centroid => {
                config.user = yaml_str(&entry.credentials["user"]);
            }
            Source::Metatrader => {
                config.user = yaml_str(&entry.credentials[options.server.as_str()][options.account.as_str()]);
                config.server = Some(options.server.clone());
                config.account = Some(options.account.clone());
            }
        }

        config.password = if options.account == "crm" {
            file.password_crm
        } else {
            file.password
        };

        Ok(config)
    }

    pub fn is_centroid(&self) -> bool {
        self.source == Source::Centroid
    }

    pub fn is_mt4(&self) -> bool {
        self.source == Source::Metatrader && self.server.as_deref() == Some("mt4")
    }

    pub fn is_multi_oms(&self) -> bool {
        MULTI_OMS.contains(&self.client.as_str())
    }

    /// Copy with the password masked, for printing
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.password.is_empty() {
            copy.password = "********".to_string();
        }
        copy
    }
}

/// Credentials may be written as strings or bare numbers (account logins).
fn yaml_str(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIT: &str = r#"
password: secret
password_crm: crm-secret
centroid:
  main:
    base_url: https://sit.example.com
    credentials:
      user: trader@example.com
metatrader:
  lirunex:
    base_url: https://mt.example.com
    app_package: com.example.mt
    credentials:
      mt5:
        live: 1234567
        crm: "crm-login"
"#;

    #[test]
    fn test_centroid_defaults() {
        let config = RuntimeConfig::from_yaml(&RunOptions::default(), SIT).unwrap();
        assert_eq!(config.client, "main");
        assert_eq!(config.base_url, "https://sit.example.com");
        assert_eq!(config.user, "trader@example.com");
        assert_eq!(config.password, "secret");
        assert!(config.is_centroid());
        assert_eq!(config.server, None);
    }

    #[test]
    fn test_metatrader_credentials_by_server_and_account() {
        let options = RunOptions {
            source: Source::Metatrader,
            ..Default::default()
        };
        let config = RuntimeConfig::from_yaml(&options, SIT).unwrap();
        assert_eq!(config.client, "lirunex");
        assert_eq!(config.user, "1234567");
        assert_eq!(config.app_package, "com.example.mt");
        assert_eq!(config.server.as_deref(), Some("mt5"));
        assert!(config.is_multi_oms());
        assert!(!config.is_mt4());
    }

    #[test]
    fn test_crm_account_uses_crm_password() {
        let options = RunOptions {
            source: Source::Metatrader,
            account: "crm".to_string(),
            ..Default::default()
        };
        let config = RuntimeConfig::from_yaml(&options, SIT).unwrap();
        assert_eq!(config.user, "crm-login");
        assert_eq!(config.password, "crm-secret");
    }

    #[test]
    fn test_explicit_user_and_url_win() {
        let options = RunOptions {
            user: "me".to_string(),
            password: "pw".to_string(),
            url: "https://custom.example.com".to_string(),
            ..Default::default()
        };
        let config = RuntimeConfig::from_yaml(&options, SIT).unwrap();
        assert_eq!(config.user, "me");
        assert_eq!(config.password, "pw");
        assert_eq!(config.base_url, "https://custom.example.com");
        assert_eq!(config.redacted().password, "********");
    }

    #[test]
    fn test_load_missing_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RuntimeConfig::load(&RunOptions::default(), dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("uat.yaml"), SIT).unwrap();
        let options = RunOptions {
            env: "uat".to_string(),
            ..Default::default()
        };
        let config = RuntimeConfig::load(&options, dir.path()).unwrap();
        assert_eq!(config.env, "uat");
    }
}
