//! Runtime configuration resolution

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use tradecheck_common::{default_config_dir, RunOptions, RuntimeConfig};

use crate::output::{print_item, OutputFormat, TableDisplay};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Directory with `<env>.yaml` files
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    #[command(flatten)]
    pub options: RunOptions,
}

impl TableDisplay for RuntimeConfig {
    fn headers() -> Vec<&'static str> {
        vec!["Env", "Source", "Client", "Base URL", "User", "Password", "Server", "Account"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.env.clone(),
            self.source.to_string(),
            self.client.clone(),
            self.base_url.clone(),
            self.user.clone(),
            self.password.clone(),
            self.server.clone().unwrap_or_default(),
            self.account.clone().unwrap_or_default(),
        ]
    }
}

/// Resolve the config for the given run options, password masked.
pub fn resolve(args: &ConfigArgs) -> Result<RuntimeConfig> {
    let dir = args.config_dir.clone().unwrap_or_else(default_config_dir);
    Ok(RuntimeConfig::load(&args.options, &dir)?.redacted())
}

pub fn execute(args: ConfigArgs, format: OutputFormat) -> Result<()> {
    let config = resolve(&args)?;
    print_item(&config, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradecheck_common::Source;

    const ENV: &str = r#"
password: secret
centroid:
  main:
    base_url: https://sit.example.com
    credentials:
      user: trader@example.com
metatrader:
  lirunex:
    base_url: https://mt.example.com
    credentials:
      mt5:
        live: 1234567
"#;

    fn args(dir: &tempfile::TempDir, options: RunOptions) -> ConfigArgs {
        std::fs::write(dir.path().join("sit.yaml"), ENV).unwrap();
        ConfigArgs {
            config_dir: Some(dir.path().to_path_buf()),
            options,
        }
    }

    #[test]
    fn test_resolve_masks_password() {
        let dir = tempfile::tempdir().unwrap();
        let config = resolve(&args(&dir, RunOptions::default())).unwrap();
        assert_eq!(config.user, "trader@example.com");
        assert_eq!(config.password, "********");
        assert_eq!(config.row()[3], "https://sit.example.com");
    }

    #[test]
    fn test_resolve_metatrader_row() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            source: Source::Metatrader,
            ..RunOptions::default()
        };
        let config = resolve(&args(&dir, options)).unwrap();
        assert_eq!(
            config.row(),
            vec![
                "sit",
                "metatrader",
                "lirunex",
                "https://mt.example.com",
                "1234567",
                "********",
                "mt5",
                "live"
            ]
        );
    }

    #[test]
    fn test_missing_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = ConfigArgs {
            config_dir: Some(dir.path().to_path_buf()),
            options: RunOptions::default(),
        };
        assert!(resolve(&args).is_err());
    }
}
