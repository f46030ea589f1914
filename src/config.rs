use anyhow::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure that can be loaded from CLI, config file, or environment
///
/// Example configuration file content
/// # Firecast Configuration
///
/// # Server configuration
/// listen_on_port = 8000
/// workspace = "./data"
///
/// # API authentication
/// secret = "change-me"
///
/// # SFTP destination (all required)
/// sftp_address = "sftp.example.com"
/// sftp_port = 22
/// sftp_user = "radio"
/// sftp_password = "change-me"
///
/// # Downloader configuration
/// yt_dlp_path = "/usr/local/bin/yt-dlp"
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    #[serde(default = "default_port")]
    pub listen_on_port: u16,

    /// Shared secret expected in the x-api-key request header
    #[arg(long, env = "FIRECAST_SECRET")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// SFTP server hostname or IP address
    #[arg(long, env = "SFTP_ADDRESS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sftp_address: Option<String>,

    /// SFTP server port
    #[arg(long, env = "SFTP_PORT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sftp_port: Option<u16>,

    /// SFTP username
    #[arg(long, env = "SFTP_USER")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sftp_user: Option<String>,

    /// SFTP password
    #[arg(long, env = "SFTP_PASSWORD")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sftp_password: Option<String>,

    /// Working directory for in-flight downloads
    #[arg(short = 'w', long, default_value = ".")]
    #[serde(default = "default_workspace")]
    pub workspace: String,

    /// Configuration file path (fills in settings not given on the CLI)
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Path of the yt-dlp binary
    #[arg(long, default_value = "yt-dlp")]
    #[serde(default = "default_yt_dlp_path")]
    pub yt_dlp_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_on_port: default_port(),
            secret: None,
            sftp_address: None,
            sftp_port: None,
            sftp_user: None,
            sftp_password: None,
            workspace: default_workspace(),
            config: None,
            yt_dlp_path: default_yt_dlp_path(),
        }
    }
}

impl Config {
    /// Load configuration from CLI args and environment, optionally merging with a config file
    pub fn load() -> Result<Self> {
        // First parse CLI args
        let mut config = Config::parse();

        // If a config file is specified, load it and merge
        if let Some(config_path) = &config.config {
            let file_config = Self::from_file(Path::new(config_path))?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge with file config, CLI args take precedence
    fn merge_with_file(mut self, file_config: Config) -> Self {
        // If CLI value is default, use file value
        if self.listen_on_port == default_port() {
            self.listen_on_port = file_config.listen_on_port;
        }
        if self.workspace == default_workspace() {
            self.workspace = file_config.workspace;
        }
        if self.yt_dlp_path == default_yt_dlp_path() {
            self.yt_dlp_path = file_config.yt_dlp_path;
        }

        // For Option fields, CLI takes precedence if Some
        if self.secret.is_none() {
            self.secret = file_config.secret;
        }
        if self.sftp_address.is_none() {
            self.sftp_address = file_config.sftp_address;
        }
        if self.sftp_port.is_none() {
            self.sftp_port = file_config.sftp_port;
        }
        if self.sftp_user.is_none() {
            self.sftp_user = file_config.sftp_user;
        }
        if self.sftp_password.is_none() {
            self.sftp_password = file_config.sftp_password;
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.secret.as_ref().map(|s| s.is_empty()).unwrap_or(true) {
            return Err(anyhow::anyhow!(
                "API secret is required (set FIRECAST_SECRET or --secret)"
            ));
        }
        if self
            .sftp_address
            .as_ref()
            .map(|s| s.is_empty())
            .unwrap_or(true)
        {
            return Err(anyhow::anyhow!(
                "SFTP address is required (set SFTP_ADDRESS or --sftp-address)"
            ));
        }
        if self.sftp_port.is_none() {
            return Err(anyhow::anyhow!(
                "SFTP port is required (set SFTP_PORT or --sftp-port)"
            ));
        }
        if self
            .sftp_user
            .as_ref()
            .map(|s| s.is_empty())
            .unwrap_or(true)
        {
            return Err(anyhow::anyhow!(
                "SFTP user is required (set SFTP_USER or --sftp-user)"
            ));
        }
        if self
            .sftp_password
            .as_ref()
            .map(|s| s.is_empty())
            .unwrap_or(true)
        {
            return Err(anyhow::anyhow!(
                "SFTP password is required (set SFTP_PASSWORD or --sftp-password)"
            ));
        }

        Ok(())
    }

    /// Convert to the SFTP connection settings consumed by the uploader
    pub fn to_sftp_config(&self) -> Option<SftpConfig> {
        Some(SftpConfig {
            address: self.sftp_address.clone()?,
            port: self.sftp_port?,
            user: self.sftp_user.clone()?,
            password: self.sftp_password.clone()?,
        })
    }
}

// SFTP connection settings subset
#[derive(Debug, Clone)]
pub struct SftpConfig {
    pub address: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

// Default value functions
fn default_port() -> u16 {
    8000
}

fn default_workspace() -> String {
    ".".to_string()
}

fn default_yt_dlp_path() -> String {
    "yt-dlp".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_cli() -> Config {
        Config::try_parse_from([
            "firecast",
            "--secret",
            "topsecret",
            "--sftp-address",
            "sftp.example.com",
            "--sftp-port",
            "2222",
            "--sftp-user",
            "radio",
            "--sftp-password",
            "hunter2",
        ])
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.listen_on_port, 8000);
        assert_eq!(config.workspace, ".");
        assert_eq!(config.yt_dlp_path, "yt-dlp");
        assert!(config.secret.is_none());
        assert!(config.to_sftp_config().is_none());
    }

    #[test]
    fn test_cli_parsing() {
        let config = full_cli();
        assert_eq!(config.secret.as_deref(), Some("topsecret"));
        assert_eq!(config.sftp_address.as_deref(), Some("sftp.example.com"));
        assert_eq!(config.sftp_port, Some(2222));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_settings() {
        assert!(Config::default().validate().is_err());

        let mut config = full_cli();
        config.sftp_password = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml() {
        let config: Config = toml::from_str(
            r#"
            listen_on_port = 9000
            secret = "filekey"
            sftp_address = "upload.example.com"
            sftp_port = 22
            sftp_user = "radio"
            sftp_password = "hunter2"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_on_port, 9000);
        assert!(config.validate().is_ok());

        let sftp = config.to_sftp_config().unwrap();
        assert_eq!(sftp.address, "upload.example.com");
        assert_eq!(sftp.port, 22);
        assert_eq!(sftp.user, "radio");
    }

    #[test]
    fn test_merge_prefers_cli_over_file() {
        let cli = Config::try_parse_from(["firecast", "--sftp-port", "2222"]).unwrap();
        let file: Config = toml::from_str(
            r#"
            listen_on_port = 9000
            sftp_port = 22
            sftp_user = "radio"
            "#,
        )
        .unwrap();

        let merged = cli.merge_with_file(file);
        assert_eq!(merged.sftp_port, Some(2222));
        assert_eq!(merged.listen_on_port, 9000);
        assert_eq!(merged.sftp_user.as_deref(), Some("radio"));
    }
}
