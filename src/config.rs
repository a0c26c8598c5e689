//! Appliance connection settings.
//!
//! A flat mapping read from JSON or TOML (chosen by file extension), then
//! overridden by `ONEVIEWSDK_*` environment variables. A missing default
//! file is fine as long as the environment supplies the rest.

use crate::paths;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// API version assumed when none is configured.
pub const DEFAULT_API_VERSION: u32 = 800;

/// Connection settings for OneView and its companions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplianceConfig {
    pub hostname: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub api_version: u32,
    pub image_streamer_hostname: Option<String>,
    pub icsp_hostname: Option<String>,
    pub auth_login_domain: Option<String>,
    /// Skip TLS certificate verification.
    pub insecure: bool,
}

/// File contents, every field optional until the environment is applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(alias = "ip")]
    hostname: Option<String>,
    username: Option<String>,
    password: Option<String>,
    api_version: Option<u32>,
    #[serde(alias = "image_streamer_ip")]
    image_streamer_hostname: Option<String>,
    #[serde(alias = "icsp_ip")]
    icsp_hostname: Option<String>,
    auth_login_domain: Option<String>,
    insecure: Option<bool>,
}

impl ConfigFile {
    fn parse(path: &Path, content: &str) -> Result<Self> {
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            toml::from_str(content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        } else {
            serde_json::from_str(content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        let overrides = [
            ("ONEVIEWSDK_IP", &mut self.hostname),
            ("ONEVIEWSDK_USERNAME", &mut self.username),
            ("ONEVIEWSDK_PASSWORD", &mut self.password),
            ("ONEVIEWSDK_AUTH_LOGIN_DOMAIN", &mut self.auth_login_domain),
            ("ONEVIEWSDK_IMAGE_STREAMER_IP", &mut self.image_streamer_hostname),
            ("ONEVIEWSDK_ICSP_IP", &mut self.icsp_hostname),
        ];
        for (name, field) in overrides {
            if let Some(value) = var(name).filter(|v| !v.is_empty()) {
                log::debug!("Using {name} from the environment");
                *field = Some(value);
            }
        }
        if let Some(version) = var("ONEVIEWSDK_API_VERSION").filter(|v| !v.is_empty()) {
            self.api_version = Some(
                version
                    .parse()
                    .with_context(|| format!("ONEVIEWSDK_API_VERSION is not a number: {version}"))?,
            );
        }
        Ok(())
    }

    fn finish(self) -> Result<ApplianceConfig> {
        let required = |value: Option<String>, name: &str| -> Result<String> {
            match value {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => bail!("Missing '{name}' in appliance configuration"),
            }
        };
        Ok(ApplianceConfig {
            hostname: required(self.hostname, "hostname")?,
            username: required(self.username, "username")?,
            password: required(self.password, "password")?,
            api_version: self.api_version.unwrap_or(DEFAULT_API_VERSION),
            image_streamer_hostname: self.image_streamer_hostname,
            icsp_hostname: self.icsp_hostname,
            auth_login_domain: self.auth_login_domain,
            insecure: self.insecure.unwrap_or(false),
        })
    }
}

impl ApplianceConfig {
    /// Load from `explicit` or the default location, then the environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = paths::config_file(explicit)?;
        Self::load_with(&path, explicit.is_some(), |name| std::env::var(name).ok())
    }

    fn load_with(
        path: &Path,
        must_exist: bool,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut file = if path.exists() {
            log::debug!("Loading appliance config from {}", path.display());
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            ConfigFile::parse(path, &content)?
        } else if must_exist {
            bail!("Config file not found: {}", path.display());
        } else {
            log::debug!("No config at {}, using the environment", path.display());
            ConfigFile::default()
        };
        file.apply_env(var)?;
        file.finish()
    }

    /// Image Streamer host, required for Image Streamer kinds.
    pub fn image_streamer(&self) -> Result<&str> {
        self.image_streamer_hostname
            .as_deref()
            .context("'image_streamer_hostname' is required for Image Streamer resources")
    }

    /// ICsp host, required for ICsp flows.
    pub fn icsp(&self) -> Result<&str> {
        self.icsp_hostname
            .as_deref()
            .context("'icsp_hostname' is required for ICsp provisioning")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.json",
            r#"{"ip": "ov.example.com", "username": "admin", "password": "secret",
                "api_version": 1200, "image_streamer_ip": "i3s.example.com"}"#,
        );
        let config = ApplianceConfig::load_with(&path, true, no_env).unwrap();
        assert_eq!(config.hostname, "ov.example.com");
        assert_eq!(config.api_version, 1200);
        assert_eq!(config.image_streamer().unwrap(), "i3s.example.com");
        assert!(config.icsp().is_err());
        assert!(!config.insecure);
    }

    #[test]
    fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "ov.toml",
            "hostname = \"ov.example.com\"\nusername = \"admin\"\npassword = \"secret\"\ninsecure = true\n",
        );
        let config = ApplianceConfig::load_with(&path, true, no_env).unwrap();
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert!(config.insecure);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.json",
            r#"{"hostname": "ov1", "username": "admin", "password": "secret"}"#,
        );
        let env: HashMap<&str, &str> =
            HashMap::from([("ONEVIEWSDK_IP", "ov2"), ("ONEVIEWSDK_API_VERSION", "600")]);
        let config =
            ApplianceConfig::load_with(&path, true, |name| env.get(name).map(ToString::to_string))
                .unwrap();
        assert_eq!(config.hostname, "ov2");
        assert_eq!(config.api_version, 600);
    }

    #[test]
    fn test_environment_only() {
        let dir = TempDir::new().unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("ONEVIEWSDK_IP", "ov"),
            ("ONEVIEWSDK_USERNAME", "admin"),
            ("ONEVIEWSDK_PASSWORD", "secret"),
        ]);
        let config = ApplianceConfig::load_with(&dir.path().join("config.json"), false, |name| {
            env.get(name).map(ToString::to_string)
        })
        .unwrap();
        assert_eq!(config.username, "admin");
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = ApplianceConfig::load_with(&dir.path().join("nope.json"), true, no_env)
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_missing_password_fails() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.json", r#"{"hostname": "ov", "username": "admin"}"#);
        let err = ApplianceConfig::load_with(&path, true, no_env).unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.json", r#"{"hostname": "ov", "colour": "blue"}"#);
        assert!(ApplianceConfig::load_with(&path, true, no_env).is_err());
    }

    #[test]
    fn test_password_not_serialized() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.json",
            r#"{"hostname": "ov", "username": "admin", "password": "secret"}"#,
        );
        let config = ApplianceConfig::load_with(&path, true, no_env).unwrap();
        let shown = serde_json::to_string(&config).unwrap();
        assert!(!shown.contains("secret"));
    }
}
